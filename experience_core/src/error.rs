//! Error taxonomy for the experience manager.

use thiserror::Error;
use world_model::WorldError;

/// Low-level failure talking to the platform.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("platform answered {url} with status {status}")]
    Status { url: String, status: u16 },

    #[error("could not decode response from {url}: {message}")]
    Body { url: String, message: String },

    #[error("client build failed: {0}")]
    BuildClient(String),
}

/// Malformed data received from the platform.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("field `{0}` missing from platform reply")]
    MissingField(&'static str),

    #[error("unexpected shape for {what}: {found}")]
    Shape { what: &'static str, found: String },

    #[error("unsupported encounter manifest version {0}")]
    ManifestVersion(u32),
}

impl DecodeError {
    pub(crate) fn shape(what: &'static str, found: impl ToString) -> Self {
        DecodeError::Shape {
            what,
            found: found.to_string(),
        }
    }
}

/// Illegal encounter lifecycle change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("encounter `{name}` is already {status}")]
pub struct EncounterError {
    pub name: String,
    pub status: &'static str,
}

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Every failure that stops the manager.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Reply text did not match the catalog entry for this phase.
    #[error("protocol violation in {phase}: expected `{expected}`, received `{received}`")]
    ProtocolViolation {
        phase: &'static str,
        expected: String,
        received: String,
    },

    /// The platform was offline or the request failed during the handshake.
    #[error("no response from platform during {phase}")]
    NoResponse { phase: &'static str },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Encounter(#[from] EncounterError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to start receiver thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("message channel disconnected")]
    ChannelClosed,
}
