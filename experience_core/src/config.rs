//! Manager configuration, loaded from TOML.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Static endpoint paths relative to the platform base address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub protocol_messages: String,
    pub initialization: String,
    pub protocol_phase: String,
    pub error_report: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            protocol_messages: "get_protocol_messages".to_string(),
            initialization: "inizialization_em".to_string(),
            protocol_phase: "protocol_phase".to_string(),
            error_report: "add_error_message".to_string(),
        }
    }
}

/// Configuration for the experience manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Platform base address.
    pub base_url: String,

    /// Suffix appended to the phase-1 greeting.
    pub identity: String,

    /// Connectivity calls answered from cache between two real probes.
    pub max_requests_before_probe: u32,

    pub probe_timeout_ms: u64,

    pub online_poll_interval_ms: u64,

    pub phase_poll_interval_ms: u64,

    /// Sleep between two receive fetches.
    pub receive_interval_ms: u64,

    /// Sleep when the inbound queue is empty.
    pub idle_poll_interval_ms: u64,

    /// Sleep after a selection among several candidates.
    pub selection_cooldown_ms: u64,

    /// Fixed tie-breaking seed; entropy when absent.
    pub seed: Option<u64>,

    pub endpoints: EndpointConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/".to_string(),
            identity: "Experience Manager".to_string(),
            max_requests_before_probe: 10,
            probe_timeout_ms: 500,
            online_poll_interval_ms: 1000,
            phase_poll_interval_ms: 100,
            receive_interval_ms: 1000,
            idle_poll_interval_ms: 10,
            selection_cooldown_ms: 1000,
            seed: None,
            endpoints: EndpointConfig::default(),
        }
    }
}

impl ManagerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn online_poll_interval(&self) -> Duration {
        Duration::from_millis(self.online_poll_interval_ms)
    }

    pub fn phase_poll_interval(&self) -> Duration {
        Duration::from_millis(self.phase_poll_interval_ms)
    }

    pub fn receive_interval(&self) -> Duration {
        Duration::from_millis(self.receive_interval_ms)
    }

    pub fn idle_poll_interval(&self) -> Duration {
        Duration::from_millis(self.idle_poll_interval_ms)
    }

    pub fn selection_cooldown(&self) -> Duration {
        Duration::from_millis(self.selection_cooldown_ms)
    }

    /// Intervals collapsed to zero, for driving the manager against fakes.
    #[cfg(test)]
    pub(crate) fn immediate() -> Self {
        Self {
            online_poll_interval_ms: 0,
            phase_poll_interval_ms: 0,
            receive_interval_ms: 0,
            idle_poll_interval_ms: 0,
            selection_cooldown_ms: 0,
            ..Self::default()
        }
    }
}
