//! Protocol message catalog fetched from the platform at start-up.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Handshake phases that carry catalog messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolPhase {
    Phase1,
    Phase3,
    Phase4,
}

impl ProtocolPhase {
    /// Key used by the platform, e.g. `PHASE_3`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolPhase::Phase1 => "PHASE_1",
            ProtocolPhase::Phase3 => "PHASE_3",
            ProtocolPhase::Phase4 => "PHASE_4",
        }
    }
}

impl fmt::Display for ProtocolPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase -> message id -> text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolCatalog(HashMap<String, HashMap<String, String>>);

impl ProtocolCatalog {
    /// Catalog text for `(phase, message_id)`; empty when the entry is absent.
    pub fn message(&self, phase: ProtocolPhase, message_id: &str) -> &str {
        self.0
            .get(phase.as_str())
            .and_then(|messages| messages.get(message_id))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Add an entry.
    pub fn with_message(
        mut self,
        phase: ProtocolPhase,
        message_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.0
            .entry(phase.as_str().to_string())
            .or_default()
            .insert(message_id.into(), text.into());
        self
    }
}
