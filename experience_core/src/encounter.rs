//! Encounters: pre-authored narrative units gated by a precondition.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use world_model::{WorldError, WorldStateAdapter};

use crate::error::{DecodeError, EncounterError};

/// Schema version of the encounter manifest sent in handshake phase 3.
pub const MANIFEST_VERSION: u32 = 1;

/// Lifecycle status. `Executed` and `Skipped` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncounterStatus {
    Pending,
    Executed,
    Skipped,
}

impl EncounterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncounterStatus::Pending => "pending",
            EncounterStatus::Executed => "executed",
            EncounterStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for EncounterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Initialization record for one encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterRecord {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Opaque to the manager; kept as sent.
    #[serde(default)]
    pub metadata: Value,
    /// Precondition text, parsed by the world state.
    pub preconditions: String,
}

fn default_manifest_version() -> u32 {
    MANIFEST_VERSION
}

/// Versioned list of encounter records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterManifest {
    #[serde(default = "default_manifest_version")]
    pub version: u32,
    pub encounters: Vec<EncounterRecord>,
}

impl EncounterManifest {
    /// Decode from a JSON string or an inline JSON object.
    pub fn decode(value: &Value) -> Result<Self, DecodeError> {
        let manifest: Self = match value {
            Value::String(encoded) => serde_json::from_str(encoded)?,
            other => serde_json::from_value(other.clone())?,
        };
        if manifest.version != MANIFEST_VERSION {
            return Err(DecodeError::ManifestVersion(manifest.version));
        }
        Ok(manifest)
    }
}

/// A narrative unit that fires at most once.
#[derive(Debug, Clone)]
pub struct Encounter<P> {
    name: String,
    description: String,
    metadata: Value,
    precondition_text: String,
    precondition: P,
    status: EncounterStatus,
}

impl<P> Encounter<P> {
    pub fn new(record: EncounterRecord, precondition: P) -> Self {
        Self {
            name: record.name,
            description: record.description,
            metadata: record.metadata,
            precondition_text: record.preconditions,
            precondition,
            status: EncounterStatus::Pending,
        }
    }

    /// Build from a record, parsing its precondition with the world state.
    pub fn from_record<W>(record: EncounterRecord, world: &W) -> Result<Self, WorldError>
    where
        W: WorldStateAdapter<Proposition = P>,
    {
        let precondition = world.parse_precondition(&record.preconditions)?;
        Ok(Self::new(record, precondition))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    pub fn precondition_text(&self) -> &str {
        &self.precondition_text
    }

    pub fn precondition(&self) -> &P {
        &self.precondition
    }

    pub fn status(&self) -> EncounterStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == EncounterStatus::Pending
    }

    /// Trigger text sent to the platform, e.g. `start_encounter(ambush)`.
    pub fn start_message(&self) -> String {
        format!("start_encounter({})", self.name)
    }

    pub fn mark_executed(&mut self) -> Result<(), EncounterError> {
        self.transition(EncounterStatus::Executed)
    }

    pub fn mark_skipped(&mut self) -> Result<(), EncounterError> {
        self.transition(EncounterStatus::Skipped)
    }

    fn transition(&mut self, to: EncounterStatus) -> Result<(), EncounterError> {
        if self.status != EncounterStatus::Pending {
            return Err(EncounterError {
                name: self.name.clone(),
                status: self.status.as_str(),
            });
        }
        self.status = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use world_model::WorldState;

    fn record(name: &str) -> EncounterRecord {
        EncounterRecord {
            name: name.to_string(),
            description: "A shadow moves".to_string(),
            metadata: Value::Null,
            preconditions: "(at hero room1)".to_string(),
        }
    }

    #[test]
    fn test_from_record() {
        let encounter = Encounter::from_record(record("ambush"), &WorldState::new()).unwrap();
        assert_eq!(encounter.name(), "ambush");
        assert_eq!(encounter.status(), EncounterStatus::Pending);
        assert_eq!(encounter.start_message(), "start_encounter(ambush)");
    }

    #[test]
    fn test_invalid_precondition() {
        let mut bad = record("broken");
        bad.preconditions = "(and (at hero".to_string();
        assert!(Encounter::from_record(bad, &WorldState::new()).is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        let mut executed = Encounter::new(record("a"), ());
        executed.mark_executed().unwrap();
        assert!(executed.mark_skipped().is_err());
        assert!(executed.mark_executed().is_err());
        assert_eq!(executed.status(), EncounterStatus::Executed);

        let mut skipped = Encounter::new(record("b"), ());
        skipped.mark_skipped().unwrap();
        let err = skipped.mark_executed().unwrap_err();
        assert_eq!(err.status, "skipped");
        assert_eq!(skipped.status(), EncounterStatus::Skipped);
    }

    #[test]
    fn test_manifest_decoding() {
        let inline = json!({
            "encounters": [{
                "name": "merchant",
                "description": "A travelling merchant",
                "metadata": {"weight": 2},
                "preconditions": "(at hero market)"
            }]
        });
        let manifest = EncounterManifest::decode(&inline).unwrap();
        assert_eq!(manifest.version, MANIFEST_VERSION);
        assert_eq!(manifest.encounters[0].metadata["weight"], json!(2));

        let encoded = Value::String(inline.to_string());
        assert_eq!(EncounterManifest::decode(&encoded).unwrap(), manifest);
    }

    #[test]
    fn test_metadata_is_passed_through() {
        let manifest = EncounterManifest::decode(&json!({
            "encounters": [
                {"name": "a", "metadata": null, "preconditions": ""},
                {"name": "b", "metadata": ["tag", 3], "preconditions": ""},
                {"name": "c", "preconditions": ""}
            ]
        }))
        .unwrap();

        let metadata: Vec<&Value> = manifest.encounters.iter().map(|record| &record.metadata).collect();
        assert_eq!(metadata, [&Value::Null, &json!(["tag", 3]), &Value::Null]);
        let encounter = Encounter::new(manifest.encounters[1].clone(), ());
        assert_eq!(encounter.metadata(), &json!(["tag", 3]));
    }

    #[test]
    fn test_manifest_version_is_checked() {
        let future = json!({"version": 2, "encounters": []});
        assert!(matches!(
            EncounterManifest::decode(&future),
            Err(DecodeError::ManifestVersion(2))
        ));
    }
}
