//! Inbound change records delivered by the platform.
//!
//! Each raw record carries a `text` field holding JSON in one of two shapes:
//!
//! - `["update_player_model", payload]` - the whole record is a player model update
//! - `[[tag, payload], ...]` - world changes, `tag` one of `new`, `changed_value`,
//!   `new_entity`, `update_player_model`

use serde_json::Value;
use tracing::debug;

use crate::error::DecodeError;

const NEW_RELATION: &str = "new";
const CHANGED_VALUE: &str = "changed_value";
const NEW_ENTITY: &str = "new_entity";
const UPDATE_PLAYER_MODEL: &str = "update_player_model";

/// One world-state change.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeRecord {
    /// Relation fragment to add.
    NewRelation(String),
    /// Relation fragment whose value replaces the stored one.
    ChangedValue(String),
    /// Entity fragment to add.
    NewEntity(String),
    /// Opaque payload for the player model.
    UpdatePlayerModel(Value),
}

impl ChangeRecord {
    /// Decode a `[tag, payload]` pair. Unknown tags yield `None`.
    fn from_tagged(entry: &Value) -> Result<Option<Self>, DecodeError> {
        let (tag, payload) = match entry.as_array().map(Vec::as_slice) {
            Some([Value::String(tag), payload, ..]) => (tag.as_str(), payload),
            _ => return Err(DecodeError::shape("change record", entry)),
        };

        let fragment = || {
            payload
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| DecodeError::shape("relation payload", payload))
        };

        let record = match tag {
            NEW_RELATION => ChangeRecord::NewRelation(fragment()?),
            CHANGED_VALUE => ChangeRecord::ChangedValue(fragment()?),
            NEW_ENTITY => ChangeRecord::NewEntity(fragment()?),
            UPDATE_PLAYER_MODEL => ChangeRecord::UpdatePlayerModel(payload.clone()),
            other => {
                debug!(tag = other, "ignoring change record with unknown tag");
                return Ok(None);
            }
        };
        Ok(Some(record))
    }
}

/// One delivery of change records, in platform order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboundBatch {
    records: Vec<ChangeRecord>,
}

impl InboundBatch {
    pub fn new(records: Vec<ChangeRecord>) -> Self {
        Self { records }
    }

    /// Decode the raw array returned by the receive endpoint.
    pub fn decode(raw: &[Value]) -> Result<Self, DecodeError> {
        let mut records = Vec::new();
        for item in raw {
            let text = item.get("text").ok_or(DecodeError::MissingField("text"))?;
            let changes = match text {
                Value::String(encoded) => serde_json::from_str(encoded)?,
                other => other.clone(),
            };
            decode_changes(&changes, &mut records)?;
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn decode_changes(changes: &Value, records: &mut Vec<ChangeRecord>) -> Result<(), DecodeError> {
    let entries = changes
        .as_array()
        .ok_or_else(|| DecodeError::shape("change list", changes))?;

    if entries.first().and_then(Value::as_str) == Some(UPDATE_PLAYER_MODEL) {
        let payload = entries
            .get(1)
            .ok_or_else(|| DecodeError::shape("player model update", changes))?;
        records.push(ChangeRecord::UpdatePlayerModel(payload.clone()));
        return Ok(());
    }

    for entry in entries {
        if let Some(record) = ChangeRecord::from_tagged(entry)? {
            records.push(record);
        }
    }
    Ok(())
}
