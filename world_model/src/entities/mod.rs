//! Entity definitions for the world model.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::sexpr::{self, SExpr};
use crate::WorldError;

/// Type assigned to entities declared without one.
pub const DEFAULT_ENTITY_TYPE: &str = "object";

/// A named object that relations can refer to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub entity_type: String,
}

impl Entity {
    /// Create a new entity with the given name and type.
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
        }
    }

    /// Parse an entity fragment: `name`, `name - type` or `(name - type)`.
    pub fn parse(fragment: &str) -> Result<Self, WorldError> {
        let exprs = sexpr::parse_all(fragment)?;
        let items = match exprs.as_slice() {
            [SExpr::List(items)] => items.as_slice(),
            items => items,
        };
        let symbols = items
            .iter()
            .map(|item| {
                item.as_atom()
                    .ok_or_else(|| WorldError::invalid("entity", fragment, "expected a symbol"))
            })
            .collect::<Result<Vec<&str>, _>>()?;

        match symbols.as_slice() {
            [name] => Ok(Self::new(*name, DEFAULT_ENTITY_TYPE)),
            [name, "-", entity_type] => Ok(Self::new(*name, *entity_type)),
            _ => Err(WorldError::invalid(
                "entity",
                fragment,
                "expected `name` or `name - type`",
            )),
        }
    }

    /// Read a `:objects` list, where `a b - type` types every preceding name.
    pub fn parse_typed_list(items: &[SExpr]) -> Result<Vec<Self>, WorldError> {
        let mut entities = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        let mut symbols = items.iter();

        while let Some(item) = symbols.next() {
            let symbol = item
                .as_atom()
                .ok_or_else(|| WorldError::invalid("objects", item.to_string(), "expected a symbol"))?;
            if symbol == "-" {
                let entity_type = symbols
                    .next()
                    .and_then(SExpr::as_atom)
                    .ok_or_else(|| WorldError::invalid("objects", "-", "missing type after `-`"))?;
                entities.extend(pending.drain(..).map(|name| Self::new(name, entity_type)));
            } else {
                pending.push(symbol.to_string());
            }
        }
        entities.extend(
            pending
                .into_iter()
                .map(|name| Self::new(name, DEFAULT_ENTITY_TYPE)),
        );
        Ok(entities)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.name, self.entity_type)
    }
}
