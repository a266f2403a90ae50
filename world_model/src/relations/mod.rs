//! Relation facts: a predicate applied to entities, carrying a value.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::sexpr::{self, SExpr};
use crate::WorldError;

/// Value held by a relation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RelationValue {
    Bool(bool),
    Number(f64),
}

impl RelationValue {
    /// Whether the value counts as "holding" for a plain atom check.
    pub fn is_truthy(&self) -> bool {
        match self {
            RelationValue::Bool(value) => *value,
            RelationValue::Number(value) => *value != 0.0,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            RelationValue::Number(value) => Some(*value),
            RelationValue::Bool(_) => None,
        }
    }
}

impl Default for RelationValue {
    fn default() -> Self {
        RelationValue::Bool(true)
    }
}

/// A single fact in the world state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub predicate: String,
    pub args: Vec<String>,
    pub value: RelationValue,
}

impl Relation {
    /// Create a relation that holds (boolean true).
    pub fn new(predicate: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            predicate: predicate.into(),
            args: args.into_iter().map(Into::into).collect(),
            value: RelationValue::default(),
        }
    }

    /// Set the value.
    pub fn with_value(mut self, value: RelationValue) -> Self {
        self.value = value;
        self
    }

    /// Parse a relation fragment.
    ///
    /// Accepted forms:
    /// - `(at hero room1)` holds
    /// - `(not (at hero room1))` does not hold
    /// - `(= (health hero) 3)` numeric value
    pub fn parse(fragment: &str) -> Result<Self, WorldError> {
        let expr = sexpr::parse_one(fragment)?;
        Self::from_expr(&expr).map_err(|reason| WorldError::invalid("relation", fragment, reason))
    }

    pub(crate) fn from_expr(expr: &SExpr) -> Result<Self, String> {
        let items = expr
            .as_list()
            .ok_or_else(|| "expected a parenthesised relation".to_string())?;

        match expr.head() {
            Some("not") => match items {
                [_, inner] => {
                    let relation = Self::from_expr(inner)?;
                    Ok(relation.with_value(RelationValue::Bool(false)))
                }
                _ => Err("`not` takes exactly one relation".to_string()),
            },
            Some("=") => match items {
                [_, inner, SExpr::Atom(number)] => {
                    let value: f64 = number
                        .parse()
                        .map_err(|_| format!("`{number}` is not a number"))?;
                    let relation = Self::from_expr(inner)?;
                    Ok(relation.with_value(RelationValue::Number(value)))
                }
                _ => Err("`=` takes a relation and a number".to_string()),
            },
            Some(predicate) => {
                let args = items[1..]
                    .iter()
                    .map(|item| {
                        item.as_atom()
                            .map(str::to_string)
                            .ok_or_else(|| format!("argument `{item}` is not a symbol"))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::new(predicate, args))
            }
            None => Err("missing predicate".to_string()),
        }
    }

    /// Same predicate and arguments, regardless of value.
    pub fn same_identity(&self, other: &Relation) -> bool {
        self.predicate == other.predicate && self.args == other.args
    }

    /// Match against a descriptor, optionally ignoring the value.
    pub fn matches(&self, descriptor: &Relation, exclude_value: bool) -> bool {
        self.same_identity(descriptor) && (exclude_value || self.value == descriptor.value)
    }

    /// Overwrite the value in place.
    pub fn modify_value(&mut self, value: RelationValue) {
        self.value = value;
    }

    /// Identity without the value, e.g. `(at hero room1)`.
    pub fn identity(&self) -> String {
        if self.args.is_empty() {
            format!("({})", self.predicate)
        } else {
            format!("({} {})", self.predicate, self.args.join(" "))
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            RelationValue::Bool(true) => write!(f, "{}", self.identity()),
            RelationValue::Bool(false) => write!(f, "(not {})", self.identity()),
            RelationValue::Number(value) => write!(f, "(= {} {})", self.identity(), value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        let holds = Relation::parse("(at hero room1)").unwrap();
        assert_eq!(holds, Relation::new("at", ["hero", "room1"]));

        let negated = Relation::parse("(not (open door))").unwrap();
        assert_eq!(negated.value, RelationValue::Bool(false));

        let numeric = Relation::parse("(= (health hero) 7)").unwrap();
        assert_eq!(numeric.predicate, "health");
        assert_eq!(numeric.value, RelationValue::Number(7.0));
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert!(Relation::parse("at").is_err());
        assert!(Relation::parse("(= (health hero) lots)").is_err());
        assert!(Relation::parse("(at (hero) room1)").is_err());
    }

    #[test]
    fn test_matches_with_and_without_value() {
        let stored = Relation::new("health", ["hero"]).with_value(RelationValue::Number(3.0));
        let descriptor = Relation::new("health", ["hero"]).with_value(RelationValue::Number(5.0));

        assert!(stored.matches(&descriptor, true));
        assert!(!stored.matches(&descriptor, false));
        assert!(!stored.matches(&Relation::new("health", ["guard"]), true));
    }

    #[test]
    fn test_display_round_trips() {
        for text in ["(at hero room1)", "(not (open door))", "(= (health hero) 7)"] {
            assert_eq!(Relation::parse(text).unwrap().to_string(), text);
        }
    }
}
