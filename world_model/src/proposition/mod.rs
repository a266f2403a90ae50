//! Precondition propositions and their recursive evaluation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::relations::{Relation, RelationValue};
use crate::sexpr::{self, SExpr};
use crate::{WorldError, WorldState};

/// Numeric comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "=" => Some(Comparison::Eq),
            "<" => Some(Comparison::Lt),
            "<=" => Some(Comparison::Le),
            ">" => Some(Comparison::Gt),
            ">=" => Some(Comparison::Ge),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        }
    }

    pub fn apply(&self, left: f64, right: f64) -> bool {
        match self {
            Comparison::Eq => (left - right).abs() < f64::EPSILON,
            Comparison::Lt => left < right,
            Comparison::Le => left <= right,
            Comparison::Gt => left > right,
            Comparison::Ge => left >= right,
        }
    }
}

/// A boolean-evaluable expression over world relations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Proposition {
    /// Empty precondition `()`.
    True,
    /// The relation is present and holds.
    Holds(Relation),
    Not(Box<Proposition>),
    And(Vec<Proposition>),
    Or(Vec<Proposition>),
    /// Compare a numeric relation against a constant.
    Compare {
        comparison: Comparison,
        relation: Relation,
        value: f64,
    },
}

/// Outcome of evaluating a proposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub satisfied: bool,
    /// Human-readable account of why the proposition did or did not hold.
    pub explanation: String,
}

impl Evaluation {
    fn new(satisfied: bool, explanation: impl Into<String>) -> Self {
        Self {
            satisfied,
            explanation: explanation.into(),
        }
    }
}

impl Proposition {
    /// Parse a grounded precondition such as `(and (at hero room1) (> (gold hero) 10))`.
    pub fn parse(text: &str) -> Result<Self, WorldError> {
        let exprs = sexpr::parse_all(text)?;
        match exprs.as_slice() {
            [] => Ok(Proposition::True),
            [expr] => Self::from_expr(expr)
                .map_err(|reason| WorldError::invalid("precondition", text, reason)),
            _ => Err(WorldError::invalid(
                "precondition",
                text,
                "expected a single expression",
            )),
        }
    }

    fn from_expr(expr: &SExpr) -> Result<Self, String> {
        let items = expr
            .as_list()
            .ok_or_else(|| format!("`{expr}` is not a parenthesised expression"))?;

        let Some(head) = expr.head() else {
            return if items.is_empty() {
                Ok(Proposition::True)
            } else {
                Err(format!("`{expr}` has no operator"))
            };
        };

        match head {
            "and" | "or" => {
                let children = items[1..]
                    .iter()
                    .map(Self::from_expr)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(if head == "and" {
                    Proposition::And(children)
                } else {
                    Proposition::Or(children)
                })
            }
            "not" => match items {
                [_, inner] => Ok(Proposition::Not(Box::new(Self::from_expr(inner)?))),
                _ => Err("`not` takes exactly one operand".to_string()),
            },
            symbol => match (Comparison::from_symbol(symbol), items) {
                (Some(comparison), [_, inner, SExpr::Atom(number)]) => {
                    let value = number
                        .parse()
                        .map_err(|_| format!("`{number}` is not a number"))?;
                    Ok(Proposition::Compare {
                        comparison,
                        relation: Relation::from_expr(inner)?,
                        value,
                    })
                }
                (Some(_), _) => Err(format!("`{symbol}` takes a relation and a number")),
                (None, _) => Ok(Proposition::Holds(Relation::from_expr(expr)?)),
            },
        }
    }

    /// Recursively evaluate against the world state.
    pub fn evaluate(&self, world: &WorldState) -> Evaluation {
        match self {
            Proposition::True => Evaluation::new(true, "empty precondition"),
            Proposition::Holds(relation) => {
                let holds = world
                    .relation(relation)
                    .is_some_and(|stored| stored.value.is_truthy());
                if holds {
                    Evaluation::new(true, format!("{} holds", relation.identity()))
                } else {
                    Evaluation::new(false, format!("{} does not hold", relation.identity()))
                }
            }
            Proposition::Not(inner) => {
                let result = inner.evaluate(world);
                Evaluation::new(!result.satisfied, format!("not: {}", result.explanation))
            }
            Proposition::And(children) => {
                for child in children {
                    let result = child.evaluate(world);
                    if !result.satisfied {
                        return result;
                    }
                }
                Evaluation::new(true, format!("all {} conditions hold", children.len()))
            }
            Proposition::Or(children) => {
                for child in children {
                    let result = child.evaluate(world);
                    if result.satisfied {
                        return result;
                    }
                }
                Evaluation::new(false, format!("none of {} alternatives hold", children.len()))
            }
            Proposition::Compare {
                comparison,
                relation,
                value,
            } => match world.relation(relation).map(|stored| stored.value) {
                Some(RelationValue::Number(current)) => Evaluation::new(
                    comparison.apply(current, *value),
                    format!(
                        "{} is {current}, required {} {value}",
                        relation.identity(),
                        comparison.symbol()
                    ),
                ),
                _ => Evaluation::new(
                    false,
                    format!("{} has no numeric value", relation.identity()),
                ),
            },
        }
    }
}

impl fmt::Display for Proposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, op: &str, children: &[Proposition]) -> fmt::Result {
            write!(f, "({op}")?;
            for child in children {
                write!(f, " {child}")?;
            }
            write!(f, ")")
        }

        match self {
            Proposition::True => write!(f, "()"),
            Proposition::Holds(relation) => write!(f, "{}", relation.identity()),
            Proposition::Not(inner) => write!(f, "(not {inner})"),
            Proposition::And(children) => join(f, "and", children),
            Proposition::Or(children) => join(f, "or", children),
            Proposition::Compare {
                comparison,
                relation,
                value,
            } => write!(f, "({} {} {value})", comparison.symbol(), relation.identity()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> WorldState {
        let mut world = WorldState::new();
        world.add_relation(Relation::new("at", ["hero", "room1"]));
        world.add_relation(Relation::new("open", ["door"]).with_value(RelationValue::Bool(false)));
        world.add_relation(Relation::new("gold", ["hero"]).with_value(RelationValue::Number(12.0)));
        world
    }

    #[test]
    fn test_atom_and_negation() {
        let world = world();
        assert!(Proposition::parse("(at hero room1)").unwrap().evaluate(&world).satisfied);
        assert!(!Proposition::parse("(at hero room2)").unwrap().evaluate(&world).satisfied);
        assert!(!Proposition::parse("(open door)").unwrap().evaluate(&world).satisfied);
        assert!(Proposition::parse("(not (open door))").unwrap().evaluate(&world).satisfied);
    }

    #[test]
    fn test_connectives_and_comparisons() {
        let world = world();
        let guarded = Proposition::parse("(and (at hero room1) (> (gold hero) 10))").unwrap();
        assert!(guarded.evaluate(&world).satisfied);

        let too_poor = Proposition::parse("(and (at hero room1) (>= (gold hero) 20))").unwrap();
        let result = too_poor.evaluate(&world);
        assert!(!result.satisfied);
        assert!(result.explanation.contains("(gold hero) is 12"));

        let either = Proposition::parse("(or (at hero room2) (= (gold hero) 12))").unwrap();
        assert!(either.evaluate(&world).satisfied);
    }

    #[test]
    fn test_empty_precondition_is_true() {
        assert_eq!(Proposition::parse("").unwrap(), Proposition::True);
        assert_eq!(Proposition::parse("()").unwrap(), Proposition::True);
        assert!(Proposition::True.evaluate(&WorldState::new()).satisfied);
    }

    #[test]
    fn test_missing_numeric_relation() {
        let result = Proposition::parse("(< (gold guard) 5)")
            .unwrap()
            .evaluate(&world());
        assert!(!result.satisfied);
    }

    #[test]
    fn test_invalid_precondition() {
        assert!(Proposition::parse("(not)").is_err());
        assert!(Proposition::parse("(> (gold hero))").is_err());
        assert!(Proposition::parse("(a) (b)").is_err());
    }
}
