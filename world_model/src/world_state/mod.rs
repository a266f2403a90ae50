//! World state management - the central structure holding every known fact.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::entities::Entity;
use crate::relations::Relation;
use crate::sexpr::{self, SExpr};
use crate::WorldError;

/// The complete set of entities and relation facts at any point in time.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorldState {
    /// Name declared by `(domain <name>)`.
    pub domain_name: Option<String>,

    /// Name declared by `(problem <name>)`.
    pub problem_name: Option<String>,

    /// All entities by name.
    entities: HashMap<String, Entity>,

    /// Relation facts in insertion order.
    relations: Vec<Relation>,
}

impl WorldState {
    /// Create a new empty world state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the initial world from a domain and a problem description.
    ///
    /// Domain constants and problem objects become entities; every `:init`
    /// fact becomes a relation.
    pub fn from_problem(domain_text: &str, problem_text: &str) -> Result<Self, WorldError> {
        let mut world = Self::new();

        let domain = define_sections(domain_text, "domain")?;
        world.domain_name = Some(domain.name);
        for section in &domain.sections {
            if section.head() == Some(":constants") {
                world.add_entities(section)?;
            }
        }

        let problem = define_sections(problem_text, "problem")?;
        world.problem_name = Some(problem.name);
        for section in &problem.sections {
            let items = section.as_list().unwrap_or_default();
            match section.head() {
                Some(":domain") => {
                    let declared = items.get(1).and_then(SExpr::as_atom);
                    if declared != world.domain_name.as_deref() {
                        warn!(
                            declared = ?declared,
                            domain = ?world.domain_name,
                            "problem refers to a different domain"
                        );
                    }
                }
                Some(":objects") => world.add_entities(section)?,
                Some(":init") => {
                    for fact in &items[1..] {
                        let relation = Relation::from_expr(fact)
                            .map_err(|reason| WorldError::invalid("init", fact.to_string(), reason))?;
                        world.add_relation(relation);
                    }
                }
                _ => {}
            }
        }

        debug!(
            entities = world.entities.len(),
            relations = world.relations.len(),
            "world state created from problem"
        );
        Ok(world)
    }

    fn add_entities(&mut self, section: &SExpr) -> Result<(), WorldError> {
        let items = section.as_list().unwrap_or_default();
        for entity in Entity::parse_typed_list(&items[1..])? {
            self.add_entity(entity);
        }
        Ok(())
    }

    /// Add an entity, replacing any entity with the same name.
    pub fn add_entity(&mut self, entity: Entity) {
        self.entities.insert(entity.name.clone(), entity);
    }

    /// Get entity by name.
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    /// Add a relation. A relation with the same identity has its value overwritten.
    pub fn add_relation(&mut self, relation: Relation) {
        match self
            .relations
            .iter_mut()
            .find(|stored| stored.same_identity(&relation))
        {
            Some(stored) => {
                debug!(relation = %relation, "relation already present, overwriting value");
                stored.value = relation.value;
            }
            None => self.relations.push(relation),
        }
    }

    /// Stored relation with the same identity as `descriptor`.
    pub fn relation(&self, descriptor: &Relation) -> Option<&Relation> {
        self.find_relation(descriptor, true)
    }

    /// Find a stored relation, optionally ignoring its value.
    pub fn find_relation(&self, descriptor: &Relation, exclude_value: bool) -> Option<&Relation> {
        self.relations
            .iter()
            .find(|stored| stored.matches(descriptor, exclude_value))
    }

    /// Mutable variant of [`WorldState::find_relation`].
    pub fn find_relation_mut(
        &mut self,
        descriptor: &Relation,
        exclude_value: bool,
    ) -> Option<&mut Relation> {
        self.relations
            .iter_mut()
            .find(|stored| stored.matches(descriptor, exclude_value))
    }

    /// All relations in insertion order.
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Get the total number of relations.
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    /// Get the total number of entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

struct Definition {
    name: String,
    sections: Vec<SExpr>,
}

/// Read `(define (<kind> <name>) sections...)`.
fn define_sections(text: &str, kind: &'static str) -> Result<Definition, WorldError> {
    let expr = sexpr::parse_one(text)?;
    let invalid = |reason: &str| WorldError::invalid(kind, truncate(text), reason);

    let items = match expr.as_list() {
        Some(items) if expr.head() == Some("define") => items,
        _ => return Err(invalid("expected `(define ...)`")),
    };
    let name = items
        .get(1)
        .filter(|header| header.head() == Some(kind))
        .and_then(|header| header.as_list())
        .and_then(|header| header.get(1))
        .and_then(SExpr::as_atom)
        .ok_or_else(|| invalid("missing name header"))?;

    Ok(Definition {
        name: name.to_string(),
        sections: items[2..].to_vec(),
    })
}

fn truncate(text: &str) -> String {
    const LIMIT: usize = 40;
    match text.char_indices().nth(LIMIT) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
