//! The contract the experience manager requires of a world state.

use crate::entities::Entity;
use crate::proposition::{Evaluation, Proposition};
use crate::relations::Relation;
use crate::{WorldError, WorldState};

/// Relation/entity store plus precondition evaluator.
///
/// The manager only mutates the world through these operations.
pub trait WorldStateAdapter {
    /// Boolean-evaluable expression produced by [`WorldStateAdapter::parse_precondition`].
    type Proposition;

    /// Value-matchable relation descriptor.
    type Relation;

    fn parse_precondition(&self, text: &str) -> Result<Self::Proposition, WorldError>;

    fn check_precondition(&self, proposition: &Self::Proposition) -> Evaluation;

    /// Parse a relation fragment and add it as a new relation.
    fn add_relation(&mut self, text: &str) -> Result<(), WorldError>;

    /// Parse a relation fragment into a descriptor without adding it.
    fn create_relation(&self, text: &str) -> Result<Self::Relation, WorldError>;

    fn find_relation_mut(
        &mut self,
        descriptor: &Self::Relation,
        exclude_value: bool,
    ) -> Option<&mut Self::Relation>;

    /// Copy the value of `source` into `target`.
    fn modify_value(target: &mut Self::Relation, source: &Self::Relation);

    fn add_entity(&mut self, text: &str) -> Result<(), WorldError>;

    /// Overwrite the value of the stored relation matching `text`, ignoring its current value.
    fn apply_changed_value(&mut self, text: &str) -> Result<(), WorldError> {
        let descriptor = self.create_relation(text)?;
        let stored = self
            .find_relation_mut(&descriptor, true)
            .ok_or_else(|| WorldError::RelationNotFound(text.to_string()))?;
        Self::modify_value(stored, &descriptor);
        Ok(())
    }
}

impl WorldStateAdapter for WorldState {
    type Proposition = Proposition;
    type Relation = Relation;

    fn parse_precondition(&self, text: &str) -> Result<Proposition, WorldError> {
        Proposition::parse(text)
    }

    fn check_precondition(&self, proposition: &Proposition) -> Evaluation {
        proposition.evaluate(self)
    }

    fn add_relation(&mut self, text: &str) -> Result<(), WorldError> {
        let relation = Relation::parse(text)?;
        WorldState::add_relation(self, relation);
        Ok(())
    }

    fn create_relation(&self, text: &str) -> Result<Relation, WorldError> {
        Relation::parse(text)
    }

    fn find_relation_mut(&mut self, descriptor: &Relation, exclude_value: bool) -> Option<&mut Relation> {
        WorldState::find_relation_mut(self, descriptor, exclude_value)
    }

    fn modify_value(target: &mut Relation, source: &Relation) {
        target.modify_value(source.value);
    }

    fn add_entity(&mut self, text: &str) -> Result<(), WorldError> {
        let entity = Entity::parse(text)?;
        WorldState::add_entity(self, entity);
        Ok(())
    }
}
