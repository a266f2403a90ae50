//! Encounter selection: apply a batch to the world, find applicable
//! encounters, fire one of them.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use tracing::{debug, info, warn};

use world_model::{WorldError, WorldStateAdapter};

use crate::encounter::{Encounter, EncounterRecord};
use crate::error::{ManagerError, TransportError};
use crate::events::{ChangeRecord, InboundBatch};
use crate::transport::{PlatformClient, Transport};

/// Picks one candidate out of a tie.
pub trait ChoiceSource {
    /// Index in `0..candidates`; `candidates` is at least 2.
    ///
    /// Returning an index outside that range is a bug in the implementation
    /// and panics.
    fn choose(&mut self, candidates: usize) -> usize;
}

/// Uniform choice backed by a random number generator.
#[derive(Debug, Clone)]
pub struct RandomChoice<R> {
    rng: R,
}

impl<R: Rng> RandomChoice<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomChoice<StdRng> {
    /// Seeded when `seed` is given, otherwise from OS entropy.
    pub fn from_seed(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(rng)
    }
}

impl<R: Rng> ChoiceSource for RandomChoice<R> {
    fn choose(&mut self, candidates: usize) -> usize {
        self.rng.gen_range(0..candidates)
    }
}

/// Receives player model updates.
pub trait PlayerModel {
    fn update(&mut self, payload: &Value);
}

/// Player model that keeps the latest payload.
#[derive(Debug, Clone, Default)]
pub struct LoggedPlayerModel {
    latest: Option<Value>,
    updates: usize,
}

impl LoggedPlayerModel {
    pub fn latest(&self) -> Option<&Value> {
        self.latest.as_ref()
    }

    pub fn updates(&self) -> usize {
        self.updates
    }
}

impl PlayerModel for LoggedPlayerModel {
    fn update(&mut self, payload: &Value) {
        info!(payload = %payload, "updating player model");
        self.latest = Some(payload.clone());
        self.updates += 1;
    }
}

/// Where trigger messages go.
pub trait MessageSink {
    /// Send `text`; `Ok(false)` when the platform is offline and nothing was sent.
    fn send_text(&self, text: &str) -> Result<bool, TransportError>;
}

impl<C: PlatformClient> MessageSink for Transport<C> {
    fn send_text(&self, text: &str) -> Result<bool, TransportError> {
        self.send_message(text).map(|reply| reply.is_some())
    }
}

/// What a processed batch led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// No encounter was applicable.
    Idle,
    /// Exactly one encounter was applicable and fired.
    Single { name: String },
    /// Several were applicable; one fired and the rest were skipped.
    Chosen { name: String, skipped: Vec<String> },
}

impl SelectionOutcome {
    pub fn triggered(&self) -> Option<&str> {
        match self {
            SelectionOutcome::Idle => None,
            SelectionOutcome::Single { name } | SelectionOutcome::Chosen { name, .. } => Some(name),
        }
    }

    /// Only a selection among several candidates is followed by a cooldown.
    pub fn needs_cooldown(&self) -> bool {
        matches!(self, SelectionOutcome::Chosen { .. })
    }
}

/// Owns the world and the encounters; processes one batch at a time.
pub struct SelectionEngine<W: WorldStateAdapter, S, M> {
    world: W,
    encounters: Vec<Encounter<W::Proposition>>,
    chooser: S,
    player_model: M,
}

impl<W, S, M> SelectionEngine<W, S, M>
where
    W: WorldStateAdapter,
    S: ChoiceSource,
    M: PlayerModel,
{
    pub fn new(world: W, encounters: Vec<Encounter<W::Proposition>>, chooser: S, player_model: M) -> Self {
        Self {
            world,
            encounters,
            chooser,
            player_model,
        }
    }

    /// Build encounters from their initialization records.
    pub fn from_records(
        world: W,
        records: Vec<EncounterRecord>,
        chooser: S,
        player_model: M,
    ) -> Result<Self, WorldError> {
        let encounters = records
            .into_iter()
            .map(|record| Encounter::from_record(record, &world))
            .collect::<Result<Vec<_>, _>>()?;
        info!(encounters = encounters.len(), "encounters initialized");
        Ok(Self::new(world, encounters, chooser, player_model))
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn encounters(&self) -> &[Encounter<W::Proposition>] {
        &self.encounters
    }

    pub fn encounter(&self, name: &str) -> Option<&Encounter<W::Proposition>> {
        self.encounters.iter().find(|encounter| encounter.name() == name)
    }

    pub fn player_model(&self) -> &M {
        &self.player_model
    }

    /// Update the world, then fire at most one encounter.
    pub fn process_batch(
        &mut self,
        batch: &InboundBatch,
        sink: &impl MessageSink,
    ) -> Result<SelectionOutcome, ManagerError> {
        self.apply_batch(batch)?;
        let applicable = self.applicable();
        self.resolve(applicable, sink)
    }

    /// Apply every record in order.
    pub fn apply_batch(&mut self, batch: &InboundBatch) -> Result<(), WorldError> {
        debug!(records = batch.len(), "applying inbound batch");
        for record in batch.records() {
            match record {
                ChangeRecord::NewRelation(fragment) => self.world.add_relation(fragment)?,
                ChangeRecord::ChangedValue(fragment) => self.world.apply_changed_value(fragment)?,
                ChangeRecord::NewEntity(fragment) => self.world.add_entity(fragment)?,
                ChangeRecord::UpdatePlayerModel(payload) => self.player_model.update(payload),
            }
        }
        Ok(())
    }

    /// Indices of pending encounters whose precondition currently holds.
    pub fn applicable(&self) -> Vec<usize> {
        self.encounters
            .iter()
            .enumerate()
            .filter(|(_, encounter)| encounter.is_pending())
            .filter(|(_, encounter)| {
                let evaluation = self.world.check_precondition(encounter.precondition());
                debug!(
                    encounter = encounter.name(),
                    satisfied = evaluation.satisfied,
                    explanation = %evaluation.explanation,
                    "precondition checked"
                );
                evaluation.satisfied
            })
            .map(|(index, _)| index)
            .collect()
    }

    fn resolve(
        &mut self,
        applicable: Vec<usize>,
        sink: &impl MessageSink,
    ) -> Result<SelectionOutcome, ManagerError> {
        match applicable.as_slice() {
            [] => Ok(SelectionOutcome::Idle),
            [index] => {
                let name = self.trigger(*index, sink)?;
                Ok(SelectionOutcome::Single { name })
            }
            candidates => {
                let pick = self.chooser.choose(candidates.len());
                debug_assert!(pick < candidates.len(), "choice {pick} out of {} candidates", candidates.len());
                let chosen = candidates[pick];

                let mut skipped = Vec::with_capacity(candidates.len() - 1);
                for &index in candidates.iter().filter(|&&index| index != chosen) {
                    let encounter = &mut self.encounters[index];
                    encounter.mark_skipped()?;
                    info!(encounter = encounter.name(), "encounter skipped");
                    skipped.push(encounter.name().to_string());
                }

                let name = self.trigger(chosen, sink)?;
                Ok(SelectionOutcome::Chosen { name, skipped })
            }
        }
    }

    fn trigger(&mut self, index: usize, sink: &impl MessageSink) -> Result<String, ManagerError> {
        let encounter = &mut self.encounters[index];
        let message = encounter.start_message();
        if !sink.send_text(&message)? {
            warn!(encounter = encounter.name(), "platform offline, trigger not delivered");
        }
        encounter.mark_executed()?;
        info!(encounter = encounter.name(), "encounter started");
        Ok(encounter.name().to_string())
    }
}
