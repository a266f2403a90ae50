//! Top-level orchestration: handshake, world construction, receive loop.

use rand::rngs::StdRng;
use std::sync::Arc;
use std::thread;
use tracing::{error, info};

use world_model::WorldState;

use crate::channel::MessageChannel;
use crate::config::ManagerConfig;
use crate::error::ManagerError;
use crate::handshake::{Handshake, HandshakeOutcome};
use crate::selection::{ChoiceSource, LoggedPlayerModel, PlayerModel, RandomChoice, SelectionEngine, SelectionOutcome};
use crate::transport::{PlatformClient, Transport};

/// A running experience manager.
pub struct ExperienceManager<C, S = RandomChoice<StdRng>, M = LoggedPlayerModel> {
    config: ManagerConfig,
    transport: Arc<Transport<C>>,
    channel: MessageChannel,
    engine: SelectionEngine<WorldState, S, M>,
}

impl<C: PlatformClient + 'static> ExperienceManager<C> {
    /// Start with random tie-breaking seeded from the config.
    pub fn start(client: C, config: ManagerConfig) -> Result<Self, ManagerError> {
        let chooser = RandomChoice::from_seed(config.seed);
        Self::start_with(client, config, chooser, LoggedPlayerModel::default())
    }
}

impl<C, S, M> ExperienceManager<C, S, M>
where
    C: PlatformClient + 'static,
    S: ChoiceSource,
    M: PlayerModel,
{
    /// Fetch the catalog, run the handshake, build the world and start receiving.
    ///
    /// Failures after the catalog is fetched are reported to the platform
    /// before they are returned.
    pub fn start_with(client: C, config: ManagerConfig, chooser: S, player_model: M) -> Result<Self, ManagerError> {
        info!(base_url = %config.base_url, "starting platform communication");
        let mut transport = Transport::connect(client, config.max_requests_before_probe)?;

        let outcome = match Handshake::new(&transport, &config).run() {
            Ok(outcome) => outcome,
            Err(err) => {
                transport.report_error(&err.to_string());
                return Err(err);
            }
        };
        transport.set_endpoints(outcome.endpoints.clone());
        let transport = Arc::new(transport);

        match Self::assemble(&transport, &config, outcome, chooser, player_model) {
            Ok((channel, engine)) => {
                info!("starting normal communication");
                Ok(Self {
                    config,
                    transport,
                    channel,
                    engine,
                })
            }
            Err(err) => {
                transport.report_error(&err.to_string());
                Err(err)
            }
        }
    }

    fn assemble(
        transport: &Arc<Transport<C>>,
        config: &ManagerConfig,
        outcome: HandshakeOutcome,
        chooser: S,
        player_model: M,
    ) -> Result<(MessageChannel, SelectionEngine<WorldState, S, M>), ManagerError> {
        let channel = MessageChannel::spawn(Arc::clone(transport), config.receive_interval())
            .map_err(ManagerError::Spawn)?;

        let world = WorldState::from_problem(&outcome.domain_text, &outcome.problem_text)?;
        info!(
            domain = ?world.domain_name,
            problem = ?world.problem_name,
            relations = world.relation_count(),
            "world state initialized"
        );
        let engine = SelectionEngine::from_records(world, outcome.encounter_records, chooser, player_model)?;
        Ok((channel, engine))
    }

    pub fn transport(&self) -> &Transport<C> {
        &self.transport
    }

    pub fn engine(&self) -> &SelectionEngine<WorldState, S, M> {
        &self.engine
    }

    /// Process at most one queued batch. `Ok(None)` when the queue is empty.
    pub fn step(&mut self) -> Result<Option<SelectionOutcome>, ManagerError> {
        let Some(delivery) = self.channel.try_dequeue()? else {
            return Ok(None);
        };
        let batch = delivery?;
        info!(records = batch.len(), "received inbound batch");
        let outcome = self.engine.process_batch(&batch, self.transport.as_ref())?;
        Ok(Some(outcome))
    }

    /// Process batches until a fatal error, which is reported and returned.
    pub fn run(&mut self) -> Result<(), ManagerError> {
        loop {
            match self.step() {
                Ok(Some(outcome)) if outcome.needs_cooldown() => {
                    thread::sleep(self.config.selection_cooldown());
                }
                Ok(Some(_)) => {}
                Ok(None) => thread::sleep(self.config.idle_poll_interval()),
                Err(err) => {
                    error!(error = %err, "experience manager stopped");
                    self.transport.report_error(&err.to_string());
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encounter::EncounterStatus;
    use crate::test_support::{inbound, ScriptedPlatform};
    use serde_json::json;
    use std::time::{Duration, Instant};

    fn step_until_outcome<C, S, M>(manager: &mut ExperienceManager<C, S, M>) -> SelectionOutcome
    where
        C: PlatformClient + 'static,
        S: ChoiceSource,
        M: PlayerModel,
    {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Some(outcome) = manager.step().unwrap() {
                return outcome;
            }
            thread::sleep(Duration::from_millis(1));
        }
        panic!("no batch processed before deadline");
    }

    #[test]
    fn test_start_and_process_batches() {
        let platform = ScriptedPlatform::new().with_handshake(&["ambush", "merchant"]);
        platform.push_inbound(vec![inbound(json!(["update_player_model", {"fighter": 1}]))]);
        platform.push_inbound(vec![inbound(json!([["new", "(at hero room1)"]]))]);
        let config = ManagerConfig {
            seed: Some(3),
            ..ManagerConfig::immediate()
        };

        let mut manager = ExperienceManager::start(platform.clone(), config).unwrap();
        assert_eq!(manager.transport().endpoints().receive, "get_messages_em");
        assert_eq!(manager.engine().encounters().len(), 2);

        assert_eq!(step_until_outcome(&mut manager), SelectionOutcome::Idle);
        assert_eq!(manager.engine().player_model().updates(), 1);

        let outcome = step_until_outcome(&mut manager);
        let fired = outcome.triggered().unwrap().to_string();
        assert!(outcome.needs_cooldown());

        let sent = platform.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "add_message");
        assert_eq!(sent[0].1.text, format!("start_encounter({fired})"));
        assert_eq!(sent[0].1.to_user_role, "ENV");
        assert_eq!(
            manager.engine().encounter(&fired).unwrap().status(),
            EncounterStatus::Executed
        );
        assert!(platform.probes() >= 1);
    }

    #[test]
    fn test_transient_outage_is_not_fatal() {
        let platform = ScriptedPlatform::new().with_handshake(&["ambush"]);
        let config = ManagerConfig {
            max_requests_before_probe: 0,
            ..ManagerConfig::immediate()
        };
        let mut manager = ExperienceManager::start(platform.clone(), config).unwrap();

        platform.set_online(false);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(manager.step().unwrap(), None);
        platform.set_online(true);
        platform.push_inbound(vec![inbound(json!([["new", "(at hero room1)"]]))]);

        let outcome = step_until_outcome(&mut manager);
        assert_eq!(outcome.triggered(), Some("ambush"));
        assert_eq!(platform.sent_messages().len(), 1);
        assert!(platform.error_reports().is_empty());
    }

    #[test]
    fn test_failed_handshake_is_reported() {
        let platform = ScriptedPlatform::new();
        platform.push_init_reply(json!({ "text": "nope" }));

        let result = ExperienceManager::start(platform.clone(), ManagerConfig::immediate());

        assert!(matches!(result, Err(ManagerError::ProtocolViolation { .. })));
        let reports = platform.error_reports();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].text.contains("PHASE_1"));
    }

    #[test]
    fn test_transport_failure_stops_run() {
        let platform = ScriptedPlatform::new()
            .with_handshake(&["ambush"])
            .failing_posts(500);
        platform.push_inbound(vec![inbound(json!([["new", "(at hero room1)"]]))]);

        let mut manager = ExperienceManager::start(platform.clone(), ManagerConfig::immediate()).unwrap();
        let err = manager.run().unwrap_err();

        assert!(matches!(err, ManagerError::Transport(_)));
        assert_eq!(platform.error_reports().len(), 1);
    }

    #[test]
    fn test_decode_failure_stops_run() {
        let platform = ScriptedPlatform::new().with_handshake(&["ambush"]);
        platform.push_inbound(vec![json!({ "text": "[[\"new\"" })]);

        let mut manager = ExperienceManager::start(platform, ManagerConfig::immediate()).unwrap();
        let err = manager.run().unwrap_err();

        assert!(matches!(err, ManagerError::Decode(_)));
    }
}
