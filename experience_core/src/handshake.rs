//! The four-phase session handshake with the platform.
//!
//! ```text
//! Offline -> AwaitingOnline -> Phase1Sent -> AwaitingPhase3 -> Phase3Sent -> Phase4Sent -> Established
//! ```
//!
//! Waiting for the platform to come online is the only retried step. Every
//! reply that does not match its catalog entry aborts start-up.

use serde_json::Value;
use std::fmt;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

use crate::catalog::ProtocolPhase;
use crate::config::ManagerConfig;
use crate::encounter::{EncounterManifest, EncounterRecord};
use crate::error::{DecodeError, ManagerError};
use crate::transport::{InitPayload, PlatformClient, SessionEndpoints, Transport};

const PHASE_1_REQUEST: &str = "message_1";
const PHASE_1_REPLY: &str = "message_2";
const PHASE_3_REQUEST: &str = "message_5";
const PHASE_3_REPLY: &str = "message_7";
const PHASE_4_REQUEST: &str = "message_8";
const PHASE_4_REPLY: &str = "message_10";

/// Handshake state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    Offline,
    AwaitingOnline,
    Phase1Sent,
    AwaitingPhase3,
    Phase3Sent,
    Phase4Sent,
    Established,
}

impl fmt::Display for HandshakePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What the handshake hands over once established.
#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeOutcome {
    pub domain_text: String,
    pub problem_text: String,
    pub encounter_records: Vec<EncounterRecord>,
    pub endpoints: SessionEndpoints,
}

/// Ephemeral session state, filled in as phases complete.
pub struct Handshake<'a, C> {
    transport: &'a Transport<C>,
    identity: String,
    online_poll_interval: Duration,
    phase_poll_interval: Duration,
    phase: HandshakePhase,
    domain_text: String,
    problem_text: String,
    encounter_records: Vec<EncounterRecord>,
    endpoints: SessionEndpoints,
}

impl<'a, C: PlatformClient> Handshake<'a, C> {
    pub fn new(transport: &'a Transport<C>, config: &ManagerConfig) -> Self {
        Self {
            transport,
            identity: config.identity.clone(),
            online_poll_interval: config.online_poll_interval(),
            phase_poll_interval: config.phase_poll_interval(),
            phase: HandshakePhase::Offline,
            domain_text: String::new(),
            problem_text: String::new(),
            encounter_records: Vec::new(),
            endpoints: SessionEndpoints::default(),
        }
    }

    pub fn phase(&self) -> HandshakePhase {
        self.phase
    }

    /// Drive every transition and return the session outputs.
    pub fn run(mut self) -> Result<HandshakeOutcome, ManagerError> {
        info!("starting platform handshake");
        while self.phase != HandshakePhase::Established {
            self.advance()?;
        }
        Ok(HandshakeOutcome {
            domain_text: self.domain_text,
            problem_text: self.problem_text,
            encounter_records: self.encounter_records,
            endpoints: self.endpoints,
        })
    }

    /// Perform one transition and return the new phase.
    pub fn advance(&mut self) -> Result<HandshakePhase, ManagerError> {
        self.phase = match self.phase {
            HandshakePhase::Offline => HandshakePhase::AwaitingOnline,
            HandshakePhase::AwaitingOnline => {
                self.wait_online();
                self.greet()?;
                HandshakePhase::Phase1Sent
            }
            HandshakePhase::Phase1Sent => HandshakePhase::AwaitingPhase3,
            HandshakePhase::AwaitingPhase3 => {
                self.wait_phase_3()?;
                self.request_world()?;
                HandshakePhase::Phase3Sent
            }
            HandshakePhase::Phase3Sent => {
                self.request_links()?;
                HandshakePhase::Phase4Sent
            }
            HandshakePhase::Phase4Sent | HandshakePhase::Established => HandshakePhase::Established,
        };
        debug!(phase = %self.phase, "handshake advanced");
        Ok(self.phase)
    }

    fn wait_online(&self) {
        while !self.transport.is_online() {
            thread::sleep(self.online_poll_interval);
        }
    }

    fn wait_phase_3(&self) -> Result<(), ManagerError> {
        info!("waiting for phase 3 to start");
        while self.transport.current_phase()? != ProtocolPhase::Phase3.as_str() {
            thread::sleep(self.phase_poll_interval);
        }
        info!("phase 3 started");
        Ok(())
    }

    /// Phase 1: introduce ourselves.
    fn greet(&self) -> Result<(), ManagerError> {
        let greeting = self.transport.catalog().message(ProtocolPhase::Phase1, PHASE_1_REQUEST);
        let text = format!("{greeting} {}", self.identity);
        self.exchange(ProtocolPhase::Phase1, text, PHASE_1_REPLY)?;
        info!("handshake phase 1 successful");
        Ok(())
    }

    /// Phase 3: receive domain, problem and encounters.
    fn request_world(&mut self) -> Result<(), ManagerError> {
        let request = self.transport.catalog().message(ProtocolPhase::Phase3, PHASE_3_REQUEST);
        let reply = self.exchange(ProtocolPhase::Phase3, request.to_string(), PHASE_3_REPLY)?;

        self.domain_text = text_field(&reply, "domain")?;
        info!("domain received");
        self.problem_text = text_field(&reply, "problem")?;
        info!("problem received");
        let manifest = reply
            .get("additional_data")
            .ok_or(DecodeError::MissingField("additional_data"))?;
        self.encounter_records = EncounterManifest::decode(manifest)?.encounters;
        info!(encounters = self.encounter_records.len(), "encounters received");
        info!("handshake phase 3 successful");
        Ok(())
    }

    /// Phase 4: receive the steady-state endpoints.
    fn request_links(&mut self) -> Result<(), ManagerError> {
        let request = self.transport.catalog().message(ProtocolPhase::Phase4, PHASE_4_REQUEST);
        let reply = self.exchange(ProtocolPhase::Phase4, request.to_string(), PHASE_4_REPLY)?;

        self.endpoints = SessionEndpoints::from_fragments(
            &text_field(&reply, "get_message_url")?,
            &text_field(&reply, "add_message_url")?,
        );
        info!(receive = %self.endpoints.receive, send = %self.endpoints.send, "message links received");
        info!("handshake phase 4 successful");
        Ok(())
    }

    /// Send `text` and require the reply text to equal catalog entry `(phase, expected_id)`.
    fn exchange(&self, phase: ProtocolPhase, text: String, expected_id: &str) -> Result<Value, ManagerError> {
        debug!(%phase, message = %text, "sending handshake message");
        let reply = self
            .transport
            .send_initialization(&InitPayload::Text(text))
            .map_err(|err| {
                debug!(%phase, error = %err, "handshake request failed");
                ManagerError::NoResponse { phase: phase.as_str() }
            })?
            .ok_or(ManagerError::NoResponse { phase: phase.as_str() })?;

        let expected = self.transport.catalog().message(phase, expected_id);
        let received = reply.get("text").and_then(Value::as_str).unwrap_or_default();
        if received != expected {
            return Err(ManagerError::ProtocolViolation {
                phase: phase.as_str(),
                expected: expected.to_string(),
                received: received.to_string(),
            });
        }
        Ok(reply)
    }
}

/// Field rendered as text; non-string JSON values use their JSON form.
fn text_field(reply: &Value, field: &'static str) -> Result<String, DecodeError> {
    match reply.get(field) {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(other) => Ok(other.to_string()),
        None => Err(DecodeError::MissingField(field)),
    }
}
