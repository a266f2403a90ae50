//! Scripted platform used by unit tests.

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;

use crate::catalog::{ProtocolCatalog, ProtocolPhase};
use crate::error::TransportError;
use crate::transport::{ErrorReport, InitPayload, OutboundMessage, PlatformClient};

pub(crate) const GREETING: &str = "Hello, I am";
pub(crate) const WELCOME: &str = "Welcome";
pub(crate) const REQUEST_DATA: &str = "Ready for world data";
pub(crate) const WORLD_DATA: &str = "Here is the world";
pub(crate) const REQUEST_LINKS: &str = "Ready for links";
pub(crate) const LINKS: &str = "Here are the links";

pub(crate) const DOMAIN: &str = "(define (domain tavern) (:requirements :typing))";
pub(crate) const PROBLEM: &str = "(define (problem evening)
    (:domain tavern)
    (:objects hero - character room1 room2 - location)
    (:init (at hero room2)))";

pub(crate) fn catalog() -> ProtocolCatalog {
    ProtocolCatalog::default()
        .with_message(ProtocolPhase::Phase1, "message_1", GREETING)
        .with_message(ProtocolPhase::Phase1, "message_2", WELCOME)
        .with_message(ProtocolPhase::Phase3, "message_5", REQUEST_DATA)
        .with_message(ProtocolPhase::Phase3, "message_7", WORLD_DATA)
        .with_message(ProtocolPhase::Phase4, "message_8", REQUEST_LINKS)
        .with_message(ProtocolPhase::Phase4, "message_10", LINKS)
}

/// Encounter manifest where every encounter needs `(at hero room1)`.
pub(crate) fn manifest(names: &[&str]) -> Value {
    let encounters: Vec<Value> = names
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "description": format!("encounter {name}"),
                "metadata": {},
                "preconditions": "(at hero room1)"
            })
        })
        .collect();
    Value::String(json!({ "version": 1, "encounters": encounters }).to_string())
}

/// Inbound record encoding `changes` the way the platform does.
pub(crate) fn inbound(changes: Value) -> Value {
    json!({ "text": changes.to_string() })
}

#[derive(Default)]
struct Script {
    offline: bool,
    catalog: ProtocolCatalog,
    init_replies: VecDeque<Value>,
    phases: VecDeque<String>,
    inbound: VecDeque<Vec<Value>>,
    init_sent: Vec<InitPayload>,
    phase_fetches: usize,
    sent: Vec<(String, OutboundMessage)>,
    errors: Vec<ErrorReport>,
    probes: usize,
    post_status: Option<u16>,
}

/// In-memory [`PlatformClient`]; clones share the same script.
#[derive(Clone, Default)]
pub(crate) struct ScriptedPlatform {
    script: Arc<Mutex<Script>>,
}

impl ScriptedPlatform {
    pub(crate) fn new() -> Self {
        let platform = Self::default();
        platform.script.lock().catalog = catalog();
        platform
    }

    pub(crate) fn offline(self) -> Self {
        self.set_online(false);
        self
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.script.lock().offline = !online;
    }

    /// Queue the replies of a well-behaved platform for phases 1, 3 and 4.
    pub(crate) fn with_handshake(self, encounter_names: &[&str]) -> Self {
        self.push_init_reply(json!({ "text": WELCOME }));
        self.push_phase("PHASE_2");
        self.push_phase("PHASE_3");
        self.push_init_reply(json!({
            "text": WORLD_DATA,
            "domain": DOMAIN,
            "problem": PROBLEM,
            "additional_data": manifest(encounter_names),
        }));
        self.push_init_reply(json!({
            "text": LINKS,
            "get_message_url": "/get_messages_em",
            "add_message_url": "/add_message",
        }));
        self
    }

    pub(crate) fn failing_posts(self, status: u16) -> Self {
        self.script.lock().post_status = Some(status);
        self
    }

    pub(crate) fn push_init_reply(&self, reply: Value) {
        self.script.lock().init_replies.push_back(reply);
    }

    pub(crate) fn push_phase(&self, phase: &str) {
        self.script.lock().phases.push_back(phase.to_string());
    }

    pub(crate) fn push_inbound(&self, records: Vec<Value>) {
        self.script.lock().inbound.push_back(records);
    }

    pub(crate) fn init_sent(&self) -> Vec<InitPayload> {
        self.script.lock().init_sent.clone()
    }

    pub(crate) fn phase_fetches(&self) -> usize {
        self.script.lock().phase_fetches
    }

    pub(crate) fn sent_messages(&self) -> Vec<(String, OutboundMessage)> {
        self.script.lock().sent.clone()
    }

    pub(crate) fn error_reports(&self) -> Vec<ErrorReport> {
        self.script.lock().errors.clone()
    }

    pub(crate) fn probes(&self) -> usize {
        self.script.lock().probes
    }
}

impl PlatformClient for ScriptedPlatform {
    fn fetch_protocol_messages(&self) -> Result<ProtocolCatalog, TransportError> {
        Ok(self.script.lock().catalog.clone())
    }

    fn send_initialization(&self, payload: &InitPayload) -> Result<Value, TransportError> {
        let mut script = self.script.lock();
        script.init_sent.push(payload.clone());
        script.init_replies.pop_front().ok_or(TransportError::Status {
            url: "inizialization_em".to_string(),
            status: 500,
        })
    }

    fn fetch_phase(&self) -> Result<String, TransportError> {
        let mut script = self.script.lock();
        script.phase_fetches += 1;
        let phase = if script.phases.len() > 1 {
            script.phases.pop_front()
        } else {
            script.phases.front().cloned()
        };
        Ok(phase.unwrap_or_else(|| "PHASE_1".to_string()))
    }

    fn fetch_messages(&self, _link: &str) -> Result<Vec<Value>, TransportError> {
        Ok(self.script.lock().inbound.pop_front().unwrap_or_default())
    }

    fn post_message(&self, link: &str, message: &OutboundMessage) -> Result<Value, TransportError> {
        let mut script = self.script.lock();
        if let Some(status) = script.post_status {
            return Err(TransportError::Status {
                url: link.to_string(),
                status,
            });
        }
        script.sent.push((link.to_string(), message.clone()));
        Ok(json!({ "status": "ok" }))
    }

    fn post_error(&self, report: &ErrorReport) -> Result<(), TransportError> {
        self.script.lock().errors.push(report.clone());
        Ok(())
    }

    fn probe(&self) -> bool {
        let mut script = self.script.lock();
        script.probes += 1;
        !script.offline
    }
}
