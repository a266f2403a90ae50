//! Request/response primitives against the platform.
//!
//! [`PlatformClient`] is the raw seam (HTTP in production, scripted in tests);
//! [`Transport`] layers the connectivity probe, the protocol catalog and the
//! session endpoints assigned during the handshake on top of it.

mod http;

pub use http::HttpPlatformClient;

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::catalog::ProtocolCatalog;
use crate::connectivity::ConnectivityProbe;
use crate::error::TransportError;

/// Recipient role attached to every steady-state message.
pub const ENVIRONMENT_ROLE: &str = "ENV";

/// Query payload for an initialization-style send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitPayload {
    /// Sent as `?text=...`.
    Text(String),
    Params(BTreeMap<String, String>),
}

impl InitPayload {
    pub fn query(&self) -> Vec<(String, String)> {
        match self {
            InitPayload::Text(text) => vec![("text".to_string(), text.clone())],
            InitPayload::Params(params) => params
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }
}

/// Body of a steady-state send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub text: String,
    pub to_user_role: String,
}

impl OutboundMessage {
    pub fn to_environment(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            to_user_role: ENVIRONMENT_ROLE.to_string(),
        }
    }
}

/// Body of an error report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub text: String,
    pub error_type: String,
}

/// Dynamic endpoints assigned in handshake phase 4.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionEndpoints {
    pub receive: String,
    pub send: String,
}

impl SessionEndpoints {
    /// Build from raw path fragments, stripping every `/`.
    pub fn from_fragments(receive: &str, send: &str) -> Self {
        Self {
            receive: receive.replace('/', ""),
            send: send.replace('/', ""),
        }
    }
}

/// Raw platform endpoints.
pub trait PlatformClient: Send + Sync {
    fn fetch_protocol_messages(&self) -> Result<ProtocolCatalog, TransportError>;

    fn send_initialization(&self, payload: &InitPayload) -> Result<Value, TransportError>;

    /// Current handshake phase as reported by the platform, unquoted.
    fn fetch_phase(&self) -> Result<String, TransportError>;

    /// Pending inbound records at `link`; empty when there are none.
    fn fetch_messages(&self, link: &str) -> Result<Vec<Value>, TransportError>;

    fn post_message(&self, link: &str, message: &OutboundMessage) -> Result<Value, TransportError>;

    fn post_error(&self, report: &ErrorReport) -> Result<(), TransportError>;

    /// Lightweight reachability check; any failure is `false`.
    fn probe(&self) -> bool;
}

/// Platform transport shared by the handshake, the receiver and the selection engine.
pub struct Transport<C> {
    client: C,
    connectivity: ConnectivityProbe,
    catalog: ProtocolCatalog,
    endpoints: SessionEndpoints,
}

impl<C: PlatformClient> Transport<C> {
    /// Fetch the protocol catalog and build the transport.
    pub fn connect(client: C, max_requests_before_probe: u32) -> Result<Self, TransportError> {
        let catalog = client.fetch_protocol_messages()?;
        debug!("protocol message catalog received");
        Ok(Self {
            client,
            connectivity: ConnectivityProbe::new(max_requests_before_probe),
            catalog,
            endpoints: SessionEndpoints::default(),
        })
    }

    pub fn catalog(&self) -> &ProtocolCatalog {
        &self.catalog
    }

    pub fn endpoints(&self) -> &SessionEndpoints {
        &self.endpoints
    }

    pub fn set_endpoints(&mut self, endpoints: SessionEndpoints) {
        self.endpoints = endpoints;
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online(|| self.client.probe())
    }

    /// Initialization-style send; `None` when the platform is offline.
    pub fn send_initialization(&self, payload: &InitPayload) -> Result<Option<Value>, TransportError> {
        if !self.is_online() {
            return Ok(None);
        }
        self.client.send_initialization(payload).map(Some)
    }

    /// Current handshake phase; empty when the platform is offline.
    pub fn current_phase(&self) -> Result<String, TransportError> {
        if !self.is_online() {
            return Ok(String::new());
        }
        self.client.fetch_phase()
    }

    /// Fetch the next inbound batch; `None` when offline or nothing is pending.
    pub fn receive(&self) -> Result<Option<Vec<Value>>, TransportError> {
        if !self.is_online() {
            return Ok(None);
        }
        let records = self.client.fetch_messages(&self.endpoints.receive)?;
        Ok((!records.is_empty()).then_some(records))
    }

    /// Steady-state send; `None` when the platform is offline.
    pub fn send_message(&self, text: &str) -> Result<Option<Value>, TransportError> {
        if !self.is_online() {
            return Ok(None);
        }
        let message = OutboundMessage::to_environment(text);
        self.client
            .post_message(&self.endpoints.send, &message)
            .map(Some)
    }

    /// Fire-and-forget error notification.
    pub fn report_error(&self, text: &str) {
        if !self.is_online() {
            return;
        }
        let report = ErrorReport {
            text: text.to_string(),
            error_type: String::new(),
        };
        if let Err(err) = self.client.post_error(&report) {
            warn!(error = %err, "error report not delivered");
        }
    }
}
