use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use super::{ErrorReport, InitPayload, OutboundMessage, PlatformClient};
use crate::catalog::ProtocolCatalog;
use crate::config::{EndpointConfig, ManagerConfig};
use crate::error::TransportError;

/// [`PlatformClient`] over blocking HTTP.
#[derive(Debug, Clone)]
pub struct HttpPlatformClient {
    base_url: String,
    endpoints: EndpointConfig,
    probe_timeout: Duration,
    client: Client,
}

impl HttpPlatformClient {
    pub fn from_config(config: &ManagerConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .build()
            .map_err(|err| TransportError::BuildClient(err.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            endpoints: config.endpoints.clone(),
            probe_timeout: config.probe_timeout(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn http_error(url: &str, err: reqwest::Error) -> TransportError {
        TransportError::Http {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    fn expect_ok(url: &str, response: Response) -> Result<Response, TransportError> {
        let status = response.status();
        if status != StatusCode::OK {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, TransportError> {
        response.json().map_err(|err| TransportError::Body {
            url: url.to_string(),
            message: err.to_string(),
        })
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, TransportError> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .map_err(|err| Self::http_error(&url, err))?;
        Self::decode(&url, Self::expect_ok(&url, response)?)
    }
}

impl PlatformClient for HttpPlatformClient {
    fn fetch_protocol_messages(&self) -> Result<ProtocolCatalog, TransportError> {
        self.get_json(&self.endpoints.protocol_messages, &[])
    }

    fn send_initialization(&self, payload: &InitPayload) -> Result<Value, TransportError> {
        self.get_json(&self.endpoints.initialization, &payload.query())
    }

    fn fetch_phase(&self) -> Result<String, TransportError> {
        let url = self.url(&self.endpoints.protocol_phase);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| Self::http_error(&url, err))?;
        let text = response.text().map_err(|err| Self::http_error(&url, err))?;
        Ok(text.replace('"', "").trim().to_string())
    }

    fn fetch_messages(&self, link: &str) -> Result<Vec<Value>, TransportError> {
        self.get_json(link, &[])
    }

    fn post_message(&self, link: &str, message: &OutboundMessage) -> Result<Value, TransportError> {
        let url = self.url(link);
        let response = self
            .client
            .post(&url)
            .json(message)
            .send()
            .map_err(|err| Self::http_error(&url, err))?;
        Self::decode(&url, Self::expect_ok(&url, response)?)
    }

    fn post_error(&self, report: &ErrorReport) -> Result<(), TransportError> {
        let url = self.url(&self.endpoints.error_report);
        self.client
            .post(&url)
            .json(report)
            .send()
            .map_err(|err| Self::http_error(&url, err))?;
        Ok(())
    }

    fn probe(&self) -> bool {
        self.client
            .head(&self.base_url)
            .timeout(self.probe_timeout)
            .send()
            .is_ok_and(|response| response.status() == StatusCode::OK)
    }
}
