use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, warn};

use crate::bridge::HubRequest;
use crate::mediola::frame::SUCCESS_MARKER;

/// Attempts per request before giving up; the gateway answers fast on the
/// local network or not at all.
const MAX_ATTEMPTS: usize = 4;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
const READ_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Error, Debug)]
pub enum HubError {
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),

    #[error("gateway did not answer after {MAX_ATTEMPTS} attempts")]
    Unreachable,

    #[error("poll reply does not start with {{XC_SUC}}")]
    BadPollReply,
}

/// HTTP side of the gateway: commands out, state polls back. Every call is
/// a fresh short-lived connection.
pub struct HubClient {
    http: reqwest::Client,
    url: String,
}

impl HubClient {
    pub fn new(host: &str) -> Result<Self, HubError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .build()
            .map_err(HubError::Client)?;
        Ok(Self { http, url: format!("http://{host}/command") })
    }

    pub async fn send_command(&self, request: &HubRequest) -> Result<(), HubError> {
        let params = [
            ("XC_FNC", "SendSC".to_string()),
            ("type", request.device_type.to_string()),
            ("data", request.data.clone()),
        ];
        self.call(&params).await.map(|_| ())
    }

    /// Polls the full device state. The reply body keeps its `{XC_SUC}`
    /// marker so it runs through the same frame path as live events.
    pub async fn get_states(&self) -> Result<Bytes, HubError> {
        let body = self.call(&[("XC_FNC", "GetStates".to_string())]).await?;
        if !body.starts_with(SUCCESS_MARKER) {
            return Err(HubError::BadPollReply);
        }
        Ok(body)
    }

    async fn call(&self, params: &[(&str, String)]) -> Result<Bytes, HubError> {
        for attempt in 1..=MAX_ATTEMPTS {
            let sent = self
                .http
                .get(&self.url)
                .query(params)
                .header(reqwest::header::CONNECTION, "close")
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(e) => {
                    warn!("couldn't send request (attempt {attempt}/{MAX_ATTEMPTS}): {e}");
                    continue;
                }
            };

            if response.status() != StatusCode::OK {
                warn!(
                    "gateway answered {} (attempt {attempt}/{MAX_ATTEMPTS}), retrying",
                    response.status()
                );
                continue;
            }

            match response.bytes().await {
                Ok(body) => {
                    debug!("gateway answered {} bytes", body.len());
                    return Ok(body);
                }
                Err(e) => {
                    warn!("failed to read reply body (attempt {attempt}/{MAX_ATTEMPTS}): {e}");
                    continue;
                }
            }
        }
        Err(HubError::Unreachable)
    }
}
