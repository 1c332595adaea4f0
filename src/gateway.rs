//! CDN gateway contract and the reference HTTP transport.
//!
//! The engine decides *which* keys to purge; the gateway executes
//! purge-by-key against the edge. Purging an already-purged key is a no-op
//! by the gateway's contract, so overlapping purges need no coordination.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::histogram;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::GatewaySettings;
use crate::error::EngineError;
use crate::keys::KeySet;

const METRIC_GATEWAY_REQUEST_MS: &str = "raffica_gateway_request_ms";

/// Acknowledgement of a dispatched purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeAck {
    pub keys_accepted: usize,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("purge endpoint returned status {status}")]
    Status { status: u16 },
    #[error("purge transport failed: {0}")]
    Transport(String),
}

/// Executes purge-by-key against the edge cache.
#[async_trait]
pub trait CdnGateway: Send + Sync {
    async fn purge(&self, keys: &KeySet) -> Result<PurgeAck, GatewayError>;
}

/// Reference transport: POSTs the key set as JSON to an edge-purge endpoint.
#[derive(Debug)]
pub struct HttpGateway {
    client: Client,
    endpoint: Url,
    auth_token: Option<String>,
}

impl HttpGateway {
    pub fn new(settings: &GatewaySettings) -> Result<Self, EngineError> {
        let endpoint = Url::parse(&settings.endpoint).map_err(|err| {
            EngineError::configuration(format!(
                "invalid purge endpoint `{}`: {err}",
                settings.endpoint
            ))
        })?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .map_err(|err| {
                EngineError::configuration(format!("failed to build purge client: {err}"))
            })?;
        Ok(Self {
            client,
            endpoint,
            auth_token: settings.auth_token.clone(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("raffica/", env!("CARGO_PKG_VERSION"))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl CdnGateway for HttpGateway {
    async fn purge(&self, keys: &KeySet) -> Result<PurgeAck, GatewayError> {
        let started_at = Instant::now();

        let mut rendered: Vec<String> = keys.iter().map(ToString::to_string).collect();
        rendered.sort();
        let body = serde_json::json!({ "keys": rendered });

        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let outcome = request.send().await;
        histogram!(METRIC_GATEWAY_REQUEST_MS)
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        let response = outcome.map_err(|err| GatewayError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
            });
        }

        debug!(key_count = keys.len(), "purge dispatched");
        Ok(PurgeAck {
            keys_accepted: keys.len(),
        })
    }
}
