use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::DeliveryError;

/// Common interface for anything that can deliver a message to a named channel.
///
/// Implementations must be `Send + Sync` so the sweep engine can hold one
/// behind an `Arc` and call it from its background task. `send` takes `&self`
/// so a connected gateway can deliver concurrently without a mutable borrow.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Stable lowercase identifier for this gateway (e.g. `"http"`).
    fn name(&self) -> &str;

    /// Deliver `content` verbatim to the channel identified by `channel_id`.
    ///
    /// Whether `channel_id` refers to a real channel is the gateway's
    /// concern; the scheduler core never validates it.
    async fn send(&self, channel_id: &str, content: &str) -> Result<(), DeliveryError>;
}

/// Production gateway: posts messages to a channel service over HTTP.
///
/// `POST {base_url}/channels/{channel_id}/messages` with a JSON body
/// `{"content": …}`. A 404 maps to `ChannelNotFound`; any other non-2xx
/// response or transport fault maps to `Transport`; the client-level timeout
/// maps to `Timeout` so a stalled delivery cannot block a sweep.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    timeout_ms: u64,
}

impl HttpGateway {
    /// Build a gateway for `base_url` with a per-request `timeout`.
    ///
    /// Fails if the underlying HTTP client cannot be constructed; a client
    /// without its timeout would let a stalled delivery hold a sweep.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_ms: timeout.as_millis() as u64,
        })
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, channel_id: &str, content: &str) -> Result<(), DeliveryError> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel_id);
        debug!(%channel_id, "posting message to channel service");

        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout {
                        ms: self.timeout_ms,
                    }
                } else {
                    DeliveryError::Transport(e.to_string())
                }
            })?;

        match resp.status() {
            s if s.is_success() => Ok(()),
            reqwest::StatusCode::NOT_FOUND => Err(DeliveryError::ChannelNotFound {
                channel_id: channel_id.to_string(),
            }),
            s => {
                let body = resp.text().await.unwrap_or_default();
                Err(DeliveryError::Transport(format!(
                    "channel service returned {s}: {body}"
                )))
            }
        }
    }
}
