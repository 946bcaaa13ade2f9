//! Outbound delivery to the notification endpoint

use super::models::{OutboundMessage, RelayEnvelope};
use crate::config::{non_empty, ContactConfig};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_RELAY_ENDPOINT: &str = "https://api.emailjs.com/api/v1.0/email/send";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryTarget {
    /// Generic backend receiving the message body as-is.
    Backend { endpoint: String },
    /// Keyed email relay receiving the message wrapped in a [`RelayEnvelope`].
    KeyedRelay {
        endpoint: String,
        service_id: String,
        template_id: String,
        public_key: String,
        access_token: Option<String>,
    },
}

impl DeliveryTarget {
    /// Returns the configuration keys that are missing when no target can be built.
    pub fn resolve(config: &ContactConfig) -> Result<Self, Vec<&'static str>> {
        let relay = &config.relay;
        let service_id = non_empty(&relay.service_id);
        let template_id = non_empty(&relay.template_id);
        let public_key = non_empty(&relay.public_key);

        let relay_requested = service_id.is_some()
            || template_id.is_some()
            || public_key.is_some()
            || non_empty(&relay.access_token).is_some();

        if relay_requested {
            return match (service_id, template_id, public_key) {
                (Some(service_id), Some(template_id), Some(public_key)) => Ok(Self::KeyedRelay {
                    endpoint: config.endpoint().unwrap_or(DEFAULT_RELAY_ENDPOINT).to_string(),
                    service_id: service_id.to_string(),
                    template_id: template_id.to_string(),
                    public_key: public_key.to_string(),
                    access_token: non_empty(&relay.access_token).map(str::to_string),
                }),
                _ => {
                    let mut missing = Vec::new();
                    if service_id.is_none() {
                        missing.push("contact.relay.service_id");
                    }
                    if template_id.is_none() {
                        missing.push("contact.relay.template_id");
                    }
                    if public_key.is_none() {
                        missing.push("contact.relay.public_key");
                    }
                    Err(missing)
                }
            };
        }

        match config.endpoint() {
            Some(endpoint) => Ok(Self::Backend {
                endpoint: endpoint.to_string(),
            }),
            None => Err(vec!["contact.endpoint"]),
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            Self::Backend { endpoint } | Self::KeyedRelay { endpoint, .. } => endpoint,
        }
    }

    /// JSON body for this target.
    pub fn body_for(&self, message: &OutboundMessage) -> serde_json::Result<serde_json::Value> {
        match self {
            Self::Backend { .. } => serde_json::to_value(message),
            Self::KeyedRelay {
                service_id,
                template_id,
                public_key,
                access_token,
                ..
            } => serde_json::to_value(RelayEnvelope {
                service_id: service_id.clone(),
                template_id: template_id.clone(),
                user_id: public_key.clone(),
                access_token: access_token.clone(),
                template_params: message.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResponse {
    pub status: u16,
    pub body: String,
}

impl DeliveryResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("{0}")]
    Network(String),
}

#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    async fn deliver(
        &self,
        target: &DeliveryTarget,
        message: &OutboundMessage,
    ) -> Result<DeliveryResponse, TransportError>;
}

#[derive(Clone)]
pub struct HttpDelivery {
    client: reqwest::Client,
}

impl HttpDelivery {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DeliveryTransport for HttpDelivery {
    async fn deliver(
        &self,
        target: &DeliveryTarget,
        message: &OutboundMessage,
    ) -> Result<DeliveryResponse, TransportError> {
        let body = target
            .body_for(message)
            .map_err(|e| TransportError::Network(format!("failed to encode body: {}", e)))?;

        let response = self
            .client
            .post(target.endpoint())
            .header(http::header::ACCEPT, "application/json")
            .header("X-Requested-With", "XMLHttpRequest")
            .json(&body)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status().as_u16();
        // The body is diagnostic only; a failed read leaves it empty.
        let body = response.text().await.unwrap_or_default();

        Ok(DeliveryResponse { status, body })
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(err.to_string())
    }
}
