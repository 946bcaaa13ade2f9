//! Contact submission pipeline: local checks, anti-abuse gates, delivery and outcome

use super::{
    clock::{format_local_timestamp, Clock},
    delivery::{DeliveryTarget, DeliveryTransport, TransportError},
    error::SubmissionError,
    models::{OutboundMessage, SubmissionPayload, SubmissionReceipt},
    phone::normalize_phone,
    validation::{validate_payload, ValidatedSubmission},
};
use crate::config::{AppConfig, MAX_COOLDOWN_SECONDS};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration, time::Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct SubmissionSettings {
    pub cooldown: chrono::Duration,
    pub request_timeout: Duration,
    pub challenge_required: bool,
    pub include_reply_to: bool,
}

impl SubmissionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            cooldown: chrono::Duration::seconds(
                config.contact.cooldown_seconds.min(MAX_COOLDOWN_SECONDS) as i64,
            ),
            request_timeout: Duration::from_millis(config.contact.request_timeout_ms),
            challenge_required: config.challenge.is_enabled(),
            include_reply_to: config.contact.include_reply_to,
        }
    }
}

impl Default for SubmissionSettings {
    fn default() -> Self {
        Self {
            cooldown: chrono::Duration::seconds(60),
            request_timeout: Duration::from_secs(10),
            challenge_required: false,
            include_reply_to: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionState {
    pub last_successful_submit_at: Option<DateTime<Utc>>,
    pub in_flight: bool,
}

/// Clears `in_flight` when the delivery attempt ends, however it ends.
struct InFlightGuard<'a> {
    state: &'a Mutex<SubmissionState>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().in_flight = false;
    }
}

pub struct ContactSubmissionService {
    settings: SubmissionSettings,
    target: Result<DeliveryTarget, Vec<&'static str>>,
    transport: Arc<dyn DeliveryTransport>,
    clock: Arc<dyn Clock>,
    state: Mutex<SubmissionState>,
}

impl ContactSubmissionService {
    pub fn new(
        settings: SubmissionSettings,
        target: Result<DeliveryTarget, Vec<&'static str>>,
        transport: Arc<dyn DeliveryTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            target,
            transport,
            clock,
            state: Mutex::new(SubmissionState::default()),
        }
    }

    pub fn from_config(
        config: &AppConfig,
        transport: Arc<dyn DeliveryTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(
            SubmissionSettings::from_config(config),
            DeliveryTarget::resolve(&config.contact),
            transport,
            clock,
        )
    }

    pub fn state(&self) -> SubmissionState {
        self.state.lock().clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.lock().in_flight
    }

    pub fn is_configured(&self) -> bool {
        self.target.is_ok()
    }

    /// Seconds left before another submission is accepted, if any.
    pub fn cooldown_remaining(&self) -> Option<u64> {
        let last = self.state.lock().last_successful_submit_at?;
        self.remaining_cooldown_seconds(last, self.clock.now())
    }

    pub async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmissionReceipt, SubmissionError> {
        self.submit_claimed(payload, || {}).await
    }

    /// Like [`submit`](Self::submit), running `on_claim` once this attempt owns the
    /// in-flight slot and before anything is sent.
    pub async fn submit_claimed<F>(
        &self,
        payload: &SubmissionPayload,
        on_claim: F,
    ) -> Result<SubmissionReceipt, SubmissionError>
    where
        F: FnOnce() + Send,
    {
        let validated = validate_payload(payload, self.settings.challenge_required).map_err(|err| {
            match &err {
                SubmissionError::BotDetected => info!("contact submission dropped by honeypot"),
                other => debug!(kind = other.kind(), "contact submission failed validation"),
            }
            err
        })?;

        let (guard, target, started_at) = self.begin_flight()?;
        on_claim();
        let message = self.compose(validated, started_at);

        let outcome = self.dispatch(target, &message).await;

        if let Ok(receipt) = &outcome {
            self.state.lock().last_successful_submit_at = Some(receipt.delivered_at);
        }
        drop(guard);

        outcome
    }

    /// Single-flight, cooldown and configuration gates, checked and claimed under one lock.
    fn begin_flight(&self) -> Result<(InFlightGuard<'_>, &DeliveryTarget, DateTime<Utc>), SubmissionError> {
        let now = self.clock.now();
        let mut state = self.state.lock();

        if state.in_flight {
            debug!("contact submission ignored while another is in flight");
            return Err(SubmissionError::AlreadySubmitting);
        }

        if let Some(last) = state.last_successful_submit_at {
            if let Some(remaining) = self.remaining_cooldown_seconds(last, now) {
                info!(remaining_seconds = remaining, "contact submission rejected during cooldown");
                return Err(SubmissionError::CooldownActive(remaining));
            }
        }

        let target = match &self.target {
            Ok(target) => target,
            Err(missing) => {
                error!(missing = ?missing, "contact delivery configuration missing");
                return Err(SubmissionError::ConfigurationMissing);
            }
        };

        state.in_flight = true;
        drop(state);

        Ok((InFlightGuard { state: &self.state }, target, now))
    }

    fn remaining_cooldown_seconds(&self, last: DateTime<Utc>, now: DateTime<Utc>) -> Option<u64> {
        let cooldown_ms = self.settings.cooldown.num_milliseconds();
        let elapsed_ms = (now - last).num_milliseconds();

        if cooldown_ms <= 0 || elapsed_ms >= cooldown_ms {
            return None;
        }

        let remaining_ms = (cooldown_ms - elapsed_ms).min(cooldown_ms) as u64;
        Some(remaining_ms.div_ceil(1000))
    }

    fn compose(&self, validated: ValidatedSubmission, at: DateTime<Utc>) -> OutboundMessage {
        let ValidatedSubmission {
            fields,
            challenge_token,
        } = validated;

        let reply_to = self.settings.include_reply_to.then(|| fields.email.clone());

        OutboundMessage {
            phone: normalize_phone(&fields.phone),
            name: fields.name,
            email: fields.email,
            message: fields.message,
            time: format_local_timestamp(at),
            reply_to,
            challenge_token,
        }
    }

    async fn dispatch(
        &self,
        target: &DeliveryTarget,
        message: &OutboundMessage,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let started = Instant::now();
        let result = tokio::time::timeout(
            self.settings.request_timeout,
            self.transport.deliver(target, message),
        )
        .await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match result {
            Err(_) | Ok(Err(TransportError::Timeout)) => {
                warn!(
                    latency_ms,
                    timeout_ms = self.settings.request_timeout.as_millis() as u64,
                    "contact delivery timed out"
                );
                Err(SubmissionError::Timeout)
            }
            Ok(Err(TransportError::Network(reason))) => {
                warn!(latency_ms, error = %reason, "contact delivery failed at the network level");
                Err(SubmissionError::NetworkError(reason))
            }
            Ok(Ok(response)) if response.is_success() => {
                info!(
                    status = response.status,
                    latency_ms,
                    message_len = message.message.len(),
                    "contact request delivered"
                );
                Ok(SubmissionReceipt {
                    delivered_at: self.clock.now(),
                    status: response.status,
                })
            }
            Ok(Ok(response)) => {
                let detail = if response.body.trim().is_empty() {
                    format!("Request failed with status {}", response.status)
                } else {
                    response.body
                };
                warn!(status = response.status, latency_ms, body = %detail, "contact delivery rejected");
                Err(SubmissionError::DeliveryRejected(detail))
            }
        }
    }
}
