//! A single contact form instance and the side effects of a successful submit

use super::{
    challenge::{ChallengeWidget, TokenCallback, WidgetHandle},
    error::SubmissionError,
    models::{ContactFields, SubmissionPayload, SubmissionReceipt},
    service::ContactSubmissionService,
};
use crate::config::ChallengeConfig;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tracing::{info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChallengeState {
    Disabled,
    /// The provider never became ready; submits fail with `ChallengeRequired`.
    Unavailable,
    Rendered {
        handle: WidgetHandle,
        container: String,
        site_key: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct FormSnapshot {
    pub id: Uuid,
    pub fields: ContactFields,
    pub challenge: ChallengeState,
    pub challenge_solved: bool,
    pub in_flight: bool,
    pub last_successful_submit_at: Option<DateTime<Utc>>,
    pub cooldown_remaining_seconds: Option<u64>,
}

struct ChallengeBinding {
    widget: Arc<dyn ChallengeWidget>,
    handle: WidgetHandle,
}

pub struct ContactForm {
    id: Uuid,
    service: ContactSubmissionService,
    fields: Mutex<ContactFields>,
    bot_field: Mutex<String>,
    challenge_token: Arc<Mutex<Option<String>>>,
    challenge: ChallengeState,
    binding: Option<ChallengeBinding>,
}

impl ContactForm {
    pub fn new(service: ContactSubmissionService) -> Self {
        Self {
            id: Uuid::new_v4(),
            service,
            fields: Mutex::new(ContactFields::default()),
            bot_field: Mutex::new(String::new()),
            challenge_token: Arc::new(Mutex::new(None)),
            challenge: ChallengeState::Disabled,
            binding: None,
        }
    }

    /// Renders the challenge widget when a site key is configured.
    pub async fn with_challenge(
        service: ContactSubmissionService,
        widget: Arc<dyn ChallengeWidget>,
        config: &ChallengeConfig,
    ) -> Self {
        let mut form = Self::new(service);
        let Some(site_key) = config.site_key() else {
            return form;
        };

        if let Err(e) = widget.ready(Duration::from_millis(config.ready_timeout_ms)).await {
            warn!(form_id = %form.id, error = %e, "challenge widget unavailable");
            form.challenge = ChallengeState::Unavailable;
            return form;
        }

        let slot = form.challenge_token.clone();
        let on_token: TokenCallback = Arc::new(move |token: String| {
            *slot.lock() = Some(token);
        });

        match widget.render(&config.container_id, site_key, on_token) {
            Ok(handle) => {
                form.challenge = ChallengeState::Rendered {
                    handle: handle.clone(),
                    container: config.container_id.clone(),
                    site_key: site_key.to_string(),
                };
                form.binding = Some(ChallengeBinding { widget, handle });
            }
            Err(e) => {
                warn!(form_id = %form.id, error = %e, "challenge widget failed to render");
                form.challenge = ChallengeState::Unavailable;
            }
        }

        form
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn service(&self) -> &ContactSubmissionService {
        &self.service
    }

    pub fn challenge(&self) -> &ChallengeState {
        &self.challenge
    }

    pub fn widget_handle(&self) -> Option<&WidgetHandle> {
        self.binding.as_ref().map(|b| &b.handle)
    }

    pub fn set_fields(&self, fields: ContactFields) {
        *self.fields.lock() = fields;
    }

    pub fn set_bot_field(&self, value: impl Into<String>) {
        *self.bot_field.lock() = value.into();
    }

    pub fn fields(&self) -> ContactFields {
        self.fields.lock().clone()
    }

    pub fn bot_field(&self) -> String {
        self.bot_field.lock().clone()
    }

    pub fn challenge_token(&self) -> Option<String> {
        self.challenge_token.lock().clone()
    }

    pub fn snapshot(&self) -> FormSnapshot {
        let state = self.service.state();
        FormSnapshot {
            id: self.id,
            fields: self.fields(),
            challenge: self.challenge.clone(),
            challenge_solved: self.challenge_token.lock().is_some(),
            in_flight: state.in_flight,
            last_successful_submit_at: state.last_successful_submit_at,
            cooldown_remaining_seconds: self.service.cooldown_remaining(),
        }
    }

    /// Submits the fields currently held by the form.
    pub async fn submit(&self) -> Result<SubmissionReceipt, SubmissionError> {
        self.submit_with(self.fields(), self.bot_field()).await
    }

    /// Submits `fields` as typed. They replace the form's fields only once this
    /// attempt owns the in-flight slot, or after it failed while nothing else is
    /// in flight, so a rejected concurrent attempt never overwrites the one being sent.
    pub async fn submit_with(
        &self,
        fields: ContactFields,
        bot_field: String,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let payload = SubmissionPayload {
            fields,
            bot_field,
            challenge_token: self.challenge_token(),
        };

        let span = info_span!("contact_submit", form_id = %self.id);
        let outcome = self
            .service
            .submit_claimed(&payload, || self.store_input(&payload))
            .instrument(span)
            .await;

        match &outcome {
            Ok(_) => {
                self.fields.lock().clear();
                self.bot_field.lock().clear();
                *self.challenge_token.lock() = None;
                if let Some(binding) = &self.binding {
                    binding.widget.reset(&binding.handle);
                }
            }
            Err(SubmissionError::AlreadySubmitting) => {}
            Err(_) => {
                if !self.service.is_in_flight() {
                    self.store_input(&payload);
                }
            }
        }

        outcome
    }

    fn store_input(&self, payload: &SubmissionPayload) {
        *self.fields.lock() = payload.fields.clone();
        *self.bot_field.lock() = payload.bot_field.clone();
    }
}

impl Drop for ContactForm {
    fn drop(&mut self) {
        if let Some(binding) = &self.binding {
            binding.widget.release(&binding.handle);
        }
    }
}
