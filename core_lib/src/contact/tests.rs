use super::*;
use crate::config::ChallengeConfig;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::Notify;

struct RecordingTransport {
    calls: AtomicUsize,
    messages: Mutex<Vec<OutboundMessage>>,
    responses: Mutex<Vec<Result<DeliveryResponse, TransportError>>>,
}

impl RecordingTransport {
    fn ok() -> Arc<Self> {
        Self::replying(vec![])
    }

    /// Replies are consumed in order; once exhausted every call gets a 200.
    fn replying(responses: Vec<Result<DeliveryResponse, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            messages: Mutex::new(Vec::new()),
            responses: Mutex::new(responses),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_message(&self) -> Option<OutboundMessage> {
        self.messages.lock().last().cloned()
    }
}

#[async_trait]
impl DeliveryTransport for RecordingTransport {
    async fn deliver(
        &self,
        _target: &DeliveryTarget,
        message: &OutboundMessage,
    ) -> Result<DeliveryResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.messages.lock().push(message.clone());
        let mut responses = self.responses.lock();
        if responses.is_empty() {
            Ok(DeliveryResponse { status: 200, body: String::new() })
        } else {
            responses.remove(0)
        }
    }
}

struct HangingTransport {
    calls: AtomicUsize,
}

#[async_trait]
impl DeliveryTransport for HangingTransport {
    async fn deliver(
        &self,
        _target: &DeliveryTarget,
        _message: &OutboundMessage,
    ) -> Result<DeliveryResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

struct GatedTransport {
    calls: AtomicUsize,
    messages: Mutex<Vec<OutboundMessage>>,
    entered: Notify,
    release: Notify,
}

impl GatedTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            messages: Mutex::new(Vec::new()),
            entered: Notify::new(),
            release: Notify::new(),
        })
    }
}

#[async_trait]
impl DeliveryTransport for GatedTransport {
    async fn deliver(
        &self,
        _target: &DeliveryTarget,
        message: &OutboundMessage,
    ) -> Result<DeliveryResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.messages.lock().push(message.clone());
        self.entered.notify_one();
        self.release.notified().await;
        Ok(DeliveryResponse { status: 201, body: String::new() })
    }
}

fn start() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap()
}

fn backend() -> Result<DeliveryTarget, Vec<&'static str>> {
    Ok(DeliveryTarget::Backend {
        endpoint: "http://relay.invalid/contact".to_string(),
    })
}

fn service_with(
    transport: Arc<dyn DeliveryTransport>,
    clock: &ManualClock,
    settings: SubmissionSettings,
) -> ContactSubmissionService {
    ContactSubmissionService::new(settings, backend(), transport, Arc::new(clock.clone()))
}

fn valid_fields() -> ContactFields {
    ContactFields::new(
        "Igreja Assembleia",
        "secretaria@igreja.org",
        "(21) 99776-7702",
        "Gostaríamos de um orçamento para caixas de som.",
    )
}

fn valid_payload() -> SubmissionPayload {
    SubmissionPayload::new(valid_fields())
}

#[tokio::test]
async fn test_honeypot_blocks_without_network_call() {
    let transport = RecordingTransport::ok();
    let clock = ManualClock::new(start());
    let service = service_with(transport.clone(), &clock, SubmissionSettings::default());

    for bot_value in ["x", "http://spam.example", " "] {
        let payload = valid_payload().with_bot_field(bot_value);
        assert_eq!(service.submit(&payload).await.unwrap_err(), SubmissionError::BotDetected);
    }
    assert_eq!(transport.calls(), 0);
    assert!(!service.is_in_flight());
}

#[tokio::test]
async fn test_missing_field_blocks_without_network_call() {
    let transport = RecordingTransport::ok();
    let clock = ManualClock::new(start());
    let service = service_with(transport.clone(), &clock, SubmissionSettings::default());

    let mut payload = valid_payload();
    payload.fields.message = "  ".to_string();
    assert_eq!(service.submit(&payload).await.unwrap_err(), SubmissionError::MissingField);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_successful_delivery_sends_normalized_message() {
    let transport = RecordingTransport::ok();
    let clock = ManualClock::new(start());
    let service = service_with(transport.clone(), &clock, SubmissionSettings::default());

    let receipt = service.submit(&valid_payload()).await.unwrap();
    assert_eq!(receipt.status, 200);
    assert_eq!(receipt.delivered_at, start());
    assert_eq!(transport.calls(), 1);

    let message = transport.last_message().unwrap();
    assert_eq!(message.phone, "5521997767702");
    assert_eq!(message.time, "14/10/2026, 09:00:00");
    assert_eq!(message.reply_to.as_deref(), Some("secretaria@igreja.org"));
    assert_eq!(message.challenge_token, None);
    assert_eq!(service.state().last_successful_submit_at, Some(start()));
}

#[tokio::test]
async fn test_reply_to_can_be_disabled() {
    let transport = RecordingTransport::ok();
    let clock = ManualClock::new(start());
    let settings = SubmissionSettings {
        include_reply_to: false,
        ..SubmissionSettings::default()
    };
    let service = service_with(transport.clone(), &clock, settings);

    service.submit(&valid_payload()).await.unwrap();
    assert_eq!(transport.last_message().unwrap().reply_to, None);
}

#[tokio::test]
async fn test_second_submit_while_in_flight_is_ignored() {
    let transport = GatedTransport::new();
    let clock = ManualClock::new(start());
    let service = Arc::new(service_with(transport.clone(), &clock, SubmissionSettings::default()));

    let first = {
        let service = service.clone();
        tokio::spawn(async move { service.submit(&valid_payload()).await })
    };

    transport.entered.notified().await;
    assert!(service.is_in_flight());

    let second = service.submit(&valid_payload()).await;
    assert_eq!(second.unwrap_err(), SubmissionError::AlreadySubmitting);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

    transport.release.notify_one();
    let receipt = first.await.unwrap().unwrap();
    assert_eq!(receipt.status, 201);
    assert!(!service.is_in_flight());
}

#[tokio::test]
async fn test_cooldown_boundaries() {
    let transport = RecordingTransport::ok();
    let clock = ManualClock::new(start());
    let settings = SubmissionSettings {
        cooldown: ChronoDuration::seconds(60),
        ..SubmissionSettings::default()
    };
    let service = service_with(transport.clone(), &clock, settings);

    service.submit(&valid_payload()).await.unwrap();

    clock.advance(ChronoDuration::seconds(10));
    assert_eq!(
        service.submit(&valid_payload()).await.unwrap_err(),
        SubmissionError::CooldownActive(50)
    );
    assert_eq!(service.cooldown_remaining(), Some(50));

    clock.set(start() + ChronoDuration::milliseconds(59_999));
    assert_eq!(
        service.submit(&valid_payload()).await.unwrap_err(),
        SubmissionError::CooldownActive(1)
    );
    assert_eq!(transport.calls(), 1);

    clock.set(start() + ChronoDuration::seconds(60));
    assert_eq!(service.cooldown_remaining(), None);
    service.submit(&valid_payload()).await.unwrap();
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_failure_does_not_start_cooldown() {
    let transport = RecordingTransport::replying(vec![
        Err(TransportError::Network("connection reset".to_string())),
        Ok(DeliveryResponse { status: 503, body: String::new() }),
    ]);
    let clock = ManualClock::new(start());
    let service = service_with(transport.clone(), &clock, SubmissionSettings::default());

    assert_eq!(
        service.submit(&valid_payload()).await.unwrap_err(),
        SubmissionError::NetworkError("connection reset".to_string())
    );
    assert!(!service.is_in_flight());

    assert_eq!(
        service.submit(&valid_payload()).await.unwrap_err(),
        SubmissionError::DeliveryRejected("Request failed with status 503".to_string())
    );
    assert!(!service.is_in_flight());
    assert_eq!(service.state().last_successful_submit_at, None);

    service.submit(&valid_payload()).await.unwrap();
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn test_rejection_body_is_kept_as_diagnostic() {
    let transport = RecordingTransport::replying(vec![Ok(DeliveryResponse {
        status: 400,
        body: "The template ID is invalid".to_string(),
    })]);
    let clock = ManualClock::new(start());
    let service = service_with(transport, &clock, SubmissionSettings::default());

    let err = service.submit(&valid_payload()).await.unwrap_err();
    assert_eq!(err.diagnostic(), Some("The template ID is invalid"));
}

#[tokio::test]
async fn test_unresolved_call_times_out_and_clears_in_flight() {
    let transport = Arc::new(HangingTransport {
        calls: AtomicUsize::new(0),
    });
    let clock = ManualClock::new(start());
    let settings = SubmissionSettings {
        request_timeout: Duration::from_millis(50),
        ..SubmissionSettings::default()
    };
    let service = service_with(transport.clone(), &clock, settings);

    let err = service.submit(&valid_payload()).await.unwrap_err();
    assert_eq!(err, SubmissionError::Timeout);
    assert!(!service.is_in_flight());
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    assert_eq!(service.state().last_successful_submit_at, None);
}

#[tokio::test]
async fn test_transport_timeout_maps_to_timeout() {
    let transport = RecordingTransport::replying(vec![Err(TransportError::Timeout)]);
    let clock = ManualClock::new(start());
    let service = service_with(transport, &clock, SubmissionSettings::default());

    assert_eq!(service.submit(&valid_payload()).await.unwrap_err(), SubmissionError::Timeout);
}

#[tokio::test]
async fn test_missing_configuration_refuses_without_network_call() {
    let transport = RecordingTransport::ok();
    let clock = ManualClock::new(start());
    let service = ContactSubmissionService::new(
        SubmissionSettings::default(),
        Err(vec!["contact.endpoint"]),
        transport.clone(),
        Arc::new(clock),
    );

    assert!(!service.is_configured());
    assert_eq!(
        service.submit(&valid_payload()).await.unwrap_err(),
        SubmissionError::ConfigurationMissing
    );
    assert_eq!(transport.calls(), 0);
    assert!(!service.is_in_flight());
}

#[tokio::test]
async fn test_challenge_token_is_required_and_forwarded() {
    let transport = RecordingTransport::ok();
    let clock = ManualClock::new(start());
    let settings = SubmissionSettings {
        challenge_required: true,
        ..SubmissionSettings::default()
    };
    let service = service_with(transport.clone(), &clock, settings);

    assert_eq!(
        service.submit(&valid_payload()).await.unwrap_err(),
        SubmissionError::ChallengeRequired
    );
    assert_eq!(transport.calls(), 0);

    service
        .submit(&valid_payload().with_challenge_token("turnstile-token"))
        .await
        .unwrap();
    assert_eq!(
        transport.last_message().unwrap().challenge_token.as_deref(),
        Some("turnstile-token")
    );
}

fn challenge_config(ready_timeout_ms: u64) -> ChallengeConfig {
    ChallengeConfig {
        site_key: Some("site-key".to_string()),
        container_id: "contact-challenge".to_string(),
        ready_timeout_ms,
    }
}

#[tokio::test]
async fn test_form_success_clears_state_and_resets_widget() {
    let transport = RecordingTransport::ok();
    let clock = ManualClock::new(start());
    let settings = SubmissionSettings {
        challenge_required: true,
        ..SubmissionSettings::default()
    };
    let widget = Arc::new(TokenRelayWidget::new());
    let form = ContactForm::with_challenge(
        service_with(transport.clone(), &clock, settings),
        widget.clone(),
        &challenge_config(100),
    )
    .await;

    let handle = form.widget_handle().cloned().unwrap();
    widget.deliver_token(&handle, "tok-1").unwrap();
    assert_eq!(form.challenge_token().as_deref(), Some("tok-1"));

    form.set_fields(valid_fields());
    form.submit().await.unwrap();

    assert!(form.fields().is_blank());
    assert_eq!(form.bot_field(), "");
    assert_eq!(form.challenge_token(), None);
    assert!(!widget.is_solved(&handle));
    assert_eq!(form.service().state().last_successful_submit_at, Some(start()));
    assert_eq!(transport.last_message().unwrap().challenge_token.as_deref(), Some("tok-1"));
}

#[tokio::test]
async fn test_form_failure_keeps_fields() {
    let transport = RecordingTransport::replying(vec![Ok(DeliveryResponse {
        status: 500,
        body: "boom".to_string(),
    })]);
    let clock = ManualClock::new(start());
    let form = ContactForm::new(service_with(transport, &clock, SubmissionSettings::default()));

    form.set_fields(valid_fields());
    let err = form.submit().await.unwrap_err();
    assert_eq!(err, SubmissionError::DeliveryRejected("boom".to_string()));
    assert_eq!(form.fields(), valid_fields());
    assert_eq!(form.snapshot().last_successful_submit_at, None);
}

#[tokio::test]
async fn test_form_honeypot_is_not_cleared_on_rejection() {
    let transport = RecordingTransport::ok();
    let clock = ManualClock::new(start());
    let form = ContactForm::new(service_with(transport.clone(), &clock, SubmissionSettings::default()));

    form.set_fields(valid_fields());
    form.set_bot_field("filled-by-script");
    assert_eq!(form.submit().await.unwrap_err(), SubmissionError::BotDetected);
    assert_eq!(form.bot_field(), "filled-by-script");
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_form_with_unready_widget_is_unavailable() {
    let transport = RecordingTransport::ok();
    let clock = ManualClock::new(start());
    let settings = SubmissionSettings {
        challenge_required: true,
        ..SubmissionSettings::default()
    };
    let widget = Arc::new(TokenRelayWidget::with_ready_signal(ReadySignal::pending()));
    let form = ContactForm::with_challenge(
        service_with(transport.clone(), &clock, settings),
        widget.clone(),
        &challenge_config(20),
    )
    .await;

    assert_eq!(form.challenge(), &ChallengeState::Unavailable);
    assert!(form.widget_handle().is_none());
    assert_eq!(widget.rendered_count(), 0);

    form.set_fields(valid_fields());
    assert_eq!(form.submit().await.unwrap_err(), SubmissionError::ChallengeRequired);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_dropping_form_releases_widget() {
    let clock = ManualClock::new(start());
    let widget = Arc::new(TokenRelayWidget::new());
    let form = ContactForm::with_challenge(
        service_with(RecordingTransport::ok(), &clock, SubmissionSettings::default()),
        widget.clone(),
        &challenge_config(100),
    )
    .await;

    assert_eq!(widget.rendered_count(), 1);
    drop(form);
    assert_eq!(widget.rendered_count(), 0);
}

#[test]
fn test_oversized_cooldown_is_clamped() {
    let mut config = crate::config::AppConfig::default();
    config.contact.cooldown_seconds = 10_000_000_000_000_000;

    let settings = SubmissionSettings::from_config(&config);
    assert_eq!(
        settings.cooldown,
        ChronoDuration::seconds(crate::config::MAX_COOLDOWN_SECONDS as i64)
    );
}

#[tokio::test]
async fn test_concurrent_submit_does_not_replace_fields_in_flight() {
    let transport = GatedTransport::new();
    let clock = ManualClock::new(start());
    let form = Arc::new(ContactForm::new(service_with(
        transport.clone(),
        &clock,
        SubmissionSettings::default(),
    )));

    let first = {
        let form = form.clone();
        tokio::spawn(async move { form.submit_with(valid_fields(), String::new()).await })
    };
    transport.entered.notified().await;
    assert_eq!(form.fields(), valid_fields());

    let other = ContactFields::new(
        "Outra Igreja",
        "outra@igreja.org",
        "(21) 3333-4444",
        "Mensagem diferente",
    );
    let second = form.submit_with(other, String::new()).await;
    assert_eq!(second.unwrap_err(), SubmissionError::AlreadySubmitting);
    assert_eq!(form.fields(), valid_fields());

    let invalid = ContactFields::new("", "", "", "");
    let third = form.submit_with(invalid, String::new()).await;
    assert_eq!(third.unwrap_err(), SubmissionError::MissingField);
    assert_eq!(form.fields(), valid_fields());

    transport.release.notify_one();
    first.await.unwrap().unwrap();

    let sent = transport.messages.lock().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].name, "Igreja Assembleia");
    assert!(form.fields().is_blank());
}
