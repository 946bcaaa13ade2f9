//! Contact form endpoints

use crate::{
    contact::{ContactFields, FormSnapshot, SubmissionError, SubmissionReceipt, SUCCESS_MESSAGE},
    error::{AppError, Result},
    models::{ApiResponse, ChallengeTokenRequest, SubmitFormRequest},
    AppState,
};
use axum::{
    extract::{Path, State},
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub outcome: &'static str,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub form: FormSnapshot,
}

pub async fn handle_create_form(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let form = state.forms.insert(state.open_form().await)?;
    info!(form_id = %form.id(), "contact form opened");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(form.snapshot()))))
}

pub async fn handle_get_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let form = state.forms.get(id)?;
    Ok(Json(ApiResponse::success(form.snapshot())))
}

pub async fn handle_challenge_token(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChallengeTokenRequest>,
) -> Result<impl IntoResponse> {
    let form = state.forms.get(id)?;
    let handle = form
        .widget_handle()
        .ok_or_else(|| AppError::BadRequest("Challenge is not active for this form".to_string()))?;

    state
        .challenge_widget
        .deliver_token(handle, &payload.token)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Json(ApiResponse::success(form.snapshot())))
}

pub async fn handle_submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitFormRequest>,
) -> Result<Response> {
    payload.validate()?;
    let form = state.forms.get(id)?;

    let fields = ContactFields {
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        message: payload.message,
    };

    let outcome = form.submit_with(fields, payload.bot_field).await;
    Ok(submission_response(outcome, form.snapshot()))
}

pub fn status_for(error: &SubmissionError) -> StatusCode {
    match error {
        SubmissionError::MissingField
        | SubmissionError::InvalidEmail
        | SubmissionError::InvalidPhone
        | SubmissionError::ChallengeRequired => StatusCode::UNPROCESSABLE_ENTITY,
        SubmissionError::BotDetected => StatusCode::BAD_REQUEST,
        SubmissionError::AlreadySubmitting => StatusCode::CONFLICT,
        SubmissionError::CooldownActive(_) => StatusCode::TOO_MANY_REQUESTS,
        SubmissionError::ConfigurationMissing => StatusCode::SERVICE_UNAVAILABLE,
        SubmissionError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        SubmissionError::DeliveryRejected(_) | SubmissionError::NetworkError(_) => StatusCode::BAD_GATEWAY,
    }
}

fn submission_response(
    outcome: std::result::Result<SubmissionReceipt, SubmissionError>,
    form: FormSnapshot,
) -> Response {
    match outcome {
        Ok(_) => (
            StatusCode::OK,
            Json(SubmitResponse {
                success: true,
                outcome: "sent",
                message: Some(SUCCESS_MESSAGE.to_string()),
                retry_after_seconds: None,
                detail: None,
                form,
            }),
        )
            .into_response(),
        Err(error) => {
            let retry_after_seconds = match error {
                SubmissionError::CooldownActive(seconds) => Some(seconds),
                _ => None,
            };

            let mut response = (
                status_for(&error),
                Json(SubmitResponse {
                    success: false,
                    outcome: error.kind(),
                    message: error.user_message(),
                    retry_after_seconds,
                    detail: error.diagnostic().map(str::to_string),
                    form,
                }),
            )
                .into_response();

            if let Some(seconds) = retry_after_seconds {
                response.headers_mut().insert(RETRY_AFTER, HeaderValue::from(seconds));
            }
            response
        }
    }
}
