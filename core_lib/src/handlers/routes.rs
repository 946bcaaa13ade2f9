//! Route table and the informational endpoints

use super::contact;
use crate::{
    middleware::rate_limit::rate_limit_middleware,
    models::ApiResponse,
    site::SiteProfile,
    AppState,
};
use axum::{
    extract::State,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

pub fn create_routes(state: &AppState) -> Router<AppState> {
    let mut submit = Router::new().route(
        "/api/contact/forms/:id/submit",
        post(contact::handle_submit),
    );

    if state.config.rate_limit.enable {
        submit = submit.route_layer(axum_middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ));
    }

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/api/site", get(handle_site))
        .route("/api/contact/forms", post(contact::handle_create_form))
        .route("/api/contact/forms/:id", get(contact::handle_get_form))
        .route(
            "/api/contact/forms/:id/challenge",
            post(contact::handle_challenge_token),
        )
        .merge(submit)
}

async fn handle_root(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(serde_json::json!({
        "app": state.app_name,
        "version": state.version,
        "endpoints": {
            "health": "/health",
            "site": "/api/site",
            "forms": "/api/contact/forms",
            "form": "/api/contact/forms/{id}",
            "challenge": "/api/contact/forms/{id}/challenge",
            "submit": "/api/contact/forms/{id}/submit"
        }
    })))
}

async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().timestamp(),
        "version": state.version,
        "open_forms": state.forms.len(),
        "delivery_configured": state.delivery_configured(),
        "challenge_enabled": state.config.challenge.is_enabled(),
    })))
}

async fn handle_site(State(state): State<AppState>) -> Json<ApiResponse<SiteProfile>> {
    Json(ApiResponse::success(state.site.clone()))
}
