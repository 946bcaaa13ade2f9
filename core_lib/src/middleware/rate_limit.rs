//! Per-IP rate limiting for the submit endpoint

use crate::config::RateLimitConfig;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use parking_lot::Mutex;
use serde_json::json;
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};

const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

#[derive(Clone)]
pub struct RateLimiter {
    requests: Arc<Mutex<HashMap<IpAddr, Vec<Instant>>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window_seconds: u64) -> Self {
        Self {
            requests: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_seconds),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, config.window_seconds)
    }

    /// Records the request and returns how many remain in the window.
    pub fn check(&self, ip: IpAddr) -> Result<usize, RateLimitError> {
        let now = Instant::now();
        let mut requests = self.requests.lock();

        let entries = requests.entry(ip).or_default();
        entries.retain(|&instant| now.duration_since(instant) < self.window);

        if entries.len() >= self.max_requests {
            let oldest = entries.first().copied().unwrap_or(now);
            let reset_in = self.window.saturating_sub(now.duration_since(oldest));

            return Err(RateLimitError {
                retry_after_seconds: (reset_in.as_millis().div_ceil(1000) as u64).max(1),
                limit: self.max_requests,
            });
        }

        entries.push(now);
        Ok(self.max_requests - entries.len())
    }

    /// Forgets addresses with no requests inside the window.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut requests = self.requests.lock();
        let before = requests.len();
        requests.retain(|_, entries| {
            entries.retain(|&instant| now.duration_since(instant) < self.window);
            !entries.is_empty()
        });
        before - requests.len()
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }
}

#[derive(Debug)]
pub struct RateLimitError {
    pub retry_after_seconds: u64,
    pub limit: usize,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": "Too many requests",
            "message": format!("Rate limit exceeded. Please retry after {} seconds", self.retry_after_seconds),
            "retry_after": self.retry_after_seconds,
            "status": StatusCode::TOO_MANY_REQUESTS.as_u16(),
        }));

        let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
        let headers = response.headers_mut();
        headers.insert(LIMIT_HEADER, HeaderValue::from(self.limit));
        headers.insert(REMAINING_HEADER, HeaderValue::from(0u32));
        headers.insert(RETRY_AFTER, HeaderValue::from(self.retry_after_seconds));

        response
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    let remaining = limiter.check(addr.ip()).map_err(|err| {
        tracing::info!(ip = %addr.ip(), retry_after = err.retry_after_seconds, "rate limit exceeded");
        err
    })?;

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(LIMIT_HEADER, HeaderValue::from(limiter.max_requests));
    headers.insert(REMAINING_HEADER, HeaderValue::from(remaining));

    Ok(response)
}
