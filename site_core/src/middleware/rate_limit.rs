//! Per-client rate limiting for the contact endpoints

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use parking_lot::Mutex;
use serde_json::json;
use tracing::info;

use crate::config::RateLimitConfig;
use crate::extractors::client_ip_from_headers;

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

    /// Records a hit for `ip`; returns the remaining allowance or the rejection.
    pub fn check(&self, ip: IpAddr) -> Result<usize, RateLimitError> {
        let now = Instant::now();
        let mut requests = self.requests.lock();

        // Forget clients whose whole window has passed.
        requests.retain(|_, hits| hits.last().is_some_and(|t| now.duration_since(*t) < self.window));

        let hits = requests.entry(ip).or_default();
        hits.retain(|t| now.duration_since(*t) < self.window);

        if hits.len() >= self.max_requests {
            let oldest = hits.first().copied().unwrap_or(now);
            let reset_in = self.window.saturating_sub(now.duration_since(oldest));

            return Err(RateLimitError {
                retry_after_seconds: reset_in.as_secs().max(1),
                limit: self.max_requests,
            });
        }

        hits.push(now);
        Ok(self.max_requests - hits.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.requests.lock().len()
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
            "status": "fail",
            "error": "Demasiadas solicitudes. Por favor intente de nuevo en unos minutos.",
            "retry_after": self.retry_after_seconds,
        }));

        let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
        let headers = response.headers_mut();
        headers.insert("X-RateLimit-Limit", HeaderValue::from(self.limit));
        headers.insert("X-RateLimit-Remaining", HeaderValue::from(0u32));
        headers.insert("Retry-After", HeaderValue::from(self.retry_after_seconds));

        response
    }
}

fn request_ip(request: &Request) -> Option<IpAddr> {
    client_ip_from_headers(request.headers())
        .and_then(|ip| ip.parse().ok())
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
}

/// Requests with no identifiable client address pass through unlimited.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    let Some(ip) = request_ip(&request) else {
        return Ok(next.run(request).await);
    };

    let remaining = limiter.check(ip).inspect_err(|e| {
        info!(%ip, retry_after = e.retry_after_seconds, "Rate limit exceeded");
    })?;

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(limiter.max_requests));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));

    Ok(response)
}
