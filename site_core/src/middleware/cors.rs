//! CORS layer built from configured origins

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer as TowerCorsLayer};

use crate::config::CorsConfig;

pub const REVALIDATE_TOKEN_HEADER: &str = "x-revalidate-token";

fn allowed_headers() -> [HeaderName; 4] {
    [
        HeaderName::from_static("content-type"),
        HeaderName::from_static("accept"),
        HeaderName::from_static("origin"),
        HeaderName::from_static(REVALIDATE_TOKEN_HEADER),
    ]
}

/// A `*` entry opens the API to every origin (without credentials).
pub fn cors_layer_from_config(config: &CorsConfig) -> TowerCorsLayer {
    let layer = TowerCorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(allowed_headers())
        .expose_headers([
            HeaderName::from_static("retry-after"),
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderName::from_static("x-ratelimit-remaining"),
        ])
        .max_age(Duration::from_secs(3600));

    if config.allowed_origins.iter().any(|o| o.trim() == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.trim().trim_end_matches('/').parse().ok())
        .collect();

    layer.allow_origin(origins)
}
