//! Route table

use axum::{
    http::Uri,
    routing::{get, post},
    Router,
};

use super::{contact, health, revalidate, seo};
use crate::{
    error::AppError,
    seo::{ROBOTS_PATH, SITEMAP_PATH},
    AppState,
};

/// Contact endpoints, kept apart so the rate limiter can wrap only them.
/// `/api/contacto` is the path older deployed forms still post to.
pub fn contact_routes() -> Router<AppState> {
    Router::new()
        .route("/api/contact", post(contact::handle_contact))
        .route("/api/contacto", post(contact::handle_contact))
}

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::handle_health))
        .route(
            "/api/revalidate",
            get(revalidate::handle_revalidate).post(revalidate::handle_revalidate),
        )
        .route(SITEMAP_PATH, get(seo::handle_sitemap))
        .route(ROBOTS_PATH, get(seo::handle_robots))
        .fallback(handle_not_found)
}

async fn handle_not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
