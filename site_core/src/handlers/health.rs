//! Health check handler

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "app": state.app_name,
        "version": state.version,
        "timestamp": chrono::Utc::now().timestamp(),
        "challenge_verification": state.contact.challenge_enabled(),
        "revalidation_configured": state.revalidation.is_configured(),
        "cache_entries": state.cache.len(),
    }))
}
