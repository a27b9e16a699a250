//! CMS revalidation webhook endpoint

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{
    extractors::LenientJson,
    middleware::cors::REVALIDATE_TOKEN_HEADER,
    models::{RevalidationOutcome, WebhookNotification},
    revalidate::{RevalidateError, WebhookRequest},
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct RevalidateQuery {
    pub secret: Option<String>,
}

/// Serves both GET and POST; bodiless requests go through the same checks.
pub async fn handle_revalidate(
    State(state): State<AppState>,
    query: Option<Query<RevalidateQuery>>,
    headers: HeaderMap,
    LenientJson(notification): LenientJson<WebhookNotification>,
) -> Result<Json<RevalidationOutcome>, RevalidateError> {
    let header_token = headers
        .get(REVALIDATE_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let request = WebhookRequest {
        header_token,
        query_secret: query.and_then(|Query(q)| q.secret),
        notification,
    };

    let outcome = state.revalidation.handle(request).await?;
    Ok(Json(outcome))
}
