//! CMS change notifications: authentication and cache invalidation

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::cache::{CacheInvalidator, PathScope, CMS_TAG};
use crate::cms::ContentService;
use crate::models::{RevalidationOutcome, WebhookNotification};
use crate::seo::{ROBOTS_PATH, SITEMAP_PATH};

#[derive(Debug, Error)]
pub enum RevalidateError {
    #[error("Server misconfigured: missing secret.")]
    Misconfigured,

    #[error("Unauthorized.")]
    Unauthorized,
}

impl IntoResponse for RevalidateError {
    fn into_response(self) -> Response {
        let status = match self {
            RevalidateError::Misconfigured => StatusCode::INTERNAL_SERVER_ERROR,
            RevalidateError::Unauthorized => StatusCode::UNAUTHORIZED,
        };

        let body = Json(json!({
            "revalidated": false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Everything the handler reads from an inbound webhook call.
#[derive(Debug, Clone, Default)]
pub struct WebhookRequest {
    pub header_token: Option<String>,
    pub query_secret: Option<String>,
    pub notification: Option<WebhookNotification>,
}

impl WebhookRequest {
    /// Header, then query string, then body. Empty values count as absent.
    pub fn provided_secret(&self) -> Option<&str> {
        let body_secret = self
            .notification
            .as_ref()
            .and_then(|n| n.secret.as_deref());

        [self.header_token.as_deref(), self.query_secret.as_deref(), body_secret]
            .into_iter()
            .flatten()
            .find(|secret| !secret.is_empty())
    }
}

pub struct RevalidationWebhookHandler {
    expected_secret: Option<String>,
    content: Arc<dyn ContentService>,
    cache: Arc<dyn CacheInvalidator>,
}

impl RevalidationWebhookHandler {
    pub fn new(
        expected_secret: Option<String>,
        content: Arc<dyn ContentService>,
        cache: Arc<dyn CacheInvalidator>,
    ) -> Self {
        Self {
            expected_secret: expected_secret.filter(|s| !s.is_empty()),
            content,
            cache,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.expected_secret.is_some()
    }

    pub async fn handle(
        &self,
        request: WebhookRequest,
    ) -> Result<RevalidationOutcome, RevalidateError> {
        let Some(expected) = self.expected_secret.as_deref() else {
            error!("Revalidation webhook called but no secret is configured");
            return Err(RevalidateError::Misconfigured);
        };

        if request.provided_secret() != Some(expected) {
            warn!("Revalidation webhook rejected: bad or missing secret");
            return Err(RevalidateError::Unauthorized);
        }

        let notification = request.notification.unwrap_or_default();

        self.cache.invalidate_tag(CMS_TAG);
        self.cache.invalidate_path("/", PathScope::Layout);

        let ids = notification.document_ids();
        let paths = if ids.is_empty() {
            Vec::new()
        } else {
            self.revalidate_documents(&ids).await
        };

        info!(
            webhook_type = ?notification.webhook_type,
            documents = ids.len(),
            paths = paths.len(),
            "Revalidated CMS content"
        );

        Ok(RevalidationOutcome {
            revalidated: true,
            now: Utc::now().timestamp_millis(),
            paths,
            webhook_type: notification.webhook_type,
        })
    }

    /// Invalidates each distinct document URL, in first-seen order, and returns them.
    async fn revalidate_documents(&self, ids: &[String]) -> Vec<String> {
        let docs = match self.content.lookup_by_ids(ids).await {
            Ok(docs) => docs,
            Err(e) => {
                warn!("Document lookup failed during revalidation: {}", e);
                Vec::new()
            }
        };

        let mut paths: Vec<String> = Vec::new();
        for url in docs.iter().filter_map(|doc| doc.public_url()) {
            if !paths.iter().any(|p| p == url) {
                paths.push(url.to_string());
            }
        }

        for path in &paths {
            self.cache.invalidate_path(path, PathScope::Page);
        }

        if !docs.is_empty() {
            self.cache.invalidate_path(SITEMAP_PATH, PathScope::Page);
            self.cache.invalidate_path(ROBOTS_PATH, PathScope::Page);
        }

        paths
    }
}
