//! Application error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::cms::CmsError;
use crate::contact::{ChallengeError, MailError};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Mail transport error: {0}")]
    Mail(#[from] MailError),

    #[error("Challenge verifier error: {0}")]
    Challenge(#[from] ChallengeError),

    #[error("CMS error: {0}")]
    Cms(#[from] CmsError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Cms(CmsError::NotFound(what)) => (StatusCode::NOT_FOUND, what),
            AppError::Cms(err) => {
                tracing::error!("CMS error: {}", err);
                (StatusCode::BAD_GATEWAY, "Upstream service unavailable".to_string())
            }
            AppError::Mail(err) => {
                tracing::error!("Mail transport error: {}", err);
                (StatusCode::BAD_GATEWAY, "Upstream service unavailable".to_string())
            }
            AppError::Challenge(err) => {
                tracing::error!("Challenge verifier error: {}", err);
                (StatusCode::BAD_GATEWAY, "Upstream service unavailable".to_string())
            }
            AppError::IoError(err) => {
                tracing::error!("IO error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
