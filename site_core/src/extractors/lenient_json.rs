//! JSON body extractor that never rejects the request

use std::convert::Infallible;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Parsed body, or `None` when the body is missing, unreadable or not the expected JSON.
#[derive(Debug)]
pub struct LenientJson<T>(pub Option<T>);

#[async_trait]
impl<T, S> FromRequest<S> for LenientJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = match Bytes::from_request(req, state).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Could not read request body: {}", e);
                return Ok(LenientJson(None));
            }
        };

        if bytes.is_empty() {
            return Ok(LenientJson(None));
        }

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(LenientJson(Some(value))),
            Err(e) => {
                debug!("Ignoring malformed JSON body: {}", e);
                Ok(LenientJson(None))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        secret: Option<String>,
    }

    async fn extract(body: &'static str) -> Option<Sample> {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(body))
            .unwrap();
        let LenientJson(value) = LenientJson::<Sample>::from_request(request, &()).await.unwrap();
        value
    }

    #[tokio::test]
    async fn test_valid_body() {
        assert_eq!(
            extract(r#"{"secret":"s"}"#).await,
            Some(Sample {
                secret: Some("s".to_string())
            })
        );
    }

    #[tokio::test]
    async fn test_empty_and_malformed_bodies() {
        assert_eq!(extract("").await, None);
        assert_eq!(extract("{oops").await, None);
        assert_eq!(extract("[1,2]").await, None);
    }
}
