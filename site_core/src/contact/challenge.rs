//! Human-verification challenge tokens (Cloudflare Turnstile)

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::ChallengeConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChallengeVerdict {
    pub success: bool,
    #[serde(rename = "error-codes", default)]
    pub error_codes: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("challenge verification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("challenge verification endpoint responded with status {0}")]
    Status(u16),
}

#[async_trait]
pub trait ChallengeVerifier: Send + Sync {
    async fn verify(
        &self,
        token: &str,
        remote_ip: Option<&str>,
    ) -> Result<ChallengeVerdict, ChallengeError>;
}

pub struct TurnstileVerifier {
    http: reqwest::Client,
    secret: String,
    verify_url: String,
}

impl TurnstileVerifier {
    /// Builds a verifier when a secret is configured; `None` means verification is disabled.
    pub fn from_config(config: &ChallengeConfig) -> Result<Option<Self>, ChallengeError> {
        let Some(secret) = config.secret_key.clone() else {
            return Ok(None);
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Some(Self {
            http,
            secret,
            verify_url: config.verify_url.clone(),
        }))
    }
}

#[async_trait]
impl ChallengeVerifier for TurnstileVerifier {
    async fn verify(
        &self,
        token: &str,
        remote_ip: Option<&str>,
    ) -> Result<ChallengeVerdict, ChallengeError> {
        let mut form = vec![("secret", self.secret.as_str()), ("response", token)];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip));
        }

        let response = self.http.post(&self.verify_url).form(&form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChallengeError::Status(status.as_u16()));
        }

        Ok(response.json::<ChallengeVerdict>().await?)
    }
}
