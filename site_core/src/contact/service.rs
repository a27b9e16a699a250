//! Server-side handling of contact form submissions

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::challenge::{ChallengeError, ChallengeVerifier};
use super::compose;
use super::mailer::{MailError, Mailer, OutgoingEmail};
use crate::models::{InquiryPayload, SubmissionResult};

pub const DEFAULT_MIN_SUBMIT_MS: i64 = 2000;

pub const MSG_GENERIC_FAILURE: &str = "No se pudo enviar el mensaje.";
pub const MSG_WAIT: &str = "Por favor espere un momento antes de enviar.";
pub const MSG_CHALLENGE_REQUIRED: &str = "Por favor complete la verificación de seguridad.";
pub const MSG_CHALLENGE_FAILED: &str =
    "No se pudo verificar la seguridad. Por favor intente de nuevo.";
pub const MSG_NAME_REQUIRED: &str = "Por favor ingrese un nombre valido.";
pub const MSG_EMAIL_REQUIRED: &str = "Por favor ingrese una direccion de correo valida.";
pub const MSG_MESSAGE_REQUIRED: &str = "Por favor ingrese un mensaje.";
pub const MSG_DISPATCH_FAILED: &str =
    "No se pudo enviar el mensaje. Por favor intente de nuevo más tarde.";

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("request body is not a valid inquiry: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    #[error("honeypot field was filled")]
    Honeypot,

    #[error("submitted {elapsed_ms} ms after the form loaded")]
    TooFast { elapsed_ms: i64 },

    #[error("challenge token missing")]
    ChallengeMissing,

    #[error("challenge rejected: {0:?}")]
    ChallengeRejected(Vec<String>),

    #[error(transparent)]
    ChallengeUnavailable(#[from] ChallengeError),

    #[error("name is required")]
    MissingName,

    #[error("email is required")]
    MissingEmail,

    #[error("message is required")]
    MissingMessage,

    #[error(transparent)]
    Dispatch(#[from] MailError),
}

impl ContactError {
    /// Message shown to the visitor. Anti-abuse rejections stay vague on purpose.
    pub fn user_message(&self) -> &'static str {
        match self {
            ContactError::InvalidPayload(_) | ContactError::Honeypot => MSG_GENERIC_FAILURE,
            ContactError::TooFast { .. } => MSG_WAIT,
            ContactError::ChallengeMissing => MSG_CHALLENGE_REQUIRED,
            ContactError::ChallengeRejected(_) | ContactError::ChallengeUnavailable(_) => {
                MSG_CHALLENGE_FAILED
            }
            ContactError::MissingName => MSG_NAME_REQUIRED,
            ContactError::MissingEmail => MSG_EMAIL_REQUIRED,
            ContactError::MissingMessage => MSG_MESSAGE_REQUIRED,
            ContactError::Dispatch(_) => MSG_DISPATCH_FAILED,
        }
    }

    fn log(&self) {
        match self {
            ContactError::Honeypot
            | ContactError::TooFast { .. }
            | ContactError::ChallengeMissing
            | ContactError::ChallengeRejected(_) => info!("Contact submission rejected: {}", self),
            ContactError::ChallengeUnavailable(e) => warn!("Challenge verification failed: {}", e),
            ContactError::Dispatch(e) => error!("Failed to dispatch contact email: {}", e),
            _ => debug!("Contact submission invalid: {}", self),
        }
    }
}

/// Validates inquiries, enforces the anti-abuse checks and relays them by email.
///
/// Collaborators are injected once at start-up and shared for the life of the process.
pub struct ContactSubmissionService {
    mailer: Arc<dyn Mailer>,
    verifier: Option<Arc<dyn ChallengeVerifier>>,
    mailbox: String,
    min_submit_ms: i64,
}

impl ContactSubmissionService {
    pub fn new(mailer: Arc<dyn Mailer>, mailbox: impl Into<String>) -> Self {
        Self {
            mailer,
            verifier: None,
            mailbox: mailbox.into(),
            min_submit_ms: DEFAULT_MIN_SUBMIT_MS,
        }
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn ChallengeVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn with_min_submit_ms(mut self, min_submit_ms: i64) -> Self {
        self.min_submit_ms = min_submit_ms;
        self
    }

    pub fn challenge_enabled(&self) -> bool {
        self.verifier.is_some()
    }

    pub async fn handle(&self, raw_body: &[u8], client_ip: Option<&str>) -> SubmissionResult {
        self.handle_at(raw_body, client_ip, Utc::now().timestamp_millis())
            .await
    }

    /// Same as [`handle`](Self::handle) with an explicit current time in epoch milliseconds.
    pub async fn handle_at(
        &self,
        raw_body: &[u8],
        client_ip: Option<&str>,
        now_millis: i64,
    ) -> SubmissionResult {
        match self.process(raw_body, client_ip, now_millis).await {
            Ok(()) => SubmissionResult::done(),
            Err(err) => {
                err.log();
                SubmissionResult::fail(err.user_message())
            }
        }
    }

    async fn process(
        &self,
        raw_body: &[u8],
        client_ip: Option<&str>,
        now_millis: i64,
    ) -> Result<(), ContactError> {
        let inquiry: InquiryPayload =
            serde_json::from_slice(raw_body).map_err(ContactError::InvalidPayload)?;

        if inquiry.honeypot.as_deref().is_some_and(|hp| !hp.is_empty()) {
            return Err(ContactError::Honeypot);
        }

        if let Some(loaded_at) = inquiry.form_loaded_at_millis {
            let elapsed_ms = now_millis.saturating_sub(loaded_at);
            if elapsed_ms < self.min_submit_ms {
                return Err(ContactError::TooFast { elapsed_ms });
            }
        }

        self.verify_challenge(&inquiry, client_ip).await?;

        if inquiry.name.trim().is_empty() {
            return Err(ContactError::MissingName);
        }
        if inquiry.email.trim().is_empty() {
            return Err(ContactError::MissingEmail);
        }
        if inquiry.message.trim().is_empty() {
            return Err(ContactError::MissingMessage);
        }

        let email = OutgoingEmail {
            to: self.mailbox.clone(),
            from: self.mailbox.clone(),
            reply_to: inquiry.email.trim().to_string(),
            subject: compose::subject(&inquiry),
            text: compose::text_body(&inquiry),
            html: compose::html_body(&inquiry),
        };

        self.mailer.send(email).await?;
        info!(case_type = ?inquiry.case_type, "Contact inquiry relayed");
        Ok(())
    }

    async fn verify_challenge(
        &self,
        inquiry: &InquiryPayload,
        client_ip: Option<&str>,
    ) -> Result<(), ContactError> {
        let Some(verifier) = &self.verifier else {
            warn!("Challenge secret not configured, skipping verification");
            return Ok(());
        };

        let token = inquiry
            .challenge_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ContactError::ChallengeMissing)?;

        let verdict = verifier.verify(token, client_ip).await?;
        if !verdict.success {
            return Err(ContactError::ChallengeRejected(verdict.error_codes));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::challenge::ChallengeVerdict;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000_000;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<OutgoingEmail>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
            if self.fail {
                return Err(MailError::MissingCredentials);
            }
            self.sent.lock().push(email);
            Ok(())
        }
    }

    struct StubVerifier {
        outcome: Option<bool>,
        seen: Mutex<Vec<(String, Option<String>)>>,
    }

    impl StubVerifier {
        fn new(outcome: Option<bool>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChallengeVerifier for StubVerifier {
        async fn verify(
            &self,
            token: &str,
            remote_ip: Option<&str>,
        ) -> Result<ChallengeVerdict, ChallengeError> {
            self.seen
                .lock()
                .push((token.to_string(), remote_ip.map(str::to_string)));
            match self.outcome {
                Some(success) => Ok(ChallengeVerdict {
                    success,
                    error_codes: if success { vec![] } else { vec!["timeout-or-duplicate".into()] },
                }),
                None => Err(ChallengeError::Status(503)),
            }
        }
    }

    fn service(mailer: Arc<RecordingMailer>) -> ContactSubmissionService {
        ContactSubmissionService::new(mailer, "estudio@example.com")
    }

    fn body(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    fn valid() -> serde_json::Value {
        json!({ "name": "Ana", "email": "ana@example.com", "message": "Hola" })
    }

    #[tokio::test]
    async fn test_valid_inquiry_is_sent() {
        let mailer = Arc::new(RecordingMailer::default());
        let result = service(mailer.clone()).handle_at(&body(valid()), None, NOW).await;

        assert_eq!(result, SubmissionResult::done());
        let sent = mailer.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].reply_to, "ana@example.com");
        assert_eq!(sent[0].to, "estudio@example.com");
        assert_eq!(sent[0].from, "estudio@example.com");
        assert!(sent[0].subject.contains("Ana"));
    }

    #[tokio::test]
    async fn test_honeypot_dominates_every_other_check() {
        let mailer = Arc::new(RecordingMailer::default());
        let verifier = StubVerifier::new(Some(true));
        let service = service(mailer.clone()).with_verifier(verifier.clone());

        let payload = json!({ "name": "", "email": "", "message": "", "hp": "x", "startedAt": NOW });
        let result = service.handle_at(&body(payload), None, NOW).await;

        assert_eq!(result, SubmissionResult::fail(MSG_GENERIC_FAILURE));
        assert!(mailer.sent.lock().is_empty());
        assert!(verifier.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_empty_honeypot_is_ignored() {
        let mailer = Arc::new(RecordingMailer::default());
        let mut payload = valid();
        payload["hp"] = json!("");

        let result = service(mailer).handle_at(&body(payload), None, NOW).await;
        assert!(result.is_done());
    }

    #[tokio::test]
    async fn test_timing_check() {
        let mailer = Arc::new(RecordingMailer::default());
        let service = service(mailer.clone());

        let mut fast = valid();
        fast["startedAt"] = json!(NOW - 500);
        let result = service.handle_at(&body(fast), None, NOW).await;
        assert_eq!(result, SubmissionResult::fail(MSG_WAIT));

        let mut patient = valid();
        patient["startedAt"] = json!(NOW - 3000);
        assert!(service.handle_at(&body(patient), None, NOW).await.is_done());

        let mut patient_but_nameless = valid();
        patient_but_nameless["startedAt"] = json!(NOW - 3000);
        patient_but_nameless["name"] = json!(" ");
        let result = service.handle_at(&body(patient_but_nameless), None, NOW).await;
        assert_eq!(result, SubmissionResult::fail(MSG_NAME_REQUIRED));

        assert_eq!(mailer.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_load_time_skips_timing_check() {
        let mailer = Arc::new(RecordingMailer::default());
        let result = service(mailer).handle(&body(valid()), None).await;
        assert!(result.is_done());
    }

    #[tokio::test]
    async fn test_field_validation_order() {
        let mailer = Arc::new(RecordingMailer::default());
        let service = service(mailer.clone());

        let cases = [
            (json!({ "name": "  ", "email": "", "message": "" }), MSG_NAME_REQUIRED),
            (json!({ "email": "a@b.co", "message": "Hola" }), MSG_NAME_REQUIRED),
            (json!({ "name": "Ana", "email": "\t", "message": "" }), MSG_EMAIL_REQUIRED),
            (json!({ "name": "Ana", "email": "ana@example.com", "message": " \n" }), MSG_MESSAGE_REQUIRED),
        ];

        for (payload, expected) in cases {
            let result = service.handle_at(&body(payload), None, NOW).await;
            assert_eq!(result, SubmissionResult::fail(expected));
        }
        assert!(mailer.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_email_format_is_not_checked_on_server() {
        let mailer = Arc::new(RecordingMailer::default());
        let payload = json!({ "name": "Ana", "email": "ana-at-example", "message": "Hola" });

        let result = service(mailer.clone()).handle_at(&body(payload), None, NOW).await;
        assert!(result.is_done());
        assert_eq!(mailer.sent.lock()[0].reply_to, "ana-at-example");
    }

    #[tokio::test]
    async fn test_loosely_typed_fields_reach_validation() {
        let mailer = Arc::new(RecordingMailer::default());
        let service = service(mailer.clone());

        let blank_case = json!({ "name": "Ana", "email": "ana@example.com", "message": "Hola", "tipo_tramite": "" });
        assert!(service.handle_at(&body(blank_case), None, NOW).await.is_done());

        let fractional = json!({ "name": "Ana", "email": "ana@example.com", "message": "Hola", "startedAt": 1_699_999_990_000.5 });
        assert!(service.handle_at(&body(fractional), None, NOW).await.is_done());

        let null_name = json!({ "name": null, "email": "ana@example.com", "message": "Hola" });
        assert_eq!(
            service.handle_at(&body(null_name), None, NOW).await,
            SubmissionResult::fail(MSG_NAME_REQUIRED)
        );

        let sent = mailer.sent.lock();
        assert_eq!(sent.len(), 2);
        assert!(!sent[0].text.contains("Tipo de trámite"));
    }

    #[tokio::test]
    async fn test_malformed_body_fails_generically() {
        let mailer = Arc::new(RecordingMailer::default());
        let result = service(mailer).handle_at(b"{not json", None, NOW).await;
        assert_eq!(result, SubmissionResult::fail(MSG_GENERIC_FAILURE));
    }

    #[tokio::test]
    async fn test_challenge_token_required_when_enabled() {
        let mailer = Arc::new(RecordingMailer::default());
        let service = service(mailer.clone()).with_verifier(StubVerifier::new(Some(true)));

        let result = service.handle_at(&body(valid()), None, NOW).await;
        assert_eq!(result, SubmissionResult::fail(MSG_CHALLENGE_REQUIRED));
        assert!(mailer.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_challenge_token_verified_with_client_ip() {
        let mailer = Arc::new(RecordingMailer::default());
        let verifier = StubVerifier::new(Some(true));
        let service = service(mailer.clone()).with_verifier(verifier.clone());

        let mut payload = valid();
        payload["turnstileToken"] = json!("tok-123");
        let result = service.handle_at(&body(payload), Some("203.0.113.7"), NOW).await;

        assert!(result.is_done());
        assert_eq!(
            verifier.seen.lock()[0],
            ("tok-123".to_string(), Some("203.0.113.7".to_string()))
        );
    }

    #[tokio::test]
    async fn test_challenge_rejection_and_outage() {
        for outcome in [Some(false), None] {
            let mailer = Arc::new(RecordingMailer::default());
            let service = service(mailer.clone()).with_verifier(StubVerifier::new(outcome));

            let mut payload = valid();
            payload["turnstileToken"] = json!("tok");
            let result = service.handle_at(&body(payload), None, NOW).await;

            assert_eq!(result, SubmissionResult::fail(MSG_CHALLENGE_FAILED));
            assert!(mailer.sent.lock().is_empty());
        }
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_generic() {
        let mailer = Arc::new(RecordingMailer {
            fail: true,
            ..Default::default()
        });
        let result = service(mailer).handle_at(&body(valid()), None, NOW).await;

        assert_eq!(result, SubmissionResult::fail(MSG_DISPATCH_FAILED));
    }

    #[test]
    fn test_challenge_enabled() {
        let mailer = Arc::new(RecordingMailer::default());
        assert!(!service(mailer.clone()).challenge_enabled());
        assert!(service(mailer)
            .with_verifier(StubVerifier::new(Some(true)))
            .challenge_enabled());
    }
}
