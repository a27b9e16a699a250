//! Headless contact form controller used by site front-ends

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{CaseType, InquiryPayload, SubmissionResult};
use crate::text::trimmed;

pub const MSG_INCOMPLETE: &str = "Por favor completá nombre, email y mensaje.";
pub const MSG_SEND_FAILED: &str = "No se pudo enviar el mensaje.";
pub const MSG_SENT: &str = "¡Gracias! Recibimos tu mensaje. Te vamos a responder a la brevedad.";

pub const DEFAULT_SUCCESS_DISPLAY: Duration = Duration::from_secs(7);

lazy_static! {
    static ref EMAIL_PATTERN: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub fn looks_like_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value.trim())
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Raw reply from the contact endpoint; `body` is `None` when it was not a submission result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportReply {
    pub status: u16,
    pub body: Option<SubmissionResult>,
}

#[async_trait]
pub trait SubmitTransport: Send + Sync {
    async fn post(&self, payload: &InquiryPayload) -> Result<TransportReply, TransportError>;
}

pub struct HttpSubmitTransport {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpSubmitTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/api/contact", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SubmitTransport for HttpSubmitTransport {
    async fn post(&self, payload: &InquiryPayload) -> Result<TransportReply, TransportError> {
        let response = self.http.post(&self.endpoint).json(payload).send().await?;
        let status = response.status().as_u16();
        let body = response.json::<SubmissionResult>().await.ok();
        Ok(TransportReply { status, body })
    }
}

/// Handle on the embedded human-verification widget.
pub trait ChallengeWidget: Send + Sync {
    fn reset(&self);
}

/// Editable inputs of the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    pub name: String,
    pub email: String,
    pub message: String,
    pub case_type: CaseType,
    pub residence_country: String,
    pub consulate_city: String,
    pub whatsapp_phone: String,
    /// Hidden field; people never see it, bots tend to fill it.
    pub honeypot: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Sent,
    Invalid,
    Failed(String),
    /// Another submission was still in flight.
    Ignored,
}

struct FormState {
    fields: FormFields,
    challenge_token: Option<String>,
    loaded_at_millis: i64,
    error: Option<String>,
    success_until: Option<Instant>,
}

impl FormState {
    fn fresh() -> Self {
        Self {
            fields: FormFields::default(),
            challenge_token: None,
            loaded_at_millis: Utc::now().timestamp_millis(),
            error: None,
            success_until: None,
        }
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ContactForm {
    transport: Arc<dyn SubmitTransport>,
    widget: Option<Arc<dyn ChallengeWidget>>,
    success_display: Duration,
    state: Mutex<FormState>,
    in_flight: AtomicBool,
}

impl ContactForm {
    pub fn new(transport: Arc<dyn SubmitTransport>) -> Self {
        Self {
            transport,
            widget: None,
            success_display: DEFAULT_SUCCESS_DISPLAY,
            state: Mutex::new(FormState::fresh()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Attaches a challenge widget; a token is then required before submitting.
    pub fn with_challenge_widget(mut self, widget: Arc<dyn ChallengeWidget>) -> Self {
        self.widget = Some(widget);
        self
    }

    pub fn with_success_display(mut self, duration: Duration) -> Self {
        self.success_display = duration;
        self
    }

    pub fn edit(&self, f: impl FnOnce(&mut FormFields)) {
        f(&mut self.state.lock().fields);
    }

    pub fn fields(&self) -> FormFields {
        self.state.lock().fields.clone()
    }

    pub fn on_challenge_success(&self, token: impl Into<String>) {
        self.state.lock().challenge_token = Some(token.into());
    }

    pub fn on_challenge_expired(&self) {
        self.state.lock().challenge_token = None;
    }

    pub fn on_challenge_error(&self) {
        self.state.lock().challenge_token = None;
    }

    pub fn has_challenge_token(&self) -> bool {
        self.state.lock().challenge_token.is_some()
    }

    pub fn loaded_at_millis(&self) -> i64 {
        self.state.lock().loaded_at_millis
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn success_message(&self) -> Option<&'static str> {
        let until = self.state.lock().success_until?;
        (Instant::now() < until).then_some(MSG_SENT)
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn can_submit(&self) -> bool {
        let state = self.state.lock();
        let fields = &state.fields;

        !fields.name.trim().is_empty()
            && looks_like_email(&fields.email)
            && !fields.message.trim().is_empty()
            && (self.widget.is_none() || state.challenge_token.is_some())
    }

    fn payload(state: &FormState) -> InquiryPayload {
        let fields = &state.fields;
        let optional = |value: &str| trimmed(Some(value)).map(str::to_string);

        InquiryPayload {
            name: fields.name.trim().to_string(),
            email: fields.email.trim().to_string(),
            message: fields.message.trim().to_string(),
            case_type: Some(fields.case_type),
            residence_country: optional(&fields.residence_country),
            consulate_city: optional(&fields.consulate_city),
            whatsapp_phone: optional(&fields.whatsapp_phone),
            challenge_token: state.challenge_token.clone(),
            honeypot: Some(fields.honeypot.clone()).filter(|hp| !hp.is_empty()),
            form_loaded_at_millis: Some(state.loaded_at_millis),
        }
    }

    pub async fn submit(&self) -> SubmitOutcome {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("Submission already in flight, ignoring");
            return SubmitOutcome::Ignored;
        };

        {
            let mut state = self.state.lock();
            state.error = None;
            state.success_until = None;
        }

        if !self.can_submit() {
            self.state.lock().error = Some(MSG_INCOMPLETE.to_string());
            return SubmitOutcome::Invalid;
        }
        let payload = Self::payload(&self.state.lock());

        let failure = match self.transport.post(&payload).await {
            Ok(reply) => Self::failure_message(&reply),
            Err(e) => {
                warn!("Contact submission transport error: {}", e);
                Some(MSG_SEND_FAILED.to_string())
            }
        };

        if let Some(message) = failure {
            self.state.lock().error = Some(message.clone());
            return SubmitOutcome::Failed(message);
        }

        {
            let mut state = self.state.lock();
            *state = FormState::fresh();
            state.success_until = Some(Instant::now() + self.success_display);
        }
        if let Some(widget) = &self.widget {
            widget.reset();
        }

        SubmitOutcome::Sent
    }

    fn failure_message(reply: &TransportReply) -> Option<String> {
        let server_error = || {
            reply
                .body
                .as_ref()
                .and_then(|body| body.error.clone())
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| MSG_SEND_FAILED.to_string())
        };

        let ok = (200..300).contains(&reply.status);
        match &reply.body {
            _ if !ok => Some(server_error()),
            Some(body) if !body.is_done() => Some(server_error()),
            _ => None,
        }
    }
}
