//! Contact form pipeline: client controller, server-side checks and mail relay

pub mod challenge;
pub mod compose;
pub mod form;
pub mod mailer;
pub mod service;

pub use challenge::{ChallengeError, ChallengeVerdict, ChallengeVerifier, TurnstileVerifier};
pub use form::{
    ChallengeWidget, ContactForm, FormFields, HttpSubmitTransport, SubmitOutcome, SubmitTransport,
    TransportError, TransportReply,
};
pub use mailer::{MailError, Mailer, OutgoingEmail, SmtpMailer};
pub use service::{ContactError, ContactSubmissionService};
