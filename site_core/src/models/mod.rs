pub mod document;
pub mod inquiry;
pub mod webhook;

pub use document::CmsDocument;
pub use inquiry::{CaseType, InquiryPayload, SubmissionResult, SubmissionStatus};
pub use webhook::{RevalidationOutcome, WebhookNotification};
