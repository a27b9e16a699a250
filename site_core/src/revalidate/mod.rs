//! Cache revalidation webhook

pub mod handler;

pub use handler::{RevalidateError, RevalidationWebhookHandler, WebhookRequest};
