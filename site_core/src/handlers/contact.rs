//! Contact form endpoint

use axum::{body::Bytes, extract::State};

use crate::{extractors::ClientIp, models::SubmissionResult, AppState};

/// The raw body goes to the service so malformed JSON gets the same `fail` reply as any other rejection.
pub async fn handle_contact(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    body: Bytes,
) -> SubmissionResult {
    state.contact.handle(&body, client_ip.as_deref()).await
}
