//! Contact form request and response payloads

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of procedure the visitor is asking about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaseType {
    #[default]
    #[serde(rename = "ciudadania", alias = "citizenship")]
    Citizenship,
    #[serde(rename = "visa")]
    Visa,
    #[serde(rename = "tramites_consulares", alias = "consularProcedures")]
    ConsularProcedures,
    #[serde(rename = "otro", alias = "other")]
    Other,
}

impl CaseType {
    /// Parses a wire value, accepting the form codes and the descriptive names.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.trim() {
            "ciudadania" | "citizenship" => Some(CaseType::Citizenship),
            "visa" => Some(CaseType::Visa),
            "tramites_consulares" | "consularProcedures" => Some(CaseType::ConsularProcedures),
            "otro" | "other" => Some(CaseType::Other),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CaseType::Citizenship => "Ciudadanía",
            CaseType::Visa => "Visa",
            CaseType::ConsularProcedures => "Trámites consulares",
            CaseType::Other => "Otro",
        }
    }
}

impl fmt::Display for CaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Body posted by the contact form.
///
/// Field names on the wire are the ones the deployed form has always sent;
/// the descriptive English names are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InquiryPayload {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    #[serde(
        rename = "tipo_tramite",
        alias = "caseType",
        default,
        deserialize_with = "known_case_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub case_type: Option<CaseType>,
    #[serde(
        rename = "pais_residencia",
        alias = "residenceCountry",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub residence_country: Option<String>,
    #[serde(
        rename = "consulado_ciudad",
        alias = "consulateCity",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub consulate_city: Option<String>,
    #[serde(
        rename = "whatsapp_telefono",
        alias = "whatsappPhone",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub whatsapp_phone: Option<String>,
    #[serde(
        rename = "turnstileToken",
        alias = "challengeToken",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub challenge_token: Option<String>,
    #[serde(rename = "hp", alias = "honeypot", default, skip_serializing_if = "Option::is_none")]
    pub honeypot: Option<String>,
    #[serde(
        rename = "startedAt",
        alias = "formLoadedAtMillis",
        default,
        deserialize_with = "whole_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub form_loaded_at_millis: Option<i64>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Empty, unknown or non-string case types are treated as absent.
fn known_case_type<'de, D>(deserializer: D) -> Result<Option<CaseType>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_str).and_then(CaseType::from_wire))
}

/// Browsers may send fractional timestamps; the fraction is dropped.
fn whole_millis<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.filter(|v| v.is_finite()).map(|v| v.trunc() as i64))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Done,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub status: SubmissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmissionResult {
    pub fn done() -> Self {
        Self {
            status: SubmissionStatus::Done,
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            status: SubmissionStatus::Fail,
            error: Some(error.into()),
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == SubmissionStatus::Done
    }
}

impl IntoResponse for SubmissionResult {
    fn into_response(self) -> Response {
        let status = match self.status {
            SubmissionStatus::Done => StatusCode::OK,
            SubmissionStatus::Fail => StatusCode::BAD_REQUEST,
        };

        (status, Json(self)).into_response()
    }
}
