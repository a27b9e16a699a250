//! Notification email bodies for a contact inquiry

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::InquiryPayload;
use crate::text::{escape_markup, trimmed};

lazy_static! {
    static ref LINE_BREAK: Regex = Regex::new(r"\r\n|\r|\n").unwrap();
}

/// Labeled optional fields, in the order they appear in the email.
fn detail_lines(inquiry: &InquiryPayload) -> Vec<(&'static str, String)> {
    let case_type = inquiry.case_type.map(|c| c.label().to_string());

    [
        ("Nombre", trimmed(Some(inquiry.name.as_str())).map(str::to_string)),
        ("Email", trimmed(Some(inquiry.email.as_str())).map(str::to_string)),
        (
            "WhatsApp / Teléfono",
            trimmed(inquiry.whatsapp_phone.as_deref()).map(str::to_string),
        ),
        ("Tipo de trámite", case_type),
        (
            "País de residencia",
            trimmed(inquiry.residence_country.as_deref()).map(str::to_string),
        ),
        (
            "Consulado / ciudad",
            trimmed(inquiry.consulate_city.as_deref()).map(str::to_string),
        ),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.map(|v| (label, v)))
    .collect()
}

pub fn subject(inquiry: &InquiryPayload) -> String {
    format!("Un mensaje de {}", inquiry.name.trim())
}

pub fn text_body(inquiry: &InquiryPayload) -> String {
    let mut text = format!("{}\n\n---\n", inquiry.message.trim());
    for (label, value) in detail_lines(inquiry) {
        text.push_str(&format!("{}: {}\n", label, value));
    }
    text
}

pub fn html_body(inquiry: &InquiryPayload) -> String {
    let escaped = escape_markup(inquiry.message.trim());
    let message = LINE_BREAK.replace_all(&escaped, "<br>");

    let mut html = format!("<p>{}</p>\n<hr />\n", message);
    for (label, value) in detail_lines(inquiry) {
        html.push_str(&format!(
            "<p><strong>{}:</strong> {}</p>\n",
            label,
            escape_markup(&value)
        ));
    }
    html
}
