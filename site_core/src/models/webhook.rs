//! CMS webhook payloads

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Change notification sent by the CMS. Senders add fields freely; only these are read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookNotification {
    #[serde(default, rename = "type")]
    pub webhook_type: Option<String>,
    #[serde(default, deserialize_with = "string_entries")]
    pub documents: Option<Vec<String>>,
    #[serde(default)]
    pub secret: Option<String>,
}

impl WebhookNotification {
    /// Document ids with empty entries dropped.
    pub fn document_ids(&self) -> Vec<String> {
        self.documents
            .iter()
            .flatten()
            .filter(|id| !id.is_empty())
            .cloned()
            .collect()
    }
}

/// Keeps the string entries of an array; anything else is ignored rather than failing the body.
fn string_entries<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(id) => Some(id),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevalidationOutcome {
    pub revalidated: bool,
    pub now: i64,
    pub paths: Vec<String>,
    pub webhook_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_string_documents_are_skipped() {
        let notification: WebhookNotification = serde_json::from_value(json!({
            "type": "api-update",
            "secret": "s",
            "documents": ["a", 7, null, "", { "id": "b" }, "c"]
        }))
        .unwrap();

        assert_eq!(notification.secret.as_deref(), Some("s"));
        assert_eq!(notification.document_ids(), vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_documents_that_are_not_a_list_are_ignored() {
        let notification: WebhookNotification =
            serde_json::from_value(json!({ "secret": "s", "documents": "a" })).unwrap();
        assert_eq!(notification.secret.as_deref(), Some("s"));
        assert!(notification.document_ids().is_empty());
    }
}
