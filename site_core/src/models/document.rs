use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A published CMS document as returned by the content API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmsDocument {
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub last_publication_date: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl CmsDocument {
    pub fn new(id: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uid: None,
            doc_type: doc_type.into(),
            url: None,
            last_publication_date: None,
            data: serde_json::Value::Null,
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_last_publication_date(mut self, date: impl Into<String>) -> Self {
        self.last_publication_date = Some(date.into());
        self
    }

    /// Non-blank `url`, if the document has one.
    pub fn public_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.trim().is_empty())
    }

    /// Parses the publication date, accepting the API's `+0000` offsets as well as RFC 3339.
    pub fn last_published(&self) -> Option<DateTime<Utc>> {
        let raw = self.last_publication_date.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }

        DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z")
            .or_else(|_| DateTime::parse_from_rfc3339(raw))
            .map(|date| date.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|naive| naive.and_utc())
            })
    }
}
