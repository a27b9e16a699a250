//! Content API client

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::debug;

use super::routes::RouteResolver;
use crate::config::CmsConfig;
use crate::models::CmsDocument;

/// Upper bound on pages walked by a single query.
const MAX_PAGES: u32 = 50;

#[derive(Debug, Error)]
pub enum CmsError {
    #[error("CMS request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CMS responded with status {0}")]
    Status(u16),

    #[error("CMS repository has no master ref")]
    MissingMasterRef,

    #[error("Document not found: {0}")]
    NotFound(String),
}

/// Read access to published CMS content.
#[async_trait]
pub trait ContentService: Send + Sync {
    async fn lookup_by_ids(&self, ids: &[String]) -> Result<Vec<CmsDocument>, CmsError>;
    async fn get_all_by_type(&self, doc_type: &str) -> Result<Vec<CmsDocument>, CmsError>;
    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<CmsDocument, CmsError>;
    async fn get_single(&self, doc_type: &str) -> Result<CmsDocument, CmsError>;
}

#[derive(Debug, Deserialize)]
struct ApiInfo {
    #[serde(default)]
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<CmsDocument>,
    #[serde(default = "default_total_pages")]
    total_pages: u32,
}

fn default_total_pages() -> u32 {
    1
}

/// Client for a Prismic repository's REST API.
#[derive(Debug, Clone)]
pub struct PrismicClient {
    http: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
    page_size: u32,
    routes: RouteResolver,
}

impl PrismicClient {
    pub fn new(config: &CmsConfig) -> Result<Self, CmsError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        let endpoint = config
            .api_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}.cdn.prismic.io/api/v2", config.repository));

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            page_size: config.page_size,
            routes: RouteResolver::new(config.enable_articles),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn routes(&self) -> &RouteResolver {
        &self.routes
    }

    async fn fetch_json<T>(&self, url: &str, query: &[(&str, String)]) -> Result<T, CmsError>
    where
        T: DeserializeOwned,
    {
        let mut request = self.http.get(url).query(query);
        if let Some(token) = &self.access_token {
            request = request.query(&[("access_token", token)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CmsError::Status(status.as_u16()));
        }

        Ok(response.json::<T>().await?)
    }

    async fn master_ref(&self) -> Result<String, CmsError> {
        let info: ApiInfo = self.fetch_json(&self.endpoint, &[]).await?;
        info.refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or(CmsError::MissingMasterRef)
    }

    async fn search(&self, predicates: &[String]) -> Result<Vec<CmsDocument>, CmsError> {
        let master_ref = self.master_ref().await?;
        let url = format!("{}/documents/search", self.endpoint);
        let routes = self.routes.to_query_param();

        let mut documents = Vec::new();
        let mut page = 1;
        loop {
            let mut query = vec![
                ("ref", master_ref.clone()),
                ("pageSize", self.page_size.to_string()),
                ("page", page.to_string()),
                ("routes", routes.clone()),
            ];
            query.extend(predicates.iter().map(|p| ("q", p.clone())));

            let result: SearchPage = self.fetch_json(&url, &query).await?;
            debug!(page, total_pages = result.total_pages, count = result.results.len(), "CMS search page");
            documents.extend(result.results);

            if page >= result.total_pages || page >= MAX_PAGES {
                break;
            }
            page += 1;
        }

        for doc in &mut documents {
            if doc.public_url().is_none() {
                doc.url = self.routes.resolve(doc);
            }
        }

        Ok(documents)
    }
}

fn quoted(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

#[async_trait]
impl ContentService for PrismicClient {
    async fn lookup_by_ids(&self, ids: &[String]) -> Result<Vec<CmsDocument>, CmsError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let list = ids.iter().map(|id| quoted(id)).collect::<Vec<_>>().join(",");
        self.search(&[format!("[[in(document.id,[{}])]]", list)]).await
    }

    async fn get_all_by_type(&self, doc_type: &str) -> Result<Vec<CmsDocument>, CmsError> {
        self.search(&[format!("[[at(document.type,{})]]", quoted(doc_type))]).await
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<CmsDocument, CmsError> {
        let predicates = [
            format!("[[at(document.type,{})]]", quoted(doc_type)),
            format!("[[at(my.{}.uid,{})]]", doc_type, quoted(uid)),
        ];

        self.search(&predicates)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CmsError::NotFound(format!("{} '{}'", doc_type, uid)))
    }

    async fn get_single(&self, doc_type: &str) -> Result<CmsDocument, CmsError> {
        self.get_all_by_type(doc_type)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CmsError::NotFound(doc_type.to_string()))
    }
}
