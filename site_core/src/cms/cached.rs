use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use super::client::{CmsError, ContentService};
use crate::cache::{CacheScope, ContentCache, CMS_TAG};
use crate::models::CmsDocument;

/// Serves repeat reads from the content cache, tagging every entry with [`CMS_TAG`]
/// so a single tag invalidation drops all of them.
///
/// `lookup_by_ids` is never cached: the webhook needs the current state of
/// the documents it was told about.
#[derive(Clone)]
pub struct CachedContentService {
    inner: Arc<dyn ContentService>,
    cache: ContentCache,
}

impl CachedContentService {
    pub fn new(inner: Arc<dyn ContentService>, cache: ContentCache) -> Self {
        Self { inner, cache }
    }

    fn store<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = self.cache.insert(key, value, CacheScope::tagged(CMS_TAG)) {
            warn!("Failed to cache CMS response {}: {}", key, e);
        }
    }

    fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.cache.get(key)
    }
}

#[async_trait]
impl ContentService for CachedContentService {
    async fn lookup_by_ids(&self, ids: &[String]) -> Result<Vec<CmsDocument>, CmsError> {
        self.inner.lookup_by_ids(ids).await
    }

    async fn get_all_by_type(&self, doc_type: &str) -> Result<Vec<CmsDocument>, CmsError> {
        let key = format!("cms:type:{}", doc_type);
        if let Some(docs) = self.cached(&key) {
            return Ok(docs);
        }

        let docs = self.inner.get_all_by_type(doc_type).await?;
        self.store(&key, &docs);
        Ok(docs)
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<CmsDocument, CmsError> {
        let key = format!("cms:uid:{}:{}", doc_type, uid);
        if let Some(doc) = self.cached(&key) {
            return Ok(doc);
        }

        let doc = self.inner.get_by_uid(doc_type, uid).await?;
        self.store(&key, &doc);
        Ok(doc)
    }

    async fn get_single(&self, doc_type: &str) -> Result<CmsDocument, CmsError> {
        let key = format!("cms:single:{}", doc_type);
        if let Some(doc) = self.cached(&key) {
            return Ok(doc);
        }

        let doc = self.inner.get_single(doc_type).await?;
        self.store(&key, &doc);
        Ok(doc)
    }
}
