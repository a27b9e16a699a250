use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::config::CacheConfig;

/// Tag shared by every cached value derived from CMS content.
pub const CMS_TAG: &str = "prismic";

/// How far a path invalidation reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathScope {
    /// Only the entry rendered for exactly this path.
    Page,
    /// This path and everything nested beneath it.
    Layout,
}

/// Cache invalidation primitives used by the revalidation webhook.
pub trait CacheInvalidator: Send + Sync {
    /// Drops every entry carrying `tag`. Returns the number removed.
    fn invalidate_tag(&self, tag: &str) -> usize;

    /// Drops entries bound to `path` (or beneath it, for [`PathScope::Layout`]).
    fn invalidate_path(&self, path: &str, scope: PathScope) -> usize;
}

/// Where a cached value belongs: the public path it renders and the tags it depends on.
#[derive(Debug, Clone, Default)]
pub struct CacheScope {
    pub path: Option<String>,
    pub tags: BTreeSet<String>,
}

impl CacheScope {
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            tags: BTreeSet::new(),
        }
    }

    pub fn tagged(tag: impl Into<String>) -> Self {
        Self::default().with_tag(tag)
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: serde_json::Value,
    scope: CacheScope,
    expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn new(data: serde_json::Value, scope: CacheScope, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|duration| {
            Utc::now() + chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::seconds(300))
        });

        Self {
            data,
            scope,
            expires_at,
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| Utc::now() > expires_at)
    }
}

/// In-process LRU cache for CMS-derived responses.
#[derive(Debug, Clone)]
pub struct ContentCache {
    entries: Arc<RwLock<LruCache<String, CacheEntry>>>,
    default_ttl: Option<Duration>,
}

impl ContentCache {
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_size).unwrap_or(NonZeroUsize::MIN);
        let default_ttl = (config.default_ttl_seconds > 0)
            .then(|| Duration::from_secs(config.default_ttl_seconds));

        Self {
            entries: Arc::new(RwLock::new(LruCache::new(capacity))),
            default_ttl,
        }
    }

    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let mut entries = self.entries.write();

        let entry = entries.get(key)?;
        if entry.is_expired() {
            entries.pop(key);
            debug!("Cache entry expired for key: {}", key);
            return None;
        }

        match serde_json::from_value(entry.data.clone()) {
            Ok(value) => {
                debug!("Cache hit for key: {}", key);
                Some(value)
            }
            Err(e) => {
                warn!("Failed to deserialize cached value for key {}: {}", key, e);
                entries.pop(key);
                None
            }
        }
    }

    pub fn insert<T>(&self, key: &str, value: &T, scope: CacheScope) -> Result<(), serde_json::Error>
    where
        T: Serialize,
    {
        let data = serde_json::to_value(value)?;
        let entry = CacheEntry::new(data, scope, self.default_ttl);

        self.entries.write().put(key.to_string(), entry);
        debug!("Cached value for key: {} (TTL: {:?})", key, self.default_ttl);
        Ok(())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    fn remove_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CacheEntry) -> bool,
    {
        let mut entries = self.entries.write();
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| predicate(entry))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            entries.pop(key);
        }
        doomed.len()
    }
}

impl CacheInvalidator for ContentCache {
    fn invalidate_tag(&self, tag: &str) -> usize {
        let removed = self.remove_where(|entry| entry.scope.tags.contains(tag));
        debug!(tag, removed, "Invalidated cache tag");
        removed
    }

    fn invalidate_path(&self, path: &str, scope: PathScope) -> usize {
        let target = normalize_path(path);
        let removed = self.remove_where(|entry| match entry.scope.path.as_deref() {
            Some(entry_path) => path_matches(&normalize_path(entry_path), &target, scope),
            None => false,
        });
        debug!(path, ?scope, removed, "Invalidated cache path");
        removed
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn path_matches(entry_path: &str, target: &str, scope: PathScope) -> bool {
    match scope {
        PathScope::Page => entry_path == target,
        PathScope::Layout => {
            target == "/"
                || entry_path == target
                || entry_path
                    .strip_prefix(target)
                    .is_some_and(|rest| rest.starts_with('/'))
        }
    }
}
