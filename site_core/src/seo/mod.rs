//! Search engine artifacts served from CMS content

pub mod robots;
pub mod sitemap;

use std::sync::Arc;

use tracing::warn;

use crate::cache::{CacheScope, ContentCache, CMS_TAG};
use crate::cms::{ContentService, RouteResolver};

pub use sitemap::{Sitemap, SitemapEntry};

pub const SITEMAP_PATH: &str = "/sitemap.xml";
pub const ROBOTS_PATH: &str = "/robots.txt";

const SITEMAP_KEY: &str = "seo:sitemap";
const ROBOTS_KEY: &str = "seo:robots";

/// Renders sitemap.xml and robots.txt, keeping the output in the content cache
/// bound to their public paths.
#[derive(Clone)]
pub struct SeoService {
    content: Arc<dyn ContentService>,
    cache: ContentCache,
    routes: RouteResolver,
    site_url: String,
}

impl SeoService {
    pub fn new(
        content: Arc<dyn ContentService>,
        cache: ContentCache,
        routes: RouteResolver,
        site_url: impl Into<String>,
    ) -> Self {
        Self {
            content,
            cache,
            routes,
            site_url: site_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    /// Partial sitemaps are served but not cached.
    pub async fn sitemap_xml(&self) -> String {
        if let Some(xml) = self.cache.get::<String>(SITEMAP_KEY) {
            return xml;
        }

        let sitemap = sitemap::collect(self.content.as_ref(), &self.routes, &self.site_url).await;
        let xml = sitemap::render(&sitemap.entries);

        if sitemap.complete {
            self.store(SITEMAP_KEY, &xml, CacheScope::path(SITEMAP_PATH).with_tag(CMS_TAG));
        }
        xml
    }

    pub fn robots_txt(&self) -> String {
        if let Some(text) = self.cache.get::<String>(ROBOTS_KEY) {
            return text;
        }

        let text = robots::render(&self.site_url);
        self.store(ROBOTS_KEY, &text, CacheScope::path(ROBOTS_PATH));
        text
    }

    fn store(&self, key: &str, value: &str, scope: CacheScope) {
        if let Err(e) = self.cache.insert(key, &value, scope) {
            warn!("Failed to cache {}: {}", key, e);
        }
    }
}
