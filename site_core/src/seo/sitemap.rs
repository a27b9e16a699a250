//! sitemap.xml generation

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cms::{ContentService, RouteResolver};
use crate::models::CmsDocument;
use crate::text::escape_markup;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitemapEntry {
    pub loc: String,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Entries gathered for the sitemap. `complete` is false when a listing failed.
#[derive(Debug, Clone, Default)]
pub struct Sitemap {
    pub entries: Vec<SitemapEntry>,
    pub complete: bool,
}

fn path_of(routes: &RouteResolver, doc_type: &str) -> Option<String> {
    routes.resolve(&CmsDocument::new("", doc_type))
}

async fn push_single(
    sitemap: &mut Sitemap,
    content: &dyn ContentService,
    routes: &RouteResolver,
    site_url: &str,
    doc_type: &str,
) {
    let Some(path) = path_of(routes, doc_type) else {
        return;
    };

    let last_modified = match content.get_single(doc_type).await {
        Ok(doc) => doc.last_published(),
        Err(e) => {
            warn!("Sitemap could not load {}: {}", doc_type, e);
            None
        }
    };

    sitemap.entries.push(SitemapEntry {
        loc: format!("{}{}", site_url, path),
        last_modified: last_modified.or_else(|| Some(Utc::now())),
    });
}

async fn push_repeatable(
    sitemap: &mut Sitemap,
    content: &dyn ContentService,
    routes: &RouteResolver,
    site_url: &str,
    doc_type: &str,
) {
    let docs = match content.get_all_by_type(doc_type).await {
        Ok(docs) => docs,
        Err(e) => {
            warn!("Sitemap could not list {} documents: {}", doc_type, e);
            sitemap.complete = false;
            return;
        }
    };

    for doc in docs {
        // Documents without a uid have no public page.
        let Some(path) = routes.resolve(&doc) else {
            continue;
        };
        sitemap.entries.push(SitemapEntry {
            loc: format!("{}{}", site_url, path),
            last_modified: doc.last_published(),
        });
    }
}

/// Home and the article index fall back to the current time when their singleton can't be read.
pub async fn collect(content: &dyn ContentService, routes: &RouteResolver, site_url: &str) -> Sitemap {
    let site_url = site_url.trim_end_matches('/');
    let mut sitemap = Sitemap {
        entries: Vec::new(),
        complete: true,
    };

    push_single(&mut sitemap, content, routes, site_url, "home").await;
    push_repeatable(&mut sitemap, content, routes, site_url, "page").await;

    if routes.articles_enabled() {
        push_single(&mut sitemap, content, routes, site_url, "article_index").await;
        push_repeatable(&mut sitemap, content, routes, site_url, "article").await;
    }

    sitemap
}

pub fn render(entries: &[SitemapEntry]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );

    for entry in entries {
        xml.push_str("<url>\n");
        xml.push_str(&format!("<loc>{}</loc>\n", escape_markup(&entry.loc)));
        if let Some(modified) = entry.last_modified {
            xml.push_str(&format!(
                "<lastmod>{}</lastmod>\n",
                modified.to_rfc3339_opts(SecondsFormat::Millis, true)
            ));
        }
        xml.push_str("</url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::CmsError;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct FakeContent {
        home: bool,
        pages_fail: bool,
    }

    #[async_trait]
    impl ContentService for FakeContent {
        async fn lookup_by_ids(&self, _ids: &[String]) -> Result<Vec<CmsDocument>, CmsError> {
            Ok(vec![])
        }

        async fn get_all_by_type(&self, doc_type: &str) -> Result<Vec<CmsDocument>, CmsError> {
            match doc_type {
                "page" if self.pages_fail => Err(CmsError::Status(500)),
                "page" => Ok(vec![
                    CmsDocument::new("p1", "page")
                        .with_uid("ciudadania")
                        .with_last_publication_date("2024-03-01T10:00:00+0000"),
                    CmsDocument::new("p2", "page"),
                ]),
                "article" => Ok(vec![CmsDocument::new("a1", "article").with_uid("requisitos")]),
                _ => Ok(vec![]),
            }
        }

        async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<CmsDocument, CmsError> {
            Err(CmsError::NotFound(format!("{}/{}", doc_type, uid)))
        }

        async fn get_single(&self, doc_type: &str) -> Result<CmsDocument, CmsError> {
            if doc_type == "home" && self.home {
                Ok(CmsDocument::new("h", "home").with_last_publication_date("2024-01-02T00:00:00+0000"))
            } else {
                Err(CmsError::NotFound(doc_type.to_string()))
            }
        }
    }

    #[tokio::test]
    async fn test_collects_home_and_pages() {
        let content = FakeContent { home: true, pages_fail: false };
        let sitemap = collect(&content, &RouteResolver::new(false), "https://example.com/").await;

        assert!(sitemap.complete);
        let locs: Vec<_> = sitemap.entries.iter().map(|e| e.loc.as_str()).collect();
        assert_eq!(locs, vec!["https://example.com/", "https://example.com/ciudadania"]);
        assert_eq!(
            sitemap.entries[0].last_modified,
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_articles_when_enabled() {
        let content = FakeContent { home: false, pages_fail: false };
        let sitemap = collect(&content, &RouteResolver::new(true), "https://example.com").await;

        let locs: Vec<_> = sitemap.entries.iter().map(|e| e.loc.as_str()).collect();
        assert_eq!(
            locs,
            vec![
                "https://example.com/",
                "https://example.com/ciudadania",
                "https://example.com/articulos",
                "https://example.com/articulos/requisitos",
            ]
        );
        // failed singletons still get a lastmod
        assert!(sitemap.entries[0].last_modified.is_some());
        assert!(sitemap.entries[2].last_modified.is_some());
        assert!(sitemap.entries[3].last_modified.is_none());
    }

    #[tokio::test]
    async fn test_failed_listing_marks_incomplete() {
        let content = FakeContent { home: true, pages_fail: true };
        let sitemap = collect(&content, &RouteResolver::new(false), "https://example.com").await;

        assert!(!sitemap.complete);
        assert_eq!(sitemap.entries.len(), 1);
    }

    #[test]
    fn test_render() {
        let xml = render(&[
            SitemapEntry {
                loc: "https://example.com/".to_string(),
                last_modified: Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            },
            SitemapEntry {
                loc: "https://example.com/a&b".to_string(),
                last_modified: None,
            },
        ]);

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset"));
        assert!(xml.contains("<loc>https://example.com/</loc>\n<lastmod>2024-01-02T03:04:05.000Z</lastmod>"));
        assert!(xml.contains("<url>\n<loc>https://example.com/a&amp;b</loc>\n</url>"));
        assert!(xml.ends_with("</urlset>\n"));
    }
}
