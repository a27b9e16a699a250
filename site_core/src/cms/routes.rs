//! Document type to public path resolution

use serde::Serialize;

use crate::models::CmsDocument;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub path: String,
}

impl Route {
    fn new(doc_type: &str, path: &str) -> Self {
        Self {
            doc_type: doc_type.to_string(),
            path: path.to_string(),
        }
    }
}

/// Route table sent to the content API and applied locally when a document
/// comes back without a resolved `url`.
#[derive(Debug, Clone)]
pub struct RouteResolver {
    routes: Vec<Route>,
}

impl RouteResolver {
    /// Article routes are opt-in: the content API rejects every query whose
    /// route table names a type the repository does not define yet.
    pub fn new(enable_articles: bool) -> Self {
        let mut routes = vec![Route::new("home", "/"), Route::new("page", "/:uid")];

        if enable_articles {
            routes.push(Route::new("article_index", "/articulos"));
            routes.push(Route::new("article", "/articulos/:uid"));
        }

        Self { routes }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn articles_enabled(&self) -> bool {
        self.routes.iter().any(|route| route.doc_type == "article")
    }

    pub fn resolve(&self, doc: &CmsDocument) -> Option<String> {
        let route = self.routes.iter().find(|route| route.doc_type == doc.doc_type)?;

        if route.path.contains(":uid") {
            let uid = doc.uid.as_deref().filter(|uid| !uid.is_empty())?;
            Some(route.path.replace(":uid", uid))
        } else {
            Some(route.path.clone())
        }
    }

    pub fn to_query_param(&self) -> String {
        serde_json::to_string(&self.routes).unwrap_or_else(|_| "[]".to_string())
    }
}
