#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use site_core::{
    cms::CmsError,
    config::AppConfig,
    contact::{ChallengeVerifier, MailError, Mailer, OutgoingEmail},
    models::CmsDocument,
    AppState, ContentService,
};

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        self.sent.lock().push(email);
        Ok(())
    }
}

/// Fixed set of documents; lookups by id return those whose id matches.
#[derive(Default)]
pub struct StaticContent {
    pub documents: Vec<CmsDocument>,
    pub lookups: Mutex<Vec<Vec<String>>>,
}

impl StaticContent {
    pub fn new(documents: Vec<CmsDocument>) -> Arc<Self> {
        Arc::new(Self {
            documents,
            lookups: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ContentService for StaticContent {
    async fn lookup_by_ids(&self, ids: &[String]) -> Result<Vec<CmsDocument>, CmsError> {
        self.lookups.lock().push(ids.to_vec());
        Ok(self
            .documents
            .iter()
            .filter(|doc| ids.contains(&doc.id))
            .cloned()
            .collect())
    }

    async fn get_all_by_type(&self, doc_type: &str) -> Result<Vec<CmsDocument>, CmsError> {
        Ok(self
            .documents
            .iter()
            .filter(|doc| doc.doc_type == doc_type)
            .cloned()
            .collect())
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<CmsDocument, CmsError> {
        self.documents
            .iter()
            .find(|doc| doc.doc_type == doc_type && doc.uid.as_deref() == Some(uid))
            .cloned()
            .ok_or_else(|| CmsError::NotFound(format!("{} '{}'", doc_type, uid)))
    }

    async fn get_single(&self, doc_type: &str) -> Result<CmsDocument, CmsError> {
        self.documents
            .iter()
            .find(|doc| doc.doc_type == doc_type)
            .cloned()
            .ok_or_else(|| CmsError::NotFound(doc_type.to_string()))
    }
}

pub fn site_documents() -> Vec<CmsDocument> {
    vec![
        CmsDocument::new("home-1", "home")
            .with_url("/")
            .with_last_publication_date("2024-05-01T12:00:00+0000"),
        CmsDocument::new("page-1", "page")
            .with_uid("ciudadania-italiana")
            .with_url("/ciudadania-italiana"),
        CmsDocument::new("page-2", "page")
            .with_uid("visas")
            .with_url("/visas"),
        CmsDocument::new("menu-1", "menu"),
    ]
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.mail.address = "estudio@example.com".to_string();
    config.revalidate.secret = Some("webhook-secret".to_string());
    config.site.url = "https://consultora.example".to_string();
    config.contact.min_submit_ms = 2000;
    config
}

pub struct TestApp {
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    pub content: Arc<StaticContent>,
}

pub fn test_app(config: &AppConfig, verifier: Option<Arc<dyn ChallengeVerifier>>) -> TestApp {
    let mailer = Arc::new(RecordingMailer::default());
    let content = StaticContent::new(site_documents());
    let state = AppState::new(config, mailer.clone(), verifier, content.clone());

    TestApp {
        state,
        mailer,
        content,
    }
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    format!("http://{}", addr)
}
