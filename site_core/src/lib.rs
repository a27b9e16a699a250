//! Core library for the consultancy site backend: contact relay, CMS revalidation and SEO routes.

pub mod cache;
pub mod cms;
pub mod config;
pub mod contact;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod revalidate;
pub mod seo;
pub mod text;

pub use cache::{CacheInvalidator, ContentCache};
pub use cms::{CachedContentService, ContentService, PrismicClient, RouteResolver};
pub use config::AppConfig;
pub use contact::{
    ChallengeVerifier, ContactForm, ContactSubmissionService, HttpSubmitTransport, Mailer,
    SmtpMailer, TurnstileVerifier,
};
pub use error::{AppError, Result};
pub use handlers::routes::{contact_routes, create_routes};
pub use middleware::{cors_layer_from_config, RateLimiter};
pub use revalidate::RevalidationWebhookHandler;
pub use seo::SeoService;

use axum::{middleware as axum_middleware, Router};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};

/// Shared, immutable collaborators for the life of the process.
#[derive(Clone)]
pub struct AppState {
    pub app_name: String,
    pub version: String,
    pub contact: Arc<ContactSubmissionService>,
    pub revalidation: Arc<RevalidationWebhookHandler>,
    pub seo: SeoService,
    pub cache: ContentCache,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        mailer: Arc<dyn Mailer>,
        verifier: Option<Arc<dyn ChallengeVerifier>>,
        content: Arc<dyn ContentService>,
    ) -> Self {
        let cache = ContentCache::new(&config.cache);
        let cached_content: Arc<dyn ContentService> =
            Arc::new(CachedContentService::new(content, cache.clone()));

        let mut contact = ContactSubmissionService::new(mailer, config.mail.address.trim())
            .with_min_submit_ms(config.contact.min_submit_ms);
        if let Some(verifier) = verifier {
            contact = contact.with_verifier(verifier);
        }

        let revalidation = RevalidationWebhookHandler::new(
            config.revalidate.secret.clone(),
            cached_content.clone(),
            Arc::new(cache.clone()),
        );

        let seo = SeoService::new(
            cached_content,
            cache.clone(),
            RouteResolver::new(config.cms.enable_articles),
            config.site.url.clone(),
        );

        Self {
            app_name: "Ciudadania Consultora".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            contact: Arc::new(contact),
            revalidation: Arc::new(revalidation),
            seo,
            cache,
            rate_limiter: RateLimiter::from_config(&config.rate_limit),
        }
    }

    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }
}

/// Builds the production collaborators from configuration. Fails when mail credentials are missing.
pub fn build_state(config: &AppConfig) -> Result<AppState> {
    let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::from_config(&config.mail)?);

    let verifier = TurnstileVerifier::from_config(&config.challenge)?
        .map(|v| Arc::new(v) as Arc<dyn ChallengeVerifier>);

    let prismic = PrismicClient::new(&config.cms)?;
    info!("CMS endpoint: {}", prismic.endpoint());
    let content: Arc<dyn ContentService> = Arc::new(prismic);

    Ok(AppState::new(config, mailer, verifier, content))
}

pub fn create_app(state: AppState) -> Router {
    create_app_with_config(state, &AppConfig::default())
}

pub fn create_app_with_config(state: AppState, config: &AppConfig) -> Router {
    let mut contact = contact_routes();
    if config.rate_limit.enable {
        contact = contact.route_layer(axum_middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            middleware::rate_limit_middleware,
        ));
    }

    let mut router = Router::new().merge(create_routes()).merge(contact);

    if config.server.request_timeout_seconds > 0 {
        router = router.layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_seconds,
        )));
    }

    router = router.layer(cors_layer_from_config(&config.cors));
    router = router.layer(middleware::logging_layer());

    router.with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<()> {
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let app = app.into_make_service_with_connect_info::<SocketAddr>();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
