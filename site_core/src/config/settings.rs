use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SITE_URL: &str = "http://localhost:3000";
pub const DEFAULT_PRISMIC_REPOSITORY: &str = "ciudadania-consultora";
pub const TURNSTILE_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
    pub contact: ContactConfig,
    pub mail: MailConfig,
    pub challenge: ChallengeConfig,
    pub revalidate: RevalidateConfig,
    pub cms: CmsConfig,
    pub site: SiteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enable: bool,
    pub max_requests: usize,
    pub window_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_size: usize,
    pub default_ttl_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactConfig {
    /// Minimum time between form load and submit for a submission to count as human.
    pub min_submit_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Mailbox that both sends and receives inquiry notifications.
    pub address: String,
    pub password: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeConfig {
    /// Turnstile secret. When absent, challenge verification is skipped.
    pub secret_key: Option<String>,
    pub verify_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevalidateConfig {
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmsConfig {
    pub repository: String,
    /// Overrides the endpoint derived from `repository`.
    pub api_endpoint: Option<String>,
    pub access_token: Option<String>,
    pub enable_articles: bool,
    pub page_size: u32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            cors: CorsConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            contact: ContactConfig::default(),
            mail: MailConfig::default(),
            challenge: ChallengeConfig::default(),
            revalidate: RevalidateConfig::default(),
            cms: CmsConfig::default(),
            site: SiteConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            request_timeout_seconds: 30,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enable: true,
            max_requests: 5,
            window_seconds: 60,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            default_ttl_seconds: 3600,
        }
    }
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self { min_submit_ms: 2000 }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 465,
            address: String::new(),
            password: String::new(),
            timeout_seconds: 10,
        }
    }
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            verify_url: TURNSTILE_VERIFY_URL.to_string(),
            timeout_seconds: 5,
        }
    }
}

impl Default for RevalidateConfig {
    fn default() -> Self {
        Self { secret: None }
    }
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            repository: DEFAULT_PRISMIC_REPOSITORY.to_string(),
            api_endpoint: None,
            access_token: None,
            enable_articles: false,
            page_size: 100,
            timeout_seconds: 10,
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SITE_URL.to_string(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?);

        if std::path::Path::new("config.toml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        builder = builder.add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder = apply_deployment_env(builder, |name| std::env::var(name).ok())?;

        let config = builder.build()?;
        let mut app_config: AppConfig = config.try_deserialize()?;

        app_config.normalize();
        app_config.validate()?;

        Ok(app_config)
    }

    /// Treats blank secrets as unset and strips trailing slashes from the site URL.
    pub fn normalize(&mut self) {
        self.challenge.secret_key = non_blank(self.challenge.secret_key.take());
        self.revalidate.secret = non_blank(self.revalidate.secret.take());
        self.cms.api_endpoint = non_blank(self.cms.api_endpoint.take());
        self.cms.access_token = non_blank(self.cms.access_token.take());

        let trimmed = self.site.url.trim().trim_end_matches('/');
        self.site.url = if trimmed.is_empty() {
            DEFAULT_SITE_URL.to_string()
        } else {
            trimmed.to_string()
        };
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port cannot be 0".to_string()));
        }

        if self.rate_limit.enable && self.rate_limit.max_requests == 0 {
            return Err(ConfigError::Message(
                "Rate limit max requests must be greater than 0".to_string(),
            ));
        }

        if self.cache.max_size == 0 {
            return Err(ConfigError::Message(
                "Cache max size must be greater than 0".to_string(),
            ));
        }

        if self.contact.min_submit_ms < 0 {
            return Err(ConfigError::Message(
                "Contact minimum submit time cannot be negative".to_string(),
            ));
        }

        if self.mail.smtp_host.is_empty() {
            return Err(ConfigError::Message("SMTP host cannot be empty".to_string()));
        }

        if self.cms.repository.is_empty() && self.cms.api_endpoint.is_none() {
            return Err(ConfigError::Message(
                "CMS repository or API endpoint must be set".to_string(),
            ));
        }

        if self.cms.page_size == 0 || self.cms.page_size > 100 {
            return Err(ConfigError::Message(
                "CMS page size must be between 1 and 100".to_string(),
            ));
        }

        if !self.site.url.starts_with("http://") && !self.site.url.starts_with("https://") {
            return Err(ConfigError::Message(format!(
                "Site URL must be absolute: {}",
                self.site.url
            )));
        }

        if self.challenge.secret_key.is_none() {
            tracing::warn!("Challenge secret not set - contact form submissions will not be verified");
        }

        if self.revalidate.secret.is_none() {
            tracing::warn!("Revalidation secret not set - webhook calls will be rejected");
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Maps the variable names the site has always been deployed with onto config keys.
fn apply_deployment_env<F>(
    builder: ConfigBuilder<DefaultState>,
    lookup: F,
) -> Result<ConfigBuilder<DefaultState>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let first = |names: &[&str]| {
        names
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty())
    };

    let site_url = first(&["NEXT_PUBLIC_SITE_URL", "SITE_URL"]).or_else(|| {
        first(&["VERCEL_URL"]).map(|host| format!("https://{}", host))
    });

    builder
        .set_override_option("mail.address", first(&["EMAIL_ADDRESS"]))?
        .set_override_option("mail.password", first(&["EMAIL_PASSWORD"]))?
        .set_override_option("challenge.secret_key", first(&["TURNSTILE_SECRET_KEY"]))?
        .set_override_option(
            "revalidate.secret",
            first(&["PRISMIC_REVALIDATE_SECRET", "REVALIDATE_SECRET"]),
        )?
        .set_override_option("cms.repository", first(&["NEXT_PUBLIC_PRISMIC_ENVIRONMENT"]))?
        .set_override_option(
            "cms.enable_articles",
            first(&["NEXT_PUBLIC_PRISMIC_ENABLE_ARTICLES"]).map(|v| v == "true"),
        )?
        .set_override_option("site.url", site_url)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn build_with_env(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default()).unwrap());
        let builder = apply_deployment_env(builder, |name| vars.get(name).cloned()).unwrap();

        let mut config: AppConfig = builder.build().unwrap().try_deserialize().unwrap();
        config.normalize();
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.contact.min_submit_ms, 2000);
        assert!(config.challenge.secret_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();

        config.server.port = 0;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.cms.page_size = 250;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.site.url = "example.com".to_string();
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.contact.min_submit_ms = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bind_address() {
        let mut config = AppConfig::default();
        config.server.host = "0.0.0.0".to_string();
        config.server.port = 8080;
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_deployment_variables() {
        let config = build_with_env(&[
            ("EMAIL_ADDRESS", "estudio@example.com"),
            ("EMAIL_PASSWORD", "app-password"),
            ("TURNSTILE_SECRET_KEY", "0x4AAA"),
            ("REVALIDATE_SECRET", "fallback"),
            ("SITE_URL", "https://ciudadania.example.com///"),
            ("NEXT_PUBLIC_PRISMIC_ENABLE_ARTICLES", "true"),
        ]);

        assert_eq!(config.mail.address, "estudio@example.com");
        assert_eq!(config.mail.password, "app-password");
        assert_eq!(config.challenge.secret_key.as_deref(), Some("0x4AAA"));
        assert_eq!(config.revalidate.secret.as_deref(), Some("fallback"));
        assert_eq!(config.site.url, "https://ciudadania.example.com");
        assert!(config.cms.enable_articles);
    }

    #[test]
    fn test_prismic_secret_takes_precedence() {
        let config = build_with_env(&[
            ("PRISMIC_REVALIDATE_SECRET", "primary"),
            ("REVALIDATE_SECRET", "fallback"),
        ]);
        assert_eq!(config.revalidate.secret.as_deref(), Some("primary"));
    }

    #[test]
    fn test_site_url_falls_back_to_vercel_host() {
        let config = build_with_env(&[("VERCEL_URL", "preview-123.vercel.app")]);
        assert_eq!(config.site.url, "https://preview-123.vercel.app");

        let config = build_with_env(&[]);
        assert_eq!(config.site.url, DEFAULT_SITE_URL);
    }

    #[test]
    fn test_blank_secrets_are_unset() {
        let mut config = AppConfig::default();
        config.challenge.secret_key = Some("   ".to_string());
        config.revalidate.secret = Some(String::new());
        config.normalize();

        assert!(config.challenge.secret_key.is_none());
        assert!(config.revalidate.secret.is_none());
    }
}
