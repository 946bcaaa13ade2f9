use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Longest accepted post-success cooldown.
pub const MAX_COOLDOWN_SECONDS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub contact: ContactConfig,
    pub challenge: ChallengeConfig,
    pub site: SiteConfig,
    pub forms: FormSessionConfig,
    pub cors: CorsConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactConfig {
    pub endpoint: Option<String>,
    pub relay: RelayConfig,
    pub request_timeout_ms: u64,
    pub cooldown_seconds: u64,
    pub include_reply_to: bool,
}

/// Identifiers for a keyed email relay. Any of them being set selects relay delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    pub service_id: Option<String>,
    pub template_id: Option<String>,
    pub public_key: Option<String>,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeConfig {
    pub site_key: Option<String>,
    pub container_id: String,
    pub ready_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub business_name: String,
    pub phone_display: Option<String>,
    pub whatsapp_number: Option<String>,
    pub whatsapp_greeting: String,
    pub instagram_handle: Option<String>,
    pub instagram_url: Option<String>,
    pub service_area: Option<String>,
    pub map_embed_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSessionConfig {
    pub max_sessions: usize,
    pub idle_timeout_seconds: u64,
    pub prune_interval_seconds: u64,
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
pub struct LoggingConfig {
    pub format: String,
    pub filter: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            relay: RelayConfig::default(),
            request_timeout_ms: 10_000,
            cooldown_seconds: 60,
            include_reply_to: true,
        }
    }
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            site_key: None,
            container_id: "contact-challenge".to_string(),
            ready_timeout_ms: 5_000,
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            business_name: "Master Sonorização".to_string(),
            phone_display: Some("(21) 99776-7702".to_string()),
            whatsapp_number: Some("21997767702".to_string()),
            whatsapp_greeting: "Olá! Gostaria de solicitar um orçamento.".to_string(),
            instagram_handle: Some("@masterrsonorizacao".to_string()),
            instagram_url: Some("https://www.instagram.com/masterrsonorizacao".to_string()),
            service_area: Some("Santíssimo, Rio de Janeiro - RJ".to_string()),
            map_embed_url: None,
        }
    }
}

impl Default for FormSessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: 10_000,
            idle_timeout_seconds: 3600,
            prune_interval_seconds: 300,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enable: true,
            max_requests: 10,
            window_seconds: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "pretty".to_string(),
            filter: None,
        }
    }
}

/// Blank strings from the environment mean "not configured".
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ContactConfig {
    pub fn endpoint(&self) -> Option<&str> {
        non_empty(&self.endpoint)
    }
}

impl ChallengeConfig {
    pub fn site_key(&self) -> Option<&str> {
        non_empty(&self.site_key)
    }

    pub fn is_enabled(&self) -> bool {
        self.site_key().is_some()
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let local = Path::new("config.toml");
        Self::load_from(local.exists().then_some(local))
    }

    pub fn load_from(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("cors.allowed_origins")
                .try_parsing(true),
        );

        let app_config: AppConfig = builder.build()?.try_deserialize()?;
        app_config.validate()?;

        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port cannot be 0".to_string()));
        }

        if self.contact.request_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Contact request timeout must be greater than 0".to_string(),
            ));
        }

        if self.contact.cooldown_seconds > MAX_COOLDOWN_SECONDS {
            return Err(ConfigError::Message(format!(
                "Contact cooldown cannot exceed {} seconds",
                MAX_COOLDOWN_SECONDS
            )));
        }

        if self.challenge.ready_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Challenge ready timeout must be greater than 0".to_string(),
            ));
        }

        if self.forms.max_sessions == 0 {
            return Err(ConfigError::Message(
                "Form session capacity must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit.enable && self.rate_limit.max_requests == 0 {
            return Err(ConfigError::Message(
                "Rate limit max requests must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
