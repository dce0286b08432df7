//! Configuration management.

use serde::Deserialize;

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthSettings,

    /// Event lifecycle configuration
    #[serde(default)]
    pub events: EventsConfig,

    /// Registration ledger configuration
    #[serde(default)]
    pub registrations: RegistrationsConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// HS256 shared secret for verifying identity-provider tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Expected token issuer (unchecked when unset)
    pub issuer: Option<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            issuer: None,
        }
    }
}

impl AuthSettings {
    /// Whether the insecure development secret is still in place.
    pub fn is_dev_secret(&self) -> bool {
        self.jwt_secret == default_jwt_secret()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Deployment policy: `true` publishes new events immediately as
    /// `approved`; `false` creates them as `pending` until a moderator acts.
    #[serde(default = "default_auto_approve")]
    pub auto_approve: bool,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            auto_approve: default_auto_approve(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationsConfig {
    /// Transaction attempts before surfacing a retryable conflict
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff between attempts, in milliseconds (doubles per attempt)
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RegistrationsConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl RegistrationsConfig {
    pub fn retry_policy(&self) -> crate::registrations::RetryPolicy {
        crate::registrations::RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            backoff: std::time::Duration::from_millis(self.backoff_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
        }
    }
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_jwt_secret() -> String { "insecure-dev-secret".to_string() }
fn default_auto_approve() -> bool { true }
fn default_max_attempts() -> u32 { 4 }
fn default_backoff_ms() -> u64 { 25 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("GATHER").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with environment overrides.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("GATHER").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }
}
