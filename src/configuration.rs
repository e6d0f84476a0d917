use config::{ConfigError, FileFormat};
use std::fmt;

/// Platform name that unlocks the administrative reset
pub const DEV_PLATFORM: &str = "dev";

/// Longest accepted access token lifetime (30 days)
pub const MAX_ACCESS_TOKEN_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;
/// Longest accepted refresh token lifetime (10 years)
pub const MAX_REFRESH_TOKEN_TTL_DAYS: i64 = 3650;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub auth: AuthSettings,
    #[serde(default)]
    pub database: Option<DatabaseSettings>,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Process-wide authentication settings
///
/// Loaded once at startup and shared read-only by every component.
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    /// HMAC secret used to sign access tokens
    pub jwt_secret: String,
    /// Administrative key expected under the `ApiKey` scheme
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl_seconds: i64,
    #[serde(default = "default_refresh_token_ttl")]
    pub refresh_token_ttl_days: i64,
    #[serde(default)]
    pub platform: String,
}

fn default_access_token_ttl() -> i64 {
    3600
}

fn default_refresh_token_ttl() -> i64 {
    60
}

impl AuthSettings {
    pub fn new(jwt_secret: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            api_key: api_key.into(),
            access_token_ttl_seconds: default_access_token_ttl(),
            refresh_token_ttl_days: default_refresh_token_ttl(),
            platform: String::new(),
        }
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// `None` if the configured lifetime does not fit a `chrono::Duration`.
    pub fn access_token_ttl(&self) -> Option<chrono::Duration> {
        chrono::Duration::try_seconds(self.access_token_ttl_seconds)
    }

    /// `None` if the configured lifetime does not fit a `chrono::Duration`.
    pub fn refresh_token_ttl(&self) -> Option<chrono::Duration> {
        chrono::Duration::try_days(self.refresh_token_ttl_days)
    }

    pub fn is_dev_platform(&self) -> bool {
        self.platform == DEV_PLATFORM
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Message(
                "auth.jwt_secret must not be empty".to_string(),
            ));
        }
        if !(1..=MAX_ACCESS_TOKEN_TTL_SECONDS).contains(&self.access_token_ttl_seconds) {
            return Err(ConfigError::Message(format!(
                "auth.access_token_ttl_seconds must be between 1 and {}",
                MAX_ACCESS_TOKEN_TTL_SECONDS
            )));
        }
        if !(1..=MAX_REFRESH_TOKEN_TTL_DAYS).contains(&self.refresh_token_ttl_days) {
            return Err(ConfigError::Message(format!(
                "auth.refresh_token_ttl_days must be between 1 and {}",
                MAX_REFRESH_TOKEN_TTL_DAYS
            )));
        }
        Ok(())
    }
}

// Secrets stay out of logs.
impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &"[redacted]")
            .field("api_key", &"[redacted]")
            .field("access_token_ttl_seconds", &self.access_token_ttl_seconds)
            .field("refresh_token_ttl_days", &self.refresh_token_ttl_days)
            .field("platform", &self.platform)
            .finish()
    }
}

/// Load settings from `configuration.{yaml,toml,json}` (optional) overlaid
/// by `CHIRPY__SECTION__KEY` environment variables.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(config::Environment::with_prefix("CHIRPY").separator("__"))
        .build()?;
    into_settings(settings)
}

/// Parse settings from an in-memory YAML document.
pub fn configuration_from_yaml(source: &str) -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from_str(source, FileFormat::Yaml))
        .build()?;
    into_settings(settings)
}

fn into_settings(config: config::Config) -> Result<Settings, ConfigError> {
    let settings = config.try_deserialize::<Settings>()?;
    settings.auth.validate()?;
    Ok(settings)
}
