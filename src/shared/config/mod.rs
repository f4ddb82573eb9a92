//! Server configuration module
//!
//! `ServerConfig` is assembled through `ServerConfigBuilder`, usually from
//! environment variables via [`ServerConfig::from_env`]. Push providers are
//! optional: a provider without complete settings is left disabled.

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://sentinel.db?mode=rwc";
pub const DEFAULT_SERVER_PORT: u16 = 5000;
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;
pub const DEFAULT_WS_AUTH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_FCM_ENDPOINT: &str = "https://fcm.googleapis.com";
pub const DEFAULT_ONESIGNAL_ENDPOINT: &str = "https://onesignal.com";

/// How the FCM provider authenticates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FcmCredentials {
    /// Pre-issued OAuth access token
    AccessToken { project_id: String, token: String },
    /// Service account key JSON, exchanged for access tokens on demand
    ServiceAccount { json: String },
}

/// FCM HTTP v1 settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FcmConfig {
    pub endpoint: String,
    pub credentials: FcmCredentials,
}

/// OneSignal REST settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneSignalConfig {
    pub app_id: String,
    pub api_key: String,
    pub endpoint: String,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub server_port: u16,
    pub jwt_secret: String,
    /// Buffer size of each room channel and the presence channel
    pub broadcast_capacity: usize,
    /// How long an unauthenticated connection may wait before sending `auth`
    pub ws_auth_timeout: Duration,
    pub fcm: Option<FcmConfig>,
    pub onesignal: Option<OneSignalConfig>,
}

impl ServerConfig {
    /// Create a new ServerConfigBuilder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut builder = ServerConfig::builder();

        if let Some(url) = get("DATABASE_URL") {
            builder = builder.database_url(url);
        }
        if let Some(port) = get("SERVER_PORT") {
            builder = builder.server_port(parse_value("SERVER_PORT", &port)?);
        }
        if let Some(secret) = get("JWT_SECRET") {
            builder = builder.jwt_secret(secret);
        }
        if let Some(capacity) = get("BROADCAST_CAPACITY") {
            builder = builder.broadcast_capacity(parse_value("BROADCAST_CAPACITY", &capacity)?);
        }
        if let Some(secs) = get("WS_AUTH_TIMEOUT_SECS") {
            let secs: u64 = parse_value("WS_AUTH_TIMEOUT_SECS", &secs)?;
            builder = builder.ws_auth_timeout(Duration::from_secs(secs));
        }

        let fcm_endpoint = get("FCM_ENDPOINT").unwrap_or_else(|| DEFAULT_FCM_ENDPOINT.to_string());
        if let Some(json) = get("FIREBASE_SERVICE_ACCOUNT") {
            builder = builder.fcm(FcmConfig {
                endpoint: fcm_endpoint,
                credentials: FcmCredentials::ServiceAccount { json },
            });
        } else if let (Some(token), Some(project_id)) = (get("FCM_ACCESS_TOKEN"), get("FCM_PROJECT_ID")) {
            builder = builder.fcm(FcmConfig {
                endpoint: fcm_endpoint,
                credentials: FcmCredentials::AccessToken { project_id, token },
            });
        }

        if let (Some(app_id), Some(api_key)) = (get("ONESIGNAL_APP_ID"), get("ONESIGNAL_API_KEY")) {
            builder = builder.onesignal(OneSignalConfig {
                app_id,
                api_key,
                endpoint: get("ONESIGNAL_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_ONESIGNAL_ENDPOINT.to_string()),
            });
        }

        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingValue("JWT_SECRET"));
        }
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "BROADCAST_CAPACITY",
                value: "0".to_string(),
            });
        }
        if self.ws_auth_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "WS_AUTH_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

/// Builder for ServerConfig
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    database_url: Option<String>,
    server_port: Option<u16>,
    jwt_secret: Option<String>,
    broadcast_capacity: Option<usize>,
    ws_auth_timeout: Option<Duration>,
    fcm: Option<FcmConfig>,
    onesignal: Option<OneSignalConfig>,
}

impl ServerConfigBuilder {
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn server_port(mut self, port: u16) -> Self {
        self.server_port = Some(port);
        self
    }

    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.jwt_secret = Some(secret.into());
        self
    }

    pub fn broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = Some(capacity);
        self
    }

    pub fn ws_auth_timeout(mut self, timeout: Duration) -> Self {
        self.ws_auth_timeout = Some(timeout);
        self
    }

    pub fn fcm(mut self, fcm: FcmConfig) -> Self {
        self.fcm = Some(fcm);
        self
    }

    pub fn onesignal(mut self, onesignal: OneSignalConfig) -> Self {
        self.onesignal = Some(onesignal);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        let config = ServerConfig {
            database_url: self
                .database_url
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            server_port: self.server_port.unwrap_or(DEFAULT_SERVER_PORT),
            jwt_secret: self.jwt_secret.ok_or(ConfigError::MissingValue("JWT_SECRET"))?,
            broadcast_capacity: self.broadcast_capacity.unwrap_or(DEFAULT_BROADCAST_CAPACITY),
            ws_auth_timeout: self
                .ws_auth_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_WS_AUTH_TIMEOUT_SECS)),
            fcm: self.fcm,
            onesignal: self.onesignal,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}
