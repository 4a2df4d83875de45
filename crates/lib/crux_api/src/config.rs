//! API server configuration.

use axum::http::HeaderValue;
use crux_core::auth::jwt::JwtSecrets;
use thiserror::Error;

/// Environment name under which cookies default to non-`Secure`.
pub const DEVELOPMENT_ENV: &str = "development";

/// Startup configuration errors. Any of these aborts the server.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid CORS origin '{0}'")]
    InvalidOrigin(String),
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "0.0.0.0:3000").
    pub bind_addr: String,
    /// Access and refresh token signing secrets.
    pub secrets: JwtSecrets,
    /// Deployment environment name (e.g. "development", "production").
    pub environment: String,
    /// Version string reported in every response envelope.
    pub api_version: String,
    /// Whether auth cookies carry the `Secure` attribute.
    pub secure_cookies: bool,
    /// Origins allowed to make credentialed cross-origin requests.
    pub cors_origins: Vec<HeaderValue>,
}

impl ApiConfig {
    /// Build a config, parsing `cors_origins` into header values.
    ///
    /// `secure_cookies` defaults to on outside the development environment.
    pub fn new(
        bind_addr: impl Into<String>,
        secrets: JwtSecrets,
        environment: impl Into<String>,
        api_version: Option<String>,
        secure_cookies: Option<bool>,
        cors_origins: &[String],
    ) -> Result<Self, ConfigError> {
        let environment = environment.into();
        let cors_origins = cors_origins
            .iter()
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
            .map(|o| HeaderValue::from_str(o).map_err(|_| ConfigError::InvalidOrigin(o.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            bind_addr: bind_addr.into(),
            secrets,
            secure_cookies: secure_cookies.unwrap_or(environment != DEVELOPMENT_ENV),
            environment,
            api_version: api_version.unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            cors_origins,
        })
    }
}
