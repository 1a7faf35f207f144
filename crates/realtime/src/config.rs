//! Configuration for the realtime service
//!
//! Loaded from environment variables with the `COLLABFORGE_` prefix, with
//! `.env` support via dotenvy. The JWT secret is shared with the REST
//! layer's authentication middleware; everything else has defaults.

use crate::error::RealtimeError;

#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Bind address for the websocket server
    pub host: String,

    /// Bind port for the websocket server
    pub port: u16,

    /// HS256 secret shared with the REST authentication middleware
    pub jwt_secret: String,

    /// Base URL of the REST API that owns the durable chat log
    pub api_base_url: String,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8084,
            jwt_secret: String::new(),
            api_base_url: "http://127.0.0.1:5000".to_string(),
        }
    }
}

impl RealtimeConfig {
    /// Load configuration from environment variables
    ///
    /// `COLLABFORGE_JWT_SECRET` (or `JWT_SECRET`) is required; the rest
    /// fall back to defaults.
    pub fn from_env() -> Result<Self, RealtimeError> {
        let host =
            std::env::var("COLLABFORGE_REALTIME_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = std::env::var("COLLABFORGE_REALTIME_PORT")
            .unwrap_or_else(|_| "8084".to_string())
            .parse::<u16>()
            .map_err(|e| RealtimeError::Config(format!("Invalid realtime port: {}", e)))?;

        let jwt_secret = std::env::var("COLLABFORGE_JWT_SECRET")
            .or_else(|_| std::env::var("JWT_SECRET"))
            .map_err(|_| {
                RealtimeError::Config("COLLABFORGE_JWT_SECRET must be set".to_string())
            })?;

        let api_base_url = std::env::var("COLLABFORGE_API_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:5000".to_string());

        Ok(Self {
            host,
            port,
            jwt_secret,
            api_base_url,
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), RealtimeError> {
        if self.jwt_secret.is_empty() {
            return Err(RealtimeError::Config(
                "JWT secret must not be empty".to_string(),
            ));
        }

        if self.port == 0 {
            return Err(RealtimeError::Config(
                "Realtime port must be non-zero".to_string(),
            ));
        }

        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(RealtimeError::Config(format!(
                "API base URL must be an http(s) URL, got {}",
                self.api_base_url
            )));
        }

        Ok(())
    }
}
