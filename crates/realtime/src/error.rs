use actix_web::{HttpResponse, ResponseError};

pub type Result<T> = std::result::Result<T, RealtimeError>;

/// Handshake-time authentication failures.
///
/// These are the only errors the realtime layer reports to a client: the
/// connection upgrade is refused with the reason string and no session is
/// created. Everything after the handshake is fire-and-forget.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication error: No token provided")]
    NoToken,

    #[error("Authentication error: Invalid token")]
    InvalidToken,
}

impl ResponseError for AuthError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::Unauthorized().json(serde_json::json!({
            "error": "authentication_error",
            "message": self.to_string(),
        }))
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(_err: jsonwebtoken::errors::Error) -> Self {
        AuthError::InvalidToken
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for RealtimeError {
    fn from(err: anyhow::Error) -> Self {
        RealtimeError::Internal(err.to_string())
    }
}
