use crate::error::AuthError;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Default token lifetime, matching the REST layer's session tokens
const TOKEN_TTL_SECONDS: i64 = 24 * 3600;

/// Claims carried by a CollabForge session token.
///
/// The same HS256 secret signs tokens for the REST middleware and the
/// websocket handshake, so the claim names follow the REST layer's wire
/// format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    pub iat: i64,
    pub exp: i64,
}

/// Caller identity established at handshake time, immutable for the
/// connection's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub username: String,
}

impl Identity {
    fn from_claims(claims: Claims) -> Self {
        // Tokens issued before display names existed carry no username
        let username = claims.username.unwrap_or_else(|| claims.user_id.clone());
        Self {
            user_id: claims.user_id,
            username,
        }
    }
}

/// Verifies bearer credentials presented at connection time.
///
/// Stateless: verification is a pure function of the token and the shared
/// secret. No session state is touched here.
pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a signed token. The REST layer is the normal issuer; this
    /// exists because both layers share the signing scheme.
    pub fn issue(&self, user_id: &str, username: Option<&str>) -> Result<String, AuthError> {
        self.issue_with_ttl(user_id, username, TOKEN_TTL_SECONDS)
    }

    /// Issue a token with an explicit lifetime in seconds. A non-positive
    /// lifetime produces an already-expired token.
    pub fn issue_with_ttl(
        &self,
        user_id: &str,
        username: Option<&str>,
        ttl_seconds: i64,
    ) -> Result<String, AuthError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            user_id: user_id.to_string(),
            username: username.map(|u| u.to_string()),
            iat: now,
            exp: now + ttl_seconds,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verify and decode a presented credential.
    ///
    /// Malformed tokens, bad signatures, and expired tokens all collapse
    /// into `InvalidToken`; the refusal reason never leaks which check
    /// failed.
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(Identity::from_claims(token_data.claims))
    }

    /// Extract the token half of an `Authorization: Bearer ...` header
    pub fn extract_bearer_token(auth_header: &str) -> Result<&str, AuthError> {
        match auth_header.split_once(' ') {
            Some(("Bearer", token)) if !token.is_empty() => Ok(token),
            _ => Err(AuthError::InvalidToken),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> TokenVerifier {
        TokenVerifier::new("test-secret-for-realtime")
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let verifier = verifier();

        let token = verifier.issue("user-1", Some("ada")).unwrap();
        let identity = verifier.verify(&token).unwrap();

        assert_eq!(identity.user_id, "user-1");
        assert_eq!(identity.username, "ada");
    }

    #[test]
    fn test_username_falls_back_to_user_id() {
        let verifier = verifier();

        let token = verifier.issue("user-2", None).unwrap();
        let identity = verifier.verify(&token).unwrap();

        assert_eq!(identity.username, "user-2");
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let verifier = verifier();

        let token = verifier.issue_with_ttl("user-3", None, -60).unwrap();
        let err = verifier.verify(&token).unwrap_err();

        assert_eq!(err, AuthError::InvalidToken);
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        let verifier = verifier();

        assert_eq!(
            verifier.verify("not-a-jwt").unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = TokenVerifier::new("secret-a").issue("user-4", None).unwrap();
        let err = TokenVerifier::new("secret-b").verify(&token).unwrap_err();

        assert_eq!(err, AuthError::InvalidToken);
    }

    #[test]
    fn test_bearer_token_extraction() {
        let token = TokenVerifier::extract_bearer_token("Bearer abc123").unwrap();
        assert_eq!(token, "abc123");

        assert!(TokenVerifier::extract_bearer_token("abc123").is_err());
        assert!(TokenVerifier::extract_bearer_token("Bearer ").is_err());
    }
}
