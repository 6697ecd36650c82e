use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use taskmint_core::config::AuthConfig;
use taskmint_core::domain::user::{User, UserId};

use crate::error::ApiError;
use crate::state::ApiState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 token mint and verifier, keyed from `auth.jwt_secret`.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs: config.token_ttl_secs,
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.0.clone(),
            name: user.name.clone(),
            iat: now,
            exp: now.saturating_add(self.ttl_secs as i64),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
    }
}

/// The authenticated caller, established from the `Authorization: Bearer`
/// header. Handlers taking this extractor are unreachable without a valid
/// token.
pub struct AuthUser {
    pub id: UserId,
    pub name: String,
}

impl FromRequestParts<ApiState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        let header_value =
            parts.headers.get(header::AUTHORIZATION).and_then(|value| value.to_str().ok());
        let Some(token) = header_value.and_then(|value| value.strip_prefix("Bearer ")) else {
            return Err(ApiError::unauthorized("Access denied. No token provided."));
        };

        match state.tokens.verify(token.trim()) {
            Ok(claims) => Ok(Self { id: UserId(claims.sub), name: claims.name }),
            Err(error) if matches!(error.kind(), ErrorKind::ExpiredSignature) => {
                Err(ApiError::unauthorized("Token has expired. Please login again."))
            }
            Err(_) => Err(ApiError::unauthorized("Invalid token. Please login again.")),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use jsonwebtoken::{encode, errors::ErrorKind, Algorithm, EncodingKey, Header};

    use taskmint_core::config::AuthConfig;
    use taskmint_core::domain::user::{User, UserId};

    use super::{Claims, TokenIssuer};

    fn auth_config(secret: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string().into(),
            token_ttl_secs: 3600,
            password_iterations: 1,
        }
    }

    fn user() -> User {
        User {
            id: UserId("user-1".to_string()),
            name: "Alex Chen".to_string(),
            email: "alex@example.com".to_string(),
            password_hash: String::new(),
            contacts: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issued_tokens_verify_and_carry_identity() {
        let issuer = TokenIssuer::new(&auth_config("a-sufficiently-long-secret"));

        let token = issuer.issue(&user()).expect("issue");
        let claims = issuer.verify(&token).expect("verify");

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.name, "Alex Chen");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tokens_signed_with_a_different_secret_are_rejected() {
        let issuer = TokenIssuer::new(&auth_config("a-sufficiently-long-secret"));
        let other = TokenIssuer::new(&auth_config("another-completely-different-one"));

        let token = other.issue(&user()).expect("issue");
        assert!(issuer.verify(&token).is_err());
    }

    #[test]
    fn expired_tokens_are_reported_as_expired() {
        let issuer = TokenIssuer::new(&auth_config("a-sufficiently-long-secret"));

        let now = Utc::now().timestamp();
        let stale = Claims {
            sub: "user-1".to_string(),
            name: "Alex Chen".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &stale,
            &EncodingKey::from_secret(b"a-sufficiently-long-secret"),
        )
        .expect("encode");

        let error = issuer.verify(&token).expect_err("stale token");
        assert!(matches!(error.kind(), ErrorKind::ExpiredSignature));
    }
}
