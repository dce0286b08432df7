//! Authentication middleware.
//!
//! A thin transport adapter over the external identity provider: it
//! validates `Bearer` JWTs and resolves them into a [`Principal`] request
//! extension. Session and subscription lifecycle live entirely outside the
//! core; handlers receive an already-resolved principal (or none) and the
//! core operations take it as an explicit argument.
//!
//! Requests without an `Authorization` header pass through without a
//! principal — public endpoints serve them, and the [`Principal`] extractor
//! rejects them with 401 on protected handlers. Requests with a *bad* token
//! are rejected here.

use axum::{
    body::Body,
    extract::{FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use futures::future::BoxFuture;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::task::{Context, Poll};
use thiserror::Error;
use tower::{Layer, Service};
use tracing::debug;

use crate::authz::Principal;
use crate::error::GatherError;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Types
// ═══════════════════════════════════════════════════════════════════════════════

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid authentication token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Malformed authorization header")]
    MalformedHeader,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (code, message) = match &self {
            Self::InvalidToken => ("INVALID_TOKEN", "The provided token is invalid"),
            Self::TokenExpired => ("TOKEN_EXPIRED", "The authentication token has expired"),
            Self::MalformedHeader => (
                "MALFORMED_AUTH_HEADER",
                "Expected an Authorization: Bearer <token> header",
            ),
        };

        counter!(
            "gather_auth_errors_total",
            "error_type" => code.to_string()
        )
        .increment(1);

        let body = serde_json::json!({
            "success": false,
            "error": {
                "code": code,
                "message": message,
            }
        });

        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// JWT Claims
// ═══════════════════════════════════════════════════════════════════════════════

/// JWT token claims issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (principal id)
    pub sub: String,

    /// Principal email (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Principal display name (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Granted roles
    #[serde(default)]
    pub roles: Vec<String>,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,

    /// Issuer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl Claims {
    /// Create new claims for a principal.
    pub fn new(principal_id: impl Into<String>, roles: Vec<String>, duration: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: principal_id.into(),
            email: None,
            name: None,
            roles,
            iat: now.timestamp(),
            exp: (now + duration).timestamp(),
            iss: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn into_principal(self) -> Principal {
        Principal {
            id: self.sub,
            email: self.email,
            name: self.name,
            roles: self.roles,
        }
    }
}

/// Sign a token for the given claims (test fixtures and operator tooling).
pub fn issue_token(claims: &Claims, secret: &str) -> Result<String, GatherError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| GatherError::internal(format!("failed to sign token: {}", e)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Config
// ═══════════════════════════════════════════════════════════════════════════════

/// Authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 shared secret for token verification.
    pub jwt_secret: String,

    /// Expected issuer; unchecked when `None`.
    pub issuer: Option<String>,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            issuer: None,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Layer / Service
// ═══════════════════════════════════════════════════════════════════════════════

/// Tower layer that resolves bearer tokens into request-scoped principals.
#[derive(Clone)]
pub struct AuthLayer {
    config: AuthConfig,
}

impl AuthLayer {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            config: self.config.clone(),
        }
    }
}

/// The service produced by [`AuthLayer`].
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    config: AuthConfig,
}

impl<S> Service<Request<Body>> for AuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let config = self.config.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let header = req
                .headers()
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            if let Some(header) = header {
                let token = match header.strip_prefix("Bearer ") {
                    Some(token) => token.trim().to_string(),
                    None => return Ok(AuthError::MalformedHeader.into_response()),
                };

                let decoded = decode::<Claims>(
                    &token,
                    &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
                    &config.validation(),
                );

                match decoded {
                    Ok(data) => {
                        let principal = data.claims.into_principal();
                        debug!(principal_id = %principal.id, "Authenticated request");
                        req.extensions_mut().insert(principal);
                    }
                    Err(e) => {
                        let error = match e.kind() {
                            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                                AuthError::TokenExpired
                            }
                            _ => AuthError::InvalidToken,
                        };
                        return Ok(error.into_response());
                    }
                }
            }

            inner.call(req).await
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Extractors
// ═══════════════════════════════════════════════════════════════════════════════

#[axum::async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = GatherError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| GatherError::unauthenticated("Authentication required"))
    }
}

/// Optional-principal extractor for endpoints that serve anonymous callers.
#[derive(Debug, Clone)]
pub struct MaybePrincipal(pub Option<Principal>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybePrincipal
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Principal>().cloned()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_round_trip() {
        let claims = Claims::new("user-1", vec!["moderator".to_string()], Duration::hours(1))
            .with_email("u@example.com")
            .with_name("User One");

        let token = issue_token(&claims, "secret").unwrap();
        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &AuthConfig::new("secret").validation(),
        )
        .unwrap();

        let principal = decoded.claims.into_principal();
        assert_eq!(principal.id, "user-1");
        assert_eq!(principal.email.as_deref(), Some("u@example.com"));
        assert!(principal.is_moderator());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let claims = Claims::new("user-1", vec![], Duration::hours(1));
        let token = issue_token(&claims, "secret").unwrap();

        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"other-secret"),
            &AuthConfig::new("other-secret").validation(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let claims = Claims::new("user-1", vec![], Duration::hours(-2));
        let token = issue_token(&claims, "secret").unwrap();

        let err = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &AuthConfig::new("secret").validation(),
        )
        .unwrap_err();
        assert!(matches!(
            err.kind(),
            jsonwebtoken::errors::ErrorKind::ExpiredSignature
        ));
    }
}
