//! HTTP middleware.

pub mod auth;

pub use auth::{issue_token, AuthConfig, AuthError, AuthLayer, Claims, MaybePrincipal};
