//! HTTP API layer for Gather Core.
//!
//! A thin axum adapter over the core components: handlers parse the wire
//! shapes, resolve the principal, and delegate; every business rule lives in
//! the components. All responses share the `{"success": bool, ...}`
//! envelope.

mod handlers;
pub mod routes;

use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::events::EventStore;
use crate::middleware::{AuthConfig, AuthLayer};
use crate::profiles::ProfileResolver;
use crate::query::QueryEngine;
use crate::registrations::RegistrationLedger;
use crate::store::DocumentStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub events: EventStore,
    pub registrations: RegistrationLedger,
    pub profiles: ProfileResolver,
    pub query: QueryEngine,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire the components over a shared store per configuration.
    pub fn new(store: Arc<dyn DocumentStore>, config: &Config) -> Self {
        Self {
            events: EventStore::new(store.clone(), config.events.auto_approve),
            registrations: RegistrationLedger::new(
                store.clone(),
                config.registrations.retry_policy(),
            ),
            profiles: ProfileResolver::new(store.clone()),
            query: QueryEngine::new(store),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Build the API router.
///
/// - Unversioned `/health` and `/metrics`
/// - The REST surface under `/api`
/// - Auth, trace, compression, and CORS layers
pub fn build_router(state: AppState, auth: AuthConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::prometheus_metrics))
        .nest("/api", routes::api_router())
        .layer(AuthLayer::new(auth))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// API response wrapper.
#[derive(serde::Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}
