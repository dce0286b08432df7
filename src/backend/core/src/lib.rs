//! # Gather Core
//!
//! Community-events backend: event lifecycle, ownership authorization, and
//! capacity-bounded registration over a document-store seam.
//!
//! ## Architecture
//!
//! - **Event Store**: entity lifecycle and the moderation state machine
//! - **Authorization Guard**: pure (principal, event, action) decisions
//! - **Registration Ledger**: transactional compare-and-increment capacity
//!   enforcement
//! - **Query Engine**: filtered, ordered, paginated listings with
//!   client-side search
//! - **Profile Resolver**: lazily created per-principal profiles
//! - **Store**: the `DocumentStore` trait and the in-memory implementation
//! - **API**: axum adapter, auth middleware, error taxonomy, observability

pub mod api;
pub mod authz;
pub mod config;
pub mod error;
pub mod events;
pub mod middleware;
pub mod observability;
pub mod pagination;
pub mod profiles;
pub mod query;
pub mod registrations;
pub mod store;
pub mod validation;

pub use error::{ErrorCode, ErrorResponse, GatherError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::{build_router, ApiResponse, AppState};
    pub use crate::authz::{can_mutate, Action, Decision, Principal};
    pub use crate::config::Config;
    pub use crate::error::{ErrorCode, ErrorResponse, GatherError, Result};
    pub use crate::events::{
        Category, Event, EventDraft, EventPatch, EventStatus, EventStore, Location, Organizer,
    };
    pub use crate::middleware::{issue_token, AuthConfig, AuthLayer, Claims, MaybePrincipal};
    pub use crate::pagination::{Cursor, SortDirection};
    pub use crate::profiles::{Profile, ProfilePatch, ProfileResolver};
    pub use crate::query::{EventFilter, EventPage, QueryEngine};
    pub use crate::registrations::{
        Registration, RegistrationLedger, RegistrationStatus, RetryPolicy,
    };
    pub use crate::store::{
        Document, DocumentStore, MemoryStore, StoreError, StoreQuery, Transaction, WriteGuard,
    };
    pub use crate::validation::{FieldError, ValidationErrorKind, ValidationErrors};
}
