//! API routes for Gather Core.
//!
//! # Endpoints
//!
//! ## Events
//! - `GET    /api/events` - List events (filters, search, pagination)
//! - `POST   /api/events` - Create a new event
//! - `GET    /api/events/categories` - The fixed category list
//! - `GET    /api/events/:id` - Get event by ID (bumps view count)
//! - `PUT    /api/events/:id` - Update an event (owner/moderator)
//! - `DELETE /api/events/:id` - Delete an event + cascade (owner/moderator)
//! - `POST   /api/events/:id/status` - Moderation status transition
//!
//! ## Registrations
//! - `GET    /api/registrations` - Own registrations, or an event's attendees
//! - `POST   /api/registrations` - Register for an event
//! - `DELETE /api/registrations/:id` - Cancel a registration
//!
//! ## Profiles
//! - `GET    /api/profiles/me` - Resolve (or lazily create) own profile
//! - `PUT    /api/profiles/me` - Update own profile

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use super::{handlers, AppState};

/// Build the `/api` router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Event endpoints
        .route("/events", get(handlers::list_events))
        .route("/events", post(handlers::create_event))
        .route("/events/categories", get(handlers::list_categories))
        .route("/events/:id", get(handlers::get_event))
        .route("/events/:id", put(handlers::update_event))
        .route("/events/:id", delete(handlers::delete_event))
        .route("/events/:id/status", post(handlers::transition_event))
        // Registration endpoints
        .route("/registrations", get(handlers::list_registrations))
        .route("/registrations", post(handlers::create_registration))
        .route("/registrations/:id", delete(handlers::cancel_registration))
        // Profile endpoints
        .route("/profiles/me", get(handlers::get_my_profile))
        .route("/profiles/me", put(handlers::update_my_profile))
}

/// Route constants for use in clients and documentation.
pub mod paths {
    pub const EVENTS: &str = "/api/events";
    pub const EVENT: &str = "/api/events/:id";
    pub const EVENT_STATUS: &str = "/api/events/:id/status";
    pub const CATEGORIES: &str = "/api/events/categories";

    pub const REGISTRATIONS: &str = "/api/registrations";
    pub const REGISTRATION: &str = "/api/registrations/:id";

    pub const PROFILE_ME: &str = "/api/profiles/me";
}
