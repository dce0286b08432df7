//! API request handlers with proper error propagation.
//!
//! All handlers return `Result<impl IntoResponse, GatherError>` so that
//! errors are automatically converted to appropriate HTTP status codes via
//! the `IntoResponse` implementation on `GatherError`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use super::{ApiResponse, AppState};
use crate::authz::Principal;
use crate::error::GatherError;
use crate::events::{Category, Event, EventDraft, EventStatus};
use crate::middleware::MaybePrincipal;
use crate::pagination::{Cursor, SortDirection};
use crate::profiles::ProfilePatch;
use crate::query::EventFilter;
use crate::validation::{ValidationErrorKind, ValidationErrors};

// ═══════════════════════════════════════════════════════════════════════════════
// Health / Metrics
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => handle.render(),
        None => String::new(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Events
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListEventsParams {
    pub status: Option<String>,
    pub category: Option<String>,
    pub creator_id: Option<String>,
    pub is_public: Option<bool>,
    pub search: Option<String>,
    pub order_by: Option<String>,
    pub order: Option<String>,
    pub limit: Option<usize>,
    pub start_after: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsResponse {
    pub success: bool,
    pub events: Vec<Event>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl ListEventsParams {
    /// Parse the raw query params, accumulating every invalid one.
    fn into_filter(self) -> Result<EventFilter, GatherError> {
        let mut errors = ValidationErrors::new();
        let mut filter = EventFilter {
            creator_id: self.creator_id,
            is_public: self.is_public,
            search: self.search,
            order_by: self.order_by,
            limit: self.limit,
            ..Default::default()
        };

        if let Some(raw) = &self.status {
            match EventStatus::parse(raw) {
                Some(status) => filter.status = Some(status),
                None => errors.add_error(
                    "status",
                    ValidationErrorKind::NotInSet {
                        allowed: vec![
                            "pending".into(),
                            "approved".into(),
                            "rejected".into(),
                            "cancelled".into(),
                        ],
                    },
                ),
            }
        }
        if let Some(raw) = &self.category {
            match Category::parse(raw) {
                Some(category) => filter.category = Some(category),
                None => errors.add_error(
                    "category",
                    ValidationErrorKind::NotInSet {
                        allowed: Category::names(),
                    },
                ),
            }
        }
        if let Some(raw) = &self.order {
            match raw.parse::<SortDirection>() {
                Ok(direction) => filter.direction = Some(direction),
                Err(_) => errors.add_error(
                    "order",
                    ValidationErrorKind::NotInSet {
                        allowed: vec!["asc".into(), "desc".into()],
                    },
                ),
            }
        }

        errors.into_result()?;

        // Cursor decoding reports its own validation error.
        if let Some(token) = &self.start_after {
            filter.start_after = Some(Cursor::decode(token)?);
        }

        Ok(filter)
    }
}

/// Restrict the filter to what the caller may see.
///
/// Anonymous callers and authenticated callers browsing other people's
/// events are pinned to approved, public events. A caller filtering on
/// their own `creatorId` sees all of their events regardless of status or
/// visibility ("my events"). Moderators see everything.
fn scope_filter(filter: &mut EventFilter, principal: Option<&Principal>) {
    let is_moderator = principal.map(|p| p.is_moderator()).unwrap_or(false);
    if is_moderator {
        if filter.status.is_none() {
            filter.status = Some(EventStatus::Approved);
        }
        return;
    }

    let own_events = matches!(
        (principal, filter.creator_id.as_deref()),
        (Some(p), Some(creator)) if p.id == creator
    );
    if !own_events {
        filter.status = Some(EventStatus::Approved);
        filter.is_public = Some(true);
    }
}

pub async fn list_events(
    State(state): State<AppState>,
    MaybePrincipal(principal): MaybePrincipal,
    Query(params): Query<ListEventsParams>,
) -> Result<impl IntoResponse, GatherError> {
    let mut filter = params.into_filter()?;
    scope_filter(&mut filter, principal.as_ref());

    let page = state.query.list(&filter).await?;

    Ok(Json(ListEventsResponse {
        success: true,
        count: page.count,
        next_cursor: page.next_cursor,
        events: page.events,
    }))
}

pub async fn create_event(
    State(state): State<AppState>,
    principal: Principal,
    Json(draft): Json<EventDraft>,
) -> Result<impl IntoResponse, GatherError> {
    let event = state.events.create(&principal, &draft).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(event))))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatherError> {
    let event = state.events.get(&id).await?;
    Ok(Json(ApiResponse::success(event)))
}

pub async fn update_event(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(patch): Json<serde_json::Value>,
) -> Result<impl IntoResponse, GatherError> {
    let event = state.events.update(&principal, &id, &patch).await?;
    Ok(Json(ApiResponse::success(event)))
}

pub async fn delete_event(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatherError> {
    state.events.delete(&principal, &id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "id": id,
        "deleted": true
    }))))
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: String,
}

pub async fn transition_event(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(req): Json<TransitionRequest>,
) -> Result<impl IntoResponse, GatherError> {
    let target = EventStatus::parse(&req.status).ok_or_else(|| {
        let mut errors = ValidationErrors::new();
        errors.add_error(
            "status",
            ValidationErrorKind::NotInSet {
                allowed: vec!["approved".into(), "rejected".into(), "cancelled".into()],
            },
        );
        GatherError::validation(errors)
    })?;

    let event = state.events.transition(&principal, &id, target).await?;
    Ok(Json(ApiResponse::success(event)))
}

pub async fn list_categories() -> impl IntoResponse {
    Json(serde_json::json!({
        "success": true,
        "categories": Category::names()
    }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registrations
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub event_id: Option<String>,
}

pub async fn create_registration(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, GatherError> {
    let event_id = match req.event_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            let mut errors = ValidationErrors::new();
            errors.add_required("eventId");
            return Err(GatherError::validation(errors));
        }
    };

    let registration = state.registrations.register(&principal, &event_id).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(registration))))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListRegistrationsParams {
    pub event_id: Option<String>,
}

pub async fn list_registrations(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<ListRegistrationsParams>,
) -> Result<impl IntoResponse, GatherError> {
    let registrations = match params.event_id.as_deref() {
        Some(event_id) => {
            state
                .registrations
                .list_for_event(&principal, event_id)
                .await?
        }
        None => state.registrations.list_for_user(&principal.id).await?,
    };

    let count = registrations.len();
    Ok(Json(serde_json::json!({
        "success": true,
        "registrations": registrations,
        "count": count
    })))
}

pub async fn cancel_registration(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatherError> {
    let registration = state.registrations.cancel(&principal, &id).await?;
    Ok(Json(ApiResponse::success(registration)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Profiles
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn get_my_profile(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, GatherError> {
    let profile = state.profiles.resolve(&principal).await?;
    Ok(Json(ApiResponse::success(profile)))
}

pub async fn update_my_profile(
    State(state): State<AppState>,
    principal: Principal,
    Json(patch): Json<ProfilePatch>,
) -> Result<impl IntoResponse, GatherError> {
    let profile = state
        .profiles
        .update(&principal, &principal.id.clone(), &patch)
        .await?;
    Ok(Json(ApiResponse::success(profile)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_parse_valid_filter() {
        let params = ListEventsParams {
            status: Some("pending".to_string()),
            category: Some("Music".to_string()),
            order: Some("asc".to_string()),
            limit: Some(5),
            ..Default::default()
        };

        let filter = params.into_filter().unwrap();
        assert_eq!(filter.status, Some(EventStatus::Pending));
        assert_eq!(filter.category, Some(Category::Music));
        assert_eq!(filter.direction, Some(SortDirection::Asc));
        assert_eq!(filter.limit, Some(5));
    }

    #[test]
    fn test_params_accumulate_every_invalid_field() {
        let params = ListEventsParams {
            status: Some("published".to_string()),
            category: Some("Knitting".to_string()),
            order: Some("sideways".to_string()),
            ..Default::default()
        };

        let err = params.into_filter().unwrap_err();
        let fields = err.field_errors().unwrap();
        assert!(fields.has_errors("status"));
        assert!(fields.has_errors("category"));
        assert!(fields.has_errors("order"));
    }

    #[test]
    fn test_scope_filter_pins_anonymous_to_approved_public() {
        let mut filter = EventFilter {
            status: Some(EventStatus::Pending),
            is_public: Some(false),
            ..Default::default()
        };
        scope_filter(&mut filter, None);
        assert_eq!(filter.status, Some(EventStatus::Approved));
        assert_eq!(filter.is_public, Some(true));
    }

    #[test]
    fn test_scope_filter_allows_own_events_any_status() {
        let principal = Principal::new("user-1");
        let mut filter = EventFilter {
            status: Some(EventStatus::Pending),
            creator_id: Some("user-1".to_string()),
            ..Default::default()
        };
        scope_filter(&mut filter, Some(&principal));
        assert_eq!(filter.status, Some(EventStatus::Pending));
        assert!(filter.is_public.is_none());
    }

    #[test]
    fn test_scope_filter_pins_other_creators_to_public() {
        let principal = Principal::new("user-1");
        let mut filter = EventFilter {
            status: Some(EventStatus::Pending),
            creator_id: Some("user-2".to_string()),
            ..Default::default()
        };
        scope_filter(&mut filter, Some(&principal));
        assert_eq!(filter.status, Some(EventStatus::Approved));
        assert_eq!(filter.is_public, Some(true));
    }

    #[test]
    fn test_scope_filter_lets_moderators_through() {
        let moderator = Principal::new("mod-1").with_role(crate::authz::MODERATOR_ROLE);
        let mut filter = EventFilter {
            status: Some(EventStatus::Pending),
            ..Default::default()
        };
        scope_filter(&mut filter, Some(&moderator));
        assert_eq!(filter.status, Some(EventStatus::Pending));
    }
}
