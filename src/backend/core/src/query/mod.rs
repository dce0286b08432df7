//! Filtered, ordered, paginated views over the event collection.
//!
//! Composition order matters: equality filters, ordering, limit, and the
//! resume cursor run store-side; the free-text `search` runs client-side on
//! the returned page, because the store's native query has no substring
//! matching. A `search` combined with `limit` can therefore return fewer
//! than `limit` events even when more matches exist deeper in the
//! collection. That is a documented limitation, not a bug: the `next_cursor`
//! always points past the last *scanned* row, so callers keep paging to
//! find further matches.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::{ErrorCode, GatherError, Result};
use crate::events::{self, Category, Event, EventStatus};
use crate::pagination::{Cursor, SortDirection};
use crate::store::{DocumentStore, StoreQuery};

/// Default page size.
pub const DEFAULT_LIMIT: usize = 20;
/// Hard cap on page size.
pub const MAX_LIMIT: usize = 100;

/// Fields the collection can be ordered by.
const ORDERABLE_FIELDS: [&str; 4] = ["createdAt", "startDate", "title", "viewCount"];

// ═══════════════════════════════════════════════════════════════════════════════
// Filter
// ═══════════════════════════════════════════════════════════════════════════════

/// Recognized listing options.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Moderation status; handlers pin anonymous callers to `approved`.
    pub status: Option<EventStatus>,
    /// Exact category match.
    pub category: Option<Category>,
    /// Exact creator match ("my events" views).
    pub creator_id: Option<String>,
    /// Visibility filter; handlers pin anonymous callers to `true`.
    pub is_public: Option<bool>,
    /// Case-insensitive substring over title, description, organizer name.
    pub search: Option<String>,
    /// Order-by field; defaults to `createdAt`.
    pub order_by: Option<String>,
    /// Order direction; defaults to descending.
    pub direction: Option<SortDirection>,
    /// Page size; clamped to [1, MAX_LIMIT].
    pub limit: Option<usize>,
    /// Resume cursor from a previous page.
    pub start_after: Option<Cursor>,
}

impl EventFilter {
    /// The effective page size.
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    fn effective_order(&self) -> Result<(&str, SortDirection)> {
        let field = self.order_by.as_deref().unwrap_or("createdAt");
        if !ORDERABLE_FIELDS.contains(&field) {
            return Err(GatherError::new(
                ErrorCode::ValidationError,
                format!(
                    "Cannot order by {}; valid fields: {}",
                    field,
                    ORDERABLE_FIELDS.join(", ")
                ),
            ));
        }
        Ok((field, self.direction.unwrap_or(SortDirection::Desc)))
    }
}

/// One page of listing results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPage {
    pub events: Vec<Event>,
    /// Number of events in this page (after the search filter).
    pub count: usize,
    /// Opaque token resuming the scan after the last scanned row; absent on
    /// the final page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Engine
// ═══════════════════════════════════════════════════════════════════════════════

/// Builds filtered views over the event collection.
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn DocumentStore>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// List events matching `filter`. Finite and restartable via the
    /// returned cursor.
    pub async fn list(&self, filter: &EventFilter) -> Result<EventPage> {
        let (order_field, direction) = filter.effective_order()?;
        let limit = filter.effective_limit();

        let mut query = StoreQuery::new()
            .order_by(order_field, direction)
            .limit(limit);

        if let Some(status) = filter.status {
            query = query.filter("status", status.as_str());
        }
        if let Some(category) = filter.category {
            query = query.filter("category", category.name());
        }
        if let Some(creator_id) = &filter.creator_id {
            query = query.filter("creatorId", creator_id.clone());
        }
        if let Some(is_public) = filter.is_public {
            query = query.filter("isPublic", is_public);
        }
        if let Some(cursor) = &filter.start_after {
            query = query.start_after(cursor.value.clone(), cursor.id.clone());
        }

        let docs = self
            .store
            .query(events::COLLECTION, &query)
            .await
            .map_err(GatherError::from)?;

        // Cursor from the last scanned row, before the search filter.
        let next_cursor = if docs.len() == limit {
            docs.last().map(|doc| {
                let value = doc.data.get(order_field).cloned().unwrap_or(Value::Null);
                Cursor::new(value, doc.id.clone()).encode()
            })
        } else {
            None
        };

        let mut events = Vec::with_capacity(docs.len());
        for doc in &docs {
            events.push(doc.decode::<Event>().map_err(GatherError::from)?);
        }

        if let Some(search) = filter.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                let needle = search.to_lowercase();
                events.retain(|event| matches_search(event, &needle));
            }
        }

        Ok(EventPage {
            count: events.len(),
            next_cursor,
            events,
        })
    }
}

fn matches_search(event: &Event, needle: &str) -> bool {
    event.title.to_lowercase().contains(needle)
        || event.description.to_lowercase().contains(needle)
        || event
            .organizer
            .name
            .as_deref()
            .map(|n| n.to_lowercase().contains(needle))
            .unwrap_or(false)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
