//! The event store: lifecycle operations over the document-store seam.
//!
//! Owns creation policy, the moderation state machine, immutable-field
//! enforcement, and the delete cascade. Every mutation re-reads the current
//! document and commits through a version guard, so a concurrent
//! registration's `attendeeCount` write is never clobbered by a stale
//! full-document overwrite.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use super::model::{Event, EventDraft, EventPatch, EventStatus, COLLECTION};
use crate::authz::{self, Action, Principal};
use crate::error::{GatherError, Result};
use crate::registrations;
use crate::store::{Document, DocumentStore, StoreError, StoreQuery, Transaction};

/// Attempts for version-guarded writes before surfacing `Conflict`.
const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Event lifecycle operations.
#[derive(Clone)]
pub struct EventStore {
    store: Arc<dyn DocumentStore>,
    auto_approve: bool,
}

impl EventStore {
    pub fn new(store: Arc<dyn DocumentStore>, auto_approve: bool) -> Self {
        Self {
            store,
            auto_approve,
        }
    }

    /// The status newly created events start in, per deployment policy.
    pub fn initial_status(&self) -> EventStatus {
        if self.auto_approve {
            EventStatus::Approved
        } else {
            EventStatus::Pending
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Create / Read
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate and persist a new event.
    pub async fn create(&self, principal: &Principal, draft: &EventDraft) -> Result<Event> {
        let mut event = draft.build(principal, self.initial_status(), Utc::now())?;
        event.id = Uuid::new_v4().to_string();

        let data = serde_json::to_value(&event)?;
        self.store
            .commit(Transaction::new().create(COLLECTION, &event.id, data))
            .await?;

        counter!("gather_events_created_total", "status" => event.status.to_string())
            .increment(1);
        info!(
            event_id = %event.id,
            creator_id = %event.creator_id,
            status = %event.status,
            "Event created"
        );

        Ok(event)
    }

    /// Fetch an event and bump its view counter.
    ///
    /// The increment is best-effort: it commits through a version guard so it
    /// can never clobber a concurrent registration write, and a conflict
    /// simply drops the increment (the counter is advisory).
    pub async fn get(&self, id: &str) -> Result<Event> {
        let doc = self.load(id).await?;
        let mut event: Event = doc.decode().map_err(GatherError::from)?;

        event.view_count += 1;
        let data = serde_json::to_value(&event)?;
        match self
            .store
            .commit(Transaction::new().update(COLLECTION, id, doc.version, data))
            .await
        {
            Ok(()) => {}
            Err(StoreError::WriteConflict { .. }) => {
                debug!(event_id = %id, "Dropped view count increment after write conflict");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(event)
    }

    /// Fetch an event without side effects.
    pub async fn peek(&self, id: &str) -> Result<Event> {
        let doc = self.load(id).await?;
        doc.decode().map_err(GatherError::from)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Update
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply a partial update on behalf of `principal`.
    ///
    /// Order of checks: existence, then authorization, then field validation.
    /// Immutable fields (`id`, `creatorId`, `createdAt`, `attendeeCount`,
    /// `viewCount`, `status`) are rejected by name.
    pub async fn update(&self, principal: &Principal, id: &str, raw: &Value) -> Result<Event> {
        let patch = {
            // Existence and authorization are confirmed before validation so
            // a probing caller learns nothing from the error shape.
            let doc = self.load(id).await?;
            let event: Event = doc.decode().map_err(GatherError::from)?;
            authz::ensure_can_mutate(principal, &event, Action::Update)?;
            EventPatch::from_json(raw)?
        };

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let doc = self.load(id).await?;
            let mut event: Event = doc.decode().map_err(GatherError::from)?;
            authz::ensure_can_mutate(principal, &event, Action::Update)?;

            patch.apply(&mut event, Utc::now())?;

            let data = serde_json::to_value(&event)?;
            match self
                .store
                .commit(Transaction::new().update(COLLECTION, id, doc.version, data))
                .await
            {
                Ok(()) => {
                    info!(event_id = %id, principal_id = %principal.id, "Event updated");
                    return Ok(event);
                }
                Err(StoreError::WriteConflict { .. }) => {
                    debug!(event_id = %id, attempt, "Retrying event update after write conflict");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(GatherError::conflict("Event", id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Status transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// Transition an event's moderation status.
    ///
    /// `approved`/`rejected` require the moderator role and a `pending`
    /// event; `cancelled` requires the creator (or a moderator), an
    /// `approved` event, and an end time still in the future.
    pub async fn transition(
        &self,
        principal: &Principal,
        id: &str,
        target: EventStatus,
    ) -> Result<Event> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let doc = self.load(id).await?;
            let mut event: Event = doc.decode().map_err(GatherError::from)?;

            let action = match target {
                EventStatus::Approved | EventStatus::Rejected => Action::Moderate,
                EventStatus::Cancelled => Action::Update,
                EventStatus::Pending => {
                    return Err(GatherError::invalid_state(
                        "Events cannot be moved back to pending",
                    ))
                }
            };
            authz::ensure_can_mutate(principal, &event, action)?;

            if !event.status.can_transition(target) {
                return Err(GatherError::invalid_state(format!(
                    "Cannot transition event from {} to {}",
                    event.status, target
                )));
            }
            if target == EventStatus::Cancelled && event.has_ended(Utc::now()) {
                return Err(GatherError::invalid_state(
                    "Cannot cancel an event that has already ended",
                ));
            }

            let from = event.status;
            event.status = target;
            event.updated_at = Utc::now();

            let data = serde_json::to_value(&event)?;
            match self
                .store
                .commit(Transaction::new().update(COLLECTION, id, doc.version, data))
                .await
            {
                Ok(()) => {
                    counter!(
                        "gather_event_transitions_total",
                        "from" => from.to_string(),
                        "to" => target.to_string(),
                    )
                    .increment(1);
                    info!(
                        event_id = %id,
                        principal_id = %principal.id,
                        from = %from,
                        to = %target,
                        "Event status transition"
                    );
                    return Ok(event);
                }
                Err(StoreError::WriteConflict { .. }) => {
                    debug!(event_id = %id, attempt, "Retrying status transition after write conflict");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(GatherError::conflict("Event", id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Delete
    // ─────────────────────────────────────────────────────────────────────────

    /// Delete an event and cascade to its registrations.
    ///
    /// The event deletion is version-guarded inside the same transaction as
    /// the registration deletes: a registration committed between our scan
    /// and the commit bumps the event version, aborts the cascade, and the
    /// loop re-scans. No orphan registrations survive.
    pub async fn delete(&self, principal: &Principal, id: &str) -> Result<()> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let doc = self.load(id).await?;
            let event: Event = doc.decode().map_err(GatherError::from)?;
            authz::ensure_can_mutate(principal, &event, Action::Delete)?;

            let query = StoreQuery::new().filter("eventId", id.to_string());
            let regs = self
                .store
                .query(registrations::COLLECTION, &query)
                .await
                .map_err(GatherError::from)?;

            let mut tx = Transaction::new().delete_versioned(COLLECTION, id, doc.version);
            for reg in &regs {
                tx = tx.delete(registrations::COLLECTION, &reg.id);
            }

            match self.store.commit(tx).await {
                Ok(()) => {
                    counter!("gather_events_deleted_total").increment(1);
                    info!(
                        event_id = %id,
                        principal_id = %principal.id,
                        cascaded_registrations = regs.len(),
                        "Event deleted"
                    );
                    return Ok(());
                }
                Err(StoreError::WriteConflict { .. }) => {
                    debug!(event_id = %id, attempt, "Retrying event delete after write conflict");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(GatherError::conflict("Event", id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    async fn load(&self, id: &str) -> Result<Document> {
        self.store
            .get(COLLECTION, id)
            .await
            .map_err(GatherError::from)?
            .ok_or_else(|| GatherError::not_found("Event", id))
    }
}
