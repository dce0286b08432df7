//! The registration ledger: capacity enforcement under concurrency.
//!
//! Registering is a read-then-conditional-write: the capacity check runs
//! against a freshly read event document, and the registration insert plus
//! the `attendeeCount` increment commit in one transaction guarded by that
//! document's version. A concurrent writer invalidates the guard, the store
//! reports a write conflict, and the whole pipeline retries from the read —
//! never a bare `count + 1` against stale state.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use tracing::{debug, info, warn};

use super::model::{registration_id, Registration, RegistrationStatus, COLLECTION};
use crate::authz::Principal;
use crate::error::{ErrorCode, GatherError, Result};
use crate::events::{self, Event};
use crate::pagination::SortDirection;
use crate::store::{DocumentStore, StoreError, StoreQuery, Transaction};

/// Retry policy for the registration transaction.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts before surfacing `Conflict`.
    pub max_attempts: u32,
    /// Base backoff; doubles per attempt.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff: Duration::from_millis(25),
        }
    }
}

/// Creates and cancels registrations while maintaining the owning event's
/// `attendeeCount`.
#[derive(Clone)]
pub struct RegistrationLedger {
    store: Arc<dyn DocumentStore>,
    retry: RetryPolicy,
}

impl RegistrationLedger {
    pub fn new(store: Arc<dyn DocumentStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Register
    // ─────────────────────────────────────────────────────────────────────────

    /// Register `principal` for an event.
    ///
    /// Failure modes, in check order: `NotFound`, `InvalidState` (not
    /// approved / not public), `RegistrationClosed` (no registration or
    /// deadline passed), `AlreadyRegistered`, `CapacityExceeded`, and
    /// `Conflict` once retries are exhausted.
    pub async fn register(&self, principal: &Principal, event_id: &str) -> Result<Registration> {
        for attempt in 1..=self.retry.max_attempts {
            let event_doc = self
                .store
                .get(events::COLLECTION, event_id)
                .await
                .map_err(GatherError::from)?
                .ok_or_else(|| GatherError::not_found("Event", event_id))?;
            let event: Event = event_doc.decode().map_err(GatherError::from)?;

            if event.status != events::EventStatus::Approved || !event.is_public {
                return Err(GatherError::invalid_state(
                    "Registrations are only accepted for approved public events",
                ));
            }
            if !event.requires_registration {
                return Err(GatherError::new(
                    ErrorCode::RegistrationClosed,
                    "This event does not take registrations",
                ));
            }
            if event.registration_deadline_passed(Utc::now()) {
                return Err(GatherError::new(
                    ErrorCode::RegistrationClosed,
                    "The registration deadline has passed",
                ));
            }

            let reg_id = registration_id(event_id, &principal.id);
            let existing = self
                .store
                .get(COLLECTION, &reg_id)
                .await
                .map_err(GatherError::from)?;
            if let Some(doc) = &existing {
                let registration: Registration = doc.decode().map_err(GatherError::from)?;
                if registration.is_confirmed() {
                    return Err(GatherError::new(
                        ErrorCode::AlreadyRegistered,
                        "You are already registered for this event",
                    ));
                }
            }

            // Capacity check against the same read that guards the commit.
            if let Some(capacity) = event.capacity {
                if event.attendee_count >= capacity {
                    counter!("gather_registrations_total", "outcome" => "capacity_exceeded")
                        .increment(1);
                    return Err(GatherError::new(
                        ErrorCode::CapacityExceeded,
                        "This event is at capacity",
                    )
                    .with_context("capacity", capacity));
                }
            }

            let registration = Registration {
                id: reg_id.clone(),
                event_id: event_id.to_string(),
                user_id: principal.id.clone(),
                user_email: principal.email.clone(),
                user_name: principal.name.clone(),
                status: RegistrationStatus::Confirmed,
                registered_at: Utc::now(),
            };
            let registration_data = serde_json::to_value(&registration)?;

            let mut updated = event.clone();
            updated.attendee_count += 1;
            updated.updated_at = Utc::now();
            let event_data = serde_json::to_value(&updated)?;

            let tx = Transaction::new().update(
                events::COLLECTION,
                event_id,
                event_doc.version,
                event_data,
            );
            let tx = match &existing {
                // Reviving a cancelled registration reuses its document.
                Some(doc) => tx.update(COLLECTION, &reg_id, doc.version, registration_data),
                None => tx.create(COLLECTION, &reg_id, registration_data),
            };

            match self.store.commit(tx).await {
                Ok(()) => {
                    counter!("gather_registrations_total", "outcome" => "confirmed").increment(1);
                    info!(
                        event_id = %event_id,
                        user_id = %principal.id,
                        attendee_count = updated.attendee_count,
                        "Registration confirmed"
                    );
                    return Ok(registration);
                }
                Err(StoreError::WriteConflict { .. }) => {
                    counter!("gather_registration_conflicts_total").increment(1);
                    debug!(
                        event_id = %event_id,
                        user_id = %principal.id,
                        attempt,
                        "Registration transaction conflicted; retrying"
                    );
                    if attempt < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.backoff * 2u32.pow(attempt - 1)).await;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        counter!("gather_registrations_total", "outcome" => "conflict").increment(1);
        warn!(
            event_id = %event_id,
            user_id = %principal.id,
            attempts = self.retry.max_attempts,
            "Registration retries exhausted"
        );
        Err(GatherError::conflict("Event", event_id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cancel
    // ─────────────────────────────────────────────────────────────────────────

    /// Cancel a registration (registrant or moderator only).
    ///
    /// Sets status to `cancelled` and decrements the event's
    /// `attendeeCount` in the same transaction, floored at zero. The status
    /// check makes the decrement idempotent: cancelling twice fails with
    /// `InvalidState` instead of decrementing twice.
    pub async fn cancel(&self, principal: &Principal, registration_id: &str) -> Result<Registration> {
        for attempt in 1..=self.retry.max_attempts {
            let reg_doc = self
                .store
                .get(COLLECTION, registration_id)
                .await
                .map_err(GatherError::from)?
                .ok_or_else(|| GatherError::not_found("Registration", registration_id))?;
            let registration: Registration = reg_doc.decode().map_err(GatherError::from)?;

            if registration.user_id != principal.id && !principal.is_moderator() {
                return Err(GatherError::forbidden(
                    "Only the registrant or a moderator may cancel a registration",
                ));
            }
            if !registration.is_confirmed() {
                return Err(GatherError::invalid_state(
                    "Registration is already cancelled",
                ));
            }

            let mut updated_reg = registration.clone();
            updated_reg.status = RegistrationStatus::Cancelled;
            let reg_data = serde_json::to_value(&updated_reg)?;

            let mut tx =
                Transaction::new().update(COLLECTION, registration_id, reg_doc.version, reg_data);

            // The event may already be gone (delete cascade in flight).
            let event_doc = self
                .store
                .get(events::COLLECTION, &registration.event_id)
                .await
                .map_err(GatherError::from)?;
            if let Some(event_doc) = &event_doc {
                let mut event: Event = event_doc.decode().map_err(GatherError::from)?;
                event.attendee_count = event.attendee_count.saturating_sub(1);
                event.updated_at = Utc::now();
                let event_data = serde_json::to_value(&event)?;
                tx = tx.update(
                    events::COLLECTION,
                    &registration.event_id,
                    event_doc.version,
                    event_data,
                );
            }

            match self.store.commit(tx).await {
                Ok(()) => {
                    counter!("gather_registrations_total", "outcome" => "cancelled").increment(1);
                    info!(
                        registration_id = %registration_id,
                        event_id = %registration.event_id,
                        user_id = %registration.user_id,
                        "Registration cancelled"
                    );
                    return Ok(updated_reg);
                }
                Err(StoreError::WriteConflict { .. }) => {
                    counter!("gather_registration_conflicts_total").increment(1);
                    debug!(
                        registration_id = %registration_id,
                        attempt,
                        "Cancellation transaction conflicted; retrying"
                    );
                    if attempt < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.backoff * 2u32.pow(attempt - 1)).await;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(GatherError::conflict("Registration", registration_id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Listing
    // ─────────────────────────────────────────────────────────────────────────

    /// List a user's own registrations, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Registration>> {
        let query = StoreQuery::new()
            .filter("userId", user_id.to_string())
            .order_by("registeredAt", SortDirection::Desc);
        self.fetch(&query).await
    }

    /// List an event's registrations (event owner or moderator only).
    pub async fn list_for_event(
        &self,
        principal: &Principal,
        event_id: &str,
    ) -> Result<Vec<Registration>> {
        let event_doc = self
            .store
            .get(events::COLLECTION, event_id)
            .await
            .map_err(GatherError::from)?
            .ok_or_else(|| GatherError::not_found("Event", event_id))?;
        let event: Event = event_doc.decode().map_err(GatherError::from)?;

        if event.creator_id != principal.id && !principal.is_moderator() {
            return Err(GatherError::forbidden(
                "Only the event owner or a moderator may list attendees",
            ));
        }

        let query = StoreQuery::new()
            .filter("eventId", event_id.to_string())
            .order_by("registeredAt", SortDirection::Desc);
        self.fetch(&query).await
    }

    async fn fetch(&self, query: &StoreQuery) -> Result<Vec<Registration>> {
        let docs = self
            .store
            .query(COLLECTION, query)
            .await
            .map_err(GatherError::from)?;
        docs.iter()
            .map(|doc| doc.decode::<Registration>().map_err(GatherError::from))
            .collect()
    }
}
