//! Event store lifecycle tests: creation round-trips, view counting,
//! authorization on mutation, immutable fields, the moderation state
//! machine, and the delete cascade.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use gather_core::authz::Principal;
use gather_core::error::ErrorCode;
use gather_core::events::{Category, EventDraft, EventStatus, EventStore, Location};
use gather_core::registrations::{RegistrationLedger, RetryPolicy};
use gather_core::store::MemoryStore;
use serde_json::json;

fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

fn events_over(store: Arc<MemoryStore>, auto_approve: bool) -> EventStore {
    EventStore::new(store, auto_approve)
}

fn ledger_over(store: Arc<MemoryStore>) -> RegistrationLedger {
    RegistrationLedger::new(
        store,
        RetryPolicy {
            max_attempts: 8,
            backoff: Duration::from_millis(1),
        },
    )
}

fn creator() -> Principal {
    Principal::new("creator-1")
        .with_email("creator@example.com")
        .with_name("Creator")
}

fn moderator() -> Principal {
    Principal::new("mod-1").with_role("moderator")
}

fn draft() -> EventDraft {
    EventDraft {
        title: Some("Jazz Night".to_string()),
        description: Some("An evening of live jazz".to_string()),
        category: Some("Music".to_string()),
        tags: vec!["jazz".to_string(), "live".to_string()],
        start_date: Some((Utc::now() + ChronoDuration::days(14)).date_naive()),
        start_time: Some(chrono::NaiveTime::from_hms_opt(20, 0, 0).unwrap()),
        location_type: Some("physical".to_string()),
        venue: Some("Blue Note".to_string()),
        city: Some("Copenhagen".to_string()),
        capacity: Some(80),
        price: Some(25.0),
        ..Default::default()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Create / Read
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn create_then_get_round_trips_user_fields() {
    let events = events_over(store(), true);
    let created = events.create(&creator(), &draft()).await.unwrap();

    assert!(!created.id.is_empty());
    assert_eq!(created.creator_id, "creator-1");
    assert_eq!(created.status, EventStatus::Approved);
    assert_eq!(created.attendee_count, 0);
    assert_eq!(created.view_count, 0);
    assert_eq!(created.created_at, created.updated_at);

    let fetched = events.peek(&created.id).await.unwrap();
    assert_eq!(fetched.title, "Jazz Night");
    assert_eq!(fetched.description, "An evening of live jazz");
    assert_eq!(fetched.category, Category::Music);
    assert_eq!(fetched.tags, vec!["jazz".to_string(), "live".to_string()]);
    assert_eq!(fetched.capacity, Some(80));
    assert_eq!(fetched.price, 25.0);
    match &fetched.location {
        Location::Physical { venue, city, .. } => {
            assert_eq!(venue, "Blue Note");
            assert_eq!(city, "Copenhagen");
        }
        other => panic!("unexpected location: {:?}", other),
    }
}

#[tokio::test]
async fn pending_policy_creates_pending_events() {
    let events = events_over(store(), false);
    let created = events.create(&creator(), &draft()).await.unwrap();
    assert_eq!(created.status, EventStatus::Pending);
}

#[tokio::test]
async fn get_increments_view_count_peek_does_not() {
    let events = events_over(store(), true);
    let created = events.create(&creator(), &draft()).await.unwrap();

    for n in 1..=5u64 {
        let fetched = events.get(&created.id).await.unwrap();
        assert_eq!(fetched.view_count, n);
    }

    let peeked = events.peek(&created.id).await.unwrap();
    assert_eq!(peeked.view_count, 5);
    let peeked_again = events.peek(&created.id).await.unwrap();
    assert_eq!(peeked_again.view_count, 5);
}

#[tokio::test]
async fn get_missing_event_is_not_found() {
    let events = events_over(store(), true);
    let err = events.get("no-such-id").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn create_reports_all_violations_at_once() {
    let events = events_over(store(), true);
    let incomplete = EventDraft {
        title: Some("Incomplete".to_string()),
        category: Some("Technology".to_string()),
        location_type: Some("physical".to_string()),
        // description, startDate, startTime, venue, city all missing
        ..Default::default()
    };

    let err = events.create(&creator(), &incomplete).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);

    let fields = err.field_errors().unwrap();
    for field in ["description", "startDate", "startTime", "venue", "city"] {
        assert!(fields.has_errors(field), "missing error for {}", field);
    }
    assert!(!fields.has_errors("title"));
}

// ═══════════════════════════════════════════════════════════════════════════════
// Update
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn stranger_update_is_forbidden_and_leaves_event_unchanged() {
    let events = events_over(store(), true);
    let created = events.create(&creator(), &draft()).await.unwrap();

    let stranger = Principal::new("stranger-1");
    let err = events
        .update(&stranger, &created.id, &json!({"title": "Hijacked"}))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);

    let stored = events.peek(&created.id).await.unwrap();
    assert_eq!(stored.title, "Jazz Night");
    assert_eq!(stored.updated_at, created.updated_at);
}

#[tokio::test]
async fn owner_update_applies_and_refreshes_updated_at() {
    let events = events_over(store(), true);
    let created = events.create(&creator(), &draft()).await.unwrap();

    let updated = events
        .update(
            &creator(),
            &created.id,
            &json!({"title": "Jazz Night Vol. 2", "price": 30.0}),
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "Jazz Night Vol. 2");
    assert_eq!(updated.price, 30.0);
    assert!(updated.updated_at > created.updated_at);
    // Untouched fields survive.
    assert_eq!(updated.capacity, Some(80));
}

#[tokio::test]
async fn moderator_may_update_someone_elses_event() {
    let events = events_over(store(), true);
    let created = events.create(&creator(), &draft()).await.unwrap();

    let updated = events
        .update(&moderator(), &created.id, &json!({"isPublic": false}))
        .await
        .unwrap();
    assert!(!updated.is_public);
}

#[tokio::test]
async fn update_rejects_immutable_fields_by_name() {
    let events = events_over(store(), true);
    let created = events.create(&creator(), &draft()).await.unwrap();

    let err = events
        .update(
            &creator(),
            &created.id,
            &json!({
                "creatorId": "attacker",
                "attendeeCount": 1000,
                "status": "cancelled",
                "title": "Fine"
            }),
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ValidationError);
    let fields = err.field_errors().unwrap();
    assert!(fields.has_errors("creatorId"));
    assert!(fields.has_errors("attendeeCount"));
    assert!(fields.has_errors("status"));

    let stored = events.peek(&created.id).await.unwrap();
    assert_eq!(stored.creator_id, "creator-1");
    assert_eq!(stored.title, "Jazz Night");
}

#[tokio::test]
async fn update_missing_event_is_not_found_before_authorization() {
    let events = events_over(store(), true);
    let err = events
        .update(&Principal::new("anyone"), "ghost", &json!({"title": "x"}))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Moderation state machine
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn moderator_approves_pending_event() {
    let events = events_over(store(), false);
    let created = events.create(&creator(), &draft()).await.unwrap();

    let approved = events
        .transition(&moderator(), &created.id, EventStatus::Approved)
        .await
        .unwrap();
    assert_eq!(approved.status, EventStatus::Approved);
}

#[tokio::test]
async fn creator_may_not_approve_own_event() {
    let events = events_over(store(), false);
    let created = events.create(&creator(), &draft()).await.unwrap();

    let err = events
        .transition(&creator(), &created.id, EventStatus::Approved)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn rejected_is_terminal() {
    let events = events_over(store(), false);
    let created = events.create(&creator(), &draft()).await.unwrap();

    events
        .transition(&moderator(), &created.id, EventStatus::Rejected)
        .await
        .unwrap();

    let err = events
        .transition(&moderator(), &created.id, EventStatus::Approved)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);
}

#[tokio::test]
async fn creator_cancels_approved_future_event() {
    let events = events_over(store(), true);
    let created = events.create(&creator(), &draft()).await.unwrap();

    let cancelled = events
        .transition(&creator(), &created.id, EventStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(cancelled.status, EventStatus::Cancelled);

    // Terminal: no way back.
    let err = events
        .transition(&moderator(), &created.id, EventStatus::Approved)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);
}

#[tokio::test]
async fn pending_event_cannot_be_cancelled() {
    let events = events_over(store(), false);
    let created = events.create(&creator(), &draft()).await.unwrap();

    let err = events
        .transition(&creator(), &created.id, EventStatus::Cancelled)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);
}

#[tokio::test]
async fn ended_event_cannot_be_cancelled() {
    let events = events_over(store(), true);
    let mut past = draft();
    past.start_date = Some((Utc::now() - ChronoDuration::days(2)).date_naive());
    past.end_date = Some((Utc::now() - ChronoDuration::days(1)).date_naive());
    let created = events.create(&creator(), &past).await.unwrap();

    let err = events
        .transition(&creator(), &created.id, EventStatus::Cancelled)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Delete
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn delete_cascades_to_registrations() {
    let shared = store();
    let events = events_over(shared.clone(), true);
    let ledger = ledger_over(shared.clone());

    let created = events.create(&creator(), &draft()).await.unwrap();
    ledger
        .register(&Principal::new("att-1").with_email("a@example.com"), &created.id)
        .await
        .unwrap();
    ledger
        .register(&Principal::new("att-2").with_email("b@example.com"), &created.id)
        .await
        .unwrap();
    assert_eq!(shared.len("registrations"), 2);

    events.delete(&creator(), &created.id).await.unwrap();

    assert_eq!(shared.len("events"), 0);
    assert_eq!(shared.len("registrations"), 0);

    let err = events.peek(&created.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn stranger_delete_is_forbidden() {
    let events = events_over(store(), true);
    let created = events.create(&creator(), &draft()).await.unwrap();

    let err = events
        .delete(&Principal::new("stranger-1"), &created.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);

    assert!(events.peek(&created.id).await.is_ok());
}

#[tokio::test]
async fn delete_missing_event_is_not_found() {
    let events = events_over(store(), true);
    let err = events.delete(&creator(), "ghost").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn registration_racing_a_delete_never_orphans() {
    // A registration that commits after the delete's scan bumps the event
    // version and aborts the cascade; whichever order wins, no registration
    // may survive without its event.
    let shared = store();
    let events = events_over(shared.clone(), true);
    let ledger = ledger_over(shared.clone());

    let created = events.create(&creator(), &draft()).await.unwrap();

    let creator_principal = creator();
    let attendee_principal = Principal::new("att-1");
    let delete = events.delete(&creator_principal, &created.id);
    let register = ledger.register(&attendee_principal, &created.id);
    let (delete_result, _register_result) = tokio::join!(delete, register);

    delete_result.unwrap();
    assert_eq!(shared.len("events"), 0);
    assert_eq!(shared.len("registrations"), 0);
}
