//! Query engine tests: filter composition, ordering, cursor pagination, and
//! the client-side search (including its documented under-return behavior).

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use gather_core::authz::Principal;
use gather_core::events::{EventDraft, EventStatus, EventStore};
use gather_core::pagination::{Cursor, SortDirection};
use gather_core::query::{EventFilter, QueryEngine};
use gather_core::store::MemoryStore;

fn components(auto_approve: bool) -> (EventStore, QueryEngine) {
    let store = Arc::new(MemoryStore::new());
    (
        EventStore::new(store.clone(), auto_approve),
        QueryEngine::new(store),
    )
}

fn draft(title: &str, category: &str) -> EventDraft {
    EventDraft {
        title: Some(title.to_string()),
        description: Some(format!("{} description", title)),
        category: Some(category.to_string()),
        start_date: Some((Utc::now() + ChronoDuration::days(7)).date_naive()),
        start_time: Some(chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap()),
        location_type: Some("virtual".to_string()),
        virtual_link: Some("https://meet.example.com/x".to_string()),
        virtual_platform: Some("Meet".to_string()),
        ..Default::default()
    }
}

async fn seed(events: &EventStore, creator: &str, titles_categories: &[(&str, &str)]) -> Vec<String> {
    let principal = Principal::new(creator);
    let mut ids = Vec::new();
    for (title, category) in titles_categories {
        let event = events.create(&principal, &draft(title, category)).await.unwrap();
        ids.push(event.id);
    }
    ids
}

// ═══════════════════════════════════════════════════════════════════════════════
// Filters
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn category_filter_is_exact() {
    let (events, query) = components(true);
    seed(
        &events,
        "u1",
        &[("A", "Music"), ("B", "Technology"), ("C", "Music")],
    )
    .await;

    let page = query
        .list(&EventFilter {
            category: Some(gather_core::events::Category::Music),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.count, 2);
    assert!(page.events.iter().all(|e| e.category.name() == "Music"));
}

#[tokio::test]
async fn status_filter_separates_pending_from_approved() {
    let (pending_events, query) = components(false);
    seed(&pending_events, "u1", &[("P1", "Music"), ("P2", "Music")]).await;

    let approved = query
        .list(&EventFilter {
            status: Some(EventStatus::Approved),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(approved.count, 0);

    let pending = query
        .list(&EventFilter {
            status: Some(EventStatus::Pending),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(pending.count, 2);
}

#[tokio::test]
async fn creator_filter_returns_only_their_events() {
    let (events, query) = components(true);
    seed(&events, "alice", &[("A1", "Music"), ("A2", "Social")]).await;
    seed(&events, "bob", &[("B1", "Music")]).await;

    let page = query
        .list(&EventFilter {
            creator_id: Some("alice".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.count, 2);
    assert!(page.events.iter().all(|e| e.creator_id == "alice"));
}

// ═══════════════════════════════════════════════════════════════════════════════
// Ordering and pagination
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn default_order_is_created_at_descending() {
    let (events, query) = components(true);
    let ids = seed(&events, "u1", &[("First", "Music"), ("Second", "Music"), ("Third", "Music")]).await;

    let page = query.list(&EventFilter::default()).await.unwrap();
    let returned: Vec<&str> = page.events.iter().map(|e| e.id.as_str()).collect();

    // Newest first: reverse creation order.
    let expected: Vec<&str> = ids.iter().rev().map(String::as_str).collect();
    assert_eq!(returned, expected);
}

#[tokio::test]
async fn title_ordering_ascending() {
    let (events, query) = components(true);
    seed(&events, "u1", &[("Cello", "Music"), ("Accordion", "Music"), ("Banjo", "Music")]).await;

    let page = query
        .list(&EventFilter {
            order_by: Some("title".to_string()),
            direction: Some(SortDirection::Asc),
            ..Default::default()
        })
        .await
        .unwrap();

    let titles: Vec<&str> = page.events.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Accordion", "Banjo", "Cello"]);
}

#[tokio::test]
async fn cursor_pagination_walks_the_whole_collection_without_duplicates() {
    let (events, query) = components(true);
    let seeded: Vec<(String, String)> = (0..7)
        .map(|n| (format!("Event {}", n), "Meetup".to_string()))
        .collect();
    let pairs: Vec<(&str, &str)> = seeded
        .iter()
        .map(|(t, c)| (t.as_str(), c.as_str()))
        .collect();
    seed(&events, "u1", &pairs).await;

    let mut collected = Vec::new();
    let mut cursor: Option<Cursor> = None;
    loop {
        let page = query
            .list(&EventFilter {
                limit: Some(3),
                start_after: cursor.take(),
                ..Default::default()
            })
            .await
            .unwrap();

        collected.extend(page.events.iter().map(|e| e.id.clone()));

        match page.next_cursor {
            Some(token) => cursor = Some(Cursor::decode(&token).unwrap()),
            None => break,
        }
    }

    assert_eq!(collected.len(), 7);
    let mut deduped = collected.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), 7, "pagination returned duplicates");
}

// ═══════════════════════════════════════════════════════════════════════════════
// Search
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn search_is_case_insensitive_over_title_and_description() {
    let (events, query) = components(true);
    seed(
        &events,
        "u1",
        &[("Rust Workshop", "Workshop"), ("Cooking Class", "Education")],
    )
    .await;

    let page = query
        .list(&EventFilter {
            search: Some("RUST".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.events[0].title, "Rust Workshop");

    // Description matches too.
    let page = query
        .list(&EventFilter {
            search: Some("cooking class description".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.count, 1);
}

#[tokio::test]
async fn search_matches_organizer_name() {
    let (events, query) = components(true);
    let mut d = draft("Untitled Gathering", "Social");
    d.organizer_name = Some("Grace Hopper".to_string());
    events.create(&Principal::new("u1"), &d).await.unwrap();

    let page = query
        .list(&EventFilter {
            search: Some("hopper".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.count, 1);
}

#[tokio::test]
async fn search_with_limit_can_under_return_but_cursor_continues_the_scan() {
    // Store-side limit applies before the client-side search, so a page can
    // come back smaller than `limit` even though more matches exist further
    // on. The cursor still advances past the scanned rows.
    let (events, query) = components(true);

    // Newest-first scan order: Match B, then three non-matches, then Match A.
    seed(&events, "u1", &[("Match A", "Meetup")]).await;
    seed(
        &events,
        "u1",
        &[("Filler 1", "Meetup"), ("Filler 2", "Meetup"), ("Filler 3", "Meetup")],
    )
    .await;
    seed(&events, "u1", &[("Match B", "Meetup")]).await;

    let first = query
        .list(&EventFilter {
            search: Some("match".to_string()),
            limit: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();

    // Page one scanned [Match B, Filler 3]; only one search hit.
    assert_eq!(first.count, 1);
    assert_eq!(first.events[0].title, "Match B");
    let token = first.next_cursor.expect("scan is not finished");

    let mut matches = vec![first.events[0].title.clone()];
    let mut cursor = Some(Cursor::decode(&token).unwrap());
    while let Some(c) = cursor.take() {
        let page = query
            .list(&EventFilter {
                search: Some("match".to_string()),
                limit: Some(2),
                start_after: Some(c),
                ..Default::default()
            })
            .await
            .unwrap();
        matches.extend(page.events.iter().map(|e| e.title.clone()));
        cursor = page
            .next_cursor
            .map(|t| Cursor::decode(&t).unwrap());
    }

    assert_eq!(matches, vec!["Match B".to_string(), "Match A".to_string()]);
}

#[tokio::test]
async fn unknown_order_field_is_a_validation_error() {
    let (_, query) = components(true);
    let err = query
        .list(&EventFilter {
            order_by: Some("creatorId".to_string()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), gather_core::error::ErrorCode::ValidationError);
}
