//! Event entity, moderation state machine, and lifecycle store.

mod model;
mod store;

pub use model::{
    Category, Event, EventDraft, EventPatch, EventStatus, Location, Organizer, COLLECTION,
    IMMUTABLE_FIELDS,
};
pub use store::EventStore;

/// Test fixtures shared by unit tests across modules.
#[cfg(test)]
pub mod test_support {
    use chrono::{NaiveDate, NaiveTime, Utc};

    use super::{Event, EventDraft, EventStatus};
    use crate::authz::Principal;

    /// A minimal valid approved event owned by `creator_id`.
    pub fn sample_event(creator_id: &str) -> Event {
        let draft = EventDraft {
            title: Some("Sample Event".to_string()),
            description: Some("A sample event for tests".to_string()),
            category: Some("Technology".to_string()),
            start_date: Some(NaiveDate::from_ymd_opt(2030, 1, 15).unwrap()),
            start_time: Some(NaiveTime::from_hms_opt(10, 0, 0).unwrap()),
            location_type: Some("physical".to_string()),
            venue: Some("Tech Hub".to_string()),
            city: Some("San Francisco".to_string()),
            ..Default::default()
        };
        let mut event = draft
            .build(&Principal::new(creator_id), EventStatus::Approved, Utc::now())
            .expect("sample draft is valid");
        event.id = "sample-1".to_string();
        event
    }
}
