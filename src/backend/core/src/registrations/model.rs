//! The Registration entity: an attendee's claim on an event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store collection holding registration documents.
pub const COLLECTION: &str = "registrations";

/// Deterministic registration document id.
///
/// Keying registrations by (event, user) makes the at-most-one-non-cancelled
/// invariant structural: two concurrent registrations by the same user
/// collide on the same document and the store's write guards reject one.
pub fn registration_id(event_id: &str, user_id: &str) -> String {
    format!("{}:{}", event_id, user_id)
}

/// Lifecycle status of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Confirmed,
    Cancelled,
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Confirmed => write!(f, "confirmed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// An attendee's claim on an event.
///
/// `user_email`/`user_name` are snapshots taken at registration time, not
/// live-joined from the profile. Registrations are never physically deleted
/// by cancellation; only the event-delete cascade removes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub status: RegistrationStatus,
    pub registered_at: DateTime<Utc>,
}

impl Registration {
    pub fn is_confirmed(&self) -> bool {
        self.status == RegistrationStatus::Confirmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_id_is_deterministic() {
        assert_eq!(registration_id("evt-1", "user-9"), "evt-1:user-9");
        assert_eq!(
            registration_id("evt-1", "user-9"),
            registration_id("evt-1", "user-9")
        );
    }

    #[test]
    fn test_registration_serializes_camel_case() {
        let reg = Registration {
            id: registration_id("evt-1", "user-9"),
            event_id: "evt-1".to_string(),
            user_id: "user-9".to_string(),
            user_email: Some("u@example.com".to_string()),
            user_name: None,
            status: RegistrationStatus::Confirmed,
            registered_at: Utc::now(),
        };

        let value = serde_json::to_value(&reg).unwrap();
        assert_eq!(value["eventId"], "evt-1");
        assert_eq!(value["userId"], "user-9");
        assert_eq!(value["status"], "confirmed");
        assert!(value.get("userName").is_none());
    }
}
