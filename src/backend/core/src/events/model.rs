//! The Event entity: canonical shape, category set, location variants, and
//! the moderation state machine.
//!
//! The wire-level create/update payloads use the flat field names the
//! original clients send (`venue`, `city`, `virtualLink`, ...); validation
//! folds them into the canonical tagged [`Location`] shape and reports every
//! violated field at once.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::authz::Principal;
use crate::validation::{ValidationErrorKind, ValidationErrors, ValidationResult};

/// Store collection holding event documents.
pub const COLLECTION: &str = "events";

/// Maximum accepted tag count per event.
const MAX_TAGS: usize = 10;

// ═══════════════════════════════════════════════════════════════════════════════
// Categories
// ═══════════════════════════════════════════════════════════════════════════════

/// The fixed category set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Technology,
    Business,
    Education,
    #[serde(rename = "Arts & Culture")]
    ArtsCulture,
    #[serde(rename = "Sports & Fitness")]
    SportsFitness,
    #[serde(rename = "Health & Wellness")]
    HealthWellness,
    #[serde(rename = "Food & Drink")]
    FoodDrink,
    Music,
    Networking,
    Workshop,
    Conference,
    Meetup,
    Social,
    Other,
}

impl Category {
    /// Every category, in presentation order.
    pub const ALL: [Category; 14] = [
        Self::Technology,
        Self::Business,
        Self::Education,
        Self::ArtsCulture,
        Self::SportsFitness,
        Self::HealthWellness,
        Self::FoodDrink,
        Self::Music,
        Self::Networking,
        Self::Workshop,
        Self::Conference,
        Self::Meetup,
        Self::Social,
        Self::Other,
    ];

    /// The wire name of this category.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Technology => "Technology",
            Self::Business => "Business",
            Self::Education => "Education",
            Self::ArtsCulture => "Arts & Culture",
            Self::SportsFitness => "Sports & Fitness",
            Self::HealthWellness => "Health & Wellness",
            Self::FoodDrink => "Food & Drink",
            Self::Music => "Music",
            Self::Networking => "Networking",
            Self::Workshop => "Workshop",
            Self::Conference => "Conference",
            Self::Meetup => "Meetup",
            Self::Social => "Social",
            Self::Other => "Other",
        }
    }

    /// Parse a wire name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }

    /// All wire names (for validation messages and the categories endpoint).
    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|c| c.name().to_string()).collect()
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Moderation Status
// ═══════════════════════════════════════════════════════════════════════════════

/// Moderation state of an event.
///
/// `pending → {approved, rejected}`; `approved → {cancelled}`; `rejected`
/// and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Check whether a transition is permitted by the state machine.
    pub fn can_transition(&self, to: EventStatus) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Approved, Self::Cancelled)
        )
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled)
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Location
// ═══════════════════════════════════════════════════════════════════════════════

/// Where an event takes place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Location {
    Physical {
        venue: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        address: Option<String>,
        city: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        state: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        country: Option<String>,
    },
    Virtual {
        link: String,
        platform: String,
    },
    Hybrid {
        venue: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        address: Option<String>,
        city: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        state: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        country: Option<String>,
        link: String,
        platform: String,
    },
}

impl Location {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Physical { .. } => "physical",
            Self::Virtual { .. } => "virtual",
            Self::Hybrid { .. } => "hybrid",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Organizer
// ═══════════════════════════════════════════════════════════════════════════════

/// Informational organizer display fields, decoupled from `creator_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organizer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Event
// ═══════════════════════════════════════════════════════════════════════════════

/// The unit of publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Opaque id assigned at creation; immutable.
    pub id: String,

    pub title: String,
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,
    /// Informational; schedule comparisons happen in UTC.
    pub timezone: String,

    pub location: Location,

    /// None = unlimited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    pub price: f64,
    pub currency: String,
    pub requires_registration: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_deadline: Option<NaiveDate>,

    /// Set once at creation, never reassigned.
    pub creator_id: String,
    #[serde(default)]
    pub organizer: Organizer,

    pub status: EventStatus,

    /// Mutated only by the registration ledger.
    pub attendee_count: u32,
    /// Advisory; incremented best-effort on detail reads.
    pub view_count: u64,

    pub is_public: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// The event's end as a naive UTC datetime, falling back to the start
    /// date/time when no explicit end is set.
    pub fn end_datetime(&self) -> NaiveDateTime {
        let date = self.end_date.unwrap_or(self.start_date);
        let time = self.end_time.unwrap_or(self.start_time);
        date.and_time(time)
    }

    /// Whether the event has ended relative to `now`.
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end_datetime() < now.naive_utc()
    }

    /// Whether the registration deadline (if any) has passed.
    pub fn registration_deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.registration_deadline
            .map(|d| now.date_naive() > d)
            .unwrap_or(false)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Create Payload
// ═══════════════════════════════════════════════════════════════════════════════

/// The create-event wire payload: everything optional so validation can
/// report the complete set of missing fields rather than failing at the
/// first deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub website: Option<String>,

    pub start_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_date: Option<NaiveDate>,
    pub end_time: Option<NaiveTime>,
    pub timezone: Option<String>,

    pub location_type: Option<String>,
    pub venue: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub virtual_link: Option<String>,
    pub virtual_platform: Option<String>,

    pub capacity: Option<u32>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub requires_registration: Option<bool>,
    pub registration_deadline: Option<NaiveDate>,

    pub organizer_name: Option<String>,
    pub organizer_email: Option<String>,
    pub organizer_phone: Option<String>,
    pub organization: Option<String>,

    pub is_public: Option<bool>,
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
}

fn require<'a>(
    errors: &mut ValidationErrors,
    field: &str,
    value: &'a Option<String>,
) -> Option<&'a str> {
    if present(value) {
        value.as_deref().map(str::trim)
    } else {
        errors.add_required(field);
        None
    }
}

impl EventDraft {
    /// Validate the draft and build the canonical [`Event`].
    ///
    /// Collects every violated field; only an empty error set produces an
    /// event. `initial_status` comes from the deployment's moderation policy.
    pub fn build(
        &self,
        principal: &Principal,
        initial_status: EventStatus,
        now: DateTime<Utc>,
    ) -> ValidationResult<Event> {
        let mut errors = ValidationErrors::new();

        let title = require(&mut errors, "title", &self.title);
        let description = require(&mut errors, "description", &self.description);

        let category = match self.category.as_deref() {
            Some(raw) if !raw.trim().is_empty() => match Category::parse(raw.trim()) {
                Some(c) => Some(c),
                None => {
                    errors.add_error(
                        "category",
                        ValidationErrorKind::NotInSet {
                            allowed: Category::names(),
                        },
                    );
                    None
                }
            },
            _ => {
                errors.add_required("category");
                None
            }
        };

        if self.start_date.is_none() {
            errors.add_required("startDate");
        }
        if self.start_time.is_none() {
            errors.add_required("startTime");
        }

        let location = self.build_location(&mut errors);

        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                errors.add_error(
                    "capacity",
                    ValidationErrorKind::MinValue {
                        min: "1".into(),
                        actual: "0".into(),
                    },
                );
            }
        }

        let price = self.price.unwrap_or(0.0);
        if price < 0.0 {
            errors.add_error(
                "price",
                ValidationErrorKind::MinValue {
                    min: "0".into(),
                    actual: price.to_string(),
                },
            );
        }

        if let Some(email) = self.organizer_email.as_deref() {
            if !email.trim().is_empty() && !email.contains('@') {
                errors.add_error("organizerEmail", ValidationErrorKind::InvalidEmail);
            }
        }

        if self.tags.len() > MAX_TAGS {
            errors.add_error(
                "tags",
                ValidationErrorKind::Custom {
                    code: format!("at most {} tags", MAX_TAGS),
                },
            );
        }

        let title = title.map(str::to_string);
        let description = description.map(str::to_string);
        errors.into_result()?;

        let Some(location) = location else {
            // Unreachable when validation passed; guard anyway.
            let mut errors = ValidationErrors::new();
            errors.add_required("locationType");
            return Err(errors);
        };

        // Tags behave as a set: trimmed, deduplicated, order-preserving.
        let mut tags: Vec<String> = Vec::new();
        for tag in &self.tags {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }

        Ok(Event {
            id: String::new(), // assigned by the store at creation
            title: title.unwrap_or_default(),
            description: description.unwrap_or_default(),
            category: category.unwrap_or(Category::Other),
            tags,
            image_url: self.image_url.clone().filter(|s| !s.is_empty()),
            website: self.website.clone().filter(|s| !s.is_empty()),
            start_date: self.start_date.unwrap_or_default(),
            start_time: self.start_time.unwrap_or_default(),
            end_date: self.end_date,
            end_time: self.end_time,
            timezone: self
                .timezone
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "UTC".to_string()),
            location,
            capacity: self.capacity,
            price,
            currency: self
                .currency
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "USD".to_string()),
            requires_registration: self.requires_registration.unwrap_or(true),
            registration_deadline: self.registration_deadline,
            creator_id: principal.id.clone(),
            organizer: Organizer {
                name: self.organizer_name.clone().filter(|s| !s.is_empty()).or_else(|| principal.name.clone()),
                email: self.organizer_email.clone().filter(|s| !s.is_empty()).or_else(|| principal.email.clone()),
                phone: self.organizer_phone.clone().filter(|s| !s.is_empty()),
                organization: self.organization.clone().filter(|s| !s.is_empty()),
            },
            status: initial_status,
            attendee_count: 0,
            view_count: 0,
            is_public: self.is_public.unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }

    fn build_location(&self, errors: &mut ValidationErrors) -> Option<Location> {
        let location_type = match self.location_type.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => {
                errors.add_required("locationType");
                return None;
            }
        };

        match location_type {
            "physical" => {
                let venue = require(errors, "venue", &self.venue);
                let city = require(errors, "city", &self.city);
                match (venue, city) {
                    (Some(venue), Some(city)) => Some(Location::Physical {
                        venue: venue.to_string(),
                        address: self.address.clone().filter(|s| !s.is_empty()),
                        city: city.to_string(),
                        state: self.state.clone().filter(|s| !s.is_empty()),
                        country: self.country.clone().filter(|s| !s.is_empty()),
                    }),
                    _ => None,
                }
            }
            "virtual" => {
                let link = require(errors, "virtualLink", &self.virtual_link);
                let platform = require(errors, "virtualPlatform", &self.virtual_platform);
                match (link, platform) {
                    (Some(link), Some(platform)) => Some(Location::Virtual {
                        link: link.to_string(),
                        platform: platform.to_string(),
                    }),
                    _ => None,
                }
            }
            "hybrid" => {
                let venue = require(errors, "venue", &self.venue);
                let city = require(errors, "city", &self.city);
                let link = require(errors, "virtualLink", &self.virtual_link);
                let platform = require(errors, "virtualPlatform", &self.virtual_platform);
                match (venue, city, link, platform) {
                    (Some(venue), Some(city), Some(link), Some(platform)) => {
                        Some(Location::Hybrid {
                            venue: venue.to_string(),
                            address: self.address.clone().filter(|s| !s.is_empty()),
                            city: city.to_string(),
                            state: self.state.clone().filter(|s| !s.is_empty()),
                            country: self.country.clone().filter(|s| !s.is_empty()),
                            link: link.to_string(),
                            platform: platform.to_string(),
                        })
                    }
                    _ => None,
                }
            }
            _ => {
                errors.add_error(
                    "locationType",
                    ValidationErrorKind::NotInSet {
                        allowed: vec![
                            "physical".to_string(),
                            "virtual".to_string(),
                            "hybrid".to_string(),
                        ],
                    },
                );
                None
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Update Payload
// ═══════════════════════════════════════════════════════════════════════════════

/// Fields that may never appear in an update payload.
pub const IMMUTABLE_FIELDS: [&str; 6] = [
    "id",
    "creatorId",
    "createdAt",
    "attendeeCount",
    "viewCount",
    "status",
];

/// A partial update to an event's mutable descriptive fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub website: Option<String>,

    pub start_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_date: Option<NaiveDate>,
    pub end_time: Option<NaiveTime>,
    pub timezone: Option<String>,

    pub location: Option<Location>,

    pub capacity: Option<Option<u32>>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub requires_registration: Option<bool>,
    pub registration_deadline: Option<Option<NaiveDate>>,

    pub organizer_name: Option<String>,
    pub organizer_email: Option<String>,
    pub organizer_phone: Option<String>,
    pub organization: Option<String>,

    pub is_public: Option<bool>,
}

impl EventPatch {
    /// Parse a raw JSON patch, rejecting every immutable field by name.
    pub fn from_json(raw: &serde_json::Value) -> ValidationResult<Self> {
        let mut errors = ValidationErrors::new();

        if let Some(object) = raw.as_object() {
            for field in IMMUTABLE_FIELDS {
                if object.contains_key(field) {
                    errors.add_error(
                        field,
                        ValidationErrorKind::Custom {
                            code: "field is immutable".to_string(),
                        },
                    );
                }
            }
        } else {
            errors.add_error(
                "body",
                ValidationErrorKind::InvalidFormat {
                    expected: "JSON object".to_string(),
                },
            );
        }
        errors.into_result()?;

        serde_json::from_value(raw.clone()).map_err(|e| {
            let mut errors = ValidationErrors::new();
            errors.add_error(
                "body",
                ValidationErrorKind::Custom {
                    code: e.to_string(),
                },
            );
            errors
        })
    }

    /// Apply the patch to an event, validating changed fields. Refreshes
    /// `updated_at`; the caller persists the result.
    pub fn apply(&self, event: &mut Event, now: DateTime<Utc>) -> ValidationResult<()> {
        let mut errors = ValidationErrors::new();

        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                errors.add_required("title");
            } else {
                event.title = title.trim().to_string();
            }
        }
        if let Some(description) = &self.description {
            if description.trim().is_empty() {
                errors.add_required("description");
            } else {
                event.description = description.trim().to_string();
            }
        }
        if let Some(raw) = &self.category {
            match Category::parse(raw.trim()) {
                Some(category) => event.category = category,
                None => errors.add_error(
                    "category",
                    ValidationErrorKind::NotInSet {
                        allowed: Category::names(),
                    },
                ),
            }
        }
        if let Some(tags) = &self.tags {
            if tags.len() > MAX_TAGS {
                errors.add_error(
                    "tags",
                    ValidationErrorKind::Custom {
                        code: format!("at most {} tags", MAX_TAGS),
                    },
                );
            } else {
                let mut deduped: Vec<String> = Vec::new();
                for tag in tags {
                    let tag = tag.trim();
                    if !tag.is_empty() && !deduped.iter().any(|t| t == tag) {
                        deduped.push(tag.to_string());
                    }
                }
                event.tags = deduped;
            }
        }
        if let Some(image_url) = &self.image_url {
            event.image_url = Some(image_url.clone()).filter(|s| !s.is_empty());
        }
        if let Some(website) = &self.website {
            event.website = Some(website.clone()).filter(|s| !s.is_empty());
        }

        if let Some(start_date) = self.start_date {
            event.start_date = start_date;
        }
        if let Some(start_time) = self.start_time {
            event.start_time = start_time;
        }
        if let Some(end_date) = self.end_date {
            event.end_date = Some(end_date);
        }
        if let Some(end_time) = self.end_time {
            event.end_time = Some(end_time);
        }
        if let Some(timezone) = &self.timezone {
            if !timezone.trim().is_empty() {
                event.timezone = timezone.trim().to_string();
            }
        }

        if let Some(location) = &self.location {
            event.location = location.clone();
        }

        if let Some(capacity) = self.capacity {
            match capacity {
                Some(0) => errors.add_error(
                    "capacity",
                    ValidationErrorKind::MinValue {
                        min: "1".into(),
                        actual: "0".into(),
                    },
                ),
                Some(c) if c < event.attendee_count => errors.add_error(
                    "capacity",
                    ValidationErrorKind::MinValue {
                        min: event.attendee_count.to_string(),
                        actual: c.to_string(),
                    },
                ),
                other => event.capacity = other,
            }
        }
        if let Some(price) = self.price {
            if price < 0.0 {
                errors.add_error(
                    "price",
                    ValidationErrorKind::MinValue {
                        min: "0".into(),
                        actual: price.to_string(),
                    },
                );
            } else {
                event.price = price;
            }
        }
        if let Some(currency) = &self.currency {
            if !currency.trim().is_empty() {
                event.currency = currency.trim().to_string();
            }
        }
        if let Some(requires_registration) = self.requires_registration {
            event.requires_registration = requires_registration;
        }
        if let Some(deadline) = self.registration_deadline {
            event.registration_deadline = deadline;
        }

        if let Some(name) = &self.organizer_name {
            event.organizer.name = Some(name.clone()).filter(|s| !s.is_empty());
        }
        if let Some(email) = &self.organizer_email {
            if !email.is_empty() && !email.contains('@') {
                errors.add_error("organizerEmail", ValidationErrorKind::InvalidEmail);
            } else {
                event.organizer.email = Some(email.clone()).filter(|s| !s.is_empty());
            }
        }
        if let Some(phone) = &self.organizer_phone {
            event.organizer.phone = Some(phone.clone()).filter(|s| !s.is_empty());
        }
        if let Some(organization) = &self.organization {
            event.organizer.organization = Some(organization.clone()).filter(|s| !s.is_empty());
        }

        if let Some(is_public) = self.is_public {
            event.is_public = is_public;
        }

        errors.into_result()?;
        event.updated_at = now;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn principal() -> Principal {
        Principal::new("user-1")
            .with_email("user1@example.com")
            .with_name("User One")
    }

    fn valid_draft() -> EventDraft {
        EventDraft {
            title: Some("Rust Meetup".to_string()),
            description: Some("Monthly Rust meetup".to_string()),
            category: Some("Technology".to_string()),
            start_date: Some(NaiveDate::from_ymd_opt(2030, 6, 1).unwrap()),
            start_time: Some(NaiveTime::from_hms_opt(18, 0, 0).unwrap()),
            location_type: Some("physical".to_string()),
            venue: Some("Community Hall".to_string()),
            city: Some("Oslo".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_category_set_has_fourteen_entries() {
        assert_eq!(Category::ALL.len(), 14);
        assert_eq!(Category::parse("Arts & Culture"), Some(Category::ArtsCulture));
        assert_eq!(Category::parse("Basket Weaving"), None);
    }

    #[test]
    fn test_status_state_machine() {
        use EventStatus::*;

        assert!(Pending.can_transition(Approved));
        assert!(Pending.can_transition(Rejected));
        assert!(Approved.can_transition(Cancelled));

        assert!(!Approved.can_transition(Pending));
        assert!(!Rejected.can_transition(Approved));
        assert!(!Cancelled.can_transition(Approved));
        assert!(!Pending.can_transition(Cancelled));

        assert!(Rejected.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(!Pending.is_terminal());
    }

    #[test]
    fn test_build_valid_draft() {
        let event = valid_draft()
            .build(&principal(), EventStatus::Approved, Utc::now())
            .unwrap();

        assert_eq!(event.title, "Rust Meetup");
        assert_eq!(event.category, Category::Technology);
        assert_eq!(event.creator_id, "user-1");
        assert_eq!(event.status, EventStatus::Approved);
        assert_eq!(event.attendee_count, 0);
        assert_eq!(event.view_count, 0);
        assert!(event.is_public);
        assert_eq!(event.price, 0.0);
        assert_eq!(event.currency, "USD");
        // Organizer falls back to the principal's claims.
        assert_eq!(event.organizer.email.as_deref(), Some("user1@example.com"));
    }

    #[test]
    fn test_build_reports_all_missing_fields() {
        let errors = EventDraft::default()
            .build(&principal(), EventStatus::Approved, Utc::now())
            .unwrap_err();

        for field in ["title", "description", "category", "startDate", "startTime", "locationType"] {
            assert!(errors.has_errors(field), "missing error for {}", field);
        }
    }

    #[test]
    fn test_physical_location_requires_venue_and_city() {
        let mut draft = valid_draft();
        draft.venue = None;
        draft.city = Some("  ".to_string());

        let errors = draft
            .build(&principal(), EventStatus::Approved, Utc::now())
            .unwrap_err();
        assert!(errors.has_errors("venue"));
        assert!(errors.has_errors("city"));
    }

    #[test]
    fn test_virtual_location_requires_link_and_platform() {
        let mut draft = valid_draft();
        draft.location_type = Some("virtual".to_string());

        let errors = draft
            .build(&principal(), EventStatus::Approved, Utc::now())
            .unwrap_err();
        assert!(errors.has_errors("virtualLink"));
        assert!(errors.has_errors("virtualPlatform"));
    }

    #[test]
    fn test_hybrid_location_requires_both() {
        let mut draft = valid_draft();
        draft.location_type = Some("hybrid".to_string());
        draft.venue = None;

        let errors = draft
            .build(&principal(), EventStatus::Approved, Utc::now())
            .unwrap_err();
        assert!(errors.has_errors("venue"));
        assert!(errors.has_errors("virtualLink"));
        assert!(errors.has_errors("virtualPlatform"));
        // City was provided, so it must not be reported.
        assert!(!errors.has_errors("city"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut draft = valid_draft();
        draft.capacity = Some(0);

        let errors = draft
            .build(&principal(), EventStatus::Approved, Utc::now())
            .unwrap_err();
        assert!(errors.has_errors("capacity"));
    }

    #[test]
    fn test_negative_price_rejected() {
        let mut draft = valid_draft();
        draft.price = Some(-5.0);

        let errors = draft
            .build(&principal(), EventStatus::Approved, Utc::now())
            .unwrap_err();
        assert!(errors.has_errors("price"));
    }

    #[test]
    fn test_tags_deduplicated() {
        let mut draft = valid_draft();
        draft.tags = vec![
            "rust".to_string(),
            " rust ".to_string(),
            "meetup".to_string(),
            "".to_string(),
        ];

        let event = draft
            .build(&principal(), EventStatus::Approved, Utc::now())
            .unwrap();
        assert_eq!(event.tags, vec!["rust".to_string(), "meetup".to_string()]);
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let event = valid_draft()
            .build(&principal(), EventStatus::Pending, Utc::now())
            .unwrap();
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["creatorId"], "user-1");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["attendeeCount"], 0);
        assert_eq!(value["location"]["type"], "physical");
        assert!(value["createdAt"].is_string());
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let event = valid_draft()
            .build(&principal(), EventStatus::Approved, Utc::now())
            .unwrap();
        let value = serde_json::to_value(&event).unwrap();
        let back: Event = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_patch_rejects_immutable_fields() {
        let raw = serde_json::json!({
            "title": "New title",
            "creatorId": "someone-else",
            "attendeeCount": 999
        });

        let errors = EventPatch::from_json(&raw).unwrap_err();
        assert!(errors.has_errors("creatorId"));
        assert!(errors.has_errors("attendeeCount"));
        assert!(!errors.has_errors("title"));
    }

    #[test]
    fn test_patch_applies_and_refreshes_updated_at() {
        let mut event = valid_draft()
            .build(&principal(), EventStatus::Approved, Utc::now())
            .unwrap();
        let before = event.updated_at;

        let raw = serde_json::json!({"title": "Rust Meetup 2.0", "price": 10.0});
        let patch = EventPatch::from_json(&raw).unwrap();
        let later = before + chrono::Duration::seconds(5);
        patch.apply(&mut event, later).unwrap();

        assert_eq!(event.title, "Rust Meetup 2.0");
        assert_eq!(event.price, 10.0);
        assert_eq!(event.updated_at, later);
    }

    #[test]
    fn test_patch_cannot_shrink_capacity_below_attendees() {
        let mut event = valid_draft()
            .build(&principal(), EventStatus::Approved, Utc::now())
            .unwrap();
        event.attendee_count = 5;

        let raw = serde_json::json!({"capacity": 3});
        let patch = EventPatch::from_json(&raw).unwrap();
        let errors = patch.apply(&mut event, Utc::now()).unwrap_err();
        assert!(errors.has_errors("capacity"));
    }

    #[test]
    fn test_end_datetime_falls_back_to_start() {
        let event = valid_draft()
            .build(&principal(), EventStatus::Approved, Utc::now())
            .unwrap();
        assert_eq!(
            event.end_datetime(),
            event.start_date.and_time(event.start_time)
        );
    }
}
