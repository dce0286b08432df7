//! Ownership/role authorization guard.
//!
//! One pure decision function answers every mutation-permission question:
//! "may this principal perform this action on this event?" It has no side
//! effects and no store access, so the rule set is unit-testable in
//! isolation. Callers check existence first; denials surface as `Forbidden`
//! only after the entity is known to exist.

use serde::{Deserialize, Serialize};

use crate::error::{GatherError, Result};
use crate::events::Event;

/// Role name granting moderation rights.
pub const MODERATOR_ROLE: &str = "moderator";

/// Role name granting every right (operators).
pub const ADMIN_ROLE: &str = "admin";

// ═══════════════════════════════════════════════════════════════════════════════
// Principal
// ═══════════════════════════════════════════════════════════════════════════════

/// The authenticated identity making a request.
///
/// Issued by the external identity provider and resolved by the transport
/// adapter; the core trusts it. Every core operation takes an
/// already-resolved principal as an argument — there is no ambient auth
/// state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Opaque unique id from the identity provider.
    pub id: String,

    /// Email claim, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Display name claim, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Granted roles.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            name: None,
            roles: Vec::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Check if this principal holds a role (admins hold every role).
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role || r == ADMIN_ROLE)
    }

    /// Check if this principal may moderate events.
    pub fn is_moderator(&self) -> bool {
        self.has_role(MODERATOR_ROLE)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Actions and Decisions
// ═══════════════════════════════════════════════════════════════════════════════

/// A mutating action on an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Update,
    Delete,
    Moderate,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Moderate => write!(f, "moderate"),
        }
    }
}

/// Result of an authorization evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The action is allowed.
    Allow,
    /// The action is denied, with a reason.
    Deny(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Guard
// ═══════════════════════════════════════════════════════════════════════════════

/// Evaluate the rule set, in order:
/// 1. a moderator may always `Moderate`;
/// 2. the event's creator may always `Update` or `Delete` their own event;
/// 3. everything else is denied.
pub fn evaluate(principal: &Principal, event: &Event, action: Action) -> Decision {
    match action {
        Action::Moderate => {
            if principal.is_moderator() {
                Decision::Allow
            } else {
                Decision::Deny("moderator role required".to_string())
            }
        }
        Action::Update | Action::Delete => {
            if principal.id == event.creator_id {
                Decision::Allow
            } else if principal.is_moderator() {
                // Moderators may clean up any event.
                Decision::Allow
            } else {
                Decision::Deny(format!("only the event creator may {}", action))
            }
        }
    }
}

/// Boolean form of [`evaluate`].
pub fn can_mutate(principal: &Principal, event: &Event, action: Action) -> bool {
    evaluate(principal, event, action).is_allowed()
}

/// Evaluate and convert a denial into a `Forbidden` error.
pub fn ensure_can_mutate(principal: &Principal, event: &Event, action: Action) -> Result<()> {
    match evaluate(principal, event, action) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => Err(GatherError::forbidden(format!(
            "Not allowed to {} this event: {}",
            action, reason
        ))),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
