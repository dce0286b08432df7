//! Profiles: a principal's editable public identity.
//!
//! Profiles are keyed by principal id (one profile per principal) and
//! created lazily on first access, seeded from the principal's
//! authentication claims.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::authz::Principal;
use crate::error::{GatherError, Result};
use crate::store::{DocumentStore, StoreError, Transaction};
use crate::validation::{ValidationErrorKind, ValidationErrors};

/// Store collection holding profile documents.
pub const COLLECTION: &str = "profiles";

/// Maximum biography length, in characters.
pub const MAX_BIOGRAPHY_LEN: usize = 300;

const MAX_WRITE_ATTEMPTS: u32 = 3;

// ═══════════════════════════════════════════════════════════════════════════════
// Profile
// ═══════════════════════════════════════════════════════════════════════════════

/// A principal's editable public identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Principal id; also the document key.
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub biography: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// The default profile for a first-time principal, seeded from the
    /// authentication claims.
    fn seeded_from(principal: &Principal, now: DateTime<Utc>) -> Self {
        Self {
            id: principal.id.clone(),
            name: principal.name.clone(),
            biography: String::new(),
            email: principal.email.clone(),
            phone_number: None,
            organization: None,
            profile_image: None,
            updated_at: now,
        }
    }
}

/// A partial update to a profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub biography: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub organization: Option<String>,
    pub profile_image: Option<String>,
}

impl ProfilePatch {
    fn apply(&self, profile: &mut Profile, now: DateTime<Utc>) -> Result<()> {
        let mut errors = ValidationErrors::new();

        if let Some(biography) = &self.biography {
            if biography.chars().count() > MAX_BIOGRAPHY_LEN {
                errors.add_error(
                    "biography",
                    ValidationErrorKind::MaxLength {
                        max: MAX_BIOGRAPHY_LEN,
                        actual: biography.chars().count(),
                    },
                );
            }
        }
        if let Some(email) = &self.email {
            if !email.is_empty() && !email.contains('@') {
                errors.add_error("email", ValidationErrorKind::InvalidEmail);
            }
        }
        errors.into_result()?;

        if let Some(name) = &self.name {
            profile.name = Some(name.clone()).filter(|s| !s.is_empty());
        }
        if let Some(biography) = &self.biography {
            profile.biography = biography.clone();
        }
        if let Some(email) = &self.email {
            profile.email = Some(email.clone()).filter(|s| !s.is_empty());
        }
        if let Some(phone_number) = &self.phone_number {
            profile.phone_number = Some(phone_number.clone()).filter(|s| !s.is_empty());
        }
        if let Some(organization) = &self.organization {
            profile.organization = Some(organization.clone()).filter(|s| !s.is_empty());
        }
        if let Some(profile_image) = &self.profile_image {
            profile.profile_image = Some(profile_image.clone()).filter(|s| !s.is_empty());
        }

        profile.updated_at = now;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Resolver
// ═══════════════════════════════════════════════════════════════════════════════

/// Maps a principal to its profile record, lazily creating a default one on
/// first access.
#[derive(Clone)]
pub struct ProfileResolver {
    store: Arc<dyn DocumentStore>,
}

impl ProfileResolver {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Fetch the principal's profile, creating the default on first access.
    pub async fn resolve(&self, principal: &Principal) -> Result<Profile> {
        if let Some(doc) = self
            .store
            .get(COLLECTION, &principal.id)
            .await
            .map_err(GatherError::from)?
        {
            return doc.decode().map_err(GatherError::from);
        }

        let profile = Profile::seeded_from(principal, Utc::now());
        let data = serde_json::to_value(&profile)?;
        match self
            .store
            .commit(Transaction::new().create(COLLECTION, &principal.id, data))
            .await
        {
            Ok(()) => {
                info!(principal_id = %principal.id, "Created default profile");
                Ok(profile)
            }
            // Another request created it first; theirs wins.
            Err(StoreError::WriteConflict { .. }) => {
                debug!(principal_id = %principal.id, "Lost profile-creation race; re-reading");
                let doc = self
                    .store
                    .get(COLLECTION, &principal.id)
                    .await
                    .map_err(GatherError::from)?
                    .ok_or_else(|| GatherError::internal("profile vanished after creation race"))?;
                doc.decode().map_err(GatherError::from)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply a partial update to `principal_id`'s profile.
    ///
    /// Fails with `Forbidden` when the caller is not the profile owner.
    pub async fn update(
        &self,
        principal: &Principal,
        principal_id: &str,
        patch: &ProfilePatch,
    ) -> Result<Profile> {
        if principal.id != principal_id {
            return Err(GatherError::forbidden(
                "Profiles may only be updated by their owner",
            ));
        }

        // Ensure the record exists before patching it.
        self.resolve(principal).await?;

        for _attempt in 1..=MAX_WRITE_ATTEMPTS {
            let doc = self
                .store
                .get(COLLECTION, principal_id)
                .await
                .map_err(GatherError::from)?
                .ok_or_else(|| GatherError::not_found("Profile", principal_id))?;
            let mut profile: Profile = doc.decode().map_err(GatherError::from)?;

            patch.apply(&mut profile, Utc::now())?;

            let data = serde_json::to_value(&profile)?;
            match self
                .store
                .commit(Transaction::new().update(COLLECTION, principal_id, doc.version, data))
                .await
            {
                Ok(()) => {
                    info!(principal_id = %principal_id, "Profile updated");
                    return Ok(profile);
                }
                Err(StoreError::WriteConflict { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(GatherError::conflict("Profile", principal_id))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn resolver() -> ProfileResolver {
        ProfileResolver::new(Arc::new(MemoryStore::new()))
    }

    fn principal() -> Principal {
        Principal::new("user-1")
            .with_email("user1@example.com")
            .with_name("User One")
    }

    #[tokio::test]
    async fn test_resolve_creates_default_seeded_from_claims() {
        let resolver = resolver();
        let profile = resolver.resolve(&principal()).await.unwrap();

        assert_eq!(profile.id, "user-1");
        assert_eq!(profile.name.as_deref(), Some("User One"));
        assert_eq!(profile.email.as_deref(), Some("user1@example.com"));
        assert_eq!(profile.biography, "");
        assert!(profile.organization.is_none());
    }

    #[tokio::test]
    async fn test_resolve_returns_existing_unchanged() {
        let resolver = resolver();
        let principal = principal();

        let first = resolver.resolve(&principal).await.unwrap();
        let patch = ProfilePatch {
            biography: Some("Rustacean".to_string()),
            ..Default::default()
        };
        resolver.update(&principal, "user-1", &patch).await.unwrap();

        let second = resolver.resolve(&principal).await.unwrap();
        assert_eq!(second.biography, "Rustacean");
        assert_eq!(second.id, first.id);
    }

    #[tokio::test]
    async fn test_update_rejects_non_owner() {
        let resolver = resolver();
        let err = resolver
            .update(&principal(), "someone-else", &ProfilePatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn test_update_bounds_biography() {
        let resolver = resolver();
        let patch = ProfilePatch {
            biography: Some("x".repeat(MAX_BIOGRAPHY_LEN + 1)),
            ..Default::default()
        };

        let err = resolver
            .update(&principal(), "user-1", &patch)
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::ValidationError);
        assert!(err.field_errors().unwrap().has_errors("biography"));
    }

    #[tokio::test]
    async fn test_update_refreshes_updated_at() {
        let resolver = resolver();
        let principal = principal();
        let before = resolver.resolve(&principal).await.unwrap();

        let patch = ProfilePatch {
            organization: Some("Rust User Group".to_string()),
            ..Default::default()
        };
        let after = resolver.update(&principal, "user-1", &patch).await.unwrap();

        assert!(after.updated_at >= before.updated_at);
        assert_eq!(after.organization.as_deref(), Some("Rust User Group"));
    }
}
