//! The household registry: authoritative creation and lookup of household
//! documents, and invite-code minting/rotation.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use hearth_audit::{AuditEntry, AuditLog, MembershipAction};
use hearth_storage::{
    Collection, DocumentStore, FieldOp, Household, HouseholdId, HouseholdSettings, HouseholdType,
    MemberEntry, MemberRole, MemberStatus, Revision, StoreError, UserId,
};

use crate::error::HouseholdError;
use crate::identity::AuthenticatedUser;
use crate::{invite, profiles};

/// Tunables for household creation and invite minting.
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// How long a freshly minted invite code stays valid.
    pub invite_ttl: chrono::Duration,
    /// Mint attempts before giving up with `ResourceExhausted`.
    pub max_mint_attempts: u32,
    /// Settings stamped onto new households.
    pub default_settings: HouseholdSettings,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            invite_ttl: chrono::Duration::days(7),
            max_mint_attempts: 10,
            default_settings: HouseholdSettings::default(),
        }
    }
}

/// Owns household documents. Holds only a handle to the store and the
/// audit sink; cheap to clone and pass by value.
#[derive(Clone)]
pub struct HouseholdRegistry {
    store: Arc<dyn DocumentStore>,
    audit: Arc<dyn AuditLog>,
    config: RegistryConfig,
}

impl HouseholdRegistry {
    pub fn new(store: Arc<dyn DocumentStore>, audit: Arc<dyn AuditLog>) -> Self {
        Self::with_config(store, audit, RegistryConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn DocumentStore>,
        audit: Arc<dyn AuditLog>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            store,
            audit,
            config,
        }
    }

    pub(crate) fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// Create a household with the founder as its sole admin member.
    ///
    /// Two writes: the household document first, then the founder's
    /// back-reference. They are not atomic; the consistency sweep repairs
    /// the gap if the second write is lost.
    pub async fn create_household(
        &self,
        name: &str,
        kind: HouseholdType,
        founder: &AuthenticatedUser,
    ) -> Result<Household, HouseholdError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(HouseholdError::InvalidInput(
                "household name must not be empty".to_owned(),
            ));
        }

        let invite_code = self.mint_unique_code().await?;
        let now = Utc::now();
        let id = HouseholdId::new();

        let mut members = BTreeMap::new();
        members.insert(
            founder.uid.clone(),
            MemberEntry {
                role: MemberRole::Admin,
                joined_at: now,
                status: MemberStatus::Active,
                display_name: Some(founder.display_name.clone()),
            },
        );

        let household = Household {
            id,
            name: name.to_owned(),
            kind,
            created_by: founder.uid.clone(),
            created_at: now,
            invite_code,
            invite_code_expiry: now + self.config.invite_ttl,
            members,
            settings: self.config.default_settings.clone(),
        };

        self.store
            .put(Collection::Households, &id.to_string(), household.to_document()?)
            .await?;
        append_back_reference(self.store.as_ref(), &founder.uid, &id).await?;

        info!(household = %id, founder = %founder.uid, "household created");
        self.record(AuditEntry::new(
            id,
            founder.uid.clone(),
            None,
            MembershipAction::HouseholdCreate,
        ))
        .await;

        Ok(household)
    }

    /// Mint a new invite code and expiry. Admin only; the old code becomes
    /// unusable for joining as soon as the write lands.
    pub async fn regenerate_invite_code(
        &self,
        household_id: &HouseholdId,
        requester: &AuthenticatedUser,
    ) -> Result<String, HouseholdError> {
        let (household, _) = load_household(self.store.as_ref(), household_id)
            .await?
            .ok_or(HouseholdError::NotFound)?;
        require_admin(&household, &requester.uid)?;

        let code = self.mint_unique_code().await?;
        let expiry = Utc::now() + self.config.invite_ttl;
        self.store
            .update_fields(
                Collection::Households,
                &household_id.to_string(),
                &[
                    FieldOp::Set("inviteCode".to_owned(), Value::String(code.clone())),
                    FieldOp::Set(
                        "inviteCodeExpiry".to_owned(),
                        Value::String(expiry.to_rfc3339()),
                    ),
                ],
                None,
            )
            .await?;

        info!(household = %household_id, "invite code rotated");
        self.record(AuditEntry::new(
            *household_id,
            requester.uid.clone(),
            None,
            MembershipAction::InviteRotate,
        ))
        .await;

        Ok(code)
    }

    /// Pure lookup; absent is a valid, non-error outcome.
    pub async fn get_household(
        &self,
        id: &HouseholdId,
    ) -> Result<Option<Household>, HouseholdError> {
        Ok(load_household(self.store.as_ref(), id)
            .await?
            .map(|(household, _)| household))
    }

    /// Exact-match lookup on a normalized invite code. Returns the read
    /// revision so callers can issue a conditional write against the
    /// snapshot they validated.
    pub async fn find_by_invite_code(
        &self,
        code: &str,
    ) -> Result<Option<(Household, Revision)>, HouseholdError> {
        let code = invite::normalize(code);
        if !invite::is_well_formed(&code) {
            return Ok(None);
        }
        let mut hits = self
            .store
            .query_eq(Collection::Households, "inviteCode", &Value::String(code))
            .await?;
        match hits.pop() {
            Some((id, doc)) => {
                let revision = doc.revision;
                Ok(Some((Household::from_document(&id, &doc)?, revision)))
            }
            None => Ok(None),
        }
    }

    /// Resolve every household on the user's profile, in the profile's
    /// order. Ids that no longer resolve are silently dropped; this is the
    /// one best-effort read in the system.
    pub async fn get_user_households(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Household>, HouseholdError> {
        let Some(profile) = profiles::get_profile(self.store.as_ref(), user_id).await? else {
            return Ok(Vec::new());
        };
        let mut out = Vec::with_capacity(profile.household_ids.len());
        for id in &profile.household_ids {
            match load_household(self.store.as_ref(), id).await {
                Ok(Some((household, _))) => out.push(household),
                Ok(None) => {}
                Err(err) => {
                    warn!(household = %id, error = %err, "skipping unresolvable household");
                }
            }
        }
        Ok(out)
    }

    /// Rename a household. Admin only; the trimmed name must be non-empty.
    pub async fn rename_household(
        &self,
        household_id: &HouseholdId,
        requester: &AuthenticatedUser,
        new_name: &str,
    ) -> Result<(), HouseholdError> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(HouseholdError::InvalidInput(
                "household name must not be empty".to_owned(),
            ));
        }
        let (household, _) = load_household(self.store.as_ref(), household_id)
            .await?
            .ok_or(HouseholdError::NotFound)?;
        require_admin(&household, &requester.uid)?;

        self.store
            .update_fields(
                Collection::Households,
                &household_id.to_string(),
                &[FieldOp::Set(
                    "name".to_owned(),
                    Value::String(new_name.to_owned()),
                )],
                None,
            )
            .await?;

        self.record(AuditEntry::new(
            *household_id,
            requester.uid.clone(),
            None,
            MembershipAction::HouseholdRename,
        ))
        .await;
        Ok(())
    }

    /// Draw codes until one is unused by any stored household, up to the
    /// configured cap.
    async fn mint_unique_code(&self) -> Result<String, HouseholdError> {
        for _ in 0..self.config.max_mint_attempts {
            let code = invite::generate_invite_code();
            let clashes = self
                .store
                .query_eq(
                    Collection::Households,
                    "inviteCode",
                    &Value::String(code.clone()),
                )
                .await?;
            if clashes.is_empty() {
                return Ok(code);
            }
        }
        Err(HouseholdError::ResourceExhausted(
            self.config.max_mint_attempts,
        ))
    }

    async fn record(&self, entry: AuditEntry) {
        if let Err(err) = self.audit.record(entry).await {
            warn!(error = %err, "audit record failed");
        }
    }
}

/// Fetch and decode a household together with its revision.
pub(crate) async fn load_household(
    store: &dyn DocumentStore,
    id: &HouseholdId,
) -> Result<Option<(Household, Revision)>, StoreError> {
    match store.get(Collection::Households, &id.to_string()).await? {
        Some(doc) => {
            let revision = doc.revision;
            Ok(Some((Household::from_document(&id.to_string(), &doc)?, revision)))
        }
        None => Ok(None),
    }
}

/// Role checks are re-derived from a freshly fetched document on every
/// privileged call; nothing caches roles across requests.
pub(crate) fn require_admin(
    household: &Household,
    uid: &UserId,
) -> Result<(), HouseholdError> {
    match household.members.get(uid) {
        Some(entry) if entry.role == MemberRole::Admin => Ok(()),
        _ => Err(HouseholdError::Forbidden("admin role required")),
    }
}

/// Append the household id to the user's `householdIds`. A missing user
/// document surfaces as `NotFound` (the user side of the pair is absent).
pub(crate) async fn append_back_reference(
    store: &dyn DocumentStore,
    uid: &UserId,
    household_id: &HouseholdId,
) -> Result<(), HouseholdError> {
    store
        .update_fields(
            Collection::Users,
            uid.as_str(),
            &[FieldOp::AddToSet(
                "householdIds".to_owned(),
                Value::String(household_id.to_string()),
            )],
            None,
        )
        .await
        .map_err(|err| match err {
            StoreError::NotFound => HouseholdError::NotFound,
            other => HouseholdError::Storage(other),
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_audit::MemoryAuditLog;
    use hearth_storage::{DocumentBody, MockDocumentStore, VersionedDocument};
    use hearth_store_memory::MemoryStore;

    fn alice() -> AuthenticatedUser {
        AuthenticatedUser::new("alice", "alice@example.com", "Alice")
    }

    fn bob() -> AuthenticatedUser {
        AuthenticatedUser::new("bob", "bob@example.com", "Bob")
    }

    async fn registry_with_profiles(users: &[&AuthenticatedUser]) -> HouseholdRegistry {
        let store = Arc::new(MemoryStore::new());
        for user in users {
            profiles::create_profile(store.as_ref(), user).await.unwrap();
        }
        HouseholdRegistry::new(store, Arc::new(MemoryAuditLog::new()))
    }

    #[tokio::test]
    async fn create_seeds_founder_as_sole_admin() {
        let founder = alice();
        let registry = registry_with_profiles(&[&founder]).await;

        let household = registry
            .create_household("Appart Centre-Ville", HouseholdType::Colocation, &founder)
            .await
            .unwrap();

        assert_eq!(household.members.len(), 1);
        let entry = household.members.get(&founder.uid).unwrap();
        assert_eq!(entry.role, MemberRole::Admin);
        assert_eq!(entry.status, MemberStatus::Active);
        assert_eq!(entry.display_name.as_deref(), Some("Alice"));
        assert_eq!(household.created_by, founder.uid);
        assert_eq!(household.settings.max_members, 10);
        assert_eq!(household.invite_code.len(), 6);
        assert!(household.invite_code_expiry > household.created_at);

        // Founder's back-reference landed.
        let profile = profiles::get_profile(registry.store(), &founder.uid)
            .await
            .unwrap()
            .unwrap();
        assert!(profile.household_ids.contains(&household.id));
    }

    #[tokio::test]
    async fn create_round_trips_through_the_store() {
        let founder = alice();
        let registry = registry_with_profiles(&[&founder]).await;

        let created = registry
            .create_household("Chez Nous", HouseholdType::Family, &founder)
            .await
            .unwrap();
        let fetched = registry.get_household(&created.id).await.unwrap().unwrap();
        assert_eq!(created, fetched);
    }

    #[tokio::test]
    async fn create_rejects_blank_names() {
        let founder = alice();
        let registry = registry_with_profiles(&[&founder]).await;

        for name in ["", "   ", "\t"] {
            let err = registry
                .create_household(name, HouseholdType::Couple, &founder)
                .await
                .unwrap_err();
            assert!(matches!(err, HouseholdError::InvalidInput(_)), "{name:?}");
        }
    }

    #[tokio::test]
    async fn create_trims_the_name() {
        let founder = alice();
        let registry = registry_with_profiles(&[&founder]).await;
        let household = registry
            .create_household("  Coloc  ", HouseholdType::Colocation, &founder)
            .await
            .unwrap();
        assert_eq!(household.name, "Coloc");
    }

    #[tokio::test]
    async fn minting_gives_up_after_the_configured_attempts() {
        let mut store = MockDocumentStore::new();
        // Every candidate code is already taken.
        store.expect_query_eq().times(10).returning(|_, _, _| {
            Ok(vec![(
                "h1".to_owned(),
                VersionedDocument {
                    revision: Revision(1),
                    body: DocumentBody::new(),
                },
            )])
        });
        let registry =
            HouseholdRegistry::new(Arc::new(store), Arc::new(MemoryAuditLog::new()));

        let err = registry
            .create_household("Coloc", HouseholdType::Colocation, &alice())
            .await
            .unwrap_err();
        assert!(matches!(err, HouseholdError::ResourceExhausted(10)));
    }

    #[tokio::test]
    async fn regenerate_rotates_code_and_kills_the_old_one() {
        let founder = alice();
        let registry = registry_with_profiles(&[&founder]).await;
        let household = registry
            .create_household("Coloc", HouseholdType::Colocation, &founder)
            .await
            .unwrap();
        let old_code = household.invite_code.clone();

        let new_code = registry
            .regenerate_invite_code(&household.id, &founder)
            .await
            .unwrap();
        assert_ne!(new_code, old_code);
        assert_eq!(new_code.len(), 6);

        assert!(registry.find_by_invite_code(&old_code).await.unwrap().is_none());
        let (found, _) = registry
            .find_by_invite_code(&new_code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, household.id);
    }

    #[tokio::test]
    async fn regenerate_requires_admin() {
        let founder = alice();
        let outsider = bob();
        let registry = registry_with_profiles(&[&founder, &outsider]).await;
        let household = registry
            .create_household("Coloc", HouseholdType::Colocation, &founder)
            .await
            .unwrap();

        let err = registry
            .regenerate_invite_code(&household.id, &outsider)
            .await
            .unwrap_err();
        assert!(matches!(err, HouseholdError::Forbidden(_)));
    }

    #[tokio::test]
    async fn regenerate_unknown_household_is_not_found() {
        let registry = registry_with_profiles(&[]).await;
        let err = registry
            .regenerate_invite_code(&HouseholdId::new(), &alice())
            .await
            .unwrap_err();
        assert!(matches!(err, HouseholdError::NotFound));
    }

    #[tokio::test]
    async fn find_by_invite_code_normalizes_case() {
        let founder = alice();
        let registry = registry_with_profiles(&[&founder]).await;
        let household = registry
            .create_household("Coloc", HouseholdType::Colocation, &founder)
            .await
            .unwrap();

        let lowered = household.invite_code.to_ascii_lowercase();
        let (found, _) = registry
            .find_by_invite_code(&format!(" {lowered} "))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, household.id);
    }

    #[tokio::test]
    async fn get_user_households_drops_dangling_ids() {
        let founder = alice();
        let registry = registry_with_profiles(&[&founder]).await;
        let household = registry
            .create_household("Coloc", HouseholdType::Colocation, &founder)
            .await
            .unwrap();

        // Simulate drift: a back-reference to a household that was never
        // stored.
        append_back_reference(registry.store(), &founder.uid, &HouseholdId::new())
            .await
            .unwrap();

        let households = registry.get_user_households(&founder.uid).await.unwrap();
        assert_eq!(households.len(), 1);
        assert_eq!(households[0].id, household.id);
    }

    #[tokio::test]
    async fn get_user_households_without_profile_is_empty() {
        let registry = registry_with_profiles(&[]).await;
        let households = registry
            .get_user_households(&UserId::from("ghost"))
            .await
            .unwrap();
        assert!(households.is_empty());
    }

    #[tokio::test]
    async fn rename_is_admin_only_and_trims() {
        let founder = alice();
        let outsider = bob();
        let registry = registry_with_profiles(&[&founder, &outsider]).await;
        let household = registry
            .create_household("Coloc", HouseholdType::Colocation, &founder)
            .await
            .unwrap();

        registry
            .rename_household(&household.id, &founder, "  Maison Bleue ")
            .await
            .unwrap();
        let fetched = registry.get_household(&household.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Maison Bleue");

        let err = registry
            .rename_household(&household.id, &outsider, "Nope")
            .await
            .unwrap_err();
        assert!(matches!(err, HouseholdError::Forbidden(_)));

        let err = registry
            .rename_household(&household.id, &founder, "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, HouseholdError::InvalidInput(_)));
    }
}
