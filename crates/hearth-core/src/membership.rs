//! Membership state transitions.
//!
//! Per (user, household) pair the states are
//! `NonMember → Active → {Inactive, removed}`. Every transition writes the
//! household document first, then mirrors the change on the member's
//! profile. The join-time capacity and duplicate checks commit together
//! with the member insert as one revision-conditioned update on the
//! household document, so two racing joins cannot both slip past a stale
//! capacity read.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use hearth_audit::{AuditEntry, AuditLog, MembershipAction};
use hearth_storage::{
    Collection, DocumentStore, FieldOp, Household, HouseholdId, MemberEntry, MemberRole,
    MemberStatus, StoreError, UserId,
};

use crate::error::HouseholdError;
use crate::identity::AuthenticatedUser;
use crate::registry::{append_back_reference, load_household, require_admin, HouseholdRegistry};

/// Re-reads of the household after losing a conditional write, before the
/// conflict is handed to the caller.
const MAX_JOIN_RETRIES: u32 = 3;

/// Owns the join/leave/remove transitions and the user-side mirror of the
/// household member map.
pub struct MembershipManager {
    store: Arc<dyn DocumentStore>,
    registry: HouseholdRegistry,
    audit: Arc<dyn AuditLog>,
}

impl MembershipManager {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        registry: HouseholdRegistry,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            store,
            registry,
            audit,
        }
    }

    /// Join a household through its invite code.
    ///
    /// Validation order: code lookup (`NotFound`), expiry (`Expired`),
    /// duplicate membership (`AlreadyMember`), capacity
    /// (`CapacityExceeded`). Returns a fresh post-write snapshot of the
    /// household, not the one validated against.
    pub async fn join(
        &self,
        invite_code: &str,
        user: &AuthenticatedUser,
    ) -> Result<Household, HouseholdError> {
        let mut attempts = 0;
        let household_id = loop {
            let (household, revision) = self
                .registry
                .find_by_invite_code(invite_code)
                .await?
                .ok_or(HouseholdError::NotFound)?;

            if Utc::now() >= household.invite_code_expiry {
                return Err(HouseholdError::Expired);
            }
            if household.members.contains_key(&user.uid) {
                return Err(HouseholdError::AlreadyMember);
            }
            if household.members.len() as u32 >= household.settings.max_members {
                return Err(HouseholdError::CapacityExceeded);
            }

            let entry = MemberEntry {
                role: MemberRole::Member,
                joined_at: Utc::now(),
                status: MemberStatus::Active,
                display_name: Some(user.display_name.clone()),
            };
            let insert = FieldOp::Set(format!("members.{}", user.uid), entry.to_value()?);
            match self
                .store
                .update_fields(
                    Collection::Households,
                    &household.id.to_string(),
                    &[insert],
                    Some(revision),
                )
                .await
            {
                Ok(_) => break household.id,
                // Lost the race against another writer: re-read and
                // re-validate against the new revision.
                Err(StoreError::Conflict) if attempts < MAX_JOIN_RETRIES => {
                    attempts += 1;
                }
                Err(err) => return Err(err.into()),
            }
        };

        append_back_reference(self.store.as_ref(), &user.uid, &household_id).await?;

        info!(household = %household_id, user = %user.uid, "member joined");
        self.record(AuditEntry::new(
            household_id,
            user.uid.clone(),
            None,
            MembershipAction::MemberJoin,
        ))
        .await;

        self.registry
            .get_household(&household_id)
            .await?
            .ok_or(HouseholdError::NotFound)
    }

    /// Remove a member. Admin only; the founder can never be removed.
    pub async fn remove_member(
        &self,
        household_id: &HouseholdId,
        target: &UserId,
        requester: &AuthenticatedUser,
    ) -> Result<(), HouseholdError> {
        let (household, _) = load_household(self.store.as_ref(), household_id)
            .await?
            .ok_or(HouseholdError::NotFound)?;
        require_admin(&household, &requester.uid)?;
        if *target == household.created_by {
            return Err(HouseholdError::Forbidden("the founder cannot be removed"));
        }

        self.remove_entry(household_id, target).await?;

        info!(household = %household_id, target = %target, "member removed");
        self.record(AuditEntry::new(
            *household_id,
            requester.uid.clone(),
            Some(target.clone()),
            MembershipAction::MemberRemove,
        ))
        .await;
        Ok(())
    }

    /// Leave a household. The founder cannot leave; ownership transfer and
    /// household deletion are the only ways out, and neither exists here.
    pub async fn leave_household(
        &self,
        household_id: &HouseholdId,
        user: &AuthenticatedUser,
    ) -> Result<(), HouseholdError> {
        let (household, _) = load_household(self.store.as_ref(), household_id)
            .await?
            .ok_or(HouseholdError::NotFound)?;
        if user.uid == household.created_by {
            return Err(HouseholdError::Forbidden("the founder cannot leave"));
        }

        self.remove_entry(household_id, &user.uid).await?;

        info!(household = %household_id, user = %user.uid, "member left");
        self.record(AuditEntry::new(
            *household_id,
            user.uid.clone(),
            None,
            MembershipAction::MemberLeave,
        ))
        .await;
        Ok(())
    }

    /// Flip a member between active and inactive. Admin only.
    pub async fn set_member_status(
        &self,
        household_id: &HouseholdId,
        target: &UserId,
        requester: &AuthenticatedUser,
        status: MemberStatus,
    ) -> Result<(), HouseholdError> {
        let (household, _) = load_household(self.store.as_ref(), household_id)
            .await?
            .ok_or(HouseholdError::NotFound)?;
        require_admin(&household, &requester.uid)?;
        if !household.members.contains_key(target) {
            return Err(HouseholdError::NotFound);
        }

        self.store
            .update_fields(
                Collection::Households,
                &household_id.to_string(),
                &[FieldOp::Set(
                    format!("members.{target}.status"),
                    Value::String(status.as_str().to_owned()),
                )],
                None,
            )
            .await?;

        self.record(AuditEntry::new(
            *household_id,
            requester.uid.clone(),
            Some(target.clone()),
            MembershipAction::MemberStatusChange,
        ))
        .await;
        Ok(())
    }

    /// Dual delete: the member field on the household, then the
    /// back-reference on the user.
    async fn remove_entry(
        &self,
        household_id: &HouseholdId,
        uid: &UserId,
    ) -> Result<(), HouseholdError> {
        self.store
            .update_fields(
                Collection::Households,
                &household_id.to_string(),
                &[FieldOp::Delete(format!("members.{uid}"))],
                None,
            )
            .await?;
        self.store
            .update_fields(
                Collection::Users,
                uid.as_str(),
                &[FieldOp::RemoveFromSet(
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

    async fn record(&self, entry: AuditEntry) {
        if let Err(err) = self.audit.record(entry).await {
            warn!(error = %err, "audit record failed");
        }
    }
}
