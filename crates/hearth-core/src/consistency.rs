//! Reconciliation between household member maps and user back-references.
//!
//! Membership mutations issue two writes that are not wrapped in a single
//! transaction, so a failure between them can leave one side behind. The
//! sweep re-adds missing back-references (an idempotent `AddToSet`) and
//! reports drift in the other direction without deleting anything.

use tracing::info;

use hearth_storage::{Collection, DocumentStore, Household, HouseholdId, UserId, UserProfile};

use crate::error::HouseholdError;
use crate::profiles;
use crate::registry::{append_back_reference, load_household};

/// Outcome of reconciling a single household.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RepairReport {
    /// Back-references that were re-added to user profiles.
    pub restored: Vec<UserId>,
    /// Members whose user document does not exist at all.
    pub missing_profiles: Vec<UserId>,
}

/// Outcome of a full sweep over both collections.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SweepReport {
    pub households: Vec<(HouseholdId, RepairReport)>,
    /// (user, household) pairs where the profile lists a household that
    /// does not have the user as a member, or that no longer exists.
    /// Reported, never deleted: `get_user_households` already tolerates
    /// these.
    pub orphaned: Vec<(UserId, HouseholdId)>,
}

/// Repair the user-side mirror of one household's member map.
pub async fn reconcile_household(
    store: &dyn DocumentStore,
    household_id: &HouseholdId,
) -> Result<RepairReport, HouseholdError> {
    let (household, _) = load_household(store, household_id)
        .await?
        .ok_or(HouseholdError::NotFound)?;

    let mut report = RepairReport::default();
    for uid in household.members.keys() {
        match profiles::get_profile(store, uid).await? {
            None => report.missing_profiles.push(uid.clone()),
            Some(profile) if !profile.household_ids.contains(household_id) => {
                append_back_reference(store, uid, household_id).await?;
                info!(household = %household_id, user = %uid, "restored missing back-reference");
                report.restored.push(uid.clone());
            }
            Some(_) => {}
        }
    }
    Ok(report)
}

/// Reconcile every household, then report orphaned back-references across
/// every user profile.
pub async fn sweep(store: &dyn DocumentStore) -> Result<SweepReport, HouseholdError> {
    let mut report = SweepReport::default();

    let mut households = Vec::new();
    for (id, doc) in store.scan(Collection::Households).await? {
        households.push(Household::from_document(&id, &doc)?);
    }
    for household in &households {
        let repaired = reconcile_household(store, &household.id).await?;
        report.households.push((household.id, repaired));
    }

    for (uid, doc) in store.scan(Collection::Users).await? {
        let profile = UserProfile::from_document(&uid, &doc)?;
        for household_id in &profile.household_ids {
            let is_member = households
                .iter()
                .find(|h| h.id == *household_id)
                .is_some_and(|h| h.members.contains_key(&profile.uid));
            if !is_member {
                report.orphaned.push((profile.uid.clone(), *household_id));
            }
        }
    }

    Ok(report)
}
