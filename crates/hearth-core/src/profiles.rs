//! User-profile operations: the registration-side extension of the
//! identity provider.

use chrono::Utc;

use hearth_storage::{Collection, DocumentStore, UserId, UserProfile};

use crate::error::HouseholdError;
use crate::identity::AuthenticatedUser;

/// Seed the `users` document for a freshly registered identity, with an
/// empty household list. Replaces any existing profile for the uid.
pub async fn create_profile(
    store: &dyn DocumentStore,
    user: &AuthenticatedUser,
) -> Result<UserProfile, HouseholdError> {
    let profile = UserProfile {
        uid: user.uid.clone(),
        email: user.email.clone(),
        display_name: user.display_name.clone(),
        created_at: Utc::now(),
        household_ids: Vec::new(),
    };
    store
        .put(Collection::Users, user.uid.as_str(), profile.to_document()?)
        .await?;
    Ok(profile)
}

/// Fetch a profile; absent is a valid, non-error outcome.
pub async fn get_profile(
    store: &dyn DocumentStore,
    uid: &UserId,
) -> Result<Option<UserProfile>, HouseholdError> {
    match store.get(Collection::Users, uid.as_str()).await? {
        Some(doc) => Ok(Some(UserProfile::from_document(uid.as_str(), &doc)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_store_memory::MemoryStore;

    #[tokio::test]
    async fn create_then_get_roundtrip() {
        let store = MemoryStore::new();
        let user = AuthenticatedUser::new("u1", "u1@example.com", "Alice");

        let created = create_profile(&store, &user).await.unwrap();
        assert!(created.household_ids.is_empty());

        let fetched = get_profile(&store, &user.uid).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn absent_profile_is_none() {
        let store = MemoryStore::new();
        assert!(get_profile(&store, &UserId::from("ghost"))
            .await
            .unwrap()
            .is_none());
    }
}
