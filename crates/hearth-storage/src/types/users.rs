//! User-profile types: the identity provider's mutable extension, holding
//! the household back-references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{HouseholdId, UserId};
use crate::{DocumentBody, StoreError, VersionedDocument};

/// A user document in the `users` collection, keyed by the provider's uid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: UserId,
    pub email: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    /// Ids of the households this user currently belongs to. Mirrors the
    /// household-side member maps; order carries no meaning.
    #[serde(default)]
    pub household_ids: Vec<HouseholdId>,
}

impl UserProfile {
    /// Serialize into a document body for `put`.
    pub fn to_document(&self) -> Result<DocumentBody, StoreError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(StoreError::Corrupted(format!(
                "profile serialized to non-object: {other}"
            ))),
            Err(e) => Err(StoreError::Corrupted(e.to_string())),
        }
    }

    /// Deserialize from a stored document. The document id (the uid) is
    /// authoritative.
    pub fn from_document(uid: &str, doc: &VersionedDocument) -> Result<Self, StoreError> {
        let mut profile: UserProfile =
            serde_json::from_value(Value::Object(doc.body.clone()))
                .map_err(|e| StoreError::Corrupted(e.to_string()))?;
        profile.uid = UserId(uid.to_owned());
        Ok(profile)
    }
}
