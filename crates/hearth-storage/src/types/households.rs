//! Household types: the group record, its member map, and the closed
//! enumerations for type, role, and status.
//!
//! Unrecognized values are rejected at the boundary; nothing in the domain
//! carries open string-typed roles or types.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::{HouseholdId, UserId};
use crate::{DocumentBody, StoreError, VersionedDocument};

/// What kind of group a household is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HouseholdType {
    Colocation,
    Couple,
    Family,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized household type: {0}")]
pub struct ParseHouseholdTypeError(pub String);

impl FromStr for HouseholdType {
    type Err = ParseHouseholdTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "colocation" => Ok(HouseholdType::Colocation),
            "couple" => Ok(HouseholdType::Couple),
            "family" => Ok(HouseholdType::Family),
            "other" => Ok(HouseholdType::Other),
            _ => Err(ParseHouseholdTypeError(s.to_owned())),
        }
    }
}

impl HouseholdType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HouseholdType::Colocation => "colocation",
            HouseholdType::Couple => "couple",
            HouseholdType::Family => "family",
            HouseholdType::Other => "other",
        }
    }
}

/// Role of a member within a household.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Admin,
    Member,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized member role: {0}")]
pub struct ParseMemberRoleError(pub String);

impl FromStr for MemberRole {
    type Err = ParseMemberRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(MemberRole::Admin),
            "member" => Ok(MemberRole::Member),
            "child" => Ok(MemberRole::Child),
            _ => Err(ParseMemberRoleError(s.to_owned())),
        }
    }
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Admin => "admin",
            MemberRole::Member => "member",
            MemberRole::Child => "child",
        }
    }
}

/// Whether a membership is currently active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized member status: {0}")]
pub struct ParseMemberStatusError(pub String);

impl FromStr for MemberStatus {
    type Err = ParseMemberStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(MemberStatus::Active),
            "inactive" => Ok(MemberStatus::Inactive),
            _ => Err(ParseMemberStatusError(s.to_owned())),
        }
    }
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "active",
            MemberStatus::Inactive => "inactive",
        }
    }
}

/// Feature modules a household can enable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    Tasks,
    Finances,
    Chat,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized module: {0}")]
pub struct ParseModuleError(pub String);

impl FromStr for Module {
    type Err = ParseModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tasks" => Ok(Module::Tasks),
            "finances" => Ok(Module::Finances),
            "chat" => Ok(Module::Chat),
            _ => Err(ParseModuleError(s.to_owned())),
        }
    }
}

impl Module {
    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Tasks => "tasks",
            Module::Finances => "finances",
            Module::Chat => "chat",
        }
    }
}

/// Per-member record inside a household's member map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberEntry {
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
    pub status: MemberStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl MemberEntry {
    /// JSON value for a `members.{uid}` field write.
    pub fn to_value(&self) -> Result<Value, StoreError> {
        serde_json::to_value(self).map_err(|e| StoreError::Corrupted(e.to_string()))
    }
}

/// Household capacity and enabled feature modules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdSettings {
    pub max_members: u32,
    pub modules: BTreeSet<Module>,
}

impl Default for HouseholdSettings {
    fn default() -> Self {
        Self {
            max_members: 10,
            modules: BTreeSet::from([Module::Tasks, Module::Finances, Module::Chat]),
        }
    }
}

/// A household document.
///
/// The founder (`created_by`) is always present in `members` with role
/// admin for the lifetime of the household.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Household {
    pub id: HouseholdId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: HouseholdType,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub invite_code: String,
    pub invite_code_expiry: DateTime<Utc>,
    pub members: BTreeMap<UserId, MemberEntry>,
    pub settings: HouseholdSettings,
}

impl Household {
    /// Serialize into a document body for `put`.
    pub fn to_document(&self) -> Result<DocumentBody, StoreError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(StoreError::Corrupted(format!(
                "household serialized to non-object: {other}"
            ))),
            Err(e) => Err(StoreError::Corrupted(e.to_string())),
        }
    }

    /// Deserialize from a stored document. The document id is
    /// authoritative and overrides any id embedded in the body.
    pub fn from_document(id: &str, doc: &VersionedDocument) -> Result<Self, StoreError> {
        let mut household: Household =
            serde_json::from_value(Value::Object(doc.body.clone()))
                .map_err(|e| StoreError::Corrupted(e.to_string()))?;
        household.id = id
            .parse()
            .map_err(|e: uuid::Error| StoreError::Corrupted(e.to_string()))?;
        Ok(household)
    }
}
