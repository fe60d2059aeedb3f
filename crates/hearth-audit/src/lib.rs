//! Audit logging abstraction for hearth.
//!
//! This crate defines the `AuditLog` trait for persisting membership audit
//! events and the types representing auditable actions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

use hearth_storage::{HouseholdId, UserId};

/// Unique identifier for an audit entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditEntryId(pub Uuid);

impl AuditEntryId {
    /// Generate a new audit entry ID using UUID v7 (time-ordered)
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for AuditEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AuditEntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AuditEntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Categories of auditable membership actions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipAction {
    HouseholdCreate,
    HouseholdRename,
    InviteRotate,
    MemberJoin,
    MemberRemove,
    MemberLeave,
    MemberStatusChange,
}

/// One recorded membership event
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub household_id: HouseholdId,
    /// Who performed the action.
    pub actor: UserId,
    /// Whom the action affected, when different from the actor.
    pub subject: Option<UserId>,
    pub action: MembershipAction,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        household_id: HouseholdId,
        actor: UserId,
        subject: Option<UserId>,
        action: MembershipAction,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            household_id,
            actor,
            subject,
            action,
            at: Utc::now(),
        }
    }
}

/// Audit log errors
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit backend error: {0}")]
    Backend(String),
}

/// Sink for membership audit events.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Persist one audit entry.
    async fn record(&self, entry: AuditEntry) -> Result<(), AuditError>;

    /// Entries recorded for a household, oldest first.
    async fn entries_for(&self, household_id: &HouseholdId) -> Result<Vec<AuditEntry>, AuditError>;
}

/// In-memory audit log.
///
/// Entries are only visible within a single process; suitable for tests
/// and single-server deployments.
#[derive(Default)]
pub struct MemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| AuditError::Backend(e.to_string()))?;
        entries.push(entry);
        Ok(())
    }

    async fn entries_for(&self, household_id: &HouseholdId) -> Result<Vec<AuditEntry>, AuditError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| AuditError::Backend(e.to_string()))?;
        Ok(entries
            .iter()
            .filter(|e| e.household_id == *household_id)
            .cloned()
            .collect())
    }
}

/// Audit sink that drops every entry.
pub struct NoopAuditLog;

#[async_trait]
impl AuditLog for NoopAuditLog {
    async fn record(&self, _entry: AuditEntry) -> Result<(), AuditError> {
        Ok(())
    }

    async fn entries_for(
        &self,
        _household_id: &HouseholdId,
    ) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_and_filter_by_household() {
        let log = MemoryAuditLog::new();
        let home = HouseholdId::new();
        let other = HouseholdId::new();

        log.record(AuditEntry::new(
            home,
            UserId::from("a"),
            None,
            MembershipAction::HouseholdCreate,
        ))
        .await
        .unwrap();
        log.record(AuditEntry::new(
            other,
            UserId::from("b"),
            None,
            MembershipAction::HouseholdCreate,
        ))
        .await
        .unwrap();
        log.record(AuditEntry::new(
            home,
            UserId::from("b"),
            None,
            MembershipAction::MemberJoin,
        ))
        .await
        .unwrap();

        let entries = log.entries_for(&home).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, MembershipAction::HouseholdCreate);
        assert_eq!(entries[1].action, MembershipAction::MemberJoin);
    }

    #[tokio::test]
    async fn remove_records_subject() {
        let log = MemoryAuditLog::new();
        let home = HouseholdId::new();
        log.record(AuditEntry::new(
            home,
            UserId::from("admin"),
            Some(UserId::from("target")),
            MembershipAction::MemberRemove,
        ))
        .await
        .unwrap();

        let entries = log.entries_for(&home).await.unwrap();
        assert_eq!(entries[0].subject, Some(UserId::from("target")));
    }

    #[tokio::test]
    async fn noop_drops_everything() {
        let log = NoopAuditLog;
        let home = HouseholdId::new();
        log.record(AuditEntry::new(
            home,
            UserId::from("a"),
            None,
            MembershipAction::MemberJoin,
        ))
        .await
        .unwrap();
        assert!(log.entries_for(&home).await.unwrap().is_empty());
    }

    #[test]
    fn actions_serialize_snake_case() {
        let json = serde_json::to_string(&MembershipAction::MemberStatusChange).unwrap();
        assert_eq!(json, "\"member_status_change\"");
    }

    #[test]
    fn entry_ids_are_time_ordered() {
        let a = AuditEntryId::new();
        let b = AuditEntryId::new();
        assert_ne!(a, b);
    }
}
