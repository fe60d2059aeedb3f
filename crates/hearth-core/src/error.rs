//! Error taxonomy for the household services.
//!
//! Every domain rule violation is detected before any write and fails fast
//! with a specific kind; storage failures are propagated, never swallowed.

use thiserror::Error;

use hearth_storage::{
    ParseHouseholdTypeError, ParseMemberRoleError, ParseMemberStatusError, ParseModuleError,
    StoreError,
};

#[derive(Debug, Error)]
pub enum HouseholdError {
    /// Household or user document absent.
    #[error("not found")]
    NotFound,

    /// Authorization failure: not an admin, or a founder-protected
    /// operation.
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("already a member of this household")]
    AlreadyMember,

    #[error("household is at its maximum number of members")]
    CapacityExceeded,

    #[error("invite code has expired")]
    Expired,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Invite-code minting gave up after the configured number of
    /// collision retries.
    #[error("could not mint a unique invite code after {0} attempts")]
    ResourceExhausted(u32),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl From<ParseHouseholdTypeError> for HouseholdError {
    fn from(err: ParseHouseholdTypeError) -> Self {
        HouseholdError::InvalidInput(err.to_string())
    }
}

impl From<ParseMemberRoleError> for HouseholdError {
    fn from(err: ParseMemberRoleError) -> Self {
        HouseholdError::InvalidInput(err.to_string())
    }
}

impl From<ParseMemberStatusError> for HouseholdError {
    fn from(err: ParseMemberStatusError) -> Self {
        HouseholdError::InvalidInput(err.to_string())
    }
}

impl From<ParseModuleError> for HouseholdError {
    fn from(err: ParseModuleError) -> Self {
        HouseholdError::InvalidInput(err.to_string())
    }
}
