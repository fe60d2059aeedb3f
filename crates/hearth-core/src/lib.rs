//! Household registry and membership management.
//!
//! Two service components operate against a shared document store: the
//! [`HouseholdRegistry`] owns household documents (creation, invite-code
//! minting and rotation, lookup), and the [`MembershipManager`] owns the
//! join/leave/remove transitions together with the back-references on each
//! member's user profile.
//!
//! Both are plain structs holding a handle to the store; construct them
//! once and pass them around. There is no process-wide state.

pub mod consistency;
pub mod error;
pub mod identity;
pub mod invite;
pub mod membership;
pub mod profiles;
pub mod registry;

pub use consistency::{reconcile_household, sweep, RepairReport, SweepReport};
pub use error::HouseholdError;
pub use identity::{AuthenticatedUser, IdentityError, IdentityProvider, StaticIdentity};
pub use membership::MembershipManager;
pub use registry::{HouseholdRegistry, RegistryConfig};
