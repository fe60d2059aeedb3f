//! Identity boundary.
//!
//! Credential handling (login, registration, password reset) lives in an
//! external provider. The services here only ever accept an
//! [`AuthenticatedUser`] for the requester side of a call, and those are
//! handed out by an [`IdentityProvider`], never built from a bare,
//! caller-supplied uid.

use async_trait::async_trait;
use thiserror::Error;

use hearth_storage::UserId;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider error: {0}")]
    Provider(String),
}

/// A signed-in identity, as resolved by the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub uid: UserId,
    pub email: String,
    pub display_name: String,
}

impl AuthenticatedUser {
    pub fn new(
        uid: impl Into<String>,
        email: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            uid: UserId(uid.into()),
            email: email.into(),
            display_name: display_name.into(),
        }
    }
}

/// The external authentication subsystem, reduced to the one question the
/// membership layer asks: who is calling?
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The currently signed-in user, if any.
    async fn current_user(&self) -> Result<Option<AuthenticatedUser>, IdentityError>;
}

/// Fixed identity, for tests and embedders that manage their own session.
pub struct StaticIdentity(Option<AuthenticatedUser>);

impl StaticIdentity {
    pub fn signed_in(user: AuthenticatedUser) -> Self {
        Self(Some(user))
    }

    pub fn signed_out() -> Self {
        Self(None)
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user(&self) -> Result<Option<AuthenticatedUser>, IdentityError> {
        Ok(self.0.clone())
    }
}
