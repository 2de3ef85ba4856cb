// Identity provider port.
//
// Authentication lives with the hosted auth service. The core only needs to
// turn an opaque session token into an `Actor`, once per request, and then
// pass that actor explicitly into every operation.

use crate::core::marketplace::Actor;
use crate::core::store::StoreError;
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The authenticated user id behind a session, whether or not a profile
    /// exists for it yet. Used by sign-up.
    async fn session_subject(&self, token: &str) -> Result<Uuid, IdentityError>;

    /// `Ok(None)` is an anonymous caller: a valid session with no profile behind it.
    async fn current_actor(&self, token: &str) -> Result<Option<Actor>, IdentityError>;
}
