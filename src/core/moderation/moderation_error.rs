// Moderation error taxonomy.

use crate::core::store::StoreError;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    /// Malformed or missing input. Caller's fault, never retried.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authorization(String),

    #[error("Profile {0} is not approved yet. Please contact an administrator.")]
    NotApproved(Uuid),

    /// The record is no longer in a state that allows the action.
    #[error("{entity} {id} is already {actual}; cannot {action}")]
    InvalidState {
        entity: &'static str,
        id: Uuid,
        actual: String,
        action: &'static str,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl ModerationError {
    pub fn validation(message: impl Into<String>) -> Self {
        ModerationError::Validation(message.into())
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        ModerationError::Authorization(message.into())
    }

    /// Whether the message is meant for the end user. Store failures are not.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, ModerationError::Store(_))
    }
}

impl From<StoreError> for ModerationError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { collection, id } => ModerationError::NotFound {
                entity: collection.entity_name(),
                id,
            },
            other => ModerationError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::Collection;

    #[test]
    fn test_store_not_found_becomes_not_found() {
        let id = Uuid::new_v4();
        let error: ModerationError = StoreError::NotFound {
            collection: Collection::SalesReports,
            id,
        }
        .into();

        assert!(matches!(
            error,
            ModerationError::NotFound { entity: "Sales report", id: found } if found == id
        ));
        assert!(error.is_user_facing());

        let backend: ModerationError = StoreError::Backend("disk full".to_string()).into();
        assert!(!backend.is_user_facing());
    }
}
