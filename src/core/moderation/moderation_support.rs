// Precondition checks and lookups shared by the moderation services.

use super::moderation_error::ModerationError;
use crate::core::marketplace::{Actor, Profile, ProfileSummary, Related};
use crate::core::store::{Entities, Entity};
use uuid::Uuid;

pub fn require_admin(actor: &Actor) -> Result<(), ModerationError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(ModerationError::authorization(
            "Only administrators can perform this action",
        ))
    }
}

/// Loads the actor's profile and checks it may create records.
pub async fn load_submitter(entities: &Entities, actor: &Actor) -> Result<Profile, ModerationError> {
    let profile: Profile = entities
        .get(actor.id)
        .await?
        .ok_or_else(|| ModerationError::authorization("A registered profile is required"))?;

    if profile.is_suspended() {
        return Err(ModerationError::authorization(
            "Suspended accounts cannot submit content",
        ));
    }
    Ok(profile)
}

/// Profile lookup for notification text after a transition has committed.
///
/// The transition already happened, so a failed lookup only costs the message.
pub async fn profile_for_notice(entities: &Entities, id: Uuid) -> Option<Profile> {
    match entities.get::<Profile>(id).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::warn!(profile_id = %id, error = %e, "Profile lookup for notification failed");
            None
        }
    }
}

/// Name to print in a notice, or the placeholder when the profile is gone.
pub async fn name_for_notice(entities: &Entities, id: Uuid) -> String {
    let profile = profile_for_notice(entities, id).await;
    Related::from_lookup(id, profile.as_ref().map(ProfileSummary::from))
        .label()
        .to_string()
}

/// Explains why a guarded transition wrote nothing: the record is gone, or it
/// has already left the state the action needs.
pub async fn transition_conflict<E: Entity>(
    entities: &Entities,
    id: Uuid,
    action: &'static str,
    status: impl FnOnce(&E) -> String,
) -> ModerationError {
    let entity = E::COLLECTION.entity_name();
    match entities.get::<E>(id).await {
        Ok(Some(record)) => ModerationError::InvalidState {
            entity,
            id,
            actual: status(&record),
            action,
        },
        Ok(None) => ModerationError::NotFound { entity, id },
        Err(e) => e.into(),
    }
}

/// Trims `value` and fails when nothing is left.
pub fn non_empty(field: &str, value: &str) -> Result<String, ModerationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ModerationError::validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// `None` for missing or blank optional text.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::marketplace::{AccountStatus, Role};
    use crate::core::moderation::test_fixtures::Fixture;

    #[test]
    fn test_text_helpers() {
        assert_eq!(non_empty("Title", "  Bolo  ").unwrap(), "Bolo");
        assert!(matches!(
            non_empty("Title", "   "),
            Err(ModerationError::Validation(msg)) if msg == "Title is required"
        ));
        assert_eq!(optional_text(Some("  ")), None);
        assert_eq!(optional_text(Some(" ok ")), Some("ok".to_string()));
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&Actor::new(Uuid::new_v4(), Role::Admin)).is_ok());
        assert!(matches!(
            require_admin(&Actor::new(Uuid::new_v4(), Role::User)),
            Err(ModerationError::Authorization(_))
        ));
    }

    #[tokio::test]
    async fn test_load_submitter_rejects_unknown_and_suspended() {
        let fx = Fixture::new();
        let ghost = Actor::new(Uuid::new_v4(), Role::User);
        assert!(matches!(
            load_submitter(&fx.entities, &ghost).await,
            Err(ModerationError::Authorization(_))
        ));

        let seller = fx.user("Carla", true).await;
        assert!(load_submitter(&fx.entities, &seller).await.is_ok());

        fx.set_status(seller.id, AccountStatus::Suspended).await;
        assert!(matches!(
            load_submitter(&fx.entities, &seller).await,
            Err(ModerationError::Authorization(_))
        ));
    }
}
