// Profile moderation - registration, approval, roles and account status.

use super::moderation_error::ModerationError;
use super::moderation_support::{non_empty, optional_text, require_admin};
use crate::core::marketplace::{AccountStatus, Actor, Profile, Role};
use crate::core::notifications::{Notification, Notifier};
use crate::core::store::{Entities, Patch, Query};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// Dashboard filter for the profile list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileFilter {
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
    pub approved: Option<bool>,
    /// Case-insensitive match against the name.
    pub search: Option<String>,
}

pub struct ProfileService {
    entities: Entities,
    notifier: Notifier,
}

impl ProfileService {
    pub fn new(entities: Entities, notifier: Notifier) -> Self {
        Self { entities, notifier }
    }

    /// Sign-up event from the identity provider. New profiles are regular
    /// users waiting for approval.
    pub async fn register_profile(
        &self,
        id: Uuid,
        name: &str,
        contact: Option<&str>,
    ) -> Result<Profile, ModerationError> {
        let name = non_empty("Name", name)?;

        if self.entities.get::<Profile>(id).await?.is_some() {
            return Err(ModerationError::InvalidState {
                entity: "Profile",
                id,
                actual: "registered".to_string(),
                action: "register",
            });
        }

        let profile = Profile {
            id,
            name,
            contact: optional_text(contact),
            role: Role::User,
            is_approved: false,
            status: AccountStatus::Active,
            created_at: Utc::now(),
        };
        let profile = self.entities.create(&profile).await?;

        tracing::info!(profile_id = %profile.id, "Profile registered");
        self.notifier.notify_admin(Notification::NewRegistration {
            user_name: profile.name.clone(),
        });
        Ok(profile)
    }

    pub async fn get_profile(&self, id: Uuid) -> Result<Profile, ModerationError> {
        Ok(self.entities.require(id).await?)
    }

    pub async fn approve_profile(&self, actor: &Actor, profile_id: Uuid) -> Result<Profile, ModerationError> {
        require_admin(actor)?;

        let profile: Profile = self
            .entities
            .update(profile_id, &Patch::new().set("is_approved", json!(true)))
            .await?;
        tracing::info!(profile_id = %profile.id, admin_id = %actor.id, "Profile approved");
        Ok(profile)
    }

    /// Promote or demote. An admin cannot drop their own admin role.
    pub async fn set_role(
        &self,
        actor: &Actor,
        profile_id: Uuid,
        role: Role,
    ) -> Result<Profile, ModerationError> {
        require_admin(actor)?;
        if profile_id == actor.id && role != Role::Admin {
            return Err(ModerationError::authorization(
                "You cannot remove your own administrator role",
            ));
        }

        let profile: Profile = self
            .entities
            .update(profile_id, &Patch::new().set("role", json!(role)))
            .await?;
        tracing::info!(profile_id = %profile.id, admin_id = %actor.id, role = ?role, "Profile role changed");
        Ok(profile)
    }

    /// Suspend or reactivate. Admins may do it to anyone, users only to themselves.
    pub async fn set_account_status(
        &self,
        actor: &Actor,
        profile_id: Uuid,
        status: AccountStatus,
    ) -> Result<Profile, ModerationError> {
        if !actor.is_admin() && actor.id != profile_id {
            return Err(ModerationError::authorization(
                "You can only change the status of your own account",
            ));
        }

        let profile: Profile = self
            .entities
            .update(profile_id, &Patch::new().set("status", json!(status)))
            .await?;
        tracing::info!(
            profile_id = %profile.id,
            actor_id = %actor.id,
            status = ?status,
            "Account status changed"
        );
        Ok(profile)
    }

    /// Admin listing, newest first.
    pub async fn list_profiles(
        &self,
        actor: &Actor,
        filter: &ProfileFilter,
    ) -> Result<Vec<Profile>, ModerationError> {
        require_admin(actor)?;

        let mut query = Query::new().newest_first();
        if let Some(role) = filter.role {
            query = query.eq("role", json!(role));
        }
        if let Some(status) = filter.status {
            query = query.eq("status", json!(status));
        }
        if let Some(approved) = filter.approved {
            query = query.eq("is_approved", json!(approved));
        }

        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let profiles: Vec<Profile> = self.entities.list(&query).await?;
        Ok(profiles
            .into_iter()
            .filter(|p| match &search {
                Some(s) => p.name.to_lowercase().contains(s),
                None => true,
            })
            .collect())
    }
}
