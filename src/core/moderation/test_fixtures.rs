// Shared test setup: an in-memory store, a channel-backed notifier and a few
// profiles to act as.

use crate::core::marketplace::{AccountStatus, Actor, Category, Offer, Profile, Role};
use crate::core::notifications::notifier::{Outbound, Recipient};
use crate::core::notifications::{Notification, Notifier};
use crate::core::store::{Entities, EntityStore, Patch};
use crate::infra::store::InMemoryEntityStore;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

pub struct Fixture {
    pub entities: Entities,
    pub notifier: Notifier,
    pub outbox: UnboundedReceiver<Outbound>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryEntityStore::new()))
    }

    pub fn with_store(store: Arc<dyn EntityStore>) -> Self {
        let entities = Entities::new(store);
        let (notifier, outbox) = Notifier::channel();
        Self {
            entities,
            notifier,
            outbox,
        }
    }

    async fn profile(&self, name: &str, role: Role, approved: bool) -> Actor {
        let profile = Profile {
            id: Uuid::new_v4(),
            name: name.to_string(),
            contact: Some(format!("contact-{}", name.to_lowercase())),
            role,
            is_approved: approved,
            status: AccountStatus::Active,
            created_at: Utc::now(),
        };
        self.entities.create(&profile).await.unwrap();
        Actor::new(profile.id, role)
    }

    pub async fn admin(&self, name: &str) -> Actor {
        self.profile(name, Role::Admin, true).await
    }

    pub async fn user(&self, name: &str, approved: bool) -> Actor {
        self.profile(name, Role::User, approved).await
    }

    pub async fn set_status(&self, id: Uuid, status: AccountStatus) {
        self.entities
            .update::<Profile>(id, &Patch::new().set("status", json!(status)))
            .await
            .unwrap();
    }

    /// Stores an offer directly, bypassing submission rules.
    pub async fn offer(&self, owner: &Actor, title: &str, active: bool) -> Offer {
        let offer = Offer {
            id: Uuid::new_v4(),
            owner_id: owner.id,
            title: title.to_string(),
            description: format!("{} caseiro", title),
            price: None,
            category: Category::Food,
            neighborhood: "Centro".to_string(),
            images: Vec::new(),
            active,
            created_at: Utc::now(),
        };
        self.entities.create(&offer).await.unwrap()
    }

    /// Everything queued so far.
    pub fn drain(&mut self) -> Vec<Outbound> {
        let mut queued = Vec::new();
        while let Ok(outbound) = self.outbox.try_recv() {
            queued.push(outbound);
        }
        queued
    }

    /// Notifications queued so far, without recipients.
    pub fn sent(&mut self) -> Vec<Notification> {
        self.drain().into_iter().map(|o| o.notification).collect()
    }

    pub fn admin_notices(&mut self) -> Vec<Notification> {
        self.drain()
            .into_iter()
            .filter(|o| o.recipient == Recipient::Admin)
            .map(|o| o.notification)
            .collect()
    }
}
