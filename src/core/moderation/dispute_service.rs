// Dispute mediation.
//
// A buyer opens a case against an offer's owner; both parties and the admins
// then talk in an append-only thread until an admin resolves it.
//
//   open -> in_mediation   (first message after the complaint)
//   open | in_mediation -> resolved

use super::moderation_error::ModerationError;
use super::moderation_support::{
    load_submitter, name_for_notice, non_empty, optional_text, require_admin,
    transition_conflict,
};
use crate::core::marketplace::{
    Actor, Dispute, DisputeMessage, DisputeStatus, MessageKind, Offer,
};
use crate::core::notifications::{Notification, Notifier};
use crate::core::store::{Condition, Entities, Patch, Query};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct DisputeDraft {
    pub offer_id: Uuid,
    pub title: String,
    pub description: String,
}

/// A dispute with its conversation, oldest message first.
#[derive(Debug, Clone, Serialize)]
pub struct DisputeThread {
    pub dispute: Dispute,
    pub messages: Vec<DisputeMessage>,
}

pub struct DisputeService {
    entities: Entities,
    notifier: Notifier,
}

impl DisputeService {
    pub fn new(entities: Entities, notifier: Notifier) -> Self {
        Self { entities, notifier }
    }

    /// Open a case against the owner of `draft.offer_id`. The description is
    /// stored as the first message of the thread.
    pub async fn open_dispute(&self, actor: &Actor, draft: DisputeDraft) -> Result<Dispute, ModerationError> {
        let title = non_empty("Title", &draft.title)?;
        let description = non_empty("Description", &draft.description)?;

        let complainant = load_submitter(&self.entities, actor).await?;
        let offer: Offer = self.entities.require(draft.offer_id).await?;
        if offer.owner_id == complainant.id {
            return Err(ModerationError::validation(
                "You cannot open a dispute against your own offer",
            ));
        }

        let now = Utc::now();
        let dispute = Dispute {
            id: Uuid::new_v4(),
            offer_id: offer.id,
            complainant_id: complainant.id,
            defendant_id: offer.owner_id,
            title,
            description: description.clone(),
            status: DisputeStatus::Open,
            resolution_notes: None,
            created_at: now,
            resolved_at: None,
        };
        let dispute = self.entities.create(&dispute).await?;

        let complaint = DisputeMessage {
            id: Uuid::new_v4(),
            dispute_id: dispute.id,
            author_id: complainant.id,
            author_name: complainant.name.clone(),
            kind: MessageKind::Complaint,
            body: description,
            created_at: now,
        };
        self.entities.create(&complaint).await?;

        tracing::info!(
            dispute_id = %dispute.id,
            offer_id = %offer.id,
            complainant_id = %complainant.id,
            "Dispute opened"
        );

        let defendant_name = name_for_notice(&self.entities, offer.owner_id).await;
        self.notifier.notify_admin(Notification::DisputeOpened {
            title: dispute.title.clone(),
            complainant_name: complainant.name,
            defendant_name,
        });

        Ok(dispute)
    }

    /// Add to the thread. Parties post as `party`, outside admins as `mediator`.
    ///
    /// The message is written first and the dispute then moved to mediation
    /// under a guard on `open | in_mediation`. If a resolution committed in
    /// between, the guard fails and the message is withdrawn, so a resolved
    /// thread never gains messages.
    pub async fn post_message(
        &self,
        actor: &Actor,
        dispute_id: Uuid,
        body: &str,
    ) -> Result<DisputeMessage, ModerationError> {
        let body = non_empty("Message", body)?;
        let dispute: Dispute = self.entities.require(dispute_id).await?;

        let is_party = dispute.involves(actor.id);
        if !is_party && !actor.is_admin() {
            return Err(ModerationError::authorization(
                "Only the parties and administrators can post in this dispute",
            ));
        }
        let author = load_submitter(&self.entities, actor).await?;
        if dispute.status == DisputeStatus::Resolved {
            return Err(ModerationError::InvalidState {
                entity: "Dispute",
                id: dispute_id,
                actual: dispute.status.to_string(),
                action: "post a message",
            });
        }

        let message = DisputeMessage {
            id: Uuid::new_v4(),
            dispute_id,
            author_id: author.id,
            author_name: author.name,
            kind: if is_party {
                MessageKind::Party
            } else {
                MessageKind::Mediator
            },
            body,
            created_at: Utc::now(),
        };
        let message = self.entities.create(&message).await?;

        let still_open = self
            .entities
            .update_if::<Dispute>(
                dispute_id,
                &[Condition::is_in(
                    "status",
                    vec![json!(DisputeStatus::Open), json!(DisputeStatus::InMediation)],
                )],
                &Patch::new().set("status", json!(DisputeStatus::InMediation)),
            )
            .await?;
        if still_open.is_none() {
            self.entities.delete::<DisputeMessage>(message.id).await?;
            tracing::info!(dispute_id = %dispute_id, "Dispute closed while posting, message withdrawn");
            return Err(transition_conflict(
                &self.entities,
                dispute_id,
                "post a message",
                |d: &Dispute| d.status.to_string(),
            )
            .await);
        }
        if dispute.status == DisputeStatus::Open {
            tracing::info!(dispute_id = %dispute_id, "Dispute moved to mediation");
        }

        Ok(message)
    }

    pub async fn resolve_dispute(
        &self,
        actor: &Actor,
        dispute_id: Uuid,
        notes: Option<&str>,
    ) -> Result<Dispute, ModerationError> {
        require_admin(actor)?;

        let guard = [Condition::is_in(
            "status",
            vec![json!(DisputeStatus::Open), json!(DisputeStatus::InMediation)],
        )];
        let patch = Patch::new()
            .set("status", json!(DisputeStatus::Resolved))
            .set("resolved_at", json!(Utc::now()))
            .set("resolution_notes", json!(optional_text(notes)));

        match self.entities.update_if::<Dispute>(dispute_id, &guard, &patch).await? {
            Some(dispute) => {
                tracing::info!(dispute_id = %dispute.id, admin_id = %actor.id, "Dispute resolved");
                Ok(dispute)
            }
            None => Err(transition_conflict(&self.entities, dispute_id, "resolve", |d: &Dispute| {
                d.status.to_string()
            })
            .await),
        }
    }

    /// Admins see every dispute; everyone else only the ones they are part of.
    pub async fn list_disputes(&self, actor: &Actor) -> Result<Vec<Dispute>, ModerationError> {
        if actor.is_admin() {
            return Ok(self.entities.list(&Query::new().newest_first()).await?);
        }

        let mut disputes: Vec<Dispute> = self
            .entities
            .list(&Query::new().eq("complainant_id", json!(actor.id)))
            .await?;
        let against: Vec<Dispute> = self
            .entities
            .list(&Query::new().eq("defendant_id", json!(actor.id)))
            .await?;
        disputes.extend(against.into_iter().filter(|d| d.complainant_id != actor.id));
        disputes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(disputes)
    }

    pub async fn dispute_thread(&self, actor: &Actor, dispute_id: Uuid) -> Result<DisputeThread, ModerationError> {
        let dispute: Dispute = self.entities.require(dispute_id).await?;
        if !actor.is_admin() && !dispute.involves(actor.id) {
            return Err(ModerationError::authorization(
                "Only the parties and administrators can read this dispute",
            ));
        }

        let messages = self
            .entities
            .list(
                &Query::new()
                    .eq("dispute_id", json!(dispute_id))
                    .oldest_first(),
            )
            .await?;
        Ok(DisputeThread { dispute, messages })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::test_fixtures::Fixture;
    use crate::core::marketplace::AccountStatus;
    use crate::core::store::{Collection, EntityStore, StoreError};
    use crate::infra::store::InMemoryEntityStore;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Once armed, resolves a dispute the moment a message for it is inserted,
    /// as an admin acting between the status read and the write would.
    struct ResolvesOnMessage {
        inner: InMemoryEntityStore,
        armed: AtomicBool,
    }

    #[async_trait]
    impl EntityStore for ResolvesOnMessage {
        async fn find(&self, collection: Collection, query: &Query) -> Result<Vec<Value>, StoreError> {
            self.inner.find(collection, query).await
        }

        async fn insert(&self, collection: Collection, record: Value) -> Result<Value, StoreError> {
            let dispute_id = record
                .get("dispute_id")
                .and_then(Value::as_str)
                .and_then(|id| Uuid::parse_str(id).ok());
            if let (Collection::DisputeMessages, Some(dispute_id)) = (collection, dispute_id) {
                if self.armed.load(Ordering::SeqCst) {
                    let resolve = Patch::new().set("status", json!(DisputeStatus::Resolved));
                    self.inner.update(Collection::Disputes, dispute_id, &resolve).await?;
                }
            }
            self.inner.insert(collection, record).await
        }

        async fn update_where(
            &self,
            collection: Collection,
            id: Uuid,
            guard: &[Condition],
            patch: &Patch,
        ) -> Result<Option<Value>, StoreError> {
            self.inner.update_where(collection, id, guard, patch).await
        }

        async fn delete(&self, collection: Collection, id: Uuid) -> Result<(), StoreError> {
            self.inner.delete(collection, id).await
        }

        async fn count(&self, collection: Collection, query: &Query) -> Result<u64, StoreError> {
            self.inner.count(collection, query).await
        }
    }

    fn draft(offer_id: Uuid) -> DisputeDraft {
        DisputeDraft {
            offer_id,
            title: "Produto não entregue".to_string(),
            description: "Paguei e não recebi".to_string(),
        }
    }

    fn service(fx: &Fixture) -> DisputeService {
        DisputeService::new(fx.entities.clone(), fx.notifier.clone())
    }

    #[tokio::test]
    async fn test_open_records_complaint_and_notifies() {
        let mut fx = Fixture::new();
        let seller = fx.user("Carla", true).await;
        let buyer = fx.user("Beto", true).await;
        let offer = fx.offer(&seller, "Bolo", true).await;
        let svc = service(&fx);

        let dispute = svc.open_dispute(&buyer, draft(offer.id)).await.unwrap();
        assert_eq!(dispute.status, DisputeStatus::Open);
        assert_eq!(dispute.defendant_id, seller.id);
        assert!(matches!(
            &fx.admin_notices()[..],
            [Notification::DisputeOpened { defendant_name, .. }] if defendant_name == "Carla"
        ));

        let thread = svc.dispute_thread(&seller, dispute.id).await.unwrap();
        assert_eq!(thread.messages.len(), 1);
        assert_eq!(thread.messages[0].kind, MessageKind::Complaint);

        assert!(matches!(
            svc.open_dispute(&seller, draft(offer.id)).await,
            Err(ModerationError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_conversation_moves_to_mediation_then_resolves() {
        let fx = Fixture::new();
        let admin = fx.admin("Rita").await;
        let seller = fx.user("Carla", true).await;
        let buyer = fx.user("Beto", true).await;
        let outsider = fx.user("Dani", true).await;
        let offer = fx.offer(&seller, "Bolo", true).await;
        let svc = service(&fx);
        let dispute = svc.open_dispute(&buyer, draft(offer.id)).await.unwrap();

        let reply = svc
            .post_message(&seller, dispute.id, "Enviei ontem")
            .await
            .unwrap();
        assert_eq!(reply.kind, MessageKind::Party);
        let current: Dispute = fx.entities.require(dispute.id).await.unwrap();
        assert_eq!(current.status, DisputeStatus::InMediation);

        let note = svc
            .post_message(&admin, dispute.id, "Vou verificar")
            .await
            .unwrap();
        assert_eq!(note.kind, MessageKind::Mediator);

        assert!(matches!(
            svc.post_message(&outsider, dispute.id, "oi").await,
            Err(ModerationError::Authorization(_))
        ));

        let resolved = svc
            .resolve_dispute(&admin, dispute.id, Some("Reembolso feito"))
            .await
            .unwrap();
        assert_eq!(resolved.status, DisputeStatus::Resolved);
        assert!(resolved.resolved_at.is_some());

        assert!(matches!(
            svc.post_message(&buyer, dispute.id, "obrigado").await,
            Err(ModerationError::InvalidState { .. })
        ));
        assert!(matches!(
            svc.resolve_dispute(&admin, dispute.id, None).await,
            Err(ModerationError::InvalidState { ref actual, .. }) if actual == "resolved"
        ));
    }

    #[tokio::test]
    async fn test_message_racing_a_resolution_is_withdrawn() {
        let store = Arc::new(ResolvesOnMessage {
            inner: InMemoryEntityStore::new(),
            armed: AtomicBool::new(false),
        });
        let fx = Fixture::with_store(store.clone());
        let seller = fx.user("Carla", true).await;
        let buyer = fx.user("Beto", true).await;
        let offer = fx.offer(&seller, "Bolo", true).await;
        let svc = service(&fx);
        let dispute = svc.open_dispute(&buyer, draft(offer.id)).await.unwrap();

        store.armed.store(true, Ordering::SeqCst);
        assert!(matches!(
            svc.post_message(&seller, dispute.id, "Enviei ontem").await,
            Err(ModerationError::InvalidState { ref actual, .. }) if actual == "resolved"
        ));

        let thread = svc.dispute_thread(&buyer, dispute.id).await.unwrap();
        assert_eq!(thread.dispute.status, DisputeStatus::Resolved);
        assert_eq!(thread.messages.len(), 1);
        assert_eq!(thread.messages[0].kind, MessageKind::Complaint);
    }

    #[tokio::test]
    async fn test_suspended_party_cannot_post() {
        let fx = Fixture::new();
        let seller = fx.user("Carla", true).await;
        let buyer = fx.user("Beto", true).await;
        let offer = fx.offer(&seller, "Bolo", true).await;
        let svc = service(&fx);
        let dispute = svc.open_dispute(&buyer, draft(offer.id)).await.unwrap();

        fx.set_status(seller.id, AccountStatus::Suspended).await;
        assert!(matches!(
            svc.post_message(&seller, dispute.id, "Enviei ontem").await,
            Err(ModerationError::Authorization(_))
        ));

        let thread = svc.dispute_thread(&buyer, dispute.id).await.unwrap();
        assert_eq!(thread.messages.len(), 1);
        assert_eq!(thread.dispute.status, DisputeStatus::Open);
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_parties() {
        let fx = Fixture::new();
        let admin = fx.admin("Rita").await;
        let seller = fx.user("Carla", true).await;
        let buyer = fx.user("Beto", true).await;
        let outsider = fx.user("Dani", true).await;
        let offer = fx.offer(&seller, "Bolo", true).await;
        let svc = service(&fx);
        svc.open_dispute(&buyer, draft(offer.id)).await.unwrap();

        assert_eq!(svc.list_disputes(&admin).await.unwrap().len(), 1);
        assert_eq!(svc.list_disputes(&seller).await.unwrap().len(), 1);
        assert_eq!(svc.list_disputes(&buyer).await.unwrap().len(), 1);
        assert!(svc.list_disputes(&outsider).await.unwrap().is_empty());
    }
}
