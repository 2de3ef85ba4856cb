// Offer moderation - lifecycle of a listing from submission to publish/reject,
// plus the owner-side edits and the public browse.
//
// Approval state is the `active` flag: non-admin submissions start inactive
// and become publicly visible once an administrator turns them on.

use super::moderation_config::ModerationConfig;
use super::moderation_error::ModerationError;
use super::moderation_support::{
    load_submitter, non_empty, profile_for_notice, require_admin, transition_conflict,
};
use crate::core::marketplace::{
    Actor, Category, ContactLog, Money, Offer, Profile, ProfileSummary, Related,
};
use crate::core::notifications::{Notification, Notifier};
use crate::core::store::{Condition, Entities, Patch, Query};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

// ============================================================================
// MODELS
// ============================================================================

/// The editable fields of an offer.
#[derive(Debug, Clone)]
pub struct OfferDraft {
    pub title: String,
    pub description: String,
    pub price: Option<Money>,
    pub category: Category,
    pub neighborhood: String,
    pub images: Vec<String>,
}

/// Public browse filter. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfferSearch {
    /// Case-insensitive match against title and description.
    pub text: Option<String>,
    pub category: Option<Category>,
    /// Case-insensitive match against the neighborhood.
    pub neighborhood: Option<String>,
}

/// An offer as the admin dashboard lists it.
#[derive(Debug, Clone, Serialize)]
pub struct OfferListing {
    #[serde(flatten)]
    pub offer: Offer,
    pub owner: Related<ProfileSummary>,
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct OfferService {
    entities: Entities,
    notifier: Notifier,
    config: ModerationConfig,
}

impl OfferService {
    pub fn new(entities: Entities, notifier: Notifier) -> Self {
        Self::new_with_config(entities, notifier, ModerationConfig::default())
    }

    pub fn new_with_config(entities: Entities, notifier: Notifier, config: ModerationConfig) -> Self {
        Self {
            entities,
            notifier,
            config,
        }
    }

    /// Checks a draft and returns it with text fields trimmed.
    fn validate(&self, draft: &OfferDraft) -> Result<OfferDraft, ModerationError> {
        let title = non_empty("Title", &draft.title)?;
        let description = non_empty("Description", &draft.description)?;

        if draft.price.is_some_and(Money::is_negative) {
            return Err(ModerationError::validation("Price cannot be negative"));
        }

        let images: Vec<String> = draft
            .images
            .iter()
            .map(|i| i.trim())
            .filter(|i| !i.is_empty())
            .map(str::to_string)
            .collect();
        if images.len() > self.config.max_offer_images {
            return Err(ModerationError::validation(format!(
                "An offer can have at most {} images",
                self.config.max_offer_images
            )));
        }

        Ok(OfferDraft {
            title,
            description,
            price: draft.price,
            category: draft.category,
            neighborhood: draft.neighborhood.trim().to_string(),
            images,
        })
    }

    /// Create an offer owned by `actor`.
    ///
    /// Admin offers are published immediately. Everyone else must be approved,
    /// and their offer waits for an administrator.
    pub async fn submit_offer(&self, actor: &Actor, draft: OfferDraft) -> Result<Offer, ModerationError> {
        let draft = self.validate(&draft)?;
        let owner = load_submitter(&self.entities, actor).await?;

        if !owner.is_admin() && !owner.is_approved {
            return Err(ModerationError::NotApproved(owner.id));
        }

        let offer = Offer {
            id: Uuid::new_v4(),
            owner_id: owner.id,
            title: draft.title,
            description: draft.description,
            price: draft.price,
            category: draft.category,
            neighborhood: draft.neighborhood,
            images: draft.images,
            active: owner.is_admin(),
            created_at: Utc::now(),
        };
        let offer = self.entities.create(&offer).await?;

        tracing::info!(
            offer_id = %offer.id,
            owner_id = %owner.id,
            active = offer.active,
            "Offer submitted"
        );

        if !offer.active {
            self.notifier.notify_admin(Notification::OfferPending {
                title: offer.title.clone(),
                owner_name: owner.name.clone(),
                category: offer.category,
                neighborhood: offer.neighborhood.clone(),
            });
        }

        Ok(offer)
    }

    /// Publish an offer. Approving an already-active offer succeeds without
    /// notifying anyone again.
    pub async fn approve_offer(&self, actor: &Actor, offer_id: Uuid) -> Result<Offer, ModerationError> {
        require_admin(actor)?;

        let guard = [Condition::eq("active", json!(false))];
        let patch = Patch::new().set("active", json!(true));

        match self.entities.update_if::<Offer>(offer_id, &guard, &patch).await? {
            Some(offer) => {
                tracing::info!(offer_id = %offer.id, admin_id = %actor.id, "Offer approved");
                self.notify_owner(&offer, true).await;
                Ok(offer)
            }
            None => Ok(self.entities.require::<Offer>(offer_id).await?),
        }
    }

    /// Reject a submission by deleting it. Irreversible.
    pub async fn reject_offer(&self, actor: &Actor, offer_id: Uuid) -> Result<(), ModerationError> {
        require_admin(actor)?;

        let offer: Offer = self.entities.require(offer_id).await?;
        self.entities.delete::<Offer>(offer_id).await?;

        tracing::info!(offer_id = %offer_id, admin_id = %actor.id, "Offer rejected");
        self.notify_owner(&offer, false).await;
        Ok(())
    }

    /// Take a published offer off the platform without telling the owner.
    /// Pausing an inactive offer is a no-op.
    pub async fn pause_offer(&self, actor: &Actor, offer_id: Uuid) -> Result<Offer, ModerationError> {
        require_admin(actor)?;

        let guard = [Condition::eq("active", json!(true))];
        let patch = Patch::new().set("active", json!(false));

        match self.entities.update_if::<Offer>(offer_id, &guard, &patch).await? {
            Some(offer) => {
                tracing::info!(offer_id = %offer.id, admin_id = %actor.id, "Offer paused");
                Ok(offer)
            }
            None => Ok(self.entities.require::<Offer>(offer_id).await?),
        }
    }

    /// Flip the active flag. Only the inactive -> active direction notifies.
    ///
    /// The write is conditional on the flag still holding the value we read, so
    /// two admins toggling at once cannot cancel each other out silently.
    pub async fn toggle_active(&self, actor: &Actor, offer_id: Uuid) -> Result<Offer, ModerationError> {
        require_admin(actor)?;

        let current: Offer = self.entities.require(offer_id).await?;
        let guard = [Condition::eq("active", json!(current.active))];
        let patch = Patch::new().set("active", json!(!current.active));

        let Some(offer) = self.entities.update_if::<Offer>(offer_id, &guard, &patch).await? else {
            return Err(transition_conflict(&self.entities, offer_id, "toggle", |o: &Offer| {
                if o.active { "active" } else { "inactive" }.to_string()
            })
            .await);
        };

        tracing::info!(
            offer_id = %offer.id,
            admin_id = %actor.id,
            active = offer.active,
            "Offer visibility toggled"
        );
        if offer.active {
            self.notify_owner(&offer, true).await;
        }
        Ok(offer)
    }

    /// Edit an offer. Only the owner or an admin may; visibility is unchanged.
    /// Suspended accounts cannot edit.
    pub async fn update_offer(
        &self,
        actor: &Actor,
        offer_id: Uuid,
        draft: OfferDraft,
    ) -> Result<Offer, ModerationError> {
        let draft = self.validate(&draft)?;
        load_submitter(&self.entities, actor).await?;
        let existing: Offer = self.entities.require(offer_id).await?;
        ensure_owner_or_admin(actor, &existing)?;

        let patch = Patch::new()
            .set("title", json!(draft.title))
            .set("description", json!(draft.description))
            .set("price", json!(draft.price))
            .set("category", json!(draft.category))
            .set("neighborhood", json!(draft.neighborhood))
            .set("images", json!(draft.images));

        let offer: Offer = self.entities.update(offer_id, &patch).await?;
        tracing::info!(offer_id = %offer.id, actor_id = %actor.id, "Offer updated");
        Ok(offer)
    }

    /// Withdraw an offer. Suspended owners may still take their offers down.
    pub async fn delete_offer(&self, actor: &Actor, offer_id: Uuid) -> Result<(), ModerationError> {
        let existing: Offer = self.entities.require(offer_id).await?;
        ensure_owner_or_admin(actor, &existing)?;

        self.entities.delete::<Offer>(offer_id).await?;
        tracing::info!(offer_id = %offer_id, actor_id = %actor.id, "Offer deleted");
        Ok(())
    }

    /// Public browse: active offers only, newest first.
    pub async fn search_offers(&self, search: &OfferSearch) -> Result<Vec<Offer>, ModerationError> {
        let mut query = Query::new().eq("active", json!(true)).newest_first();
        if let Some(category) = search.category {
            query = query.eq("category", json!(category));
        }

        let text = lowercase_filter(search.text.as_deref());
        let neighborhood = lowercase_filter(search.neighborhood.as_deref());

        let offers: Vec<Offer> = self.entities.list(&query).await?;
        Ok(offers
            .into_iter()
            .filter(|offer| match &text {
                Some(text) => {
                    offer.title.to_lowercase().contains(text)
                        || offer.description.to_lowercase().contains(text)
                }
                None => true,
            })
            .filter(|offer| match &neighborhood {
                Some(n) => offer.neighborhood.to_lowercase().contains(n),
                None => true,
            })
            .collect())
    }

    /// Dashboard listing with owner summaries, newest first.
    pub async fn list_offers(
        &self,
        actor: &Actor,
        pending_only: bool,
    ) -> Result<Vec<OfferListing>, ModerationError> {
        require_admin(actor)?;

        let mut query = Query::new().newest_first();
        if pending_only {
            query = query.eq("active", json!(false));
        }
        let offers: Vec<Offer> = self.entities.list(&query).await?;
        let owners = self
            .entities
            .by_ids::<Profile>(offers.iter().map(|o| o.owner_id))
            .await?;

        Ok(offers
            .into_iter()
            .map(|offer| {
                let owner = Related::from_lookup(
                    offer.owner_id,
                    owners.get(&offer.owner_id).map(ProfileSummary::from),
                );
                OfferListing { offer, owner }
            })
            .collect())
    }

    /// A buyer pressed "contact seller": log it and tell the seller.
    pub async fn register_interest(&self, actor: &Actor, offer_id: Uuid) -> Result<ContactLog, ModerationError> {
        let buyer = load_submitter(&self.entities, actor).await?;
        let offer: Offer = self.entities.require(offer_id).await?;

        if offer.owner_id == actor.id {
            return Err(ModerationError::validation(
                "You cannot contact yourself about your own offer",
            ));
        }
        if !offer.active {
            return Err(ModerationError::InvalidState {
                entity: "Offer",
                id: offer_id,
                actual: "inactive".to_string(),
                action: "contact seller",
            });
        }

        let log = ContactLog {
            id: Uuid::new_v4(),
            offer_id,
            buyer_id: actor.id,
            created_at: Utc::now(),
        };
        let log = self.entities.create(&log).await?;
        tracing::info!(offer_id = %offer_id, buyer_id = %actor.id, "Seller contacted");

        if let Some(seller) = profile_for_notice(&self.entities, offer.owner_id).await {
            self.notifier.notify_contact(
                seller.contact.as_deref(),
                Notification::SellerInterest {
                    seller_name: seller.name.clone(),
                    offer_title: offer.title.clone(),
                    buyer_name: buyer.name,
                },
            );
        }

        Ok(log)
    }

    async fn notify_owner(&self, offer: &Offer, approved: bool) {
        let Some(owner) = profile_for_notice(&self.entities, offer.owner_id).await else {
            return;
        };
        let notification = if approved {
            Notification::OfferApproved {
                owner_name: owner.name.clone(),
                title: offer.title.clone(),
            }
        } else {
            Notification::OfferRejected {
                owner_name: owner.name.clone(),
                title: offer.title.clone(),
            }
        };
        self.notifier
            .notify_contact(owner.contact.as_deref(), notification);
    }
}

fn ensure_owner_or_admin(actor: &Actor, offer: &Offer) -> Result<(), ModerationError> {
    if actor.is_admin() || offer.owner_id == actor.id {
        Ok(())
    } else {
        Err(ModerationError::authorization(
            "Only the owner or an administrator can change this offer",
        ))
    }
}

fn lowercase_filter(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}
