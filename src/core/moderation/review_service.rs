// Review moderation with repeat-submission detection.
//
// Nobody stops an author from reviewing the same offer twice; a second
// purchase is a legitimate reason to. Instead every review carries its
// `evaluation_number` (1 for the first review of that offer by that author,
// 2 for the next, ...) and repeats are flagged to the moderator.

use super::moderation_config::ModerationConfig;
use super::moderation_error::ModerationError;
use super::moderation_support::{
    load_submitter, non_empty, require_admin, transition_conflict,
};
use crate::core::marketplace::{
    Actor, ModerationStatus, Offer, OfferSummary, Profile, ProfileSummary, Related, Review,
};
use crate::core::metrics::RatingSummary;
use crate::core::notifications::{Notification, Notifier};
use crate::core::store::{Condition, Entities, Patch, Query};
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

// ============================================================================
// MODELS
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewDraft {
    pub offer_id: Uuid,
    pub rating: u8,
    pub comment: String,
}

/// A review waiting for a decision, with what the moderator needs to judge it.
#[derive(Debug, Clone, Serialize)]
pub struct PendingReview {
    #[serde(flatten)]
    pub review: Review,
    /// Other reviews by the same author on the same offer, any status.
    pub duplicate_count: u64,
    pub offer: Related<OfferSummary>,
    pub author: Related<ProfileSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishedReview {
    #[serde(flatten)]
    pub review: Review,
    pub author: Related<ProfileSummary>,
}

/// What the public sees on an offer page.
#[derive(Debug, Clone, Serialize)]
pub struct OfferReviews {
    pub offer_id: Uuid,
    pub summary: RatingSummary,
    pub reviews: Vec<PublishedReview>,
}

// ============================================================================
// SERVICE
// ============================================================================

type SubmissionKey = (Uuid, Uuid);

pub struct ReviewService {
    entities: Entities,
    notifier: Notifier,
    config: ModerationConfig,
    /// Serializes submissions per (offer, author) so evaluation numbers are
    /// gap-free. Only covers submissions made through this process.
    submission_locks: DashMap<SubmissionKey, Arc<Mutex<()>>>,
}

impl ReviewService {
    pub fn new(entities: Entities, notifier: Notifier) -> Self {
        Self::new_with_config(entities, notifier, ModerationConfig::default())
    }

    pub fn new_with_config(entities: Entities, notifier: Notifier, config: ModerationConfig) -> Self {
        Self {
            entities,
            notifier,
            config,
            submission_locks: DashMap::new(),
        }
    }

    fn validate(&self, draft: &ReviewDraft) -> Result<String, ModerationError> {
        if !(1..=5).contains(&draft.rating) {
            return Err(ModerationError::validation(
                "Rating must be between 1 and 5",
            ));
        }
        let comment = non_empty("Comment", &draft.comment)?;
        if comment.chars().count() > self.config.max_comment_length {
            return Err(ModerationError::validation(format!(
                "Comment cannot exceed {} characters",
                self.config.max_comment_length
            )));
        }
        Ok(comment)
    }

    /// Submit a review for moderation.
    pub async fn submit_review(&self, actor: &Actor, draft: ReviewDraft) -> Result<Review, ModerationError> {
        let comment = self.validate(&draft)?;
        let author = load_submitter(&self.entities, actor).await?;
        let offer: Offer = self.entities.require(draft.offer_id).await?;

        if offer.owner_id == author.id {
            return Err(ModerationError::validation(
                "You cannot review your own offer",
            ));
        }

        let key = (offer.id, author.id);
        let lock = self
            .submission_locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _held = lock.lock().await;
            self.insert_numbered(&offer, &author, draft.rating, comment)
                .await
        };

        drop(lock);
        self.submission_locks
            .remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);

        let (review, previous_count) = result?;

        tracing::info!(
            review_id = %review.id,
            offer_id = %offer.id,
            author_id = %author.id,
            evaluation_number = review.evaluation_number,
            "Review submitted"
        );

        let notification = if review.is_repeat() {
            Notification::RepeatReview {
                offer_title: offer.title.clone(),
                author_name: author.name.clone(),
                rating: review.rating,
                evaluation_number: review.evaluation_number,
                previous_count,
            }
        } else {
            Notification::ReviewSubmitted {
                offer_title: offer.title.clone(),
                author_name: author.name.clone(),
                rating: review.rating,
            }
        };
        self.notifier.notify_admin(notification);

        Ok(review)
    }

    /// Counts the author's earlier reviews and stores the next one.
    async fn insert_numbered(
        &self,
        offer: &Offer,
        author: &Profile,
        rating: u8,
        comment: String,
    ) -> Result<(Review, u64), ModerationError> {
        let previous_count = self
            .entities
            .count::<Review>(
                &Query::new()
                    .eq("offer_id", json!(offer.id))
                    .eq("author_id", json!(author.id)),
            )
            .await?;

        let review = Review {
            id: Uuid::new_v4(),
            offer_id: offer.id,
            author_id: author.id,
            rating,
            comment,
            status: ModerationStatus::Pending,
            evaluation_number: previous_count as u32 + 1,
            created_at: Utc::now(),
        };
        let review = self.entities.create(&review).await?;
        Ok((review, previous_count))
    }

    pub async fn approve_review(&self, actor: &Actor, review_id: Uuid) -> Result<Review, ModerationError> {
        require_admin(actor)?;
        let review = self
            .decide(review_id, ModerationStatus::Approved, "approve")
            .await?;
        tracing::info!(review_id = %review.id, admin_id = %actor.id, "Review approved");
        Ok(review)
    }

    pub async fn reject_review(&self, actor: &Actor, review_id: Uuid) -> Result<Review, ModerationError> {
        require_admin(actor)?;
        let review = self
            .decide(review_id, ModerationStatus::Rejected, "reject")
            .await?;
        tracing::info!(review_id = %review.id, admin_id = %actor.id, "Review rejected");
        Ok(review)
    }

    async fn decide(
        &self,
        review_id: Uuid,
        outcome: ModerationStatus,
        action: &'static str,
    ) -> Result<Review, ModerationError> {
        let guard = [Condition::eq("status", json!(ModerationStatus::Pending))];
        let patch = Patch::new().set("status", json!(outcome));

        match self.entities.update_if::<Review>(review_id, &guard, &patch).await? {
            Some(review) => Ok(review),
            None => Err(transition_conflict(&self.entities, review_id, action, |r: &Review| {
                r.status.to_string()
            })
            .await),
        }
    }

    /// Reviews (any status) by `author_id` on `offer_id`, not counting `excluding`.
    pub async fn compute_duplicate_count(
        &self,
        offer_id: Uuid,
        author_id: Uuid,
        excluding: Uuid,
    ) -> Result<u64, ModerationError> {
        Ok(self
            .entities
            .count::<Review>(
                &Query::new()
                    .eq("offer_id", json!(offer_id))
                    .eq("author_id", json!(author_id))
                    .ne("id", json!(excluding)),
            )
            .await?)
    }

    /// The moderation queue, newest first.
    pub async fn pending_reviews(&self, actor: &Actor) -> Result<Vec<PendingReview>, ModerationError> {
        require_admin(actor)?;

        let reviews: Vec<Review> = self
            .entities
            .list(
                &Query::new()
                    .eq("status", json!(ModerationStatus::Pending))
                    .newest_first(),
            )
            .await?;
        let offers = self
            .entities
            .by_ids::<Offer>(reviews.iter().map(|r| r.offer_id))
            .await?;
        let authors = self
            .entities
            .by_ids::<Profile>(reviews.iter().map(|r| r.author_id))
            .await?;

        let mut queue = Vec::with_capacity(reviews.len());
        for review in reviews {
            let duplicate_count = self
                .compute_duplicate_count(review.offer_id, review.author_id, review.id)
                .await?;
            queue.push(PendingReview {
                duplicate_count,
                offer: Related::from_lookup(
                    review.offer_id,
                    offers.get(&review.offer_id).map(OfferSummary::from),
                ),
                author: Related::from_lookup(
                    review.author_id,
                    authors.get(&review.author_id).map(ProfileSummary::from),
                ),
                review,
            });
        }
        Ok(queue)
    }

    /// Approved reviews of an offer, newest first, with its rating summary.
    pub async fn offer_reviews(&self, offer_id: Uuid) -> Result<OfferReviews, ModerationError> {
        let reviews: Vec<Review> = self
            .entities
            .list(
                &Query::new()
                    .eq("offer_id", json!(offer_id))
                    .eq("status", json!(ModerationStatus::Approved))
                    .newest_first(),
            )
            .await?;
        let authors = self
            .entities
            .by_ids::<Profile>(reviews.iter().map(|r| r.author_id))
            .await?;

        let summary = RatingSummary::from_reviews(&reviews);
        let reviews = reviews
            .into_iter()
            .map(|review| PublishedReview {
                author: Related::from_lookup(
                    review.author_id,
                    authors.get(&review.author_id).map(ProfileSummary::from),
                ),
                review,
            })
            .collect();

        Ok(OfferReviews {
            offer_id,
            summary,
            reviews,
        })
    }
}
