// Sale report moderation.
//
// A report is a seller's claim that a sale happened, backed by a payment proof.
// Approval is a one-way gate into revenue metrics:
//
//   pending -> approved
//   pending -> rejected
//
// Both transitions are conditional writes on `status == pending`, so a report
// can never be approved twice or flipped after the fact.

use super::moderation_config::ModerationConfig;
use super::moderation_error::ModerationError;
use super::moderation_support::{
    load_submitter, name_for_notice, non_empty, optional_text, require_admin,
    transition_conflict,
};
use crate::core::marketplace::{
    Actor, ModerationStatus, Money, Offer, OfferSummary, Profile, ProfileSummary, Related,
    SaleType, SalesReport,
};
use crate::core::notifications::{Notification, Notifier};
use crate::core::store::{Condition, Entities, Patch, Query};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

// ============================================================================
// MODELS
// ============================================================================

#[derive(Debug, Clone)]
pub struct SaleReportDraft {
    pub offer_id: Uuid,
    pub sale_type: SaleType,
    pub amount: Money,
    /// Reference to the uploaded payment proof.
    pub proof_image: String,
    pub description: Option<String>,
}

/// A report with its offer and the people involved resolved for display.
#[derive(Debug, Clone, Serialize)]
pub struct SaleReportView {
    #[serde(flatten)]
    pub report: SalesReport,
    pub offer: Related<OfferSummary>,
    /// Who filed the report. Not necessarily the seller.
    pub reporter: Related<ProfileSummary>,
    /// Owner of the offer. `None` once the offer itself is gone.
    pub seller: Option<Related<ProfileSummary>>,
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct SalesService {
    entities: Entities,
    notifier: Notifier,
    config: ModerationConfig,
}

impl SalesService {
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

    /// Record a sale for an administrator to verify.
    pub async fn submit_sale_report(
        &self,
        actor: &Actor,
        draft: SaleReportDraft,
    ) -> Result<SalesReport, ModerationError> {
        if !draft.amount.is_positive() {
            return Err(ModerationError::validation(
                "Sale amount must be greater than zero",
            ));
        }
        let proof_image = non_empty("Payment proof", &draft.proof_image)?;

        let reporter = load_submitter(&self.entities, actor).await?;
        let offer: Offer = self.entities.require(draft.offer_id).await?;

        let report = SalesReport {
            id: Uuid::new_v4(),
            offer_id: offer.id,
            reporter_id: reporter.id,
            sale_type: draft.sale_type,
            amount: draft.amount,
            description: optional_text(draft.description.as_deref()),
            proof_image,
            status: ModerationStatus::Pending,
            admin_notes: None,
            created_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
        };
        let report = self.entities.create(&report).await?;

        tracing::info!(
            report_id = %report.id,
            offer_id = %offer.id,
            reporter_id = %reporter.id,
            amount = %report.amount,
            "Sale reported"
        );

        let seller_name = if offer.owner_id == reporter.id {
            reporter.name.clone()
        } else {
            name_for_notice(&self.entities, offer.owner_id).await
        };
        self.notifier.notify_admin(Notification::SaleReported {
            seller_name,
            offer_title: offer.title.clone(),
            sale_type: report.sale_type,
            amount: report.amount,
        });

        Ok(report)
    }

    /// Verify a pending report. Only this transition puts its amount into revenue.
    pub async fn approve_sale_report(
        &self,
        actor: &Actor,
        report_id: Uuid,
    ) -> Result<SalesReport, ModerationError> {
        require_admin(actor)?;
        let report = self
            .decide(actor, report_id, ModerationStatus::Approved, None, "approve")
            .await?;

        tracing::info!(
            report_id = %report.id,
            admin_id = %actor.id,
            amount = %report.amount,
            "Sale report approved"
        );
        Ok(report)
    }

    /// Reject a pending report. Without a reason the default note is stored.
    pub async fn reject_sale_report(
        &self,
        actor: &Actor,
        report_id: Uuid,
        reason: Option<&str>,
    ) -> Result<SalesReport, ModerationError> {
        require_admin(actor)?;
        let notes = optional_text(reason)
            .unwrap_or_else(|| self.config.default_rejection_note.clone());
        let report = self
            .decide(actor, report_id, ModerationStatus::Rejected, Some(notes), "reject")
            .await?;

        tracing::info!(report_id = %report.id, admin_id = %actor.id, "Sale report rejected");
        Ok(report)
    }

    async fn decide(
        &self,
        actor: &Actor,
        report_id: Uuid,
        outcome: ModerationStatus,
        notes: Option<String>,
        action: &'static str,
    ) -> Result<SalesReport, ModerationError> {
        let guard = [Condition::eq("status", json!(ModerationStatus::Pending))];
        let mut patch = Patch::new()
            .set("status", json!(outcome))
            .set("reviewed_at", json!(Utc::now()))
            .set("reviewed_by", json!(actor.id));
        if let Some(notes) = notes {
            patch = patch.set("admin_notes", json!(notes));
        }

        match self.entities.update_if::<SalesReport>(report_id, &guard, &patch).await? {
            Some(report) => Ok(report),
            None => Err(transition_conflict(&self.entities, report_id, action, |r: &SalesReport| {
                r.status.to_string()
            })
            .await),
        }
    }

    /// Admin listing, newest first, optionally narrowed to one status.
    pub async fn list_sale_reports(
        &self,
        actor: &Actor,
        status: Option<ModerationStatus>,
    ) -> Result<Vec<SaleReportView>, ModerationError> {
        require_admin(actor)?;

        let mut query = Query::new().newest_first();
        if let Some(status) = status {
            query = query.eq("status", json!(status));
        }
        let reports: Vec<SalesReport> = self.entities.list(&query).await?;

        let offers = self
            .entities
            .by_ids::<Offer>(reports.iter().map(|r| r.offer_id))
            .await?;
        let people = self
            .entities
            .by_ids::<Profile>(
                reports
                    .iter()
                    .map(|r| r.reporter_id)
                    .chain(offers.values().map(|o| o.owner_id)),
            )
            .await?;
        let person = |id: Uuid| Related::from_lookup(id, people.get(&id).map(ProfileSummary::from));

        Ok(reports
            .into_iter()
            .map(|report| {
                let offer = offers.get(&report.offer_id);
                SaleReportView {
                    offer: Related::from_lookup(report.offer_id, offer.map(OfferSummary::from)),
                    reporter: person(report.reporter_id),
                    seller: offer.map(|o| person(o.owner_id)),
                    report,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metrics::MetricsService;
    use crate::core::moderation::test_fixtures::Fixture;
    use std::sync::Arc;

    fn draft(offer_id: Uuid, cents: i64) -> SaleReportDraft {
        SaleReportDraft {
            offer_id,
            sale_type: SaleType::Product,
            amount: Money::from_cents(cents),
            proof_image: "proofs/pix-123.jpg".to_string(),
            description: Some("  ".to_string()),
        }
    }

    fn service(fx: &Fixture) -> SalesService {
        SalesService::new(fx.entities.clone(), fx.notifier.clone())
    }

    #[tokio::test]
    async fn test_submit_then_approve() {
        let mut fx = Fixture::new();
        let admin = fx.admin("Rita").await;
        let seller = fx.user("Carla", true).await;
        let buyer = fx.user("Beto", true).await;
        let offer = fx.offer(&seller, "Bolo", true).await;
        let svc = service(&fx);

        let report = svc
            .submit_sale_report(&buyer, draft(offer.id, 15_000))
            .await
            .unwrap();
        assert_eq!(report.status, ModerationStatus::Pending);
        assert_eq!(report.description, None);
        assert!(matches!(
            &fx.admin_notices()[..],
            [Notification::SaleReported { amount, offer_title, .. }]
                if *amount == Money::from_cents(15_000) && offer_title == "Bolo"
        ));

        let approved = svc.approve_sale_report(&admin, report.id).await.unwrap();
        assert_eq!(approved.status, ModerationStatus::Approved);
        assert_eq!(approved.reviewed_by, Some(admin.id));
        assert!(approved.reviewed_at.is_some());
        assert_eq!(approved.admin_notes, None);
    }

    #[tokio::test]
    async fn test_buyer_report_names_the_offer_owner_as_seller() {
        let mut fx = Fixture::new();
        let admin = fx.admin("Rita").await;
        let seller = fx.user("Carla", true).await;
        let buyer = fx.user("Beto", true).await;
        let offer = fx.offer(&seller, "Bolo", true).await;
        let svc = service(&fx);

        svc.submit_sale_report(&buyer, draft(offer.id, 15_000))
            .await
            .unwrap();
        assert!(matches!(
            &fx.admin_notices()[..],
            [Notification::SaleReported { seller_name, .. }] if seller_name == "Carla"
        ));

        let views = svc.list_sale_reports(&admin, None).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].reporter.label(), "Beto");
        assert_eq!(
            views[0].seller.as_ref().map(|s| s.label()),
            Some("Carla")
        );
    }

    #[tokio::test]
    async fn test_report_on_offer_of_deleted_owner_uses_placeholder() {
        let mut fx = Fixture::new();
        let seller = fx.user("Carla", true).await;
        let buyer = fx.user("Beto", true).await;
        let offer = fx.offer(&seller, "Bolo", true).await;
        fx.entities.delete::<Profile>(seller.id).await.unwrap();

        service(&fx)
            .submit_sale_report(&buyer, draft(offer.id, 2_000))
            .await
            .unwrap();
        assert!(matches!(
            &fx.admin_notices()[..],
            [Notification::SaleReported { seller_name, .. }] if seller_name == "Unknown user"
        ));
    }

    #[tokio::test]
    async fn test_submit_validation_persists_nothing() {
        let fx = Fixture::new();
        let seller = fx.user("Carla", true).await;
        let offer = fx.offer(&seller, "Bolo", true).await;
        let svc = service(&fx);

        assert!(matches!(
            svc.submit_sale_report(&seller, draft(offer.id, 0)).await,
            Err(ModerationError::Validation(_))
        ));

        let mut no_proof = draft(offer.id, 100);
        no_proof.proof_image = " ".to_string();
        assert!(matches!(
            svc.submit_sale_report(&seller, no_proof).await,
            Err(ModerationError::Validation(_))
        ));

        assert!(matches!(
            svc.submit_sale_report(&seller, draft(Uuid::new_v4(), 100)).await,
            Err(ModerationError::NotFound { entity: "Offer", .. })
        ));

        assert_eq!(
            fx.entities.count::<SalesReport>(&Query::new()).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_transitions_are_one_way() {
        let fx = Fixture::new();
        let admin = fx.admin("Rita").await;
        let seller = fx.user("Carla", true).await;
        let offer = fx.offer(&seller, "Bolo", true).await;
        let svc = service(&fx);

        let report = svc
            .submit_sale_report(&seller, draft(offer.id, 5_000))
            .await
            .unwrap();
        let rejected = svc
            .reject_sale_report(&admin, report.id, None)
            .await
            .unwrap();
        assert_eq!(rejected.status, ModerationStatus::Rejected);
        assert_eq!(
            rejected.admin_notes.as_deref(),
            Some("Payment proof not verified")
        );

        let err = svc.approve_sale_report(&admin, report.id).await.unwrap_err();
        assert!(matches!(
            err,
            ModerationError::InvalidState { ref actual, .. } if actual == "rejected"
        ));

        let stored: SalesReport = fx.entities.require(report.id).await.unwrap();
        assert_eq!(stored, rejected);

        assert!(matches!(
            svc.approve_sale_report(&admin, Uuid::new_v4()).await,
            Err(ModerationError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_reject_keeps_given_reason_and_requires_admin() {
        let fx = Fixture::new();
        let admin = fx.admin("Rita").await;
        let seller = fx.user("Carla", true).await;
        let offer = fx.offer(&seller, "Bolo", true).await;
        let svc = service(&fx);
        let report = svc
            .submit_sale_report(&seller, draft(offer.id, 5_000))
            .await
            .unwrap();

        assert!(matches!(
            svc.reject_sale_report(&seller, report.id, None).await,
            Err(ModerationError::Authorization(_))
        ));

        let rejected = svc
            .reject_sale_report(&admin, report.id, Some("Comprovante ilegível"))
            .await
            .unwrap();
        assert_eq!(rejected.admin_notes.as_deref(), Some("Comprovante ilegível"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_approvals_have_one_winner() {
        let fx = Fixture::new();
        let first_admin = fx.admin("Rita").await;
        let second_admin = fx.admin("Paulo").await;
        let admin = first_admin;
        let seller = fx.user("Carla", true).await;
        let offer = fx.offer(&seller, "Bolo", true).await;
        let svc = Arc::new(service(&fx));
        let report = svc
            .submit_sale_report(&seller, draft(offer.id, 15_000))
            .await
            .unwrap();
        let report_id = report.id;

        let handles: Vec<_> = [first_admin, second_admin]
            .into_iter()
            .map(|admin| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.approve_sale_report(&admin, report_id).await })
            })
            .collect();

        let mut wins = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(ModerationError::InvalidState { .. }) => conflicts += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!((wins, conflicts), (1, 1));

        let metrics = MetricsService::new(fx.entities.clone())
            .snapshot(&admin)
            .await
            .unwrap()
            .platform;
        assert_eq!(metrics.sales_approved, 1);
        assert_eq!(metrics.total_revenue, Money::from_cents(15_000));
        assert_eq!(metrics.total_revenue.to_string(), "150.00");
    }

    #[tokio::test]
    async fn test_listing_survives_deleted_offer() {
        let fx = Fixture::new();
        let admin = fx.admin("Rita").await;
        let seller = fx.user("Carla", true).await;
        let offer = fx.offer(&seller, "Bolo", true).await;
        let svc = service(&fx);
        svc.submit_sale_report(&seller, draft(offer.id, 1_000))
            .await
            .unwrap();
        fx.entities.delete::<Offer>(offer.id).await.unwrap();

        let views = svc
            .list_sale_reports(&admin, Some(ModerationStatus::Pending))
            .await
            .unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].offer.label(), "Offer unavailable");
        assert_eq!(views[0].reporter.label(), "Carla");
        assert!(views[0].seller.is_none());

        let approved = svc
            .list_sale_reports(&admin, Some(ModerationStatus::Approved))
            .await
            .unwrap();
        assert!(approved.is_empty());
    }
}
