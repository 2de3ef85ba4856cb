// Metrics aggregator.
//
// Every figure is recomputed from the current collections on each call.
// Nothing is cached, so a dashboard is exactly as fresh as its last load.

use super::metrics_models::{
    MetricsSnapshot, MonthlyOffers, MonthlySales, PlatformMetrics, RatingSummary, RecentSale,
    SellerStats,
};
use crate::core::marketplace::{
    Actor, ContactLog, Dispute, ModerationStatus, Money, Offer, OfferSummary, Profile, Related,
    Review, SalesReport,
};
use crate::core::moderation::moderation_support::require_admin;
use crate::core::moderation::ModerationError;
use crate::core::store::{Entities, Query};
use chrono::{DateTime, Datelike, Utc};
use serde_json::json;
use std::collections::BTreeMap;
use uuid::Uuid;

// ============================================================================
// PURE AGGREGATION
// ============================================================================

pub fn platform_metrics(
    profiles: &[Profile],
    offers: &[Offer],
    reports: &[SalesReport],
    reviews: &[Review],
    total_contacts: u64,
) -> PlatformMetrics {
    let rating = RatingSummary::from_reviews(reviews);

    let count_status =
        |status: ModerationStatus| reports.iter().filter(|r| r.status == status).count() as u64;
    let sales_approved = count_status(ModerationStatus::Approved);
    let total_revenue = total_revenue(reports);

    PlatformMetrics {
        total_offers: offers.len() as u64,
        active_offers: offers.iter().filter(|o| o.active).count() as u64,
        total_users: profiles.len() as u64,
        approved_users: profiles.iter().filter(|p| p.is_approved).count() as u64,
        total_reviews: rating.count,
        average_rating: rating.average,
        sales_approved,
        sales_pending: count_status(ModerationStatus::Pending),
        sales_rejected: count_status(ModerationStatus::Rejected),
        total_sales_reports: reports.len() as u64,
        total_revenue,
        average_sale_value: total_revenue.average_over(sales_approved),
        total_contacts,
    }
}

/// Sum of approved amounts. Exact, so the order of `reports` does not matter.
pub fn total_revenue(reports: &[SalesReport]) -> Money {
    reports
        .iter()
        .filter(|r| r.status == ModerationStatus::Approved)
        .map(|r| r.amount)
        .sum()
}

fn month_key(at: &DateTime<Utc>) -> (i32, u32) {
    (at.year(), at.month())
}

fn month_label((year, month): (i32, u32)) -> String {
    format!("{}/{}", month, year)
}

/// Approved sales grouped by the calendar month they were reported in, oldest first.
pub fn sales_by_month(reports: &[SalesReport]) -> Vec<MonthlySales> {
    let mut months: BTreeMap<(i32, u32), (u64, Money)> = BTreeMap::new();
    for report in reports
        .iter()
        .filter(|r| r.status == ModerationStatus::Approved)
    {
        let entry = months
            .entry(month_key(&report.created_at))
            .or_insert((0, Money::ZERO));
        entry.0 += 1;
        entry.1 = entry.1 + report.amount;
    }

    months
        .into_iter()
        .map(|(key, (count, total))| MonthlySales {
            month_year: month_label(key),
            count,
            total,
        })
        .collect()
}

/// All offers grouped by creation month, oldest first.
pub fn offers_by_month(offers: &[Offer]) -> Vec<MonthlyOffers> {
    let mut months: BTreeMap<(i32, u32), u64> = BTreeMap::new();
    for offer in offers {
        *months.entry(month_key(&offer.created_at)).or_insert(0) += 1;
    }

    months
        .into_iter()
        .map(|(key, count)| MonthlyOffers {
            month_year: month_label(key),
            count,
        })
        .collect()
}

/// The `n` most recently created reports, any status.
pub fn recent_sales(reports: &[SalesReport], n: usize) -> Vec<SalesReport> {
    let mut sorted: Vec<SalesReport> = reports.to_vec();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted.truncate(n);
    sorted
}

pub fn seller_stats(
    profile_id: Uuid,
    offers: &[Offer],
    reviews: &[Review],
    disputes: &[Dispute],
) -> SellerStats {
    let own: Vec<&Offer> = offers.iter().filter(|o| o.owner_id == profile_id).collect();
    let active_offers = own.iter().filter(|o| o.active).count() as u64;

    let rating = RatingSummary::from_reviews(
        reviews
            .iter()
            .filter(|r| own.iter().any(|o| o.id == r.offer_id)),
    );

    SellerStats {
        profile_id,
        total_offers: own.len() as u64,
        active_offers,
        pending_offers: own.len() as u64 - active_offers,
        rating,
        disputes: disputes.iter().filter(|d| d.involves(profile_id)).count() as u64,
    }
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct MetricsService {
    entities: Entities,
    recent_sales_window: usize,
}

impl MetricsService {
    pub fn new(entities: Entities) -> Self {
        Self::with_recent_window(entities, 10)
    }

    pub fn with_recent_window(entities: Entities, recent_sales_window: usize) -> Self {
        Self {
            entities,
            recent_sales_window,
        }
    }

    pub async fn snapshot(&self, actor: &Actor) -> Result<MetricsSnapshot, ModerationError> {
        require_admin(actor)?;

        let all = Query::new();
        let profiles: Vec<Profile> = self.entities.list(&all).await?;
        let offers: Vec<Offer> = self.entities.list(&all).await?;
        let reports: Vec<SalesReport> = self.entities.list(&all).await?;
        let reviews: Vec<Review> = self.entities.list(&all).await?;
        let total_contacts = self.entities.count::<ContactLog>(&all).await?;

        let platform = platform_metrics(&profiles, &offers, &reports, &reviews, total_contacts);
        let recent_sales = recent_sales(&reports, self.recent_sales_window)
            .into_iter()
            .map(|report| {
                let offer = offers.iter().find(|o| o.id == report.offer_id);
                RecentSale {
                    offer: Related::from_lookup(report.offer_id, offer.map(OfferSummary::from)),
                    report,
                }
            })
            .collect();

        tracing::debug!(
            offers = platform.total_offers,
            reports = platform.total_sales_reports,
            "Metrics recomputed"
        );

        Ok(MetricsSnapshot {
            platform,
            sales_by_month: sales_by_month(&reports),
            offers_by_month: offers_by_month(&offers),
            recent_sales,
        })
    }

    /// Stats for one seller. Sellers may read their own, admins anyone's.
    pub async fn seller_stats(&self, actor: &Actor, profile_id: Uuid) -> Result<SellerStats, ModerationError> {
        if !actor.is_admin() && actor.id != profile_id {
            return Err(ModerationError::authorization(
                "You can only view your own statistics",
            ));
        }
        self.entities.require::<Profile>(profile_id).await?;

        let offers: Vec<Offer> = self
            .entities
            .list(&Query::new().eq("owner_id", json!(profile_id)))
            .await?;
        let offer_ids = offers.iter().map(|o| json!(o.id)).collect();
        let reviews: Vec<Review> = self
            .entities
            .list(
                &Query::new()
                    .is_in("offer_id", offer_ids)
                    .eq("status", json!(ModerationStatus::Approved)),
            )
            .await?;

        let mut disputes: Vec<Dispute> = self
            .entities
            .list(&Query::new().eq("defendant_id", json!(profile_id)))
            .await?;
        let opened: Vec<Dispute> = self
            .entities
            .list(&Query::new().eq("complainant_id", json!(profile_id)))
            .await?;
        disputes.extend(opened.into_iter().filter(|d| d.defendant_id != profile_id));

        Ok(seller_stats(profile_id, &offers, &reviews, &disputes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::marketplace::SaleType;
    use crate::core::moderation::test_fixtures::Fixture;
    use crate::core::moderation::{SaleReportDraft, SalesService};
    use chrono::TimeZone;

    fn report(status: ModerationStatus, cents: i64, at: DateTime<Utc>) -> SalesReport {
        SalesReport {
            id: Uuid::new_v4(),
            offer_id: Uuid::new_v4(),
            reporter_id: Uuid::new_v4(),
            sale_type: SaleType::Product,
            amount: Money::from_cents(cents),
            description: None,
            proof_image: "p.jpg".to_string(),
            status,
            admin_notes: None,
            created_at: at,
            reviewed_at: None,
            reviewed_by: None,
        }
    }

    fn review(rating: u8, status: ModerationStatus) -> Review {
        Review {
            id: Uuid::new_v4(),
            offer_id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            rating,
            comment: "ok".to_string(),
            status,
            evaluation_number: 1,
            created_at: Utc::now(),
        }
    }

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_platform_has_zero_averages() {
        let metrics = platform_metrics(&[], &[], &[], &[], 0);
        assert_eq!(metrics.average_rating, 0.0);
        assert_eq!(metrics.average_sale_value, Money::ZERO);
        assert_eq!(metrics.total_revenue, Money::ZERO);
    }

    #[test]
    fn test_only_approved_reviews_count() {
        let reviews = vec![
            review(5, ModerationStatus::Approved),
            review(2, ModerationStatus::Approved),
            review(1, ModerationStatus::Pending),
            review(1, ModerationStatus::Rejected),
        ];
        let metrics = platform_metrics(&[], &[], &[], &reviews, 0);
        assert_eq!(metrics.total_reviews, 2);
        assert_eq!(metrics.average_rating, 3.5);
    }

    #[test]
    fn test_revenue_ignores_order_and_unapproved() {
        let mut reports = vec![
            report(ModerationStatus::Approved, 15_000, at(2024, 1, 5)),
            report(ModerationStatus::Approved, 1_001, at(2024, 2, 5)),
            report(ModerationStatus::Pending, 99_999, at(2024, 2, 6)),
            report(ModerationStatus::Rejected, 50_000, at(2024, 2, 7)),
        ];
        let forward = platform_metrics(&[], &[], &reports, &[], 0);
        reports.reverse();
        let backward = platform_metrics(&[], &[], &reports, &[], 0);

        assert_eq!(forward, backward);
        assert_eq!(forward.total_revenue, Money::from_cents(16_001));
        assert_eq!(forward.sales_approved, 2);
        assert_eq!(forward.sales_pending, 1);
        assert_eq!(forward.sales_rejected, 1);
        assert_eq!(forward.total_sales_reports, 4);
        // 160.01 / 2 = 80.005, rounded half away from zero.
        assert_eq!(forward.average_sale_value, Money::from_cents(8_001));
    }

    #[test]
    fn test_monthly_buckets_are_chronological() {
        let reports = vec![
            report(ModerationStatus::Approved, 100, at(2024, 2, 1)),
            report(ModerationStatus::Approved, 200, at(2023, 11, 30)),
            report(ModerationStatus::Approved, 300, at(2024, 2, 28)),
            report(ModerationStatus::Pending, 400, at(2024, 3, 1)),
        ];
        let months = sales_by_month(&reports);

        assert_eq!(
            months,
            vec![
                MonthlySales {
                    month_year: "11/2023".to_string(),
                    count: 1,
                    total: Money::from_cents(200),
                },
                MonthlySales {
                    month_year: "2/2024".to_string(),
                    count: 2,
                    total: Money::from_cents(400),
                },
            ]
        );
    }

    #[test]
    fn test_recent_sales_newest_first() {
        let reports: Vec<SalesReport> = (1..=12)
            .map(|day| report(ModerationStatus::Pending, 100, at(2024, 1, day)))
            .collect();
        let recent = recent_sales(&reports, 10);

        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].created_at, at(2024, 1, 12));
        assert_eq!(recent[9].created_at, at(2024, 1, 3));
    }

    #[tokio::test]
    async fn test_approval_moves_revenue_once() {
        let fx = Fixture::new();
        let admin = fx.admin("Rita").await;
        let seller = fx.user("Carla", true).await;
        let buyer = fx.user("Beto", true).await;
        let offer = fx.offer(&seller, "Bolo", true).await;
        let sales = SalesService::new(fx.entities.clone(), fx.notifier.clone());
        let metrics = MetricsService::new(fx.entities.clone());

        let report = sales
            .submit_sale_report(
                &buyer,
                SaleReportDraft {
                    offer_id: offer.id,
                    sale_type: SaleType::Product,
                    amount: "150.00".parse().unwrap(),
                    proof_image: "pix.jpg".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();
        let before = metrics.snapshot(&admin).await.unwrap().platform;

        sales.approve_sale_report(&admin, report.id).await.unwrap();
        assert!(sales.approve_sale_report(&admin, report.id).await.is_err());
        let after = metrics.snapshot(&admin).await.unwrap();

        assert_eq!(
            after.platform.total_revenue.cents() - before.total_revenue.cents(),
            15_000
        );
        assert_eq!(after.platform.sales_approved, before.sales_approved + 1);
        assert_eq!(after.platform.sales_pending, before.sales_pending - 1);
        assert_eq!(after.recent_sales[0].offer.label(), "Bolo");
        assert_eq!(after.sales_by_month.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_and_seller_stats_access() {
        let fx = Fixture::new();
        let admin = fx.admin("Rita").await;
        let seller = fx.user("Carla", true).await;
        let other = fx.user("Beto", true).await;
        fx.offer(&seller, "Bolo", true).await;
        fx.offer(&seller, "Torta", false).await;
        let metrics = MetricsService::new(fx.entities.clone());

        assert!(matches!(
            metrics.snapshot(&seller).await,
            Err(ModerationError::Authorization(_))
        ));
        assert!(matches!(
            metrics.seller_stats(&other, seller.id).await,
            Err(ModerationError::Authorization(_))
        ));

        let own = metrics.seller_stats(&seller, seller.id).await.unwrap();
        assert_eq!(own.total_offers, 2);
        assert_eq!(own.active_offers, 1);
        assert_eq!(own.pending_offers, 1);
        assert_eq!(own.rating.count, 0);

        let snapshot = metrics.snapshot(&admin).await.unwrap();
        assert_eq!(snapshot.platform.total_users, 3);
        assert_eq!(snapshot.platform.approved_users, 3);
        assert_eq!(snapshot.offers_by_month.iter().map(|m| m.count).sum::<u64>(), 2);
    }
}
