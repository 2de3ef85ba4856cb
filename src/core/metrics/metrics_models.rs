// Metrics models - derived, read-only views of the marketplace.

use crate::core::marketplace::{ModerationStatus, Money, OfferSummary, Related, Review, SalesReport};
use serde::Serialize;
use uuid::Uuid;

/// Count and mean rating of a set of reviews. Only approved reviews count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingSummary {
    pub count: u64,
    /// 0 when there are no approved reviews.
    pub average: f64,
}

impl RatingSummary {
    pub fn from_reviews<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> Self {
        let (count, sum) = reviews
            .into_iter()
            .filter(|r| r.status == ModerationStatus::Approved)
            .fold((0u64, 0u64), |(count, sum), r| (count + 1, sum + r.rating as u64));

        let average = if count == 0 {
            0.0
        } else {
            sum as f64 / count as f64
        };
        Self { count, average }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformMetrics {
    pub total_offers: u64,
    pub active_offers: u64,
    pub total_users: u64,
    pub approved_users: u64,
    /// Approved reviews only.
    pub total_reviews: u64,
    pub average_rating: f64,
    pub sales_approved: u64,
    pub sales_pending: u64,
    pub sales_rejected: u64,
    pub total_sales_reports: u64,
    /// Sum of approved sale amounts.
    pub total_revenue: Money,
    pub average_sale_value: Money,
    pub total_contacts: u64,
}

/// Approved sales in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySales {
    /// "M/YYYY", e.g. "3/2024".
    pub month_year: String,
    pub count: u64,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyOffers {
    pub month_year: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentSale {
    #[serde(flatten)]
    pub report: SalesReport,
    pub offer: Related<OfferSummary>,
}

/// Everything the admin dashboard shows, computed in one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub platform: PlatformMetrics,
    pub sales_by_month: Vec<MonthlySales>,
    pub offers_by_month: Vec<MonthlyOffers>,
    pub recent_sales: Vec<RecentSale>,
}

/// One seller's standing on the platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SellerStats {
    pub profile_id: Uuid,
    pub total_offers: u64,
    pub active_offers: u64,
    pub pending_offers: u64,
    pub rating: RatingSummary,
    pub disputes: u64,
}
