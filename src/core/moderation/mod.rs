// Moderation core - state machines for offers, sale reports, reviews,
// profiles and disputes.

pub mod dispute_service;
pub mod moderation_config;
pub mod moderation_error;
pub mod moderation_support;
pub mod offer_service;
pub mod profile_service;
pub mod review_service;
pub mod sales_service;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use dispute_service::{DisputeDraft, DisputeService, DisputeThread};
pub use moderation_config::ModerationConfig;
pub use moderation_error::ModerationError;
pub use offer_service::{OfferDraft, OfferListing, OfferSearch, OfferService};
pub use profile_service::{ProfileFilter, ProfileService};
pub use review_service::{OfferReviews, PendingReview, ReviewDraft, ReviewService};
pub use sales_service::{SaleReportDraft, SaleReportView, SalesService};
