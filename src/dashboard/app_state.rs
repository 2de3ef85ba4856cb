//! Application state shared across handlers

use std::sync::Arc;

use crate::core::identity::IdentityProvider;
use crate::core::metrics::MetricsService;
use crate::core::moderation::{
    DisputeService, ModerationConfig, OfferService, ProfileService, ReviewService, SalesService,
};
use crate::core::notifications::Notifier;
use crate::core::store::Entities;

#[derive(Clone)]
pub struct AppState {
    pub offers: Arc<OfferService>,
    pub sales: Arc<SalesService>,
    pub reviews: Arc<ReviewService>,
    pub profiles: Arc<ProfileService>,
    pub disputes: Arc<DisputeService>,
    pub metrics: Arc<MetricsService>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Wire every service to the same store and notification queue.
    pub fn new(
        entities: Entities,
        notifier: Notifier,
        config: ModerationConfig,
        recent_sales_window: usize,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            offers: Arc::new(OfferService::new_with_config(
                entities.clone(),
                notifier.clone(),
                config.clone(),
            )),
            sales: Arc::new(SalesService::new_with_config(
                entities.clone(),
                notifier.clone(),
                config.clone(),
            )),
            reviews: Arc::new(ReviewService::new_with_config(
                entities.clone(),
                notifier.clone(),
                config,
            )),
            profiles: Arc::new(ProfileService::new(entities.clone(), notifier.clone())),
            disputes: Arc::new(DisputeService::new(entities.clone(), notifier)),
            metrics: Arc::new(MetricsService::with_recent_window(
                entities,
                recent_sales_window,
            )),
            identity,
        }
    }
}
