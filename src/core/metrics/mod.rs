// Metrics aggregator - counts, sums and monthly breakdowns for the dashboard.

pub mod metrics_models;
pub mod metrics_service;

pub use metrics_models::*;
pub use metrics_service::MetricsService;
