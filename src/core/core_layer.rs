// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "marketplace/mod.rs"]
pub mod marketplace;

#[path = "store/mod.rs"]
pub mod store;

#[path = "notifications/mod.rs"]
pub mod notifications;

#[path = "identity/mod.rs"]
pub mod identity;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "metrics/mod.rs"]
pub mod metrics;
