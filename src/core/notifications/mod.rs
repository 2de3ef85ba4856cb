// Notifications - event catalogue, gateway port and the non-blocking dispatch queue.

pub mod notification_models;
pub mod notifier;

pub use notification_models::Notification;
pub use notifier::{DeliverySettings, NotificationError, NotificationGateway, Notifier};
