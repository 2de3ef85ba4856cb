// Notification dispatch - queue now, deliver later.
//
// Services call `Notifier::notify_*` after a state transition is committed.
// That only pushes onto an unbounded channel, so it can neither block nor fail
// the transition. A single worker task drains the channel and talks to the
// gateway; delivery failures are logged and dropped.

use super::notification_models::Notification;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// ============================================================================
// GATEWAY (PORT)
// ============================================================================

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Messaging gateway is not configured")]
    NotConfigured,

    #[error("Invalid recipient '{0}'")]
    InvalidRecipient(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Gateway rejected message with status {status}: {detail}")]
    Rejected { status: u16, detail: String },
}

/// The external messaging service (WhatsApp).
///
/// Failures come back as values; callers treat every one of them as non-fatal.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), NotificationError>;
}

// ============================================================================
// QUEUE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Recipient {
    /// The platform's designated admin contact.
    Admin,
    /// A profile's own contact handle.
    Contact(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub recipient: Recipient,
    pub notification: Notification,
}

#[derive(Debug, Clone)]
pub struct DeliverySettings {
    pub admin_contact: Option<String>,
    pub currency_symbol: String,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            admin_contact: None,
            currency_symbol: "R$".to_string(),
        }
    }
}

/// Cheap, cloneable handle services use to queue notifications.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl Notifier {
    /// A notifier whose queue the caller drains itself (used by tests).
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Start the delivery worker. It stops once every `Notifier` clone is dropped.
    pub fn spawn(
        gateway: Arc<dyn NotificationGateway>,
        settings: DeliverySettings,
    ) -> (Self, JoinHandle<()>) {
        let (notifier, rx) = Self::channel();
        let handle = tokio::spawn(run_delivery(rx, gateway, settings));
        (notifier, handle)
    }

    pub fn notify_admin(&self, notification: Notification) {
        self.enqueue(Recipient::Admin, notification);
    }

    /// Queue a message for a profile. Profiles without a contact are skipped.
    pub fn notify_contact(&self, contact: Option<&str>, notification: Notification) {
        match contact.map(str::trim).filter(|c| !c.is_empty()) {
            Some(contact) => self.enqueue(Recipient::Contact(contact.to_string()), notification),
            None => tracing::debug!(
                kind = notification.kind(),
                "Recipient has no contact handle; notification skipped"
            ),
        }
    }

    fn enqueue(&self, recipient: Recipient, notification: Notification) {
        let kind = notification.kind();
        if self
            .tx
            .send(Outbound {
                recipient,
                notification,
            })
            .is_err()
        {
            tracing::warn!(kind, "Notification queue is closed; notification dropped");
        }
    }
}

/// Drain the queue until every sender is gone.
pub async fn run_delivery(
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    gateway: Arc<dyn NotificationGateway>,
    settings: DeliverySettings,
) {
    while let Some(outbound) = rx.recv().await {
        deliver(gateway.as_ref(), &settings, outbound).await;
    }
    tracing::info!("Notification delivery worker stopped");
}

async fn deliver(gateway: &dyn NotificationGateway, settings: &DeliverySettings, outbound: Outbound) {
    let kind = outbound.notification.kind();
    let recipient = match &outbound.recipient {
        Recipient::Contact(contact) => contact.as_str(),
        Recipient::Admin => match settings.admin_contact.as_deref() {
            Some(admin) => admin,
            None => {
                tracing::warn!(kind, "Admin contact not configured; notification skipped");
                return;
            }
        },
    };

    let text = outbound.notification.render(&settings.currency_symbol);
    match gateway.send_message(recipient, &text).await {
        Ok(()) => tracing::info!(kind, "Notification delivered"),
        Err(e) => tracing::warn!(kind, error = %e, "Notification delivery failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every send; fails for one poisoned recipient.
    struct RecordingGateway {
        sent: Mutex<Vec<(String, String)>>,
        failing_recipient: Option<String>,
    }

    impl RecordingGateway {
        fn new(failing_recipient: Option<&str>) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                failing_recipient: failing_recipient.map(str::to_string),
            }
        }
    }

    #[async_trait]
    impl NotificationGateway for RecordingGateway {
        async fn send_message(&self, recipient: &str, text: &str) -> Result<(), NotificationError> {
            if self.failing_recipient.as_deref() == Some(recipient) {
                return Err(NotificationError::Transport("connection refused".to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((recipient.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn approved(title: &str) -> Notification {
        Notification::OfferApproved {
            owner_name: "Ana".to_string(),
            title: title.to_string(),
        }
    }

    #[tokio::test]
    async fn test_worker_delivers_and_survives_failures() {
        let gateway = Arc::new(RecordingGateway::new(Some("5511000000000")));
        let settings = DeliverySettings {
            admin_contact: Some("5511999999999".to_string()),
            ..Default::default()
        };
        let (notifier, handle) = Notifier::spawn(gateway.clone(), settings);

        notifier.notify_contact(Some("5511000000000"), approved("fails"));
        notifier.notify_contact(Some("5511888888888"), approved("Bolo"));
        notifier.notify_admin(Notification::NewRegistration {
            user_name: "Bia".to_string(),
        });
        drop(notifier);
        handle.await.unwrap();

        let sent = gateway.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "5511888888888");
        assert!(sent[0].1.contains("\"Bolo\""));
        assert_eq!(sent[1].0, "5511999999999");
    }

    #[tokio::test]
    async fn test_admin_messages_skipped_without_admin_contact() {
        let gateway = Arc::new(RecordingGateway::new(None));
        let (notifier, handle) = Notifier::spawn(gateway.clone(), DeliverySettings::default());

        notifier.notify_admin(Notification::NewRegistration {
            user_name: "Bia".to_string(),
        });
        drop(notifier);
        handle.await.unwrap();

        assert!(gateway.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_blank_contact_is_not_queued() {
        let (notifier, mut rx) = Notifier::channel();

        notifier.notify_contact(None, approved("a"));
        notifier.notify_contact(Some("   "), approved("b"));
        notifier.notify_contact(Some(" 5511 "), approved("c"));

        let queued = rx.try_recv().unwrap();
        assert_eq!(queued.recipient, Recipient::Contact("5511".to_string()));
        assert!(rx.try_recv().is_err());
    }
}
