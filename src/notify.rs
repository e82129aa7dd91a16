use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

/// A timestamped, user-visible message ("Approaching X...", failures).
///
/// The log is append-only; the engine emits and never reads back.
#[derive(Debug, Clone)]
pub struct Notification {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Creates a new notification channel pair
pub fn notification_channel() -> (Notifier, NotificationReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Notifier(tx), NotificationReceiver(rx))
}

/// Sender side of the notification channel
#[derive(Clone)]
pub struct Notifier(mpsc::UnboundedSender<Notification>);

impl Notifier {
    /// Emit a notification; silently dropped if the sink is gone
    pub fn notify(&self, text: impl Into<String>) {
        let _ = self.0.send(Notification {
            text: text.into(),
            timestamp: Utc::now(),
        });
    }
}

/// Receiver side of the notification channel
pub struct NotificationReceiver(mpsc::UnboundedReceiver<Notification>);

impl NotificationReceiver {
    pub async fn recv(&mut self) -> Option<Notification> {
        self.0.recv().await
    }

    pub fn try_recv(&mut self) -> Result<Notification, mpsc::error::TryRecvError> {
        self.0.try_recv()
    }

    /// Drain everything currently buffered without waiting
    pub fn drain(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = self.0.try_recv() {
            out.push(n);
        }
        out
    }
}
