//! Outbound message channel between background workers and the chat
//! transport.
//!
//! Background threads never call into the front-end's event loop; they
//! push `(client, text)` pairs into this channel and the loop drains it
//! at its own pace. Delivery is fire-and-forget with no acknowledgment.

use async_trait::async_trait;
use tokio::sync::mpsc;

use lexarchive_core::notify::Notifier;

/// One message queued for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub client_id: i64,
    pub text: String,
}

/// [`Notifier`] that forwards into an unbounded outbox channel.
pub struct OutboxNotifier {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl OutboxNotifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn send(&self, client_id: i64, text: &str) {
        // A closed receiver means the transport is gone; dropping the
        // message matches fire-and-forget semantics.
        let _ = self.tx.send(OutboundMessage {
            client_id,
            text: text.to_string(),
        });
    }
}
