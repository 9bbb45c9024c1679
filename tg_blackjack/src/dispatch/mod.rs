//! Outbound messages and the sink they are delivered through.
//!
//! The engine never talks to Telegram directly. It hands finished
//! [`OutboundMessage`]s to a [`MessageDispatcher`]; the server decides what
//! delivery means.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

pub mod messages;
pub mod texts;

pub use messages::{Button, OutboundMessage};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The receiving side has gone away.
    #[error("message channel closed")]
    Closed,

    /// Delivery failed downstream.
    #[error("delivery failed: {0}")]
    Delivery(String),
}

pub type DispatchResult<T> = Result<T, DispatchError>;

/// Output sink for chat messages.
#[async_trait]
pub trait MessageDispatcher: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> DispatchResult<()>;
}

/// Forwards every message into a bounded channel.
#[derive(Clone, Debug)]
pub struct ChannelDispatcher {
    sender: mpsc::Sender<OutboundMessage>,
}

impl ChannelDispatcher {
    /// Create a dispatcher and the receiver its messages arrive on.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl MessageDispatcher for ChannelDispatcher {
    async fn send(&self, message: OutboundMessage) -> DispatchResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| DispatchError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_dispatcher_forwards_in_order() {
        let (dispatcher, mut rx) = ChannelDispatcher::new(4);
        dispatcher.send(OutboundMessage::text(1, "first")).await.unwrap();
        dispatcher.send(OutboundMessage::text(1, "second")).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().text, "first");
        assert_eq!(rx.recv().await.unwrap().text, "second");
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped_fails() {
        let (dispatcher, rx) = ChannelDispatcher::new(1);
        drop(rx);
        let result = dispatcher.send(OutboundMessage::text(1, "lost")).await;
        assert!(matches!(result, Err(DispatchError::Closed)));
    }
}
