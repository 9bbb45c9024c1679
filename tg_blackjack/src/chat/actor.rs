//! Per-chat actor.
//!
//! Every chat gets one task that owns its inbox, so updates from a chat are
//! applied strictly in arrival order while different chats run in parallel.

use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use super::messages::{ChatMessage, ChatResponse, InboundUpdate};
use crate::{db::ChatId, engine::StageController};

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ChatError {
    /// The actor stopped before handling the message.
    #[error("chat actor is closed")]
    Closed,
}

/// Handle for sending messages to a chat actor
#[derive(Clone, Debug)]
pub struct ChatHandle {
    sender: mpsc::Sender<ChatMessage>,
    chat_id: ChatId,
}

impl ChatHandle {
    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    /// Whether the actor behind this handle has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Queue an update and wait for its outcome.
    pub async fn handle_update(&self, update: InboundUpdate) -> Result<ChatResponse, ChatError> {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(ChatMessage::Update { update, response })
            .await
            .map_err(|_| ChatError::Closed)?;
        receiver.await.map_err(|_| ChatError::Closed)
    }

    /// Ask the actor to stop once it has drained the updates queued so far.
    pub async fn close(&self) {
        // Already gone is as good as closed.
        let _ = self.sender.send(ChatMessage::Close).await;
    }
}

/// Actor serialising the updates of a single chat
pub struct ChatActor {
    chat_id: ChatId,
    controller: StageController,
    inbox: mpsc::Receiver<ChatMessage>,
    idle_timeout: Duration,
}

impl ChatActor {
    /// Create an actor and the handle used to reach it. The actor does
    /// nothing until [`ChatActor::run`] is spawned.
    pub fn new(chat_id: ChatId, controller: StageController) -> (Self, ChatHandle) {
        let config = controller.config();
        let (sender, inbox) = mpsc::channel(config.inbox_capacity);
        let idle_timeout = config.chat_idle_timeout;

        let actor = Self {
            chat_id,
            controller,
            inbox,
            idle_timeout,
        };
        (actor, ChatHandle { sender, chat_id })
    }

    /// Run the actor event loop until it is closed, every handle is dropped
    /// or the chat has been idle for the configured timeout.
    pub async fn run(mut self) {
        log::debug!("Chat {} actor starting", self.chat_id);

        loop {
            tokio::select! {
                biased;

                message = self.inbox.recv() => match message {
                    Some(ChatMessage::Update { update, response }) => {
                        let result = self.controller.handle_update(&update).await;
                        if response.send(result).is_err() {
                            log::debug!("Chat {}: caller went away before the reply", self.chat_id);
                        }
                    }
                    Some(ChatMessage::Close) | None => break,
                },

                _ = tokio::time::sleep(self.idle_timeout) => {
                    log::debug!("Chat {} idle, stopping actor", self.chat_id);
                    break;
                }
            }
        }

        log::debug!("Chat {} actor stopped", self.chat_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chat::messages::UserInfo,
        db::InMemoryGameStore,
        dispatch::{ChannelDispatcher, OutboundMessage},
        engine::GameConfig,
        game::RandomCards,
    };
    use std::sync::Arc;

    fn controller(idle: Duration) -> (StageController, mpsc::Receiver<OutboundMessage>) {
        let (dispatcher, outbox) = ChannelDispatcher::new(64);
        let config = GameConfig {
            chat_idle_timeout: idle,
            ..GameConfig::default()
        };
        let controller = StageController::new(
            Arc::new(InMemoryGameStore::new()),
            Arc::new(dispatcher),
            Arc::new(RandomCards),
            config,
        );
        (controller, outbox)
    }

    fn update(data: &str) -> InboundUpdate {
        InboundUpdate {
            chat_id: -1,
            user: UserInfo {
                id: 1,
                username: None,
                first_name: "Alice".to_string(),
            },
            data: data.to_string(),
        }
    }

    #[tokio::test]
    async fn test_actor_replies_to_updates() {
        let (controller, mut outbox) = controller(Duration::from_secs(60));
        let (actor, handle) = ChatActor::new(-1, controller);
        tokio::spawn(actor.run());

        let response = handle.handle_update(update("/start")).await.unwrap();
        assert!(response.is_success());
        assert!(outbox.recv().await.unwrap().has_callback("join_new_game"));

        let response = handle.handle_update(update("gibberish")).await.unwrap();
        assert!(matches!(response, ChatResponse::Rejected(_)));
    }

    #[tokio::test]
    async fn test_close_stops_actor() {
        let (controller, _outbox) = controller(Duration::from_secs(60));
        let (actor, handle) = ChatActor::new(-1, controller);
        let task = tokio::spawn(actor.run());

        handle.close().await;
        task.await.unwrap();
        assert!(handle.is_closed());
        assert_eq!(
            handle.handle_update(update("/start")).await,
            Err(ChatError::Closed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_actor_stops() {
        let (controller, _outbox) = controller(Duration::from_secs(5));
        let (actor, handle) = ChatActor::new(-1, controller);
        let task = tokio::spawn(actor.run());

        tokio::time::sleep(Duration::from_secs(6)).await;
        task.await.unwrap();
        assert!(handle.is_closed());
    }
}
