//! Chat manager: finds or spawns the actor for each inbound update.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

use super::{
    actor::{ChatActor, ChatError, ChatHandle},
    messages::{ChatResponse, InboundUpdate},
};
use crate::{db::ChatId, engine::StageController};

/// Routes updates to per-chat actors, spawning them lazily.
#[derive(Clone)]
pub struct ChatManager {
    controller: StageController,

    /// Handles of actors spawned so far. A handle whose actor has stopped
    /// is replaced the next time its chat is used.
    chats: Arc<RwLock<HashMap<ChatId, ChatHandle>>>,
}

impl ChatManager {
    pub fn new(controller: StageController) -> Self {
        Self {
            controller,
            chats: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn controller(&self) -> &StageController {
        &self.controller
    }

    /// Deliver an update to its chat's actor and wait for the outcome.
    ///
    /// An actor that stopped (idle timeout) before taking the update never
    /// applied it, so the update is retried once on a fresh actor.
    pub async fn route(&self, update: InboundUpdate) -> ChatResponse {
        let chat_id = update.chat_id;
        for _ in 0..2 {
            let handle = self.get_or_spawn(chat_id).await;
            match handle.handle_update(update.clone()).await {
                Ok(response) => return response,
                Err(ChatError::Closed) => {
                    log::debug!("Chat {chat_id}: actor closed, respawning");
                }
            }
        }

        log::error!("Chat {chat_id}: no actor accepted the update");
        ChatResponse::Failed("something went wrong, please try again".to_string())
    }

    /// Get the live handle for a chat, spawning its actor if needed.
    pub async fn get_or_spawn(&self, chat_id: ChatId) -> ChatHandle {
        {
            let chats = self.chats.read().await;
            if let Some(handle) = chats.get(&chat_id).filter(|h| !h.is_closed()) {
                return handle.clone();
            }
        }

        let mut chats = self.chats.write().await;
        // Another task may have spawned it while we waited for the lock.
        if let Some(handle) = chats.get(&chat_id).filter(|h| !h.is_closed()) {
            return handle.clone();
        }

        let (actor, handle) = ChatActor::new(chat_id, self.controller.clone());
        chats.insert(chat_id, handle.clone());
        drop(chats);

        tokio::spawn(actor.run());
        log::debug!("Spawned actor for chat {chat_id}");
        handle
    }

    /// Number of chats with a running actor.
    pub async fn active_chat_count(&self) -> usize {
        self.chats
            .read()
            .await
            .values()
            .filter(|h| !h.is_closed())
            .count()
    }

    /// Drop handles of actors that have stopped. Returns how many went.
    pub async fn prune(&self) -> usize {
        let mut chats = self.chats.write().await;
        let before = chats.len();
        chats.retain(|_, handle| !handle.is_closed());
        before - chats.len()
    }

    /// Stop a chat's actor. Returns whether the chat had one.
    pub async fn close_chat(&self, chat_id: ChatId) -> bool {
        let handle = self.chats.write().await.remove(&chat_id);
        match handle {
            Some(handle) => {
                handle.close().await;
                true
            }
            None => false,
        }
    }

    /// Stop every actor.
    pub async fn shutdown(&self) {
        let handles: Vec<ChatHandle> = self.chats.write().await.drain().map(|(_, h)| h).collect();
        for handle in &handles {
            handle.close().await;
        }
        log::info!("Closed {} chat actor(s)", handles.len());
    }
}
