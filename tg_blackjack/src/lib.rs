//! # tg_blackjack
//!
//! A Blackjack engine for Telegram group chats.
//!
//! Players in a chat start a game with a button, join during a short join
//! window, place one bet each, then take cards or stand until nobody is
//! taking any more. The dealer then draws to 17 and every bet is settled
//! against the player's balance in that chat.
//!
//! ## Stages
//!
//! - **WaitingForPlayersToJoin**: the join window is open
//! - **Betting**: every player must bet before the bet window closes, or the
//!   game is canceled
//! - **PlayerHit**: players take cards or stand
//! - **DillerHit**: the dealer plays their hand
//! - **Summarizing**: bets are settled and the results posted
//!
//! ## Core Modules
//!
//! - [`game`]: cards, scoring and the stage rules
//! - [`db`]: the [`GameStore`](db::GameStore) trait with PostgreSQL and
//!   in-memory implementations
//! - [`engine`]: the stage controller, timers and round resolver
//! - [`chat`]: one actor per chat, routed by the [`ChatManager`]
//! - [`dispatch`]: outbound messages and their sink
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tg_blackjack::{
//!     ChatManager, GameConfig, StageController,
//!     chat::{InboundUpdate, UserInfo},
//!     db::InMemoryGameStore,
//!     dispatch::ChannelDispatcher,
//!     game::RandomCards,
//! };
//!
//! # async fn example() {
//! let (dispatcher, mut outbox) = ChannelDispatcher::new(64);
//! let controller = StageController::new(
//!     Arc::new(InMemoryGameStore::new()),
//!     Arc::new(dispatcher),
//!     Arc::new(RandomCards),
//!     GameConfig::default(),
//! );
//! let chats = ChatManager::new(controller);
//!
//! let user = UserInfo { id: 42, username: None, first_name: "Alice".into() };
//! chats
//!     .route(InboundUpdate { chat_id: -100, user, data: "/start".into() })
//!     .await;
//! let welcome = outbox.recv().await;
//! # }
//! ```

/// Per-chat actors and inbound update routing.
pub mod chat;

/// Persistence of players, balances and games.
pub mod db;

/// Outbound chat messages.
pub mod dispatch;

/// Stage controller, timers and round resolution.
pub mod engine;

/// Cards, scoring and stage rules.
pub mod game;

pub use chat::{ChatManager, ChatResponse, InboundUpdate};
pub use engine::{EngineError, GameConfig, StageController};
pub use game::{
    Action, ActionError, Card, GameStage, GameStatus, PlayerStatus,
    constants::{self, BLACK_JACK, DEALER_STOP_SCORE},
    entities, functional,
};
