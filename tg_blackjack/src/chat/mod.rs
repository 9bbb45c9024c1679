//! Routing of inbound updates to one actor per chat.

pub mod actor;
pub mod manager;
pub mod messages;

pub use actor::{ChatActor, ChatError, ChatHandle};
pub use manager::ChatManager;
pub use messages::{ChatMessage, ChatResponse, InboundUpdate, UserInfo};
