//! Engine error types.

use thiserror::Error;

use crate::{db::StoreError, game::ActionError};

#[derive(Debug, Error)]
pub enum EngineError {
    /// The action is not allowed right now. Nothing was changed.
    #[error(transparent)]
    Action(#[from] ActionError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Text safe to show in the chat. Rejections are explained; failures are
    /// reduced to a generic message.
    pub fn client_message(&self) -> String {
        match self {
            EngineError::Action(err) => err.to_string(),
            EngineError::Store(_) => "something went wrong, please try again".to_string(),
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, EngineError::Action(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
