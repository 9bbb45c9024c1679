//! Blackjack rules: cards, scoring and the stage machine.
//!
//! Everything in here is synchronous and free of I/O so it can be
//! exercised directly from unit tests and benchmarks.

pub mod constants;
pub mod entities;
pub mod functional;
pub mod state_machine;

pub use entities::{Card, CardSource, RandomCards, Rank, ScriptedCards, Suit};
pub use functional::{Outcome, dealer_play, format_hand, is_blackjack, is_bust, score_hand, settle};
pub use state_machine::{Action, ActionError, GameStage, GameStatus, PlayerStatus};
