//! The game engine: stage controller, timers and round resolution.

pub mod config;
pub mod controller;
pub mod errors;
pub mod resolver;
pub mod timers;

pub use config::GameConfig;
pub use controller::StageController;
pub use errors::{EngineError, EngineResult};
pub use resolver::{PlayerResult, RoundResolver, RoundSummary};
pub use timers::{TimerKind, TimerRegistry};
