//! Process wiring for the group-chat Blackjack engine: configuration,
//! logging and the HTTP update endpoint.

pub mod api;
pub mod config;
pub mod logging;
