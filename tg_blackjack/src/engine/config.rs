//! Game rules and timing configuration.

use serde::{Deserialize, Serialize};
use std::{env, time::Duration};

use crate::game::constants::{DEFAULT_BET_OPTIONS, DEFAULT_STARTING_BALANCE};

pub const DEFAULT_RULES_URL: &str = "https://en.wikipedia.org/wiki/Blackjack";

/// Per-deployment game settings, shared by every chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// How long players can join after a game is started (default: 10s)
    pub join_window: Duration,

    /// How long players have to bet once betting opens (default: 15s)
    pub bet_window: Duration,

    /// Bet buttons, in display order
    pub bet_options: Vec<i64>,

    /// Smallest bet that counts as placed
    pub min_bet: i64,

    /// Points a player starts with in a chat they have not played in
    pub starting_balance: i64,

    /// Queued updates per chat before senders wait
    pub inbox_capacity: usize,

    /// A chat actor with no updates for this long shuts down
    pub chat_idle_timeout: Duration,

    /// Target of the "Game rules" button
    pub rules_url: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            join_window: Duration::from_secs(10),
            bet_window: Duration::from_secs(15),
            bet_options: DEFAULT_BET_OPTIONS.to_vec(),
            min_bet: DEFAULT_BET_OPTIONS[0],
            starting_balance: DEFAULT_STARTING_BALANCE,
            inbox_capacity: 64,
            chat_idle_timeout: Duration::from_secs(30 * 60),
            rules_url: DEFAULT_RULES_URL.to_string(),
        }
    }
}

impl GameConfig {
    /// Load from environment variables, falling back to the defaults:
    ///
    /// - `JOIN_WINDOW_SECS`, `BET_WINDOW_SECS`
    /// - `BET_OPTIONS`: comma separated amounts, e.g. `10,25,50,100`
    /// - `MIN_BET` (default: the smallest bet option)
    /// - `STARTING_BALANCE`, `CHAT_INBOX_CAPACITY`, `CHAT_IDLE_TIMEOUT_SECS`
    /// - `RULES_URL`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let bet_options = env::var("BET_OPTIONS")
            .ok()
            .and_then(|raw| {
                raw.split(',')
                    .map(|amount| amount.trim().parse::<i64>().ok())
                    .collect::<Option<Vec<_>>>()
            })
            .filter(|options| !options.is_empty())
            .unwrap_or(defaults.bet_options);
        let smallest = bet_options.iter().copied().min().unwrap_or(defaults.min_bet);

        Self {
            join_window: Duration::from_secs(parse_env_or(
                "JOIN_WINDOW_SECS",
                defaults.join_window.as_secs(),
            )),
            bet_window: Duration::from_secs(parse_env_or(
                "BET_WINDOW_SECS",
                defaults.bet_window.as_secs(),
            )),
            min_bet: parse_env_or("MIN_BET", smallest),
            bet_options,
            starting_balance: parse_env_or("STARTING_BALANCE", defaults.starting_balance),
            inbox_capacity: parse_env_or("CHAT_INBOX_CAPACITY", defaults.inbox_capacity),
            chat_idle_timeout: Duration::from_secs(parse_env_or(
                "CHAT_IDLE_TIMEOUT_SECS",
                defaults.chat_idle_timeout.as_secs(),
            )),
            rules_url: env::var("RULES_URL").unwrap_or(defaults.rules_url),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.join_window.is_zero() || self.bet_window.is_zero() {
            return Err("Join and bet windows must be longer than zero".to_string());
        }

        if self.bet_options.is_empty() {
            return Err("At least one bet option is required".to_string());
        }

        if self.min_bet <= 1 {
            // A bet of 1 is indistinguishable from "no bet yet".
            return Err("Minimum bet must be greater than 1".to_string());
        }

        if let Some(low) = self.bet_options.iter().find(|&&b| b < self.min_bet) {
            return Err(format!("Bet option {low} is below the minimum bet"));
        }

        if self.starting_balance <= 0 {
            return Err("Starting balance must be positive".to_string());
        }

        if self.inbox_capacity == 0 {
            return Err("Chat inbox capacity must be at least 1".to_string());
        }

        Ok(())
    }

    pub fn is_bet_option(&self, amount: i64) -> bool {
        self.bet_options.contains(&amount)
    }
}

fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 4] = ["JOIN_WINDOW_SECS", "BET_OPTIONS", "MIN_BET", "RULES_URL"];

    fn clear() {
        for var in VARS {
            unsafe { env::remove_var(var) };
        }
    }

    #[test]
    fn test_default_is_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bet_options, vec![10, 25, 50, 100]);
        assert_eq!(config.min_bet, 10);
        assert_eq!(config.join_window.as_secs(), 10);
        assert_eq!(config.bet_window.as_secs(), 15);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear();
        unsafe {
            env::set_var("JOIN_WINDOW_SECS", "3");
            env::set_var("BET_OPTIONS", "5, 20");
            env::set_var("RULES_URL", "https://example.org/rules");
        }
        let config = GameConfig::from_env();
        assert_eq!(config.join_window.as_secs(), 3);
        assert_eq!(config.bet_options, vec![5, 20]);
        assert_eq!(config.min_bet, 5);
        assert_eq!(config.rules_url, "https://example.org/rules");
        assert!(config.validate().is_ok());
        clear();
    }

    #[test]
    #[serial]
    fn test_from_env_ignores_bad_bet_options() {
        clear();
        unsafe { env::set_var("BET_OPTIONS", "10,lots") };
        let config = GameConfig::from_env();
        assert_eq!(config.bet_options, vec![10, 25, 50, 100]);
        clear();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = GameConfig {
            min_bet: 1,
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());

        let config = GameConfig {
            bet_options: vec![5, 25],
            ..GameConfig::default()
        };
        assert!(config.validate().unwrap_err().contains('5'));

        let config = GameConfig {
            bet_window: Duration::ZERO,
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
