//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::net::{Ipv4Addr, SocketAddr};
use tg_blackjack::{GameConfig, db::DatabaseConfig};

const DEFAULT_BIND: SocketAddr = SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::LOCALHOST), 8080);

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Keep all state in memory instead of PostgreSQL
    pub in_memory: bool,
    /// Capacity of the outbound message queue
    pub outbox_capacity: usize,
    /// Game rules and timing
    pub game: GameConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `in_memory` - Whether `--memory` was passed
    ///
    /// # Errors
    ///
    /// Returns error if `SERVER_BIND` is set but is not a socket address
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        in_memory: bool,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => match std::env::var("SERVER_BIND") {
                Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
                    var: "SERVER_BIND".to_string(),
                    reason: format!("{value:?} is not an IP:PORT address"),
                })?,
                Err(_) => DEFAULT_BIND,
            },
        };

        let mut database = DatabaseConfig::from_env();
        if let Some(url) = database_url_override {
            database.database_url = url;
        }

        Ok(ServerConfig {
            bind,
            database,
            in_memory: in_memory || parse_env_or("IN_MEMORY_STORE", false),
            outbox_capacity: parse_env_or("OUTBOX_CAPACITY", 1024),
            game: GameConfig::from_env(),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.in_memory && self.database.database_url.is_empty() {
            return Err(ConfigError::MissingRequired {
                var: "DATABASE_URL".to_string(),
                hint: "Set a PostgreSQL URL or run with --memory".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed max connections ({})",
                    self.database.max_connections
                ),
            });
        }

        if self.outbox_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "OUTBOX_CAPACITY".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        self.game.validate().map_err(|reason| ConfigError::Invalid {
            var: "game settings".to_string(),
            reason,
        })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn config() -> ServerConfig {
        ServerConfig {
            bind: DEFAULT_BIND,
            database: DatabaseConfig::development(),
            in_memory: false,
            outbox_capacity: 16,
            game: GameConfig::default(),
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "DATABASE_URL".to_string(),
            hint: "Use --memory".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("DATABASE_URL"));
        assert!(msg.contains("Use --memory"));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_empty_database_url_needs_memory_flag() {
        let mut config = config();
        config.database.database_url.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired { .. })
        ));

        config.in_memory = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_game_settings_are_reported() {
        let mut config = config();
        config.game.bet_options.clear();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_pool_bounds_validation() {
        let mut config = config();
        config.database.min_connections = 20;
        config.database.max_connections = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_overrides_take_priority() {
        unsafe {
            std::env::set_var("SERVER_BIND", "0.0.0.0:9000");
            std::env::set_var("DATABASE_URL", "postgres://env@localhost/env");
        }

        let bind: SocketAddr = "127.0.0.1:7000".parse().unwrap();
        let config =
            ServerConfig::from_env(Some(bind), Some("postgres://cli@localhost/cli".into()), true)
                .unwrap();
        assert_eq!(config.bind, bind);
        assert_eq!(config.database.database_url, "postgres://cli@localhost/cli");
        assert!(config.in_memory);

        let config = ServerConfig::from_env(None, None, false).unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.database.database_url, "postgres://env@localhost/env");

        unsafe {
            std::env::remove_var("SERVER_BIND");
            std::env::remove_var("DATABASE_URL");
        }
    }

    #[test]
    #[serial]
    fn test_invalid_bind_is_an_error() {
        unsafe {
            std::env::set_var("SERVER_BIND", "not-an-address");
        }
        let result = ServerConfig::from_env(None, None, false);
        unsafe {
            std::env::remove_var("SERVER_BIND");
        }
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }
}
