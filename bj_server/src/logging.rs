//! Structured logging configuration.
//!
//! The engine logs through the `log` facade; `init` installs a `tracing`
//! subscriber that also picks up those records.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Levels are configurable via the `RUST_LOG` env var and default to
/// `info,sqlx=warn,hyper=warn`.
///
/// # Example
///
/// ```no_run
/// use bj_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a game lifecycle event with structured data
///
/// # Example
///
/// ```
/// use bj_server::logging::log_game_event;
///
/// log_game_event("outbound", -100, None, "Alice bets 25 points.");
/// ```
pub fn log_game_event(event_type: &str, chat_id: i64, game_id: Option<i64>, message: &str) {
    tracing::info!(
        event_type = event_type,
        chat_id = chat_id,
        game_id = game_id,
        "GAME: {}",
        message
    );
}

/// Log database operation
///
/// # Arguments
///
/// * `operation` - What was done, e.g. `migrate` or `interrupt_active_games`
/// * `duration_ms` - Duration in milliseconds
/// * `rows` - Rows affected, if known
pub fn log_database_operation(operation: &str, duration_ms: u64, rows: Option<u64>) {
    tracing::debug!(
        operation = operation,
        duration_ms = duration_ms,
        rows = rows,
        "Database operation"
    );

    if duration_ms > 1000 {
        tracing::warn!(
            operation = operation,
            duration_ms = duration_ms,
            "Slow database operation detected"
        );
    }
}
