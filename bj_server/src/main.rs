//! Group-chat Blackjack server.
//!
//! Spawns one ChatActor per chat, managed by ChatManager, with games and
//! balances kept in PostgreSQL (or in memory with `--memory`).

use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Error;
use bj_server::{
    api,
    config::ServerConfig,
    logging::{self, log_database_operation, log_game_event},
};
use log::info;
use pico_args::Arguments;
use tg_blackjack::{
    ChatManager, StageController,
    db::{Database, GameStore, InMemoryGameStore, PgGameStore},
    dispatch::{ChannelDispatcher, OutboundMessage},
    game::RandomCards,
};
use tokio::sync::mpsc;

const DELIVERY_GRACE: Duration = Duration::from_secs(2);

const HELP: &str = "\
Run the group-chat Blackjack server

USAGE:
  bj_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/blackjack_db]

FLAGS:
  --memory                 Keep games and balances in memory, without a database
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  JOIN_WINDOW_SECS         Seconds players have to join a new game
  BET_WINDOW_SECS          Seconds players have to bet once betting opens
  BET_OPTIONS              Comma separated bet amounts (e.g., 10,25,50,100)
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let in_memory = pargs.contains("--memory");
    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;

    logging::init();

    let config = ServerConfig::from_env(bind, database_url, in_memory)?;
    config.validate()?;
    info!("Starting Blackjack server at {}", config.bind);

    let (store, database) = open_store(&config).await?;

    let (dispatcher, outbox) = ChannelDispatcher::new(config.outbox_capacity);
    let deliveries = tokio::spawn(deliver(outbox));

    let controller = StageController::new(
        store.clone(),
        Arc::new(dispatcher),
        Arc::new(RandomCards),
        config.game.clone(),
    );
    let chats = ChatManager::new(controller);

    let app = api::create_router(api::AppState {
        chats: chats.clone(),
        store,
    });

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");
    chats.shutdown().await;
    drop(chats);
    // Pending stage timers still hold the dispatcher, so the queue may
    // never close on its own.
    match tokio::time::timeout(DELIVERY_GRACE, deliveries).await {
        Ok(Err(err)) => log::error!("Delivery task failed: {err}"),
        Ok(Ok(())) => {}
        Err(_) => log::warn!("Dropping undelivered messages after {DELIVERY_GRACE:?}"),
    }
    if let Some(database) = database {
        database.close().await;
    }

    Ok(())
}

/// Connect the configured store. With PostgreSQL, migrations are applied
/// and games left running by a previous process are marked interrupted.
async fn open_store(
    config: &ServerConfig,
) -> Result<(Arc<dyn GameStore>, Option<Database>), Error> {
    if config.in_memory {
        info!("Using in-memory store; nothing survives a restart");
        return Ok((Arc::new(InMemoryGameStore::new()), None));
    }

    info!("Connecting to database");
    let database = Database::new(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    let started = Instant::now();
    database
        .migrate()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to apply migrations: {}", e))?;
    log_database_operation("migrate", started.elapsed().as_millis() as u64, None);

    let store = PgGameStore::new(database.pool().clone());
    let started = Instant::now();
    let interrupted = store.interrupt_active_games().await?;
    log_database_operation(
        "interrupt_active_games",
        started.elapsed().as_millis() as u64,
        Some(interrupted),
    );
    if interrupted > 0 {
        info!("Marked {interrupted} unfinished game(s) as interrupted");
    }

    info!("Database connected successfully");
    Ok((Arc::new(store), Some(database)))
}

/// Drain the outbound queue. Delivery to Telegram is not wired in; each
/// message is logged instead.
async fn deliver(mut outbox: mpsc::Receiver<OutboundMessage>) {
    while let Some(message) = outbox.recv().await {
        let buttons: Vec<&str> = message.buttons.iter().map(|b| b.text.as_str()).collect();
        if buttons.is_empty() {
            log_game_event("outbound", message.chat_id, None, &message.text);
        } else {
            log_game_event(
                "outbound",
                message.chat_id,
                None,
                &format!("{} [{}]", message.text, buttons.join(" | ")),
            );
        }
    }
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {err}");
        std::future::pending::<()>().await;
    }
}
