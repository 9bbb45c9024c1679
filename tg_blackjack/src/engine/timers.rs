//! Delayed, cancellable stage transitions.
//!
//! Each scheduled timer is a tokio task that sleeps and then runs its job
//! in a child task. The job's result is logged, and so is a panic, which
//! surfaces as a [`tokio::task::JoinError`] on the child. Once the sleep is
//! over the timer leaves the registry: a job that has started is never
//! aborted, only timers still waiting are.

use std::{
    collections::HashMap,
    fmt,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::task::AbortHandle;

use super::errors::EngineResult;
use crate::db::GameId;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TimerKind {
    /// Closes joining and opens betting.
    JoinWindow,
    /// Cancels the game if someone still has not bet.
    BetWindow,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerKind::JoinWindow => write!(f, "join window"),
            TimerKind::BetWindow => write!(f, "bet window"),
        }
    }
}

struct PendingTimer {
    id: u64,
    abort: AbortHandle,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    pending: HashMap<(GameId, TimerKind), PendingTimer>,
}

/// Timers keyed by game and kind. Cloning shares the registry.
#[derive(Clone, Default)]
pub struct TimerRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `job` after `delay`. A timer of the same kind already pending for
    /// the game is replaced.
    pub fn schedule<F, Fut>(&self, game_id: GameId, kind: TimerKind, delay: Duration, job: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = EngineResult<()>> + Send + 'static,
    {
        // Held across the spawn so a zero-delay timer cannot try to remove
        // its entry before it is inserted.
        let mut registry = self.lock();
        registry.next_id += 1;
        let id = registry.next_id;

        let timers = self.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            timers.remove(game_id, kind, id);

            match tokio::spawn(job()).await {
                Ok(Ok(())) => log::debug!("Game {game_id}: {kind} timer done"),
                Ok(Err(err)) => log::error!("Game {game_id}: {kind} timer failed: {err}"),
                Err(err) if err.is_panic() => {
                    log::error!("Game {game_id}: {kind} timer panicked")
                }
                Err(_) => log::debug!("Game {game_id}: {kind} timer job cancelled"),
            }
        });

        let replaced = registry.pending.insert(
            (game_id, kind),
            PendingTimer {
                id,
                abort: task.abort_handle(),
            },
        );
        if let Some(old) = replaced {
            old.abort.abort();
            log::debug!("Game {game_id}: replaced pending {kind} timer");
        }
    }

    fn remove(&self, game_id: GameId, kind: TimerKind, id: u64) {
        let mut registry = self.lock();
        if registry
            .pending
            .get(&(game_id, kind))
            .is_some_and(|timer| timer.id == id)
        {
            registry.pending.remove(&(game_id, kind));
        }
    }

    /// Abort one pending timer. Returns whether one was pending.
    pub fn cancel(&self, game_id: GameId, kind: TimerKind) -> bool {
        match self.lock().pending.remove(&(game_id, kind)) {
            Some(timer) => {
                timer.abort.abort();
                true
            }
            None => false,
        }
    }

    /// Abort every pending timer of a game. Returns how many were aborted.
    pub fn cancel_game(&self, game_id: GameId) -> usize {
        let mut registry = self.lock();
        let keys: Vec<_> = registry
            .pending
            .keys()
            .filter(|(id, _)| *id == game_id)
            .copied()
            .collect();
        for key in &keys {
            if let Some(timer) = registry.pending.remove(key) {
                timer.abort.abort();
            }
        }
        if !keys.is_empty() {
            log::debug!("Game {game_id}: cancelled {} timer(s)", keys.len());
        }
        keys.len()
    }

    pub fn is_pending(&self, game_id: GameId, kind: TimerKind) -> bool {
        self.lock().pending.contains_key(&(game_id, kind))
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }
}
