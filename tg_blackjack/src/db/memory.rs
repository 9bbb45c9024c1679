//! In-process [`GameStore`].
//!
//! Backs the engine when the server runs without a database and in tests.
//! All state sits behind one lock, so each operation is atomic and the
//! conditional updates behave exactly like their SQL counterparts.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::Mutex;

use super::{
    errors::{StoreError, StoreResult},
    models::{
        Balance, ChatId, Game, GameId, GamePlay, GamePlayId, GamePlayUpdate, NewPlayer, Player,
        PlayerHand, PlayerId,
    },
    repository::GameStore,
};
use crate::game::{Card, GameStage, GameStatus, PlayerStatus, constants::BET_SENTINEL};

#[derive(Debug, Default)]
struct State {
    players: BTreeMap<PlayerId, Player>,
    balances: HashMap<(ChatId, PlayerId), Balance>,
    games: BTreeMap<GameId, Game>,
    gameplays: BTreeMap<GamePlayId, GamePlay>,
    next_id: i64,
    failing: HashSet<&'static str>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&self, operation: &'static str) -> StoreResult<()> {
        if self.failing.contains(operation) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn active_game_mut(&mut self, chat_id: ChatId) -> Option<&mut Game> {
        self.games
            .values_mut()
            .find(|g| g.chat_id == chat_id && g.status == GameStatus::Active)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryGameStore {
    state: Mutex<State>,
}

impl InMemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delete a balance row. Lets tests exercise settlement against a
    /// player whose balance has gone missing.
    pub async fn remove_balance(&self, chat_id: ChatId, player_id: PlayerId) -> Option<Balance> {
        self.state
            .lock()
            .await
            .balances
            .remove(&(chat_id, player_id))
    }

    /// Every game ever created in a chat, oldest first.
    pub async fn games_in_chat(&self, chat_id: ChatId) -> Vec<Game> {
        self.state
            .lock()
            .await
            .games
            .values()
            .filter(|g| g.chat_id == chat_id)
            .cloned()
            .collect()
    }

    /// Make every later call of `operation` (a [`GameStore`] method name)
    /// fail as if the database were unreachable.
    pub async fn fail_operation(&self, operation: &'static str) {
        self.state.lock().await.failing.insert(operation);
    }

    pub async fn find_player(&self, tg_id: i64) -> Option<Player> {
        self.state
            .lock()
            .await
            .players
            .values()
            .find(|p| p.tg_id == tg_id)
            .cloned()
    }
}

#[async_trait]
impl GameStore for InMemoryGameStore {
    async fn get_or_create_player(&self, new: &NewPlayer) -> StoreResult<(Player, bool)> {
        let mut state = self.state.lock().await;
        if let Some(player) = state.players.values_mut().find(|p| p.tg_id == new.tg_id) {
            if player.first_name.is_empty() && !new.first_name.is_empty() {
                player.first_name = new.first_name.clone();
            }
            if player.username.is_none() {
                player.username = new.username.clone();
            }
            return Ok((player.clone(), false));
        }

        let player = Player {
            id: state.next_id(),
            tg_id: new.tg_id,
            username: new.username.clone(),
            first_name: new.first_name.clone(),
        };
        state.players.insert(player.id, player.clone());
        Ok((player, true))
    }

    async fn get_or_create_balance(
        &self,
        chat_id: ChatId,
        player_id: PlayerId,
        initial: i64,
    ) -> StoreResult<Balance> {
        let mut state = self.state.lock().await;
        let balance = state
            .balances
            .entry((chat_id, player_id))
            .or_insert_with(|| Balance {
                chat_id,
                player_id,
                current_value: initial,
                max_value: initial,
                min_value: initial,
            });
        Ok(balance.clone())
    }

    async fn get_balance(
        &self,
        chat_id: ChatId,
        player_id: PlayerId,
    ) -> StoreResult<Option<Balance>> {
        let state = self.state.lock().await;
        Ok(state.balances.get(&(chat_id, player_id)).cloned())
    }

    async fn change_balance(
        &self,
        player_id: PlayerId,
        chat_id: ChatId,
        new_value: i64,
    ) -> StoreResult<Balance> {
        let mut state = self.state.lock().await;
        let balance = state
            .balances
            .get_mut(&(chat_id, player_id))
            .ok_or_else(|| {
                StoreError::not_found("Balance", format!("chat {chat_id} player {player_id}"))
            })?;
        balance.current_value = new_value;
        balance.max_value = balance.max_value.max(new_value);
        balance.min_value = balance.min_value.min(new_value);
        Ok(balance.clone())
    }

    async fn get_active_game(&self, chat_id: ChatId) -> StoreResult<Option<Game>> {
        let mut state = self.state.lock().await;
        Ok(state.active_game_mut(chat_id).map(|g| g.clone()))
    }

    async fn get_game(&self, game_id: GameId) -> StoreResult<Option<Game>> {
        let state = self.state.lock().await;
        Ok(state.games.get(&game_id).cloned())
    }

    async fn get_or_create_game(
        &self,
        chat_id: ChatId,
        dealer_cards: &[Card],
    ) -> StoreResult<(Game, bool)> {
        let mut state = self.state.lock().await;
        if let Some(game) = state.active_game_mut(chat_id) {
            return Ok((game.clone(), false));
        }

        let game = Game {
            id: state.next_id(),
            chat_id,
            created_at: Utc::now(),
            status: GameStatus::Active,
            stage: GameStage::WaitingForPlayersToJoin,
            dealer_cards: dealer_cards.to_vec(),
        };
        state.games.insert(game.id, game.clone());
        Ok((game, true))
    }

    async fn get_or_create_gameplay(
        &self,
        game_id: GameId,
        player_id: PlayerId,
    ) -> StoreResult<(GamePlay, bool)> {
        let mut state = self.state.lock().await;
        if !state.games.contains_key(&game_id) {
            return Err(StoreError::not_found("Game", game_id));
        }
        if let Some(gameplay) = state
            .gameplays
            .values()
            .find(|gp| gp.game_id == game_id && gp.player_id == player_id)
        {
            return Ok((gameplay.clone(), false));
        }

        let gameplay = GamePlay {
            id: state.next_id(),
            game_id,
            player_id,
            bet: BET_SENTINEL,
            status: PlayerStatus::Betting,
            cards: Vec::new(),
        };
        state.gameplays.insert(gameplay.id, gameplay.clone());
        Ok((gameplay, true))
    }

    async fn get_gameplay(
        &self,
        game_id: GameId,
        player_id: PlayerId,
    ) -> StoreResult<Option<GamePlay>> {
        let state = self.state.lock().await;
        Ok(state
            .gameplays
            .values()
            .find(|gp| gp.game_id == game_id && gp.player_id == player_id)
            .cloned())
    }

    async fn list_gameplays(&self, game_id: GameId) -> StoreResult<Vec<PlayerHand>> {
        let state = self.state.lock().await;
        state.check("list_gameplays")?;
        state
            .gameplays
            .values()
            .filter(|gp| gp.game_id == game_id)
            .map(|gp| {
                let player = state
                    .players
                    .get(&gp.player_id)
                    .ok_or_else(|| StoreError::not_found("Player", gp.player_id))?;
                Ok(PlayerHand {
                    gameplay: gp.clone(),
                    username: player.username.clone(),
                    first_name: player.first_name.clone(),
                })
            })
            .collect()
    }

    async fn change_game_stage(
        &self,
        chat_id: ChatId,
        from: GameStage,
        to: GameStage,
    ) -> StoreResult<Option<Game>> {
        let mut state = self.state.lock().await;
        Ok(state
            .active_game_mut(chat_id)
            .filter(|g| g.stage == from)
            .map(|g| {
                g.stage = to;
                g.clone()
            }))
    }

    async fn set_dealer_cards(&self, game_id: GameId, cards: &[Card]) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.check("set_dealer_cards")?;
        let game = state
            .games
            .get_mut(&game_id)
            .ok_or_else(|| StoreError::not_found("Game", game_id))?;
        game.dealer_cards = cards.to_vec();
        Ok(())
    }

    async fn finish_game(&self, game_id: GameId) -> StoreResult<Option<Game>> {
        let mut state = self.state.lock().await;
        state.check("finish_game")?;
        Ok(state
            .games
            .get_mut(&game_id)
            .filter(|g| g.status == GameStatus::Active)
            .map(|g| {
                g.status = GameStatus::Finished;
                g.clone()
            }))
    }

    async fn change_gameplay_fields(
        &self,
        id: GamePlayId,
        expected: PlayerStatus,
        update: &GamePlayUpdate,
    ) -> StoreResult<Option<GamePlay>> {
        let mut state = self.state.lock().await;
        Ok(state
            .gameplays
            .get_mut(&id)
            .filter(|gp| gp.status == expected)
            .map(|gp| {
                update.apply(gp);
                gp.clone()
            }))
    }

    async fn change_gameplay_fields_in_stage(
        &self,
        id: GamePlayId,
        expected: PlayerStatus,
        stage: GameStage,
        update: &GamePlayUpdate,
    ) -> StoreResult<Option<GamePlay>> {
        let mut state = self.state.lock().await;
        let State {
            games, gameplays, ..
        } = &mut *state;
        Ok(gameplays
            .get_mut(&id)
            .filter(|gp| gp.status == expected)
            .filter(|gp| {
                games
                    .get(&gp.game_id)
                    .is_some_and(|g| g.status == GameStatus::Active && g.stage == stage)
            })
            .map(|gp| {
                update.apply(gp);
                gp.clone()
            }))
    }

    async fn check_all_players_have_bet(
        &self,
        game_id: GameId,
        min_bet: i64,
    ) -> StoreResult<bool> {
        let state = self.state.lock().await;
        let mut gameplays = state
            .gameplays
            .values()
            .filter(|gp| gp.game_id == game_id)
            .peekable();
        if gameplays.peek().is_none() {
            return Ok(false);
        }
        Ok(gameplays.all(|gp| gp.bet >= min_bet))
    }

    async fn any_player_taking(&self, game_id: GameId) -> StoreResult<bool> {
        let state = self.state.lock().await;
        Ok(state
            .gameplays
            .values()
            .any(|gp| gp.game_id == game_id && gp.status == PlayerStatus::Taking))
    }

    async fn cancel_game_if_still_betting(&self, game_id: GameId) -> StoreResult<Option<Game>> {
        let mut state = self.state.lock().await;
        Ok(state
            .games
            .get_mut(&game_id)
            .filter(|g| g.status == GameStatus::Active && g.stage == GameStage::Betting)
            .map(|g| {
                g.status = GameStatus::Canceled;
                g.clone()
            }))
    }

    async fn interrupt_game(&self, game_id: GameId) -> StoreResult<Option<Game>> {
        let mut state = self.state.lock().await;
        Ok(state
            .games
            .get_mut(&game_id)
            .filter(|g| g.status == GameStatus::Active)
            .map(|g| {
                g.status = GameStatus::Interrupted;
                g.clone()
            }))
    }

    async fn interrupt_active_games(&self) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        let mut count = 0;
        for game in state
            .games
            .values_mut()
            .filter(|g| g.status == GameStatus::Active)
        {
            game.status = GameStatus::Interrupted;
            count += 1;
        }
        Ok(count)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
