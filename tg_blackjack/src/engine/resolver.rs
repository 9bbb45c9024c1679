//! Dealer play and settlement.

use serde::Serialize;
use std::sync::Arc;

use super::errors::EngineResult;
use crate::{
    db::{ChatId, Game, GameId, GamePlayUpdate, GameStore, PlayerHand, PlayerId, StoreError},
    dispatch::{MessageDispatcher, texts},
    game::{
        Card, CardSource, GameStage, GameStatus, Outcome, PlayerStatus, dealer_play, score_hand,
        settle,
    },
};

/// How one player's round was settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerResult {
    pub player_id: PlayerId,
    pub name: String,
    pub cards: Vec<Card>,
    pub score: u32,
    pub outcome: Outcome,
    pub bet: i64,
    /// Balance after settlement, `None` if it could not be recorded.
    pub balance: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundSummary {
    pub game_id: GameId,
    pub dealer_cards: Vec<Card>,
    pub dealer_score: u32,
    pub results: Vec<PlayerResult>,
}

/// Plays the dealer's hand and settles every player's bet.
#[derive(Clone)]
pub struct RoundResolver {
    store: Arc<dyn GameStore>,
    dispatcher: Arc<dyn MessageDispatcher>,
    cards: Arc<dyn CardSource>,
}

impl RoundResolver {
    pub fn new(
        store: Arc<dyn GameStore>,
        dispatcher: Arc<dyn MessageDispatcher>,
        cards: Arc<dyn CardSource>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            cards,
        }
    }

    /// Resolve a game that has just entered the dealer stage.
    ///
    /// The dealer's hand is stored while the game is still in DILLERHIT and
    /// only then does it move on to SUMMARIZING. Returns `None` if the game
    /// had already left the dealer stage. An error leaves the game active;
    /// the caller decides what becomes of it.
    pub async fn resolve(&self, game: &Game) -> EngineResult<Option<RoundSummary>> {
        let game = match self.store.get_game(game.id).await? {
            Some(game)
                if game.status == GameStatus::Active && game.stage == GameStage::DillerHit =>
            {
                game
            }
            _ => {
                log::warn!("Game {}: left the dealer stage before resolution", game.id);
                return Ok(None);
            }
        };

        let (dealer_cards, dealer_score) = dealer_play(&game.dealer_cards, self.cards.as_ref());
        self.store.set_dealer_cards(game.id, &dealer_cards).await?;

        let Some(game) = self
            .store
            .change_game_stage(game.chat_id, GameStage::DillerHit, GameStage::Summarizing)
            .await?
        else {
            log::warn!("Game {}: left the dealer stage during resolution", game.id);
            return Ok(None);
        };

        let hands = self.store.list_gameplays(game.id).await?;
        let mut results = Vec::with_capacity(hands.len());
        for hand in &hands {
            let gameplay = &hand.gameplay;
            let exceeded = match gameplay.status {
                PlayerStatus::Exceeded => true,
                PlayerStatus::Standing => false,
                other => {
                    log::warn!(
                        "Game {}: skipping gameplay {} in status {other}",
                        game.id,
                        gameplay.id
                    );
                    continue;
                }
            };
            let score = score_hand(&gameplay.cards);
            let outcome = settle(score, exceeded, dealer_score);

            let balance = match self.record(game.chat_id, hand, outcome).await {
                Ok(balance) => Some(balance),
                Err(err) => {
                    log::error!(
                        "Game {}: failed to settle player {}: {err}",
                        game.id,
                        gameplay.player_id
                    );
                    None
                }
            };

            results.push(PlayerResult {
                player_id: gameplay.player_id,
                name: hand.display_name().to_string(),
                cards: gameplay.cards.clone(),
                score,
                outcome,
                bet: gameplay.bet,
                balance,
            });
        }

        self.store.finish_game(game.id).await?;
        log::info!(
            "Game {} finished in chat {}: dealer {dealer_score}, {} player(s)",
            game.id,
            game.chat_id,
            results.len()
        );

        let lines: Vec<String> = results
            .iter()
            .map(|result| {
                texts::result_line(
                    &result.name,
                    result.outcome,
                    &result.cards,
                    result.bet,
                    result.balance,
                )
            })
            .collect();
        let results_message = texts::results(game.chat_id, &lines, &dealer_cards, dealer_score);
        if let Err(err) = self.dispatcher.send(results_message).await {
            log::warn!("Game {}: could not deliver results: {err}", game.id);
        }

        Ok(Some(RoundSummary {
            game_id: game.id,
            dealer_cards,
            dealer_score,
            results,
        }))
    }

    /// Persist one player's outcome and return their new balance.
    async fn record(
        &self,
        chat_id: ChatId,
        hand: &PlayerHand,
        outcome: Outcome,
    ) -> Result<i64, StoreError> {
        let gameplay = &hand.gameplay;
        if let Some(status) = outcome.final_status() {
            let updated = self
                .store
                .change_gameplay_fields(
                    gameplay.id,
                    PlayerStatus::Standing,
                    &GamePlayUpdate::status(status),
                )
                .await?;
            if updated.is_none() {
                log::warn!("Gameplay {}: no longer standing at settlement", gameplay.id);
            }
        }

        let balance = self
            .store
            .get_balance(chat_id, gameplay.player_id)
            .await?
            .ok_or_else(|| {
                StoreError::not_found(
                    "Balance",
                    format!("chat {chat_id} player {}", gameplay.player_id),
                )
            })?;

        let delta = outcome.delta(gameplay.bet);
        if delta == 0 {
            return Ok(balance.current_value);
        }
        let balance = self
            .store
            .change_balance(gameplay.player_id, chat_id, balance.current_value + delta)
            .await?;
        Ok(balance.current_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{InMemoryGameStore, NewPlayer},
        dispatch::ChannelDispatcher,
        game::ScriptedCards,
    };

    const CHAT: ChatId = -7;

    fn cards(tokens: &[&str]) -> Vec<Card> {
        tokens.iter().map(|t| t.parse().unwrap()).collect()
    }

    /// Seat a player with a balance of 1000 and apply `update` to their
    /// fresh gameplay.
    async fn seat(store: &InMemoryGameStore, game: &Game, tg_id: i64, update: GamePlayUpdate) {
        let (player, _) = store
            .get_or_create_player(&NewPlayer {
                tg_id,
                username: None,
                first_name: format!("P{tg_id}"),
            })
            .await
            .unwrap();
        store.get_or_create_balance(CHAT, player.id, 1000).await.unwrap();
        let (gameplay, _) = store.get_or_create_gameplay(game.id, player.id).await.unwrap();
        store
            .change_gameplay_fields(gameplay.id, PlayerStatus::Betting, &update)
            .await
            .unwrap()
            .unwrap();
    }

    async fn dealer_stage_game(store: &InMemoryGameStore, dealer: &[&str]) -> Game {
        let (game, _) = store.get_or_create_game(CHAT, &cards(dealer)).await.unwrap();
        game
    }

    async fn advance_to_dealer(store: &InMemoryGameStore) -> Game {
        let path = [
            GameStage::WaitingForPlayersToJoin,
            GameStage::Betting,
            GameStage::PlayerHit,
            GameStage::DillerHit,
        ];
        let mut game = None;
        for pair in path.windows(2) {
            game = store.change_game_stage(CHAT, pair[0], pair[1]).await.unwrap();
        }
        game.unwrap()
    }

    fn resolver(store: Arc<InMemoryGameStore>, draws: &[&str]) -> RoundResolver {
        let (dispatcher, _outbox) = ChannelDispatcher::new(16);
        RoundResolver::new(
            store,
            Arc::new(dispatcher),
            Arc::new(ScriptedCards::from_tokens(draws)),
        )
    }

    #[tokio::test]
    async fn test_resolve_settles_each_player_once() {
        let store = Arc::new(InMemoryGameStore::new());
        let game = dealer_stage_game(&store, &["10♠"]).await;
        let standing = |tokens: &[&str], bet| {
            GamePlayUpdate::status(PlayerStatus::Standing)
                .with_bet(bet)
                .with_cards(cards(tokens))
        };
        seat(&store, &game, 1, standing(&["10♥", "10♣"], 50)).await;
        seat(&store, &game, 2, standing(&["9♥", "9♣"], 10)).await;
        let game = advance_to_dealer(&store).await;

        // The dispatcher's receiver is gone; the round is settled anyway.
        let resolver = resolver(store.clone(), &["8♦"]);
        let summary = resolver.resolve(&game).await.unwrap().unwrap();
        assert_eq!(summary.dealer_score, 18);
        assert_eq!(summary.results.len(), 2);

        let game = store.get_game(game.id).await.unwrap().unwrap();
        assert_eq!(game.status, GameStatus::Finished);
        assert_eq!(game.dealer_cards, cards(&["10♠", "8♦"]));

        let hands = store.list_gameplays(game.id).await.unwrap();
        assert_eq!(hands[0].gameplay.status, PlayerStatus::Won);
        assert_eq!(hands[1].gameplay.status, PlayerStatus::Tie);
        let first = store
            .get_balance(CHAT, hands[0].gameplay.player_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.current_value, 1050);
        assert_eq!(first.max_value, 1050);

        // A second resolution finds the game already past the dealer stage.
        let again = resolver.resolve(&game).await.unwrap();
        assert!(again.is_none());
        let first = store
            .get_balance(CHAT, hands[0].gameplay.player_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.current_value, 1050);
    }

    #[tokio::test]
    async fn test_resolve_returns_summary_and_skips_unsettled_gameplays() {
        let store = Arc::new(InMemoryGameStore::new());
        let game = dealer_stage_game(&store, &["5♠"]).await;
        seat(
            &store,
            &game,
            1,
            GamePlayUpdate::status(PlayerStatus::Standing)
                .with_bet(25)
                .with_cards(cards(&["10♥", "7♣"])),
        )
        .await;
        // Joined too late to bet.
        seat(&store, &game, 2, GamePlayUpdate::default()).await;
        let game = advance_to_dealer(&store).await;

        let (dispatcher, mut outbox) = ChannelDispatcher::new(16);
        let resolver = RoundResolver::new(
            store.clone(),
            Arc::new(dispatcher),
            Arc::new(ScriptedCards::from_tokens(&["6♦", "K♣"])),
        );
        let summary = resolver.resolve(&game).await.unwrap().unwrap();

        // 5 + 6 = 11, + K = 21
        assert_eq!(summary.dealer_score, 21);
        assert_eq!(summary.results.len(), 1);
        let result = &summary.results[0];
        assert_eq!(result.outcome, Outcome::Lost);
        assert_eq!(result.score, 17);
        assert_eq!(result.balance, Some(975));

        let message = outbox.recv().await.unwrap();
        assert!(message.text.contains("P1 (10♥, 7♣, 17) loses 25; balance: 975"));
        assert!(!message.text.contains("P2"));
    }

    #[tokio::test]
    async fn test_failed_dealer_write_leaves_game_in_dealer_stage() {
        let store = Arc::new(InMemoryGameStore::new());
        let game = dealer_stage_game(&store, &["10♠"]).await;
        seat(
            &store,
            &game,
            1,
            GamePlayUpdate::status(PlayerStatus::Standing)
                .with_bet(25)
                .with_cards(cards(&["10♥", "9♣"])),
        )
        .await;
        let game = advance_to_dealer(&store).await;
        store.fail_operation("set_dealer_cards").await;

        let resolver = resolver(store.clone(), &["7♦"]);
        let result = resolver.resolve(&game).await;
        assert!(matches!(result, Err(crate::engine::EngineError::Store(_))));

        let game = store.get_game(game.id).await.unwrap().unwrap();
        assert_eq!(game.status, GameStatus::Active);
        assert_eq!(game.stage, GameStage::DillerHit);
        let hands = store.list_gameplays(game.id).await.unwrap();
        assert_eq!(hands[0].gameplay.status, PlayerStatus::Standing);
    }
}
