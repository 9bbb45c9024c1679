//! The stage controller.
//!
//! Turns inbound actions into conditional store updates and chat messages,
//! starts the stage timers and hands finished rounds to the
//! [`RoundResolver`]. A controller keeps no game state of its own; every
//! decision is taken against the store, so clones are interchangeable.

use std::sync::Arc;

use super::{
    config::GameConfig,
    errors::{EngineError, EngineResult},
    resolver::{RoundResolver, RoundSummary},
    timers::{TimerKind, TimerRegistry},
};
use crate::{
    chat::messages::{ChatResponse, InboundUpdate},
    db::{Balance, ChatId, Game, GameId, GamePlay, GamePlayUpdate, GameStore, Player},
    dispatch::{MessageDispatcher, OutboundMessage, texts},
    game::{
        Action, ActionError, CardSource, GameStage, PlayerStatus,
        constants::INITIAL_HAND_SIZE,
        is_blackjack, is_bust, score_hand,
        state_machine::check_stage,
    },
};

#[derive(Clone)]
pub struct StageController {
    store: Arc<dyn GameStore>,
    dispatcher: Arc<dyn MessageDispatcher>,
    cards: Arc<dyn CardSource>,
    config: Arc<GameConfig>,
    timers: TimerRegistry,
    resolver: RoundResolver,
}

impl StageController {
    pub fn new(
        store: Arc<dyn GameStore>,
        dispatcher: Arc<dyn MessageDispatcher>,
        cards: Arc<dyn CardSource>,
        config: GameConfig,
    ) -> Self {
        let resolver = RoundResolver::new(store.clone(), dispatcher.clone(), cards.clone());
        Self {
            store,
            dispatcher,
            cards,
            config: Arc::new(config),
            timers: TimerRegistry::new(),
            resolver,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    pub fn store(&self) -> &Arc<dyn GameStore> {
        &self.store
    }

    /// Apply one update and report what happened. Rejections and failures
    /// are also announced in the chat.
    pub async fn handle_update(&self, update: &InboundUpdate) -> ChatResponse {
        let result = match Action::parse(&update.data) {
            Some(action) => self.apply(update, action).await,
            None => Err(ActionError::UnknownCommand.into()),
        };

        let Err(err) = result else {
            return ChatResponse::Applied;
        };

        if err.is_rejection() {
            log::debug!(
                "Chat {}: rejected {:?} from {}: {err}",
                update.chat_id,
                update.data,
                update.user.id
            );
        } else {
            log::error!(
                "Chat {}: failed to handle {:?} from {}: {err}",
                update.chat_id,
                update.data,
                update.user.id
            );
        }

        let message = err.client_message();
        self.send(texts::notice(update.chat_id, update.user.display_name(), &message))
            .await;

        if err.is_rejection() {
            ChatResponse::Rejected(message)
        } else {
            ChatResponse::Failed(message)
        }
    }

    async fn apply(&self, update: &InboundUpdate, action: Action) -> EngineResult<()> {
        match action {
            Action::Start => self.start(update.chat_id).await,
            Action::NewGame => self.new_game(update).await,
            Action::Join => self.join(update).await,
            Action::Bet(amount) => self.bet(update, amount).await,
            Action::TakeCard => self.take_card(update).await,
            Action::Stand => self.stand(update).await,
        }
    }

    /// Deliver a message. A failed delivery is logged and never stops the
    /// transition that produced it.
    async fn send(&self, message: OutboundMessage) {
        let chat_id = message.chat_id;
        if let Err(err) = self.dispatcher.send(message).await {
            log::warn!("Chat {chat_id}: could not deliver message: {err}");
        }
    }

    /// Register the sender and make sure they have a balance in this chat.
    async fn register(&self, update: &InboundUpdate) -> EngineResult<(Player, Balance)> {
        let (player, created) = self
            .store
            .get_or_create_player(&update.user.to_new_player())
            .await?;
        if created {
            log::info!("Registered player {} (tg {})", player.id, player.tg_id);
        }
        let balance = self
            .store
            .get_or_create_balance(update.chat_id, player.id, self.config.starting_balance)
            .await?;
        Ok((player, balance))
    }

    async fn active_game(&self, chat_id: ChatId) -> EngineResult<Game> {
        self.store
            .get_active_game(chat_id)
            .await?
            .ok_or_else(|| ActionError::NoActiveGame.into())
    }

    /// The active game and the sender's gameplay in it, provided the game is
    /// in the stage `action` needs.
    async fn current_gameplay(
        &self,
        update: &InboundUpdate,
        action: Action,
    ) -> EngineResult<(Game, GamePlay, Balance)> {
        let game = self.active_game(update.chat_id).await?;
        check_stage(action, game.stage)?;
        let (player, balance) = self.register(update).await?;
        let gameplay = self
            .store
            .get_gameplay(game.id, player.id)
            .await?
            .ok_or(ActionError::NotAPlayer)?;
        Ok((game, gameplay, balance))
    }

    /// Explain why a player's conditional update matched nothing: the game
    /// ended or moved to another stage, or else the gameplay itself changed.
    async fn lost_update(
        &self,
        chat_id: ChatId,
        action: Action,
        otherwise: ActionError,
    ) -> EngineError {
        match self.store.get_active_game(chat_id).await {
            Ok(None) => ActionError::NoActiveGame.into(),
            Ok(Some(game)) => check_stage(action, game.stage)
                .err()
                .unwrap_or(otherwise)
                .into(),
            Err(err) => err.into(),
        }
    }

    /// `/start`: greet the chat and offer a new game if none is running.
    pub async fn start(&self, chat_id: ChatId) -> EngineResult<()> {
        let message = match self.store.get_active_game(chat_id).await? {
            Some(_) => texts::welcome_game_running(chat_id, &self.config.rules_url),
            None => texts::welcome(chat_id, &self.config.rules_url),
        };
        self.send(message).await;
        Ok(())
    }

    /// Create a game with one open dealer card and seat the sender in it.
    pub async fn new_game(&self, update: &InboundUpdate) -> EngineResult<()> {
        let chat_id = update.chat_id;
        if self.store.get_active_game(chat_id).await?.is_some() {
            return Err(ActionError::GameInProgress.into());
        }

        let (player, _) = self.register(update).await?;
        let dealer_cards = vec![self.cards.draw()];
        let (game, created) = self.store.get_or_create_game(chat_id, &dealer_cards).await?;
        if !created {
            return Err(ActionError::GameInProgress.into());
        }
        self.store.get_or_create_gameplay(game.id, player.id).await?;
        log::info!("Game {} created in chat {chat_id}", game.id);
        self.schedule_join_window(&game);

        self.send(texts::join_prompt(chat_id, self.config.join_window))
            .await;
        self.send(texts::joined(chat_id, player.display_name()))
            .await;
        Ok(())
    }

    pub async fn join(&self, update: &InboundUpdate) -> EngineResult<()> {
        let game = self.active_game(update.chat_id).await?;
        check_stage(Action::Join, game.stage)?;

        let (player, _) = self.register(update).await?;
        let (_, created) = self.store.get_or_create_gameplay(game.id, player.id).await?;
        if created {
            log::debug!("Game {}: player {} joined", game.id, player.id);
            self.send(texts::joined(update.chat_id, player.display_name()))
                .await;
        }
        Ok(())
    }

    /// Place the sender's bet and deal their two cards. A two-card 21 stands
    /// immediately. The last bet opens the player stage.
    pub async fn bet(&self, update: &InboundUpdate, amount: i64) -> EngineResult<()> {
        if !self.config.is_bet_option(amount) || amount < self.config.min_bet {
            return Err(ActionError::InvalidBet(amount).into());
        }

        let (game, gameplay, balance) = self.current_gameplay(update, Action::Bet(amount)).await?;
        if gameplay.status != PlayerStatus::Betting {
            return Err(ActionError::AlreadyBet.into());
        }
        if amount > balance.current_value {
            return Err(ActionError::InsufficientBalance {
                available: balance.current_value,
                required: amount,
            }
            .into());
        }

        let cards: Vec<_> = (0..INITIAL_HAND_SIZE).map(|_| self.cards.draw()).collect();
        let blackjack = is_blackjack(score_hand(&cards));
        let status = if blackjack {
            PlayerStatus::Standing
        } else {
            PlayerStatus::Taking
        };
        debug_assert!(gameplay.status.can_transition_to(status));

        let update_fields = GamePlayUpdate::status(status)
            .with_bet(amount)
            .with_cards(cards);
        let Some(gameplay) = self
            .store
            .change_gameplay_fields_in_stage(
                gameplay.id,
                PlayerStatus::Betting,
                GameStage::Betting,
                &update_fields,
            )
            .await?
        else {
            return Err(self
                .lost_update(game.chat_id, Action::Bet(amount), ActionError::AlreadyBet)
                .await);
        };

        let name = update.user.display_name();
        self.send(texts::bet_placed(game.chat_id, name, amount))
            .await;
        if blackjack {
            self.send(texts::blackjack(game.chat_id, name, &gameplay.cards))
                .await;
        }

        if self
            .store
            .check_all_players_have_bet(game.id, self.config.min_bet)
            .await?
        {
            self.begin_player_hits(game.chat_id).await?;
        }
        Ok(())
    }

    pub async fn take_card(&self, update: &InboundUpdate) -> EngineResult<()> {
        let (game, gameplay, _) = self.current_gameplay(update, Action::TakeCard).await?;
        if gameplay.status != PlayerStatus::Taking {
            return Err(ActionError::WrongStatus.into());
        }

        let mut cards = gameplay.cards.clone();
        cards.push(self.cards.draw());
        let exceeded = is_bust(score_hand(&cards));
        let status = if exceeded {
            PlayerStatus::Exceeded
        } else {
            PlayerStatus::Taking
        };

        let Some(gameplay) = self
            .store
            .change_gameplay_fields_in_stage(
                gameplay.id,
                PlayerStatus::Taking,
                GameStage::PlayerHit,
                &GamePlayUpdate::status(status).with_cards(cards),
            )
            .await?
        else {
            return Err(self
                .lost_update(game.chat_id, Action::TakeCard, ActionError::WrongStatus)
                .await);
        };

        let name = update.user.display_name();
        let message = if exceeded {
            texts::exceeded(game.chat_id, name, &gameplay.cards)
        } else {
            texts::took_card(game.chat_id, name, &gameplay.cards)
        };
        self.send(message).await;

        self.after_player_move(&game).await.map(drop)
    }

    pub async fn stand(&self, update: &InboundUpdate) -> EngineResult<()> {
        let (game, gameplay, _) = self.current_gameplay(update, Action::Stand).await?;
        if gameplay.status != PlayerStatus::Taking {
            return Err(ActionError::WrongStatus.into());
        }

        let Some(gameplay) = self
            .store
            .change_gameplay_fields_in_stage(
                gameplay.id,
                PlayerStatus::Taking,
                GameStage::PlayerHit,
                &GamePlayUpdate::status(PlayerStatus::Standing),
            )
            .await?
        else {
            return Err(self
                .lost_update(game.chat_id, Action::Stand, ActionError::WrongStatus)
                .await);
        };

        self.send(texts::stood(
            game.chat_id,
            update.user.display_name(),
            &gameplay.cards,
        ))
        .await;

        self.after_player_move(&game).await.map(drop)
    }

    /// BETTING -> PLAYERHIT, then show every hand. Loses silently to a bet
    /// timer that cancelled the game first.
    async fn begin_player_hits(&self, chat_id: ChatId) -> EngineResult<()> {
        let Some(game) = self
            .store
            .change_game_stage(chat_id, GameStage::Betting, GameStage::PlayerHit)
            .await?
        else {
            log::debug!("Chat {chat_id}: betting already closed");
            return Ok(());
        };
        self.timers.cancel(game.id, TimerKind::BetWindow);
        log::info!("Game {}: all bets placed", game.id);

        match self.store.list_gameplays(game.id).await {
            Ok(hands) => {
                self.send(texts::hands_dealt(chat_id, &hands, &game.dealer_cards))
                    .await
            }
            Err(err) => log::error!("Game {}: could not list hands: {err}", game.id),
        }

        // Everyone may have stood on a blackjack already.
        self.after_player_move(&game).await.map(drop)
    }

    /// Resolve the round once nobody is taking cards any more.
    async fn after_player_move(&self, game: &Game) -> EngineResult<Option<RoundSummary>> {
        if self.store.any_player_taking(game.id).await? {
            return Ok(None);
        }
        self.finish_round(game.chat_id).await
    }

    async fn finish_round(&self, chat_id: ChatId) -> EngineResult<Option<RoundSummary>> {
        let Some(game) = self
            .store
            .change_game_stage(chat_id, GameStage::PlayerHit, GameStage::DillerHit)
            .await?
        else {
            return Ok(None);
        };

        let summary = self.resolver.resolve(&game).await;
        self.timers.cancel_game(game.id);
        if let Err(err) = &summary {
            log::error!("Game {}: resolution failed: {err}", game.id);
            match self.store.interrupt_game(game.id).await {
                Ok(Some(_)) => log::warn!("Game {}: marked interrupted", game.id),
                Ok(None) => {}
                Err(interrupt_err) => {
                    log::error!("Game {}: could not mark interrupted: {interrupt_err}", game.id)
                }
            }
        }
        summary
    }

    fn schedule_join_window(&self, game: &Game) {
        let controller = self.clone();
        let (game_id, chat_id) = (game.id, game.chat_id);
        self.timers.schedule(
            game_id,
            TimerKind::JoinWindow,
            self.config.join_window,
            move || async move { controller.on_join_window_elapsed(chat_id, game_id).await },
        );
    }

    fn schedule_bet_window(&self, game_id: GameId) {
        let controller = self.clone();
        self.timers.schedule(
            game_id,
            TimerKind::BetWindow,
            self.config.bet_window,
            move || async move { controller.on_bet_window_elapsed(game_id).await },
        );
    }

    /// Join window over: open betting for everyone who joined.
    pub async fn on_join_window_elapsed(
        &self,
        chat_id: ChatId,
        game_id: GameId,
    ) -> EngineResult<()> {
        let Some(game) = self
            .store
            .change_game_stage(chat_id, GameStage::WaitingForPlayersToJoin, GameStage::Betting)
            .await?
        else {
            log::debug!("Game {game_id}: join window closed on a game no longer waiting");
            return Ok(());
        };
        if game.id != game_id {
            log::warn!("Game {game_id}: join timer advanced game {} instead", game.id);
        }

        self.schedule_bet_window(game.id);

        let hands = self.store.list_gameplays(game.id).await?;
        let names: Vec<&str> = hands.iter().map(|h| h.display_name()).collect();
        log::info!("Game {}: betting open for {} player(s)", game.id, names.len());
        self.send(texts::bet_prompt(chat_id, &names, &self.config.bet_options))
            .await;
        Ok(())
    }

    /// Bet window over: cancel the game if it is still waiting on bets.
    pub async fn on_bet_window_elapsed(&self, game_id: GameId) -> EngineResult<()> {
        if let Some(game) = self.store.cancel_game_if_still_betting(game_id).await? {
            log::info!("Game {game_id}: canceled, not every player bet in time");
            self.send(texts::canceled_no_bets(game.chat_id)).await;
        }
        Ok(())
    }
}
