//! Persisted game data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::{Card, GameStage, GameStatus, PlayerStatus};

/// Telegram chat id. Group chats are negative.
pub type ChatId = i64;

/// Row id of a [`Player`].
pub type PlayerId = i64;

/// Row id of a [`Game`].
pub type GameId = i64;

/// Row id of a [`GamePlay`].
pub type GamePlayId = i64;

/// A Telegram user that has interacted with the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    /// Telegram user id.
    pub tg_id: i64,
    pub username: Option<String>,
    pub first_name: String,
}

impl Player {
    pub fn display_name(&self) -> &str {
        if self.first_name.is_empty() {
            self.username.as_deref().unwrap_or("player")
        } else {
            &self.first_name
        }
    }
}

/// Fields needed to register a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPlayer {
    pub tg_id: i64,
    pub username: Option<String>,
    pub first_name: String,
}

/// A player's points in one chat, with the highest and lowest values the
/// balance has ever reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub chat_id: ChatId,
    pub player_id: PlayerId,
    pub current_value: i64,
    pub max_value: i64,
    pub min_value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub chat_id: ChatId,
    pub created_at: DateTime<Utc>,
    pub status: GameStatus,
    pub stage: GameStage,
    pub dealer_cards: Vec<Card>,
}

/// One player's participation in one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePlay {
    pub id: GamePlayId,
    pub game_id: GameId,
    pub player_id: PlayerId,
    pub bet: i64,
    pub status: PlayerStatus,
    pub cards: Vec<Card>,
}

/// A gameplay joined with its player's names, for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerHand {
    pub gameplay: GamePlay,
    pub username: Option<String>,
    pub first_name: String,
}

impl PlayerHand {
    pub fn display_name(&self) -> &str {
        if self.first_name.is_empty() {
            self.username.as_deref().unwrap_or("player")
        } else {
            &self.first_name
        }
    }
}

/// Partial update of a gameplay. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GamePlayUpdate {
    pub bet: Option<i64>,
    pub status: Option<PlayerStatus>,
    pub cards: Option<Vec<Card>>,
}

impl GamePlayUpdate {
    pub fn status(status: PlayerStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_cards(mut self, cards: Vec<Card>) -> Self {
        self.cards = Some(cards);
        self
    }

    pub fn with_bet(mut self, bet: i64) -> Self {
        self.bet = Some(bet);
        self
    }

    /// Apply to an in-memory gameplay.
    pub fn apply(&self, gameplay: &mut GamePlay) {
        if let Some(bet) = self.bet {
            gameplay.bet = bet;
        }
        if let Some(status) = self.status {
            gameplay.status = status;
        }
        if let Some(cards) = &self.cards {
            gameplay.cards = cards.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_username() {
        let mut player = Player {
            id: 1,
            tg_id: 42,
            username: Some("ace".to_string()),
            first_name: String::new(),
        };
        assert_eq!(player.display_name(), "ace");
        player.first_name = "Alice".to_string();
        assert_eq!(player.display_name(), "Alice");
    }

    #[test]
    fn test_update_only_touches_set_fields() {
        let mut gameplay = GamePlay {
            id: 1,
            game_id: 1,
            player_id: 1,
            bet: 1,
            status: PlayerStatus::Betting,
            cards: Vec::new(),
        };
        let cards: Vec<Card> = vec!["A♠".parse().unwrap(), "K♦".parse().unwrap()];
        GamePlayUpdate::status(PlayerStatus::Standing)
            .with_bet(25)
            .with_cards(cards.clone())
            .apply(&mut gameplay);
        assert_eq!(gameplay.bet, 25);
        assert_eq!(gameplay.status, PlayerStatus::Standing);
        assert_eq!(gameplay.cards, cards);

        GamePlayUpdate::default().apply(&mut gameplay);
        assert_eq!(gameplay.bet, 25);
    }
}
