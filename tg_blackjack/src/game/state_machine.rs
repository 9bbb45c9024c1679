//! Game stage machine rules.
//!
//! A game moves through [`GameStage`]s in a fixed order. Which inbound
//! [`Action`] is legal depends on the stage, and each player's gameplay
//! moves through [`PlayerStatus`]es that only ever go forward. Nothing in
//! here touches the store; the controller consults these rules before it
//! issues conditional updates.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Lifecycle status of a game row.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Active,
    Finished,
    /// Left active by a previous process whose timers were lost.
    Interrupted,
    /// Betting window expired before everyone placed a bet.
    Canceled,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Finished => "finished",
            Self::Interrupted => "interrupted",
            Self::Canceled => "canceled",
        }
    }
}

/// Current phase of an active game.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStage {
    WaitingForPlayersToJoin,
    Betting,
    PlayerHit,
    DillerHit,
    Summarizing,
}

impl GameStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WaitingForPlayersToJoin => "waiting_for_players_to_join",
            Self::Betting => "betting",
            Self::PlayerHit => "playerhit",
            Self::DillerHit => "dillerhit",
            Self::Summarizing => "summarizing",
        }
    }

    /// The stage that follows this one, if any.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::WaitingForPlayersToJoin => Some(Self::Betting),
            Self::Betting => Some(Self::PlayerHit),
            Self::PlayerHit => Some(Self::DillerHit),
            Self::DillerHit => Some(Self::Summarizing),
            Self::Summarizing => None,
        }
    }

    pub fn can_advance_to(&self, to: Self) -> bool {
        self.next() == Some(to)
    }
}

/// Status of one player's participation in a game.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    Betting,
    Taking,
    Standing,
    Exceeded,
    Lost,
    Won,
    Tie,
}

impl PlayerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Betting => "betting",
            Self::Taking => "taking",
            Self::Standing => "standing",
            Self::Exceeded => "exceeded",
            Self::Lost => "lost",
            Self::Won => "won",
            Self::Tie => "tie",
        }
    }

    /// Whether a gameplay may move from `self` to `to`.
    ///
    /// `Taking -> Taking` is the take-card self loop. Nothing ever returns
    /// to `Taking` from another status.
    pub fn can_transition_to(&self, to: Self) -> bool {
        use PlayerStatus::*;
        matches!(
            (self, to),
            (Betting, Taking)
                | (Betting, Standing)
                | (Taking, Taking)
                | (Taking, Standing)
                | (Taking, Exceeded)
                | (Standing, Won)
                | (Standing, Lost)
                | (Standing, Tie)
        )
    }

    /// Final statuses are never changed again.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Exceeded | Self::Lost | Self::Won | Self::Tie)
    }
}

macro_rules! impl_db_enum {
    ($ty:ty, [$($variant:expr),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                [$($variant),+]
                    .into_iter()
                    .find(|v: &$ty| v.as_str() == s)
                    .ok_or_else(|| UnknownVariant(s.to_string()))
            }
        }
    };
}

impl_db_enum!(
    GameStatus,
    [
        GameStatus::Active,
        GameStatus::Finished,
        GameStatus::Interrupted,
        GameStatus::Canceled,
    ]
);
impl_db_enum!(
    GameStage,
    [
        GameStage::WaitingForPlayersToJoin,
        GameStage::Betting,
        GameStage::PlayerHit,
        GameStage::DillerHit,
        GameStage::Summarizing,
    ]
);
impl_db_enum!(
    PlayerStatus,
    [
        PlayerStatus::Betting,
        PlayerStatus::Taking,
        PlayerStatus::Standing,
        PlayerStatus::Exceeded,
        PlayerStatus::Lost,
        PlayerStatus::Won,
        PlayerStatus::Tie,
    ]
);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown variant {0:?}")]
pub struct UnknownVariant(pub String);

/// Callback data carried by the bot's inline buttons.
pub mod callbacks {
    pub const JOIN_GAME: &str = "join_new_game";
    pub const ADD_PLAYER: &str = "add_player";
    pub const BET_PREFIX: &str = "make_bet_";
    pub const TAKE_CARD: &str = "take_card";
    pub const STOP_TAKING: &str = "stop_taking";
    pub const START_COMMAND: &str = "/start";
}

/// Something a chat member asked the bot to do.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Action {
    /// The `/start` command.
    Start,
    /// "Start a new game" button.
    NewGame,
    /// "Join the game" button.
    Join,
    /// A bet button.
    Bet(i64),
    TakeCard,
    Stand,
}

impl Action {
    /// Parse callback data or command text. Commands may carry a bot
    /// mention suffix (`/start@SomeBot`).
    pub fn parse(data: &str) -> Option<Self> {
        let data = data.trim();
        let command = data.split('@').next().unwrap_or(data);
        match data {
            callbacks::JOIN_GAME => Some(Self::NewGame),
            callbacks::ADD_PLAYER => Some(Self::Join),
            callbacks::TAKE_CARD => Some(Self::TakeCard),
            callbacks::STOP_TAKING => Some(Self::Stand),
            _ if command == callbacks::START_COMMAND => Some(Self::Start),
            _ => data
                .strip_prefix(callbacks::BET_PREFIX)
                .and_then(|amount| amount.parse().ok())
                .map(Self::Bet),
        }
    }

    /// Callback data for this action's button.
    pub fn callback_data(&self) -> String {
        match self {
            Self::Start => callbacks::START_COMMAND.to_string(),
            Self::NewGame => callbacks::JOIN_GAME.to_string(),
            Self::Join => callbacks::ADD_PLAYER.to_string(),
            Self::Bet(amount) => format!("{}{amount}", callbacks::BET_PREFIX),
            Self::TakeCard => callbacks::TAKE_CARD.to_string(),
            Self::Stand => callbacks::STOP_TAKING.to_string(),
        }
    }

    /// Stage an active game must be in for this action to be legal.
    /// `None` means the action does not act on a running game.
    pub fn required_stage(&self) -> Option<GameStage> {
        match self {
            Self::Start | Self::NewGame => None,
            Self::Join => Some(GameStage::WaitingForPlayersToJoin),
            Self::Bet(_) => Some(GameStage::Betting),
            Self::TakeCard | Self::Stand => Some(GameStage::PlayerHit),
        }
    }
}

/// Reasons an action is rejected. All of them are expected during play and
/// are reported back to the chat; none of them changes any state.
#[derive(Debug, Clone, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum ActionError {
    #[error("this button does not match the current stage of the game")]
    WrongStage,
    #[error("you are not playing in the current game")]
    NotAPlayer,
    #[error("you can't do that right now")]
    WrongStatus,
    #[error("you have already placed a bet")]
    AlreadyBet,
    #[error("{0} is not an available bet")]
    InvalidBet(i64),
    #[error("not enough points: balance {available}, bet {required}")]
    InsufficientBalance { available: i64, required: i64 },
    #[error("no game is running; send /start and press \"Start a new game\"")]
    NoActiveGame,
    #[error("a game is already running in this chat; please wait for it to finish")]
    GameInProgress,
    #[error("unknown command")]
    UnknownCommand,
}

/// Check that `action` is legal while the game is in `stage`.
pub fn check_stage(action: Action, stage: GameStage) -> Result<(), ActionError> {
    match action.required_stage() {
        Some(required) if required == stage => Ok(()),
        // Late joiners are told to wait rather than that they pressed the
        // wrong button.
        Some(_) if action == Action::Join => Err(ActionError::GameInProgress),
        Some(_) => Err(ActionError::WrongStage),
        None => Ok(()),
    }
}
