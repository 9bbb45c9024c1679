use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    collections::VecDeque,
    fmt,
    str::FromStr,
    sync::{LazyLock, Mutex},
};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Suit {
    Club,
    Spade,
    Diamond,
    Heart,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Club, Suit::Spade, Suit::Diamond, Suit::Heart];

    fn symbol(self) -> char {
        match self {
            Self::Club => '♣',
            Self::Spade => '♠',
            Self::Diamond => '♦',
            Self::Heart => '♥',
        }
    }

    fn from_symbol(c: char) -> Option<Self> {
        match c {
            '♣' => Some(Self::Club),
            '♠' => Some(Self::Spade),
            '♦' => Some(Self::Diamond),
            '♥' => Some(Self::Heart),
            _ => None,
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    /// Points the rank is worth. Aces count as 11 here; hand scoring
    /// discounts them when the hand would otherwise bust.
    pub fn value(self) -> u32 {
        match self {
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
            Self::Nine => 9,
            Self::Ten | Self::Jack | Self::Queen | Self::King => 10,
            Self::Ace => 11,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Two => "2",
            Self::Three => "3",
            Self::Four => "4",
            Self::Five => "5",
            Self::Six => "6",
            Self::Seven => "7",
            Self::Eight => "8",
            Self::Nine => "9",
            Self::Ten => "10",
            Self::Jack => "J",
            Self::Queen => "Q",
            Self::King => "K",
            Self::Ace => "A",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A playing card. Its string form (`"A♠"`, `"10♥"`) is the token stored
/// in the database and shown in chat.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Card(pub Rank, pub Suit);

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Self(rank, suit)
    }

    pub fn rank(&self) -> Rank {
        self.0
    }

    pub fn suit(&self) -> Suit {
        self.1
    }

    pub fn value(&self) -> u32 {
        self.0.value()
    }

    pub fn is_ace(&self) -> bool {
        self.0 == Rank::Ace
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.0, self.1)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid card token {0:?}")]
pub struct CardParseError(pub String);

impl FromStr for Card {
    type Err = CardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || CardParseError(s.to_string());
        // Tolerate the emoji variation selector some clients append to suits.
        let trimmed = s.trim().trim_end_matches('\u{fe0f}');
        let suit_char = trimmed.chars().last().ok_or_else(err)?;
        let suit = Suit::from_symbol(suit_char).ok_or_else(err)?;
        let label = &trimmed[..trimmed.len() - suit_char.len_utf8()];
        let rank = Rank::ALL
            .into_iter()
            .find(|rank| rank.label() == label)
            .ok_or_else(err)?;
        Ok(Self(rank, suit))
    }
}

impl Serialize for Card {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The fixed 52-entry table every draw is taken from.
pub static CARD_TABLE: LazyLock<Vec<Card>> = LazyLock::new(|| {
    Suit::ALL
        .into_iter()
        .flat_map(|suit| Rank::ALL.into_iter().map(move |rank| Card(rank, suit)))
        .collect()
});

/// Where cards come from. Draws are with replacement: the table never runs
/// out, so there is no shoe to track.
pub trait CardSource: Send + Sync {
    fn draw(&self) -> Card;
}

/// Uniform draws from [`CARD_TABLE`] using the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCards;

impl CardSource for RandomCards {
    fn draw(&self) -> Card {
        draw_card_with(&mut rand::rng())
    }
}

/// Uniform draw from [`CARD_TABLE`], with replacement.
pub fn draw_card() -> Card {
    RandomCards.draw()
}

/// Draw a card with a caller-provided RNG.
pub fn draw_card_with<R: Rng + ?Sized>(rng: &mut R) -> Card {
    CARD_TABLE[rng.random_range(0..CARD_TABLE.len())]
}

/// Hands out a predetermined sequence of cards, then falls back to `2♣`.
#[derive(Debug, Default)]
pub struct ScriptedCards {
    cards: Mutex<VecDeque<Card>>,
}

impl ScriptedCards {
    pub fn new<I: IntoIterator<Item = Card>>(cards: I) -> Self {
        Self {
            cards: Mutex::new(cards.into_iter().collect()),
        }
    }

    /// Build from tokens such as `["A♠", "K♦"]`.
    ///
    /// # Panics
    ///
    /// Panics if a token is not a valid card.
    pub fn from_tokens(tokens: &[&str]) -> Self {
        Self::new(
            tokens
                .iter()
                .map(|t| t.parse::<Card>().expect("valid card token")),
        )
    }

    pub fn push(&self, card: Card) {
        self.cards
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(card);
    }

    pub fn remaining(&self) -> usize {
        self.cards
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl CardSource for ScriptedCards {
    fn draw(&self) -> Card {
        self.cards
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or(Card(Rank::Two, Suit::Club))
    }
}
