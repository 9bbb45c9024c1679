//! Blackjack rule constants.

/// Best possible hand score; anything above it is a bust.
pub const BLACK_JACK: u32 = 21;

/// The dealer keeps drawing while their score is below this value.
pub const DEALER_STOP_SCORE: u32 = 17;

/// Amount an ace loses when it is counted as 1 instead of 11.
pub const SOFT_ACE_DISCOUNT: u32 = 10;

/// Number of cards dealt to a player when their bet is accepted.
pub const INITIAL_HAND_SIZE: usize = 2;

/// Bet value stored on a gameplay before its player has bet.
pub const BET_SENTINEL: i64 = 1;

/// Points every player starts with in a chat.
pub const DEFAULT_STARTING_BALANCE: i64 = 1000;

/// Bet buttons offered during the betting stage.
pub const DEFAULT_BET_OPTIONS: [i64; 4] = [10, 25, 50, 100];
