//! Pure scoring and settlement functions.

use serde::{Deserialize, Serialize};

use super::{
    constants::{BLACK_JACK, DEALER_STOP_SCORE, SOFT_ACE_DISCOUNT},
    entities::{Card, CardSource},
    state_machine::PlayerStatus,
};

/// Score a hand, counting each ace as 11 until that would bust the hand,
/// then as 1.
#[must_use]
pub fn score_hand(cards: &[Card]) -> u32 {
    let mut score: u32 = cards.iter().map(Card::value).sum();
    let mut aces = cards.iter().filter(|card| card.is_ace()).count();

    while score > BLACK_JACK && aces > 0 {
        score -= SOFT_ACE_DISCOUNT;
        aces -= 1;
    }

    score
}

#[must_use]
pub fn is_bust(score: u32) -> bool {
    score > BLACK_JACK
}

#[must_use]
pub fn is_blackjack(score: u32) -> bool {
    score == BLACK_JACK
}

/// Play out the dealer's hand: draw while the score is below
/// [`DEALER_STOP_SCORE`]. Returns the final hand and its score.
pub fn dealer_play(initial: &[Card], source: &dyn CardSource) -> (Vec<Card>, u32) {
    let mut cards = initial.to_vec();
    let mut score = score_hand(&cards);

    while score < DEALER_STOP_SCORE {
        cards.push(source.draw());
        score = score_hand(&cards);
    }

    (cards, score)
}

/// How a player's round ended against the dealer.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Outcome {
    /// Went over 21 while taking cards. Loses regardless of the dealer.
    Exceeded,
    Won,
    Lost,
    Tie,
}

impl Outcome {
    /// Balance change for a settled bet.
    pub fn delta(self, bet: i64) -> i64 {
        match self {
            Self::Exceeded | Self::Lost => -bet,
            Self::Won => bet,
            Self::Tie => 0,
        }
    }

    /// Status the gameplay is moved to. Exceeded gameplays keep theirs.
    pub fn final_status(self) -> Option<PlayerStatus> {
        match self {
            Self::Exceeded => None,
            Self::Won => Some(PlayerStatus::Won),
            Self::Lost => Some(PlayerStatus::Lost),
            Self::Tie => Some(PlayerStatus::Tie),
        }
    }
}

/// Compare a finished hand with the dealer's.
#[must_use]
pub fn settle(player_score: u32, exceeded: bool, dealer_score: u32) -> Outcome {
    if exceeded || is_bust(player_score) {
        Outcome::Exceeded
    } else if is_bust(dealer_score) || player_score > dealer_score {
        Outcome::Won
    } else if player_score < dealer_score {
        Outcome::Lost
    } else {
        Outcome::Tie
    }
}

/// Render cards as a comma separated list of tokens.
#[must_use]
pub fn format_hand(cards: &[Card]) -> String {
    cards
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::ScriptedCards;

    fn hand(tokens: &[&str]) -> Vec<Card> {
        tokens.iter().map(|t| t.parse().unwrap()).collect()
    }

    #[test]
    fn test_two_aces_is_twelve() {
        assert_eq!(score_hand(&hand(&["A♠", "A♥"])), 12);
    }

    #[test]
    fn test_ace_king_is_blackjack() {
        let score = score_hand(&hand(&["A♠", "K♦"]));
        assert_eq!(score, 21);
        assert!(is_blackjack(score));
    }

    #[test]
    fn test_two_aces_and_nine_is_21() {
        assert_eq!(score_hand(&hand(&["A♠", "A♥", "9♣"])), 21);
    }

    #[test]
    fn test_hard_hand_can_bust() {
        let score = score_hand(&hand(&["K♠", "Q♥", "5♣"]));
        assert_eq!(score, 25);
        assert!(is_bust(score));
    }

    #[test]
    fn test_soft_ace_converts_only_when_needed() {
        assert_eq!(score_hand(&hand(&["A♠", "6♥"])), 17);
        assert_eq!(score_hand(&hand(&["A♠", "6♥", "8♦"])), 15);
    }

    #[test]
    fn test_empty_hand_scores_zero() {
        assert_eq!(score_hand(&[]), 0);
    }

    #[test]
    fn test_dealer_stands_on_17() {
        let source = ScriptedCards::from_tokens(&["9♣"]);
        let (cards, score) = dealer_play(&hand(&["10♠", "7♥"]), &source);
        assert_eq!(score, 17);
        assert_eq!(cards.len(), 2);
        assert_eq!(source.remaining(), 1);
    }

    #[test]
    fn test_dealer_draws_until_17() {
        let source = ScriptedCards::from_tokens(&["2♣", "3♦", "4♥", "K♠"]);
        let (cards, score) = dealer_play(&hand(&["5♠"]), &source);
        // 5 + 2 + 3 + 4 = 14, then K busts to 24
        assert_eq!(cards.len(), 5);
        assert_eq!(score, 24);
    }

    #[test]
    fn test_dealer_soft_ace_keeps_drawing_after_conversion() {
        let source = ScriptedCards::from_tokens(&["6♣", "9♦", "2♥"]);
        // A+6 = soft 17, stops immediately
        let (cards, score) = dealer_play(&hand(&["A♠"]), &source);
        assert_eq!(score, 17);
        assert_eq!(cards.len(), 2);

        let source = ScriptedCards::from_tokens(&["5♦", "9♣", "3♥"]);
        let (cards, score) = dealer_play(&hand(&["A♠"]), &source);
        // A+5 = 16 -> +9 = 25 -> ace becomes 1 -> 15 -> +3 = 18
        assert_eq!(score, 18);
        assert_eq!(cards.len(), 4);
    }

    #[test]
    fn test_settle() {
        assert_eq!(settle(19, false, 20), Outcome::Lost);
        assert_eq!(settle(20, false, 19), Outcome::Won);
        assert_eq!(settle(18, false, 18), Outcome::Tie);
        assert_eq!(settle(12, false, 24), Outcome::Won);
        // A busted player loses even when the dealer busts too.
        assert_eq!(settle(25, true, 23), Outcome::Exceeded);
    }

    #[test]
    fn test_outcome_delta() {
        assert_eq!(Outcome::Lost.delta(25), -25);
        assert_eq!(Outcome::Exceeded.delta(10), -10);
        assert_eq!(Outcome::Won.delta(50), 50);
        assert_eq!(Outcome::Tie.delta(100), 0);
        assert_eq!(Outcome::Exceeded.final_status(), None);
        assert_eq!(Outcome::Tie.final_status(), Some(PlayerStatus::Tie));
    }

    #[test]
    fn test_format_hand() {
        assert_eq!(format_hand(&hand(&["A♠", "10♥"])), "A♠, 10♥");
        assert_eq!(format_hand(&[]), "");
    }
}
