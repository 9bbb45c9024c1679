//! Chat texts and the keyboards attached to them.

use std::time::Duration;

use super::messages::{Button, OutboundMessage};
use crate::{
    db::{ChatId, PlayerHand},
    game::{Action, Card, Outcome, format_hand, score_hand},
};

const WELCOME: &str = "Welcome to the Blackjack bot!";
const GAME_RUNNING: &str = "A game is already running in this chat. \
     To play, please wait for the current game to finish.";

const START_BUTTON: &str = "Start a new game";
const JOIN_BUTTON: &str = "Join the game";
const RULES_BUTTON: &str = "Game rules";
const TAKE_CARD_BUTTON: &str = "Take a card";
const STOP_TAKING_BUTTON: &str = "Enough cards";

fn rules_button(rules_url: &str) -> Button {
    Button::url(RULES_BUTTON, rules_url)
}

/// Reply to `/start` when no game is running.
pub fn welcome(chat_id: ChatId, rules_url: &str) -> OutboundMessage {
    OutboundMessage::text(chat_id, WELCOME).with_buttons(vec![
        Button::callback(START_BUTTON, Action::NewGame.callback_data()),
        rules_button(rules_url),
    ])
}

/// Reply to `/start` while a game is running.
pub fn welcome_game_running(chat_id: ChatId, rules_url: &str) -> OutboundMessage {
    OutboundMessage::text(chat_id, format!("{WELCOME}\n{GAME_RUNNING}"))
        .with_buttons(vec![rules_button(rules_url)])
}

pub fn game_running(chat_id: ChatId) -> OutboundMessage {
    OutboundMessage::text(chat_id, GAME_RUNNING)
}

pub fn join_prompt(chat_id: ChatId, join_window: Duration) -> OutboundMessage {
    OutboundMessage::text(
        chat_id,
        format!(
            "Starting a new game. To join, press the button below within {} seconds.",
            join_window.as_secs()
        ),
    )
    .with_buttons(vec![Button::callback(
        JOIN_BUTTON,
        Action::Join.callback_data(),
    )])
}

pub fn joined(chat_id: ChatId, name: &str) -> OutboundMessage {
    OutboundMessage::text(chat_id, format!("{name} is in the game"))
}

pub fn bet_prompt(chat_id: ChatId, players: &[&str], bet_options: &[i64]) -> OutboundMessage {
    OutboundMessage::text(
        chat_id,
        format!(
            "The game has started.\nPlayers: {}\n\
             Every player must place a bet by pressing one of the buttons below. \
             A bet is made once per game and cannot be changed.",
            players.join(", ")
        ),
    )
    .with_buttons(
        bet_options
            .iter()
            .map(|&amount| {
                Button::callback(format!("{amount}💰"), Action::Bet(amount).callback_data())
            })
            .collect(),
    )
}

pub fn bet_placed(chat_id: ChatId, name: &str, bet: i64) -> OutboundMessage {
    OutboundMessage::text(chat_id, format!("{name} bets {bet} points."))
}

pub fn blackjack(chat_id: ChatId, name: &str, cards: &[Card]) -> OutboundMessage {
    OutboundMessage::text(
        chat_id,
        format!("Blackjack! {name} has 21: {}", format_hand(cards)),
    )
}

fn hand_line(name: &str, cards: &[Card]) -> String {
    format!("{name}:  {} ({})", format_hand(cards), score_hand(cards))
}

/// Every player's hand and the dealer's open card, with the Take/Stand
/// keyboard.
pub fn hands_dealt(chat_id: ChatId, hands: &[PlayerHand], dealer_cards: &[Card]) -> OutboundMessage {
    let lines: Vec<String> = hands
        .iter()
        .map(|hand| hand_line(hand.display_name(), &hand.gameplay.cards))
        .collect();
    OutboundMessage::text(
        chat_id,
        format!(
            "All bets are in. You can now take a card or stop taking cards.\n\n\
             Hands:\n\n{}\n\nDealer:  {}",
            lines.join("\n"),
            format_hand(dealer_cards)
        ),
    )
    .with_buttons(vec![
        Button::callback(TAKE_CARD_BUTTON, Action::TakeCard.callback_data()),
        Button::callback(STOP_TAKING_BUTTON, Action::Stand.callback_data()),
    ])
}

pub fn took_card(chat_id: ChatId, name: &str, cards: &[Card]) -> OutboundMessage {
    OutboundMessage::text(
        chat_id,
        format!("{name} takes another card, hand: {}", format_hand(cards)),
    )
}

pub fn exceeded(chat_id: ChatId, name: &str, cards: &[Card]) -> OutboundMessage {
    OutboundMessage::text(
        chat_id,
        format!("{name} has more than 21, hand: {}", format_hand(cards)),
    )
}

pub fn stood(chat_id: ChatId, name: &str, cards: &[Card]) -> OutboundMessage {
    OutboundMessage::text(
        chat_id,
        format!("{name} stops taking cards, hand: {}", format_hand(cards)),
    )
}

pub fn canceled_no_bets(chat_id: ChatId) -> OutboundMessage {
    OutboundMessage::text(
        chat_id,
        "The game was canceled: not everyone placed a bet in time.",
    )
}

/// One player's line in the results message. `balance` is `None` when the
/// settlement could not be recorded.
pub fn result_line(
    name: &str,
    outcome: Outcome,
    cards: &[Card],
    bet: i64,
    balance: Option<i64>,
) -> String {
    let verdict = match outcome {
        Outcome::Exceeded => format!("exceeded 21 and loses {bet}"),
        Outcome::Won => format!("wins {bet}"),
        Outcome::Lost => format!("loses {bet}"),
        Outcome::Tie => "ties with the dealer".to_string(),
    };
    let balance = match balance {
        Some(value) => format!("balance: {value}"),
        None => "the result could not be recorded".to_string(),
    };
    format!(
        "{name} ({}, {}) {verdict}; {balance}",
        format_hand(cards),
        score_hand(cards)
    )
}

pub fn results(
    chat_id: ChatId,
    lines: &[String],
    dealer_cards: &[Card],
    dealer_score: u32,
) -> OutboundMessage {
    OutboundMessage::text(
        chat_id,
        format!(
            "Game over.\n\n{}\n\nDealer:  {} ({dealer_score})",
            lines.join("\n"),
            format_hand(dealer_cards)
        ),
    )
}

/// A rejected action or failure, addressed to whoever pressed the button.
pub fn notice(chat_id: ChatId, name: &str, text: &str) -> OutboundMessage {
    OutboundMessage::text(chat_id, format!("{name}, {text}"))
}
