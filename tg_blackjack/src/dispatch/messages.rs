use serde::{Deserialize, Serialize};

use crate::db::ChatId;

/// An inline keyboard button. Exactly one of `callback` and `url` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Button {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback: Some(data.into()),
            url: None,
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback: None,
            url: Some(url.into()),
        }
    }
}

/// A message to post in a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub chat_id: ChatId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
}

impl OutboundMessage {
    pub fn text(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_buttons(mut self, buttons: Vec<Button>) -> Self {
        self.buttons = buttons;
        self
    }

    pub fn has_callback(&self, data: &str) -> bool {
        self.buttons
            .iter()
            .any(|b| b.callback.as_deref() == Some(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buttons_serialize_without_empty_fields() {
        let message = OutboundMessage::text(-5, "hi")
            .with_buttons(vec![Button::callback("Join", "add_player")]);
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["buttons"][0]["callback"], "add_player");
        assert!(json["buttons"][0].get("url").is_none());

        let plain = serde_json::to_value(OutboundMessage::text(-5, "hi")).unwrap();
        assert!(plain.get("buttons").is_none());
    }

    #[test]
    fn test_has_callback() {
        let message = OutboundMessage::text(1, "rules")
            .with_buttons(vec![Button::url("Rules", "https://example.org")]);
        assert!(!message.has_callback("https://example.org"));
        assert!(message.with_buttons(vec![Button::callback("Take", "take_card")]).has_callback("take_card"));
    }
}
