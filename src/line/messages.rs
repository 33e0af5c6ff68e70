//! Outbound message payloads for the LINE Messaging API

use serde::Serialize;

/// LINE rejects more than 13 quick reply buttons
pub const MAX_QUICK_REPLY_ITEMS: usize = 13;

/// LINE rejects a reply or push with more than 5 messages
pub const MAX_MESSAGES_PER_CALL: usize = 5;

/// Quick reply labels are capped at 20 characters
const MAX_LABEL_CHARS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Message {
    #[serde(rename_all = "camelCase")]
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        quick_reply: Option<QuickReply>,
    },
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Message::Text {
            text: text.into(),
            quick_reply: None,
        }
    }

    pub fn with_buttons(text: impl Into<String>, buttons: Vec<PostbackAction>) -> Self {
        let items: Vec<QuickReplyItem> = buttons
            .into_iter()
            .take(MAX_QUICK_REPLY_ITEMS)
            .map(|action| QuickReplyItem {
                kind: "action",
                action,
            })
            .collect();

        Message::Text {
            text: text.into(),
            quick_reply: (!items.is_empty()).then_some(QuickReply { items }),
        }
    }

    pub fn body(&self) -> &str {
        match self {
            Message::Text { text, .. } => text,
        }
    }

    #[cfg(test)]
    pub fn buttons(&self) -> &[QuickReplyItem] {
        match self {
            Message::Text {
                quick_reply: Some(reply),
                ..
            } => &reply.items,
            Message::Text { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickReply {
    pub items: Vec<QuickReplyItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickReplyItem {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub action: PostbackAction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostbackAction {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub label: String,
    pub data: String,
    pub display_text: String,
}

impl PostbackAction {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        let label: String = label.into();
        Self {
            kind: "postback",
            label: label.chars().take(MAX_LABEL_CHARS).collect(),
            data: data.into(),
            display_text: label,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest<'a> {
    pub reply_token: &'a str,
    pub messages: &'a [Message],
}

#[derive(Debug, Serialize)]
pub struct PushRequest<'a> {
    pub to: &'a str,
    pub messages: &'a [Message],
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_message_wire_format() {
        let message = Message::text("こんにちは");
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"type": "text", "text": "こんにちは"})
        );
    }

    #[test]
    fn test_quick_reply_wire_format() {
        let message = Message::with_buttons(
            "選んでください",
            vec![PostbackAction::new("✅ 完了", "action=submit&status=completed")],
        );
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "type": "text",
                "text": "選んでください",
                "quickReply": {"items": [{
                    "type": "action",
                    "action": {
                        "type": "postback",
                        "label": "✅ 完了",
                        "data": "action=submit&status=completed",
                        "displayText": "✅ 完了"
                    }
                }]}
            })
        );
    }

    #[test]
    fn test_quick_reply_is_capped() {
        let buttons = (0..20)
            .map(|i| PostbackAction::new(format!("報告{}", i), format!("n={}", i)))
            .collect();
        let message = Message::with_buttons("多い", buttons);
        assert_eq!(message.buttons().len(), MAX_QUICK_REPLY_ITEMS);
    }

    #[test]
    fn test_long_labels_are_truncated() {
        let action = PostbackAction::new("あ".repeat(30), "x=1");
        assert_eq!(action.label.chars().count(), 20);
        assert_eq!(action.display_text.chars().count(), 30);
    }
}
