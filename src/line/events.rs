//! Inbound webhook payloads from the LINE Messaging API

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub source: Option<Source>,
    #[serde(default)]
    pub message: Option<EventMessage>,
    #[serde(default)]
    pub postback: Option<Postback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postback {
    pub data: String,
}

/// The parts of an event the bot acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    Text(String),
    Postback(String),
    Follow,
    /// Stickers, images, unfollow, joins and anything else
    Other,
}

impl Event {
    pub fn user_id(&self) -> Option<&str> {
        self.source.as_ref()?.user_id.as_deref()
    }

    pub fn payload(&self) -> EventPayload {
        match self.kind.as_str() {
            "message" => match &self.message {
                Some(EventMessage {
                    kind,
                    text: Some(text),
                }) if kind == "text" => EventPayload::Text(text.clone()),
                _ => EventPayload::Other,
            },
            "postback" => match &self.postback {
                Some(postback) => EventPayload::Postback(postback.data.clone()),
                None => EventPayload::Other,
            },
            "follow" => EventPayload::Follow,
            _ => EventPayload::Other,
        }
    }
}
