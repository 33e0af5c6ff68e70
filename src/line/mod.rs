//! LINE Messaging API: inbound events, outbound messages and signatures

pub mod client;
pub mod events;
pub mod messages;
pub mod signature;

pub use client::{LineClient, NotifyError, Notifier};
pub use events::{Event, EventPayload, WebhookBody};
pub use messages::{Message, PostbackAction};
