//! Event model for the Courier framework.
//!
//! This module provides the core event types:
//!
//! - [`Event`] - The tagged union of everything the platform can deliver
//! - [`MessageEvent`] / [`CallbackEvent`] - The two event kinds
//! - [`EventKind`] - Kind classification used by the listener registry
//! - [`ChatId`], [`UserId`], [`Sender`] - Identity types
//!
//! Events are immutable once received. Each event carries the identity of
//! the chat and sender it originated from, its payload (message text or
//! callback data), and a [`ReplyHandle`] bound to the originating chat.

use serde::{Deserialize, Serialize};

use crate::foundation::reply::ReplyHandle;

// ============================================================================
// Identity Types
// ============================================================================

/// Identifier of a chat (private conversation, group, or channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a platform user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The account an event originated from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sender {
    /// The sending user's identifier.
    pub user_id: UserId,

    /// The sender's username, if the platform exposes one.
    #[serde(default)]
    pub username: Option<String>,

    /// The sender's display name, if the platform exposes one.
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Sender {
    /// Creates a sender with only a user id.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            username: None,
            display_name: None,
        }
    }
}

// ============================================================================
// Event Kinds
// ============================================================================

/// Classification of event kinds.
///
/// The listener registry keeps one ordered listener lane per kind; dispatch
/// starts by selecting the lane matching the incoming event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A text message sent to a chat.
    Message,
    /// A callback action (e.g. an inline button press).
    Callback,
}

impl EventKind {
    /// Returns the kind as a lowercase string, for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Message => "message",
            EventKind::Callback => "callback",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Event Types
// ============================================================================

/// An inbound text message.
#[derive(Clone)]
pub struct MessageEvent {
    /// The chat the message was sent in.
    pub chat: ChatId,
    /// Who sent the message.
    pub sender: Sender,
    /// Platform-assigned message identifier.
    pub message_id: i64,
    /// The message text.
    pub text: String,
    /// Reply capability bound to the originating chat.
    pub reply: ReplyHandle,
}

/// An inbound callback action.
#[derive(Clone)]
pub struct CallbackEvent {
    /// The chat the action originated from.
    pub chat: ChatId,
    /// Who triggered the action.
    pub sender: Sender,
    /// Platform-assigned callback identifier, used to acknowledge the action.
    pub callback_id: String,
    /// The opaque data attached to the pressed control.
    pub data: String,
    /// Reply capability bound to the originating chat.
    pub reply: ReplyHandle,
}

/// An inbound event from the bot platform.
///
/// `Event` is the unit everything in the core operates on: session context
/// loading, middleware admission, predicate evaluation and handler dispatch
/// all receive the same immutable value.
#[derive(Clone)]
pub enum Event {
    /// A text message.
    Message(MessageEvent),
    /// A callback action.
    Callback(CallbackEvent),
}

impl Event {
    /// Returns the kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Message(_) => EventKind::Message,
            Event::Callback(_) => EventKind::Callback,
        }
    }

    /// Returns the chat this event originated from.
    pub fn chat(&self) -> ChatId {
        match self {
            Event::Message(m) => m.chat,
            Event::Callback(c) => c.chat,
        }
    }

    /// Returns the sender of this event.
    pub fn sender(&self) -> &Sender {
        match self {
            Event::Message(m) => &m.sender,
            Event::Callback(c) => &c.sender,
        }
    }

    /// Returns the reply handle attached to this event.
    pub fn reply(&self) -> &ReplyHandle {
        match self {
            Event::Message(m) => &m.reply,
            Event::Callback(c) => &c.reply,
        }
    }

    /// Returns the message text, if this is a message event.
    pub fn text(&self) -> Option<&str> {
        match self {
            Event::Message(m) => Some(&m.text),
            Event::Callback(_) => None,
        }
    }

    /// Returns the callback data, if this is a callback event.
    pub fn callback_data(&self) -> Option<&str> {
        match self {
            Event::Message(_) => None,
            Event::Callback(c) => Some(&c.data),
        }
    }

    /// Returns the inner message event, if any.
    pub fn as_message(&self) -> Option<&MessageEvent> {
        match self {
            Event::Message(m) => Some(m),
            Event::Callback(_) => None,
        }
    }

    /// Returns the inner callback event, if any.
    pub fn as_callback(&self) -> Option<&CallbackEvent> {
        match self {
            Event::Message(_) => None,
            Event::Callback(c) => Some(c),
        }
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::Message(m) => f
                .debug_struct("MessageEvent")
                .field("chat", &m.chat)
                .field("sender", &m.sender.user_id)
                .field("message_id", &m.message_id)
                .field("text", &m.text)
                .finish(),
            Event::Callback(c) => f
                .debug_struct("CallbackEvent")
                .field("chat", &c.chat)
                .field("sender", &c.sender.user_id)
                .field("callback_id", &c.callback_id)
                .field("data", &c.data)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::reply::{ApiResult, Replier};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NullReplier;

    #[async_trait]
    impl Replier for NullReplier {
        async fn send_text(&self, _chat: ChatId, _text: &str) -> ApiResult<i64> {
            Ok(0)
        }

        async fn answer_callback(&self, _callback_id: &str, _text: Option<&str>) -> ApiResult<()> {
            Ok(())
        }
    }

    fn reply_handle(chat: ChatId) -> ReplyHandle {
        ReplyHandle::new(chat, Arc::new(NullReplier))
    }

    #[test]
    fn test_event_accessors() {
        let event = Event::Message(MessageEvent {
            chat: ChatId(7),
            sender: Sender::new(UserId(11)),
            message_id: 1,
            text: "hello".to_string(),
            reply: reply_handle(ChatId(7)),
        });

        assert_eq!(event.kind(), EventKind::Message);
        assert_eq!(event.chat(), ChatId(7));
        assert_eq!(event.sender().user_id, UserId(11));
        assert_eq!(event.text(), Some("hello"));
        assert!(event.callback_data().is_none());
        assert!(event.as_callback().is_none());
    }

    #[test]
    fn test_callback_accessors() {
        let event = Event::Callback(CallbackEvent {
            chat: ChatId(3),
            sender: Sender::new(UserId(5)),
            callback_id: "cb-1".to_string(),
            data: "confirm".to_string(),
            reply: reply_handle(ChatId(3)),
        });

        assert_eq!(event.kind(), EventKind::Callback);
        assert_eq!(event.callback_data(), Some("confirm"));
        assert!(event.text().is_none());
        assert_eq!(event.as_callback().unwrap().callback_id, "cb-1");
    }
}
