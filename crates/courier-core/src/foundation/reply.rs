//! Reply capability attached to inbound events.
//!
//! The core never talks to the platform itself. Every event arrives with a
//! [`ReplyHandle`], a chat-bound wrapper over an injected [`Replier`]
//! capability, and handlers produce side effects exclusively through it.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::foundation::event::ChatId;

/// Result type for platform API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors produced by the reply capability.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The platform connection is unavailable.
    #[error("platform connection unavailable")]
    NotConnected,

    /// The API call timed out.
    #[error("API call timed out")]
    Timeout,

    /// The platform rejected the call.
    #[error("platform rejected the call: {message}")]
    Rejected {
        /// Platform-provided rejection message.
        message: String,
    },

    /// The call failed at the transport level.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// The outbound side of the platform boundary.
///
/// Implementations live outside the core (typically next to the event
/// source) and know how to deliver messages over the wire. The core only
/// ever sees this trait.
#[async_trait]
pub trait Replier: Send + Sync {
    /// Sends a text message to a chat, returning the new message id.
    async fn send_text(&self, chat: ChatId, text: &str) -> ApiResult<i64>;

    /// Acknowledges a callback action, optionally with a notification text.
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> ApiResult<()>;
}

/// A shared, type-erased replier.
pub type BoxedReplier = Arc<dyn Replier>;

/// Reply capability bound to the chat an event originated from.
///
/// Cloning is cheap; the underlying [`Replier`] is shared.
#[derive(Clone)]
pub struct ReplyHandle {
    chat: ChatId,
    replier: BoxedReplier,
}

impl ReplyHandle {
    /// Creates a handle bound to the given chat.
    pub fn new(chat: ChatId, replier: BoxedReplier) -> Self {
        Self { chat, replier }
    }

    /// Returns the chat this handle replies into.
    pub fn chat(&self) -> ChatId {
        self.chat
    }

    /// Sends a text reply into the originating chat.
    pub async fn reply(&self, text: &str) -> ApiResult<i64> {
        self.replier.send_text(self.chat, text).await
    }

    /// Sends a text message to an arbitrary chat.
    pub async fn send_to(&self, chat: ChatId, text: &str) -> ApiResult<i64> {
        self.replier.send_text(chat, text).await
    }

    /// Acknowledges a callback action.
    pub async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> ApiResult<()> {
        self.replier.answer_callback(callback_id, text).await
    }
}

impl std::fmt::Debug for ReplyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyHandle").field("chat", &self.chat).finish()
    }
}
