//! Predicate functions for handler matching.
//!
//! A [`Predicate`] is a pure boolean test over an [`Event`]. A handler
//! matches an event iff *all* of its predicates return true; a handler with
//! no predicates matches unconditionally.
//!
//! # Example
//!
//! ```rust,ignore
//! let def = HandlerDef::new("start", on_start)
//!     .predicate(is_command("start"))
//!     .predicate(from_chat(ChatId(42)));
//! ```

use std::sync::Arc;

use crate::foundation::event::{ChatId, Event, EventKind, UserId};

/// A type-erased predicate function.
pub type Predicate = Arc<dyn Fn(&Event) -> bool + Send + Sync>;

/// Wraps a closure into a [`Predicate`].
pub fn predicate<F>(f: F) -> Predicate
where
    F: Fn(&Event) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Matches message-kind events.
pub fn is_message() -> Predicate {
    predicate(|event| event.kind() == EventKind::Message)
}

/// Matches callback-kind events.
pub fn is_callback() -> Predicate {
    predicate(|event| event.kind() == EventKind::Callback)
}

/// Matches message events carrying the given command.
///
/// The leading `/` may be omitted; matching is case-insensitive and
/// compares the first whitespace-separated token, so `is_command("start")`
/// matches `"/start"` and `"/start now"` but not `"/startle"`.
pub fn is_command(cmd: impl Into<String>) -> Predicate {
    let cmd = cmd.into();
    let full_cmd = if cmd.starts_with('/') {
        cmd.to_lowercase()
    } else {
        format!("/{}", cmd.to_lowercase())
    };

    predicate(move |event| {
        let Some(text) = event.text() else {
            return false;
        };
        text.trim()
            .split_whitespace()
            .next()
            .is_some_and(|token| token.to_lowercase() == full_cmd)
    })
}

/// Matches message events whose trimmed text equals `text`.
pub fn text_equals(text: impl Into<String>) -> Predicate {
    let text = text.into();
    predicate(move |event| event.text().is_some_and(|t| t.trim() == text))
}

/// Matches message events whose text starts with `prefix`.
pub fn text_starts_with(prefix: impl Into<String>) -> Predicate {
    let prefix = prefix.into();
    predicate(move |event| event.text().is_some_and(|t| t.starts_with(&prefix)))
}

/// Matches callback events carrying exactly the given data.
pub fn callback_data(data: impl Into<String>) -> Predicate {
    let data = data.into();
    predicate(move |event| event.callback_data() == Some(data.as_str()))
}

/// Matches events originating from the given chat.
pub fn from_chat(chat: ChatId) -> Predicate {
    predicate(move |event| event.chat() == chat)
}

/// Matches events sent by the given user.
pub fn from_user(user: UserId) -> Predicate {
    predicate(move |event| event.sender().user_id == user)
}
