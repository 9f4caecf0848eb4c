//! Foundation layer - Core abstractions and type system.
//!
//! This module contains the types everything else builds on:
//! - Event model ([`Event`], [`MessageEvent`], [`CallbackEvent`])
//! - Identity types ([`ChatId`], [`UserId`], [`Sender`])
//! - Reply capability ([`Replier`], [`ReplyHandle`])
//! - Execution context ([`EventContext`])
//! - Dispatch error taxonomy ([`DispatchError`])

pub mod context;
pub mod error;
pub mod event;
pub mod reply;

pub use context::EventContext;
pub use error::DispatchError;
pub use event::{CallbackEvent, ChatId, Event, EventKind, MessageEvent, Sender, UserId};
pub use reply::{ApiError, ApiResult, BoxedReplier, Replier, ReplyHandle};
