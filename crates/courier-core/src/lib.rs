//! # Courier Core
//!
//! The core dispatch engine of the Courier bot framework.
//!
//! Courier routes inbound conversational events (text messages and callback
//! actions) to registered handlers. Every event runs through the same
//! pipeline, a small state machine per event:
//!
//! ```text
//! ┌───────────────┐   ┌──────────────┐   ┌────────────────┐   ┌──────────┐
//! │ Session Tree  │──▶│  Middleware  │──▶│    Registry    │──▶│ Handler  │
//! │  (pre-order)  │   │ (veto chain) │   │ (first match)  │   │  (one)   │
//! └───────────────┘   └──────────────┘   └────────────────┘   └──────────┘
//!                                                                   │
//!                                            on failure ▼───────────┘
//!                                        method override, else global
//! ```
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! Core abstractions and type system:
//! - **Event Model**: the message/callback tagged union ([`Event`])
//! - **Reply Capability**: chat-bound side-effect handle ([`ReplyHandle`])
//! - **Execution Context**: event plus loaded session state ([`EventContext`])
//!
//! ### Framework Layer
//!
//! Event processing and routing:
//! - **Session Context Tree**: per-event hierarchical state loading
//!   ([`SessionTree`])
//! - **Middleware Chain**: ordered, short-circuiting admission guards
//!   ([`MiddlewareChain`])
//! - **Listener Registry**: predicate-guarded handler records built once at
//!   startup ([`ListenerRegistry`])
//! - **Dispatcher**: the per-event pipeline ([`Dispatcher`])
//! - **Recovery**: two-tier failure resolution ([`RecoveryFn`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use courier_core::prelude::*;
//!
//! async fn on_start(ctx: Arc<EventContext>) -> anyhow::Result<()> {
//!     ctx.reply().reply("welcome aboard").await?;
//!     Ok(())
//! }
//!
//! let dispatcher = Dispatcher::builder()
//!     .message_listener(
//!         Listener::new("onboarding")
//!             .handler(HandlerDef::new("start", on_start).predicate(is_command("start"))),
//!     )
//!     .build();
//! ```
//!
//! Nothing in this crate persists past one event's processing, and one
//! event's failure never affects another event's pipeline.

// Architectural layers
pub mod foundation;
pub mod framework;

// Re-export foundation types
pub use foundation::{
    ApiError, ApiResult, BoxedReplier, CallbackEvent, ChatId, DispatchError, Event, EventContext,
    EventKind, MessageEvent, Replier, ReplyHandle, Sender, UserId,
};

// Re-export framework types
pub use framework::{
    Admission, ContextFactory, DispatchOutcome, Dispatcher, DispatcherBuilder, HandlerDef,
    HandlerFn, Listener, ListenerRegistry, LoadedContexts, Middleware, MiddlewareChain,
    MiddlewareFactory, NodeId, Predicate, RecoveryFn, RecoveryTier, SessionContext, SessionTree,
    SessionTreeBuilder, callback_data, context_factory, from_chat, from_user, handler_fn,
    is_callback, is_command, is_message, middleware_factory, recovery_fn, text_equals,
    text_starts_with,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::framework::{
        Dispatcher, HandlerDef, Listener, Middleware, SessionContext, SessionTree,
        callback_data, context_factory, from_chat, from_user, is_callback, is_command,
        is_message, middleware_factory, recovery_fn, text_equals, text_starts_with,
    };
}
