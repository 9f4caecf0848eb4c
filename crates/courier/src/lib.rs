//! # Courier
//!
//! A predicate-routed, middleware-guarded dispatch framework for chat bots.
//!
//! ## Overview
//!
//! Courier routes inbound conversational events (text messages and
//! callback actions) to explicitly registered, predicate-guarded handlers.
//! Every event runs the same per-event pipeline:
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐   ┌─────────────┐   ┌───────────┐
//! │ Event Source │──▶│ Session Tree   │──▶│ Middleware  │──▶│ Registry  │
//! │ (poll/hook)  │   │ (state, DFS)   │   │ (veto/pass) │   │ (1 match) │
//! └──────────────┘   └────────────────┘   └─────────────┘   └───────────┘
//!                         on failure: method override, else global recovery
//! ```
//!
//! - **Session Context Tree**: hierarchical per-event state, loaded
//!   pre-order before any routing decision
//! - **Middleware Chain**: ordered guards with early-exit vetoes and
//!   private continuation sub-chains
//! - **Listener Registry**: ordered listeners per event kind; the first
//!   handler whose predicates all pass wins
//! - **Recovery**: two-tier failure handling, method override first
//! - **Fetch Strategy**: polling or webhook event acquisition, selected by
//!   configuration
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::prelude::*;
//!
//! async fn on_start(ctx: Arc<EventContext>) -> anyhow::Result<()> {
//!     ctx.reply().reply("welcome!").await?;
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let dispatcher = Dispatcher::builder()
//!         .message_listener(
//!             Listener::new("onboarding")
//!                 .handler(HandlerDef::new("start", on_start).predicate(is_command("start"))),
//!         )
//!         .build();
//!
//!     let runtime = CourierRuntime::new(dispatcher);
//!     runtime.run(MyPlatform::new()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `webhook` *(default)*: webhook event source (axum listener)
//! - `http-client` *(default)*: generic authenticated HTTP API client

pub use courier_core as core;
pub use courier_runtime as runtime;
pub use courier_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use courier::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use courier_runtime::CourierRuntime;

    // Dispatch pipeline
    pub use courier_core::{
        DispatchOutcome, Dispatcher, EventContext, HandlerDef, Listener, Middleware,
        MiddlewareChain, SessionContext, SessionTree, context_factory, middleware_factory,
        recovery_fn,
    };

    // Event model
    pub use courier_core::{
        CallbackEvent, ChatId, Event, EventKind, MessageEvent, Replier, ReplyHandle, Sender,
        UserId,
    };

    // Predicates
    pub use courier_core::{
        callback_data, from_chat, from_user, is_callback, is_command, is_message, text_equals,
        text_starts_with,
    };

    // Transport boundary - for platform adapters
    pub use courier_transport::{
        EventSink, FetchStrategy, PlatformAdapter, PollingConfig, UpdateDecoder, UpdatePuller,
        WebhookConfig,
    };
}
