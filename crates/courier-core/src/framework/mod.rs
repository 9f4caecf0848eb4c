//! Framework layer - Event processing and routing.
//!
//! This module contains the per-event processing pipeline:
//! - Session context tree for event-scoped state loading
//! - Middleware chain for pre-dispatch admission control
//! - Predicate functions and the listener registry
//! - Central dispatcher tying the stages together
//! - Recovery functions for two-tier failure handling

pub mod dispatcher;
pub mod listener;
pub mod middleware;
pub mod predicate;
pub mod recovery;
pub mod registry;
pub mod session;

pub use dispatcher::{DispatchOutcome, Dispatcher, DispatcherBuilder};
pub use listener::{HandlerDef, HandlerFn, Listener, handler_fn};
pub use middleware::{
    Admission, Middleware, MiddlewareChain, MiddlewareFactory, middleware_factory,
};
pub use predicate::{
    Predicate, callback_data, from_chat, from_user, is_callback, is_command, is_message,
    predicate, text_equals, text_starts_with,
};
pub use recovery::{RecoveryFn, RecoveryTier, recovery_fn};
pub use registry::{ListenerRegistry, Selection};
pub use session::{
    ContextFactory, LoadedContexts, NodeId, SessionContext, SessionTree, SessionTreeBuilder,
    context_factory,
};
