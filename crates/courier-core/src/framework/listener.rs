//! Listeners and handler definitions.
//!
//! A [`Listener`] is a named grouping of [`HandlerDef`]s for one event
//! kind. Each handler is identified by a method name, guarded by an ordered
//! list of predicates (AND semantics), and may carry a method-level recovery
//! override. Registration is explicit: the registry is built once at startup
//! from these definitions, with no runtime introspection.
//!
//! # Example
//!
//! ```rust,ignore
//! let listener = Listener::new("onboarding")
//!     .handler(
//!         HandlerDef::new("start", on_start).predicate(is_command("start")),
//!     )
//!     .handler(
//!         HandlerDef::new("fallback", on_anything),
//!     );
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::foundation::context::EventContext;
use crate::foundation::event::Event;
use crate::framework::predicate::Predicate;
use crate::framework::recovery::RecoveryFn;

/// A type-erased handler function.
pub type HandlerFn =
    Arc<dyn Fn(Arc<EventContext>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Wraps an async closure into a [`HandlerFn`].
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(Arc<EventContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// One registered handler: method name, predicates, body, and an optional
/// recovery override.
#[derive(Clone)]
pub struct HandlerDef {
    method: String,
    predicates: Vec<Predicate>,
    func: HandlerFn,
    recovery: Option<RecoveryFn>,
}

impl HandlerDef {
    /// Creates a handler definition from a method name and an async
    /// function taking `Arc<EventContext>`.
    pub fn new<F, Fut>(method: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<EventContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            method: method.into(),
            predicates: Vec::new(),
            func: handler_fn(f),
            recovery: None,
        }
    }

    /// Appends a predicate.
    ///
    /// Predicates are evaluated in the order they are added; all must pass
    /// for the handler to match. A handler with no predicates matches
    /// unconditionally.
    pub fn predicate(mut self, p: Predicate) -> Self {
        self.predicates.push(p);
        self
    }

    /// Appends several predicates at once.
    pub fn predicates(mut self, ps: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(ps);
        self
    }

    /// Sets the method-level recovery override.
    ///
    /// When set, failures in this handler are delivered to the override
    /// instead of the global recovery function.
    pub fn on_error(mut self, recovery: RecoveryFn) -> Self {
        self.recovery = Some(recovery);
        self
    }

    /// Returns the method identifier.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the number of predicates.
    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }

    /// Returns the method-level recovery override, if configured.
    pub fn recovery(&self) -> Option<&RecoveryFn> {
        self.recovery.as_ref()
    }

    /// Returns true if every predicate passes for the event.
    pub(crate) fn matches(&self, event: &Event) -> bool {
        self.predicates.iter().all(|p| p(event))
    }

    /// Runs the handler body.
    pub(crate) async fn invoke(&self, ctx: Arc<EventContext>) -> anyhow::Result<()> {
        (self.func)(ctx).await
    }
}

impl std::fmt::Debug for HandlerDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerDef")
            .field("method", &self.method)
            .field("predicate_count", &self.predicates.len())
            .field("has_recovery", &self.recovery.is_some())
            .finish()
    }
}

/// A named grouping of handlers.
///
/// Handlers are consulted in the order they were added; dispatch invokes
/// the first one whose predicates all pass and stops.
#[derive(Clone)]
pub struct Listener {
    name: String,
    handlers: Vec<HandlerDef>,
}

impl Listener {
    /// Creates an empty listener.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: Vec::new(),
        }
    }

    /// Adds a handler definition (builder pattern).
    pub fn handler(mut self, def: HandlerDef) -> Self {
        self.handlers.push(def);
        self
    }

    /// Returns the listener name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the handlers in declaration order.
    pub fn handlers(&self) -> &[HandlerDef] {
        &self.handlers
    }

    /// Returns the number of handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("name", &self.name)
            .field("handler_count", &self.handlers.len())
            .finish()
    }
}
