//! Execution context handed to handlers and recovery functions.

use crate::foundation::event::Event;
use crate::foundation::reply::ReplyHandle;
use crate::framework::session::{LoadedContexts, SessionContext};

/// The context object passed to handlers during event processing.
///
/// `EventContext` bundles the immutable [`Event`] with the session contexts
/// loaded for it. It is shared as an `Arc` across the handler and any
/// recovery function that runs for the same event.
///
/// # Example
///
/// ```rust,ignore
/// async fn on_start(ctx: Arc<EventContext>) -> anyhow::Result<()> {
///     let profile = ctx.context::<UserProfile>().expect("profile loaded");
///     ctx.reply().reply(&format!("hello, {}", profile.name)).await?;
///     Ok(())
/// }
/// ```
pub struct EventContext {
    /// The event being processed.
    event: Event,
    /// Session contexts loaded for this event, in load order.
    contexts: LoadedContexts,
}

impl EventContext {
    /// Creates a context with no loaded session state.
    ///
    /// Used on the session-failure path, where loading aborted before any
    /// context could be retained.
    pub fn new(event: Event) -> Self {
        Self {
            event,
            contexts: LoadedContexts::new(),
        }
    }

    /// Creates a context carrying the session state loaded for the event.
    pub fn with_contexts(event: Event, contexts: LoadedContexts) -> Self {
        Self { event, contexts }
    }

    /// Returns the event being processed.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Returns the reply handle attached to the event.
    pub fn reply(&self) -> &ReplyHandle {
        self.event.reply()
    }

    /// Returns the loaded session contexts.
    pub fn contexts(&self) -> &LoadedContexts {
        &self.contexts
    }

    /// Looks up a loaded session context by type.
    pub fn context<T: SessionContext>(&self) -> Option<&T> {
        self.contexts.get::<T>()
    }
}

impl std::fmt::Debug for EventContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventContext")
            .field("event", &self.event)
            .field("context_count", &self.contexts.len())
            .finish()
    }
}
