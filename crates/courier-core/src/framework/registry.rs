//! Listener registry.
//!
//! The registry holds the configured listeners in two ordered lanes, one
//! per [`EventKind`]. It is built once at startup and performs only lookup
//! per event: no reflection, no mutation.

use crate::foundation::event::{Event, EventKind};
use crate::framework::listener::{HandlerDef, Listener};

/// The handler chosen for an event, together with its owning listener.
#[derive(Debug)]
pub struct Selection<'a> {
    /// Name of the listener the handler belongs to.
    pub listener: &'a str,
    /// The matched handler.
    pub handler: &'a HandlerDef,
}

/// Ordered listener lanes for both event kinds.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    message: Vec<Listener>,
    callback: Vec<Listener>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a listener to the message lane.
    pub fn add_message(&mut self, listener: Listener) {
        self.message.push(listener);
    }

    /// Appends a listener to the callback lane.
    pub fn add_callback(&mut self, listener: Listener) {
        self.callback.push(listener);
    }

    /// Appends a listener to both lanes.
    pub fn add_generic(&mut self, listener: Listener) {
        self.message.push(listener.clone());
        self.callback.push(listener);
    }

    /// Returns the listeners configured for an event kind.
    pub fn listeners_for(&self, kind: EventKind) -> &[Listener] {
        match kind {
            EventKind::Message => &self.message,
            EventKind::Callback => &self.callback,
        }
    }

    /// Selects the handler for an event.
    ///
    /// Listeners are scanned in configured order and their handlers in
    /// declared order; the first handler whose predicates all pass wins,
    /// and nothing after it is evaluated. Returns `None` when no handler
    /// matches, which is a silent drop rather than an error.
    pub fn select(&self, event: &Event) -> Option<Selection<'_>> {
        for listener in self.listeners_for(event.kind()) {
            for handler in listener.handlers() {
                if handler.matches(event) {
                    return Some(Selection {
                        listener: listener.name(),
                        handler,
                    });
                }
            }
        }
        None
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("message_listeners", &self.message.len())
            .field("callback_listeners", &self.callback.len())
            .finish()
    }
}
