//! Middleware chain.
//!
//! Middleware is cross-cutting admission control (auth gates, rate limits,
//! feature kill-switches) applied uniformly before dispatch. The chain is a
//! filter, not an error path: a rejecting node stops processing for the
//! event with no error raised and no handler invoked.
//!
//! # Continuation Sub-Chains
//!
//! A node may carry a private continuation via [`Middleware::next`]. When
//! the node does not reject, its continuation's `reject` is evaluated
//! immediately as part of the same step, before the following top-level
//! node, letting a middleware extend itself without altering the
//! externally configured order. Continuations nest.
//!
//! # Example
//!
//! ```rust,ignore
//! struct MaintenanceGate { enabled: bool }
//!
//! #[async_trait]
//! impl Middleware for MaintenanceGate {
//!     fn name(&self) -> &'static str { "maintenance-gate" }
//!
//!     async fn reject(&self, _event: &Event) -> bool {
//!         self.enabled
//!     }
//! }
//!
//! let chain = MiddlewareChain::new()
//!     .with(middleware_factory(|| MaintenanceGate { enabled: false }));
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::foundation::event::Event;

/// A pre-dispatch admission guard.
///
/// Instances are created per event through a [`MiddlewareFactory`] and
/// dropped when the chain finishes; any cross-event state belongs in a
/// backing store the implementation deliberately owns and shares.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// A stable name for this middleware, used in logging.
    fn name(&self) -> &'static str {
        "middleware"
    }

    /// Returns true to stop processing this event.
    ///
    /// A veto is a legitimate, silent drop: no error is raised and no
    /// handler is invoked.
    async fn reject(&self, event: &Event) -> bool;

    /// Returns this node's private continuation, if it has one.
    fn next(&self) -> Option<Box<dyn Middleware>> {
        None
    }
}

/// Factory producing a fresh middleware instance per event.
pub type MiddlewareFactory = Arc<dyn Fn() -> Box<dyn Middleware> + Send + Sync>;

/// Wraps a plain constructor function into a [`MiddlewareFactory`].
pub fn middleware_factory<T, F>(make: F) -> MiddlewareFactory
where
    T: Middleware + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    Arc::new(move || Box::new(make()) as Box<dyn Middleware>)
}

/// Result of evaluating a [`MiddlewareChain`] for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Every node let the event through.
    Admitted,
    /// The node at `index` (declaration order) vetoed the event.
    Vetoed {
        /// Index of the vetoing top-level node.
        index: usize,
    },
}

impl Admission {
    /// Returns true if the event was vetoed.
    pub fn is_vetoed(&self) -> bool {
        matches!(self, Admission::Vetoed { .. })
    }
}

/// The configured, ordered middleware chain.
///
/// Execution order equals declaration order and is deterministic. The
/// evaluation of a rejecting node completes the drop immediately: neither
/// later top-level nodes nor the rejecting node's own continuation are
/// consulted.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    factories: Vec<MiddlewareFactory>,
}

impl MiddlewareChain {
    /// Creates an empty chain that admits everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware factory to the chain.
    pub fn push(&mut self, factory: MiddlewareFactory) {
        self.factories.push(factory);
    }

    /// Appends a middleware factory (builder pattern).
    pub fn with(mut self, factory: MiddlewareFactory) -> Self {
        self.factories.push(factory);
        self
    }

    /// Returns the number of top-level nodes.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns true if the chain has no nodes.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Evaluates the chain for one event.
    pub async fn evaluate(&self, event: &Event) -> Admission {
        for (index, factory) in self.factories.iter().enumerate() {
            let mut node = factory();
            loop {
                if node.reject(event).await {
                    return Admission::Vetoed { index };
                }
                match node.next() {
                    Some(continuation) => node = continuation,
                    None => break,
                }
            }
        }
        Admission::Admitted
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.factories.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::event::{ChatId, Event, MessageEvent, Sender, UserId};
    use crate::foundation::reply::{ApiResult, Replier, ReplyHandle};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

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

    fn message_event(chat: i64) -> Event {
        Event::Message(MessageEvent {
            chat: ChatId(chat),
            sender: Sender::new(UserId(1)),
            message_id: 1,
            text: "hi".to_string(),
            reply: ReplyHandle::new(ChatId(chat), Arc::new(NullReplier)),
        })
    }

    struct Recording {
        name: &'static str,
        verdict: bool,
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Middleware for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn reject(&self, _event: &Event) -> bool {
            self.order.lock().unwrap().push(self.name);
            self.verdict
        }
    }

    fn recording(
        name: &'static str,
        verdict: bool,
        order: &Arc<Mutex<Vec<&'static str>>>,
    ) -> MiddlewareFactory {
        let order = Arc::clone(order);
        middleware_factory(move || Recording {
            name,
            verdict,
            order: Arc::clone(&order),
        })
    }

    #[tokio::test]
    async fn test_declaration_order_and_admission() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let chain = MiddlewareChain::new()
            .with(recording("first", false, &order))
            .with(recording("second", false, &order));

        let admission = chain.evaluate(&message_event(1)).await;

        assert_eq!(admission, Admission::Admitted);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_veto_short_circuits() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let instantiated = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&instantiated);
        let order_late = Arc::clone(&order);

        let chain = MiddlewareChain::new()
            .with(recording("vetoer", true, &order))
            .with(middleware_factory(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Recording {
                    name: "late",
                    verdict: false,
                    order: Arc::clone(&order_late),
                }
            }));

        let admission = chain.evaluate(&message_event(1)).await;

        assert_eq!(admission, Admission::Vetoed { index: 0 });
        assert_eq!(*order.lock().unwrap(), vec!["vetoer"]);
        // The node after the vetoer was never even instantiated.
        assert_eq!(instantiated.load(Ordering::SeqCst), 0);
    }

    struct WithContinuation {
        verdict: bool,
        continuation_verdict: bool,
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Middleware for WithContinuation {
        fn name(&self) -> &'static str {
            "owner"
        }

        async fn reject(&self, _event: &Event) -> bool {
            self.order.lock().unwrap().push("owner");
            self.verdict
        }

        fn next(&self) -> Option<Box<dyn Middleware>> {
            Some(Box::new(Recording {
                name: "continuation",
                verdict: self.continuation_verdict,
                order: Arc::clone(&self.order),
            }))
        }
    }

    #[tokio::test]
    async fn test_continuation_runs_in_same_step() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let owner_order = Arc::clone(&order);

        let chain = MiddlewareChain::new()
            .with(middleware_factory(move || WithContinuation {
                verdict: false,
                continuation_verdict: false,
                order: Arc::clone(&owner_order),
            }))
            .with(recording("top-level", false, &order));

        chain.evaluate(&message_event(1)).await;

        assert_eq!(
            *order.lock().unwrap(),
            vec!["owner", "continuation", "top-level"]
        );
    }

    #[tokio::test]
    async fn test_continuation_veto_attributed_to_owner_step() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let owner_order = Arc::clone(&order);

        let chain = MiddlewareChain::new()
            .with(middleware_factory(move || WithContinuation {
                verdict: false,
                continuation_verdict: true,
                order: Arc::clone(&owner_order),
            }))
            .with(recording("top-level", false, &order));

        let admission = chain.evaluate(&message_event(1)).await;

        assert_eq!(admission, Admission::Vetoed { index: 0 });
        assert_eq!(*order.lock().unwrap(), vec!["owner", "continuation"]);
    }

    #[tokio::test]
    async fn test_rejecting_node_continuation_not_consulted() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let owner_order = Arc::clone(&order);

        let chain = MiddlewareChain::new().with(middleware_factory(move || WithContinuation {
            verdict: true,
            continuation_verdict: false,
            order: Arc::clone(&owner_order),
        }));

        let admission = chain.evaluate(&message_event(1)).await;

        assert_eq!(admission, Admission::Vetoed { index: 0 });
        assert_eq!(*order.lock().unwrap(), vec!["owner"]);
    }

    #[tokio::test]
    async fn test_empty_chain_admits() {
        let chain = MiddlewareChain::new();
        assert_eq!(chain.evaluate(&message_event(1)).await, Admission::Admitted);
    }
}
