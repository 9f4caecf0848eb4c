//! Event dispatcher for the Courier framework.
//!
//! The [`Dispatcher`] runs the whole per-event pipeline:
//!
//! 1. The session context tree is instantiated and loaded (pre-order)
//! 2. The middleware chain is evaluated in declaration order
//! 3. The listener registry selects the first fully-matching handler
//! 4. The handler runs with the loaded contexts and the event
//! 5. On failure, the most specific configured recovery function runs
//!
//! Exactly one handler executes per event per dispatch pass. A middleware
//! veto and a dispatch miss both end the pipeline silently; they are
//! outcomes, not errors. A session load failure preempts middleware and
//! dispatch entirely and is eligible for global recovery only.
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::builder()
//!     .session_tree(tree)
//!     .middleware(middleware_factory(ChatThrottle::new))
//!     .message_listener(commands)
//!     .callback_listener(confirmations)
//!     .on_error(global_recovery)
//!     .build();
//!
//! let outcome = dispatcher.dispatch(event).await;
//! ```

use std::sync::Arc;

use tracing::{Level, span, trace};

use crate::foundation::context::EventContext;
use crate::foundation::error::DispatchError;
use crate::foundation::event::Event;
use crate::framework::listener::Listener;
use crate::framework::middleware::{Admission, MiddlewareChain, MiddlewareFactory};
use crate::framework::recovery::{RecoveryFn, RecoveryTier};
use crate::framework::registry::ListenerRegistry;
use crate::framework::session::SessionTree;

/// How one event's dispatch pass ended.
///
/// The caller (the runtime) is responsible for logging drops at debug level
/// and unrecovered failures on the event source's failure path; the core
/// only reports.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A handler ran to completion.
    Handled {
        /// Name of the listener that owned the handler.
        listener: String,
        /// Method identifier of the handler.
        method: String,
    },
    /// A middleware vetoed the event. Silent drop.
    Vetoed,
    /// No handler matched the event. Silent drop.
    NoMatch,
    /// A failure occurred and the chosen recovery function absorbed it.
    Recovered {
        /// The failure that was recovered.
        error: Arc<DispatchError>,
        /// The tier that handled it.
        tier: RecoveryTier,
    },
    /// A failure occurred and no recovery function absorbed it.
    ///
    /// The failure surfaces on the event source's unhandled-failure path;
    /// it never affects any other event's pipeline.
    Unrecovered(Arc<DispatchError>),
}

impl DispatchOutcome {
    /// Returns true if a handler ran to completion.
    pub fn is_handled(&self) -> bool {
        matches!(self, DispatchOutcome::Handled { .. })
    }

    /// Returns true for the silent-drop outcomes.
    pub fn is_dropped(&self) -> bool {
        matches!(self, DispatchOutcome::Vetoed | DispatchOutcome::NoMatch)
    }
}

/// The central event dispatcher.
///
/// Configuration (session tree, middleware chain, listener registry, global
/// recovery) is assembled once through [`DispatcherBuilder`] and immutable
/// afterwards. `Dispatcher` is `Send + Sync`; different events' pipelines
/// may run concurrently on independent tasks, while the stages of a single
/// event always run strictly in order.
pub struct Dispatcher {
    sessions: SessionTree,
    middlewares: MiddlewareChain,
    registry: ListenerRegistry,
    global_recovery: Option<RecoveryFn>,
}

impl Dispatcher {
    /// Creates a builder for a new dispatcher.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Runs the full pipeline for one event.
    pub async fn dispatch(&self, event: Event) -> DispatchOutcome {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            kind = %event.kind(),
            chat = event.chat().0,
        );
        let _enter = span.enter();

        // Stage 1: session contexts. A failure here preempts everything
        // else; only the global recovery tier is eligible.
        let contexts = match self.sessions.load_for(&event).await {
            Ok(contexts) => contexts,
            Err(error) => {
                let ctx = Arc::new(EventContext::new(event));
                return self.recover(ctx, Arc::new(error), None).await;
            }
        };

        let ctx = Arc::new(EventContext::with_contexts(event, contexts));

        // Stage 2: middleware admission.
        if let Admission::Vetoed { index } = self.middlewares.evaluate(ctx.event()).await {
            trace!(index, "middleware vetoed event");
            return DispatchOutcome::Vetoed;
        }

        // Stage 3: handler selection. First full match wins.
        let Some(selection) = self.registry.select(ctx.event()) else {
            trace!("no handler matched");
            return DispatchOutcome::NoMatch;
        };
        let listener = selection.listener.to_string();
        let method = selection.handler.method().to_string();
        let override_recovery = selection.handler.recovery().cloned();

        trace!(listener = %listener, method = %method, "handler selected");

        // Stage 4: handler execution, stage 5: recovery on failure.
        match selection.handler.invoke(Arc::clone(&ctx)).await {
            Ok(()) => DispatchOutcome::Handled { listener, method },
            Err(cause) => {
                let error = Arc::new(DispatchError::handler_execution(listener, method, cause));
                self.recover(ctx, error, override_recovery.as_ref()).await
            }
        }
    }

    /// Resolves a failure to the most specific configured recovery tier.
    ///
    /// Exactly one tier runs per failure: the method override when the
    /// failing handler carries one, otherwise the global function. A chosen
    /// tier that rethrows leaves the failure unrecovered; it is never
    /// forwarded to the other tier.
    async fn recover(
        &self,
        ctx: Arc<EventContext>,
        error: Arc<DispatchError>,
        override_recovery: Option<&RecoveryFn>,
    ) -> DispatchOutcome {
        let (tier, recovery) = match override_recovery {
            Some(recovery) => (RecoveryTier::Method, recovery),
            None => match &self.global_recovery {
                Some(recovery) => (RecoveryTier::Global, recovery),
                None => return DispatchOutcome::Unrecovered(error),
            },
        };

        match recovery(ctx, Arc::clone(&error)).await {
            Ok(()) => DispatchOutcome::Recovered { error, tier },
            Err(rethrown) => {
                trace!(tier = %tier, error = %rethrown, "recovery function rethrew");
                DispatchOutcome::Unrecovered(error)
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("sessions", &self.sessions)
            .field("middlewares", &self.middlewares)
            .field("registry", &self.registry)
            .field("has_global_recovery", &self.global_recovery.is_some())
            .finish()
    }
}

/// Builder assembling a [`Dispatcher`] at startup.
#[derive(Default)]
pub struct DispatcherBuilder {
    sessions: SessionTree,
    middlewares: MiddlewareChain,
    registry: ListenerRegistry,
    global_recovery: Option<RecoveryFn>,
}

impl DispatcherBuilder {
    /// Sets the session context tree.
    pub fn session_tree(mut self, tree: SessionTree) -> Self {
        self.sessions = tree;
        self
    }

    /// Appends a middleware factory to the chain.
    pub fn middleware(mut self, factory: MiddlewareFactory) -> Self {
        self.middlewares.push(factory);
        self
    }

    /// Appends a listener for message-kind events.
    pub fn message_listener(mut self, listener: Listener) -> Self {
        self.registry.add_message(listener);
        self
    }

    /// Appends a listener for callback-kind events.
    pub fn callback_listener(mut self, listener: Listener) -> Self {
        self.registry.add_callback(listener);
        self
    }

    /// Appends a listener to both event kinds.
    pub fn listener(mut self, listener: Listener) -> Self {
        self.registry.add_generic(listener);
        self
    }

    /// Sets the global recovery function.
    pub fn on_error(mut self, recovery: RecoveryFn) -> Self {
        self.global_recovery = Some(recovery);
        self
    }

    /// Builds the dispatcher.
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            sessions: self.sessions,
            middlewares: self.middlewares,
            registry: self.registry,
            global_recovery: self.global_recovery,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::event::{CallbackEvent, ChatId, MessageEvent, Sender, UserId};
    use crate::foundation::reply::{ApiResult, Replier, ReplyHandle};
    use crate::framework::listener::HandlerDef;
    use crate::framework::middleware::{Middleware, middleware_factory};
    use crate::framework::predicate::{callback_data, is_command};
    use crate::framework::recovery::recovery_fn;
    use crate::framework::session::{LoadedContexts, SessionContext, context_factory};
    use async_trait::async_trait;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingReplier {
        sent: AtomicUsize,
    }

    #[async_trait]
    impl Replier for CountingReplier {
        async fn send_text(&self, _chat: ChatId, _text: &str) -> ApiResult<i64> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        }

        async fn answer_callback(&self, _callback_id: &str, _text: Option<&str>) -> ApiResult<()> {
            Ok(())
        }
    }

    fn counting_replier() -> Arc<CountingReplier> {
        Arc::new(CountingReplier {
            sent: AtomicUsize::new(0),
        })
    }

    fn message_from(chat: i64, text: &str, replier: Arc<CountingReplier>) -> Event {
        Event::Message(MessageEvent {
            chat: ChatId(chat),
            sender: Sender::new(UserId(chat)),
            message_id: 1,
            text: text.to_string(),
            reply: ReplyHandle::new(ChatId(chat), replier),
        })
    }

    fn message(text: &str) -> Event {
        message_from(1, text, counting_replier())
    }

    fn callback(data: &str) -> Event {
        Event::Callback(CallbackEvent {
            chat: ChatId(1),
            sender: Sender::new(UserId(1)),
            callback_id: "cb".to_string(),
            data: data.to_string(),
            reply: ReplyHandle::new(ChatId(1), counting_replier()),
        })
    }

    fn counting_def(method: &str, counter: &Arc<AtomicUsize>) -> HandlerDef {
        let counter = Arc::clone(counter);
        HandlerDef::new(method, move |_ctx: Arc<EventContext>| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    fn failing_def(method: &str) -> HandlerDef {
        HandlerDef::new(method, |_ctx: Arc<EventContext>| async move {
            anyhow::bail!("boom")
        })
    }

    // Scenario: "/start" routed to the predicate-guarded handler, nothing
    // else in the same or later listeners runs.
    #[tokio::test]
    async fn test_command_routes_to_first_match_only() {
        let start_calls = Arc::new(AtomicUsize::new(0));
        let other_calls = Arc::new(AtomicUsize::new(0));

        let dispatcher = Dispatcher::builder()
            .message_listener(
                Listener::new("onboarding")
                    .handler(
                        counting_def("start", &start_calls).predicate(is_command("start")),
                    )
                    .handler(counting_def("fallback", &other_calls)),
            )
            .message_listener(
                Listener::new("later").handler(counting_def("catch_all", &other_calls)),
            )
            .build();

        let outcome = dispatcher.dispatch(message("/start")).await;

        match outcome {
            DispatchOutcome::Handled { listener, method } => {
                assert_eq!(listener, "onboarding");
                assert_eq!(method, "start");
            }
            other => panic!("expected Handled, got {other:?}"),
        }
        assert_eq!(start_calls.load(Ordering::SeqCst), 1);
        assert_eq!(other_calls.load(Ordering::SeqCst), 0);
    }

    // Scenario: callback "confirm" skips a non-matching first listener and
    // lands in the second.
    #[tokio::test]
    async fn test_callback_falls_through_to_second_listener() {
        let cancel_calls = Arc::new(AtomicUsize::new(0));
        let confirm_calls = Arc::new(AtomicUsize::new(0));

        let dispatcher = Dispatcher::builder()
            .callback_listener(
                Listener::new("cancellations").handler(
                    counting_def("cancel", &cancel_calls).predicate(callback_data("cancel")),
                ),
            )
            .callback_listener(
                Listener::new("confirmations").handler(
                    counting_def("confirm", &confirm_calls).predicate(callback_data("confirm")),
                ),
            )
            .build();

        let outcome = dispatcher.dispatch(callback("confirm")).await;

        match outcome {
            DispatchOutcome::Handled { listener, method } => {
                assert_eq!(listener, "confirmations");
                assert_eq!(method, "confirm");
            }
            other => panic!("expected Handled, got {other:?}"),
        }
        assert_eq!(cancel_calls.load(Ordering::SeqCst), 0);
        assert_eq!(confirm_calls.load(Ordering::SeqCst), 1);
    }

    struct RejectChat42;

    #[async_trait]
    impl Middleware for RejectChat42 {
        fn name(&self) -> &'static str {
            "reject-chat-42"
        }

        async fn reject(&self, event: &Event) -> bool {
            event.chat() == ChatId(42)
        }
    }

    // Scenario: a veto drops the event with no handler, no recovery, and
    // no reply.
    #[tokio::test]
    async fn test_middleware_veto_is_a_silent_drop() {
        let handler_calls = Arc::new(AtomicUsize::new(0));
        let recovery_calls = Arc::new(AtomicUsize::new(0));
        let recovery_counter = Arc::clone(&recovery_calls);
        let replier = counting_replier();

        let dispatcher = Dispatcher::builder()
            .middleware(middleware_factory(|| RejectChat42))
            .message_listener(
                Listener::new("all").handler(counting_def("any", &handler_calls)),
            )
            .on_error(recovery_fn(move |_ctx, _error| {
                let counter = Arc::clone(&recovery_counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }))
            .build();

        let event = message_from(42, "hello", Arc::clone(&replier));
        let outcome = dispatcher.dispatch(event).await;

        assert!(matches!(outcome, DispatchOutcome::Vetoed));
        assert_eq!(handler_calls.load(Ordering::SeqCst), 0);
        assert_eq!(recovery_calls.load(Ordering::SeqCst), 0);
        assert_eq!(replier.sent.load(Ordering::SeqCst), 0);

        // Other chats pass the same chain untouched.
        let outcome = dispatcher
            .dispatch(message_from(7, "hello", counting_replier()))
            .await;
        assert!(outcome.is_handled());
    }

    struct FailingContext;

    #[async_trait]
    impl SessionContext for FailingContext {
        fn name(&self) -> &'static str {
            "profile"
        }

        async fn load(&mut self, _event: &Event, _loaded: &LoadedContexts) -> anyhow::Result<()> {
            anyhow::bail!("profile backend down")
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    // Scenario: a failing session load reaches only the global recovery
    // function, with zero middleware evaluations and zero handlers.
    #[tokio::test]
    async fn test_session_failure_goes_to_global_only() {
        let handler_calls = Arc::new(AtomicUsize::new(0));
        let middleware_instances = Arc::new(AtomicUsize::new(0));
        let override_calls = Arc::new(AtomicUsize::new(0));
        let global_calls = Arc::new(AtomicUsize::new(0));
        let middleware_counter = Arc::clone(&middleware_instances);
        let override_counter = Arc::clone(&override_calls);
        let global_counter = Arc::clone(&global_calls);

        let mut tree = SessionTree::builder();
        tree.root(context_factory(|| FailingContext));

        let dispatcher = Dispatcher::builder()
            .session_tree(tree.build())
            .middleware(middleware_factory(move || {
                middleware_counter.fetch_add(1, Ordering::SeqCst);
                RejectChat42
            }))
            .message_listener(
                Listener::new("all").handler(
                    counting_def("any", &handler_calls).on_error(
                        recovery_fn(move |_ctx, _error| {
                            let counter = Arc::clone(&override_counter);
                            async move {
                                counter.fetch_add(1, Ordering::SeqCst);
                                Ok(())
                            }
                        }),
                    ),
                ),
            )
            .on_error(recovery_fn(move |_ctx, error| {
                let counter = Arc::clone(&global_counter);
                async move {
                    assert!(error.is_session_load());
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }))
            .build();

        let outcome = dispatcher.dispatch(message("hello")).await;

        match outcome {
            DispatchOutcome::Recovered { error, tier } => {
                assert!(error.is_session_load());
                assert_eq!(tier, RecoveryTier::Global);
            }
            other => panic!("expected Recovered, got {other:?}"),
        }
        assert_eq!(handler_calls.load(Ordering::SeqCst), 0);
        assert_eq!(middleware_instances.load(Ordering::SeqCst), 0);
        assert_eq!(override_calls.load(Ordering::SeqCst), 0);
        assert_eq!(global_calls.load(Ordering::SeqCst), 1);
    }

    // A method-level override receives the failure exactly once; the global
    // function is never consulted.
    #[tokio::test]
    async fn test_method_override_shadows_global() {
        let override_calls = Arc::new(AtomicUsize::new(0));
        let global_calls = Arc::new(AtomicUsize::new(0));
        let override_counter = Arc::clone(&override_calls);
        let global_counter = Arc::clone(&global_calls);

        let dispatcher = Dispatcher::builder()
            .message_listener(
                Listener::new("billing").handler(
                    failing_def("charge").on_error(recovery_fn(
                        move |_ctx, error| {
                            let counter = Arc::clone(&override_counter);
                            async move {
                                assert!(!error.is_session_load());
                                counter.fetch_add(1, Ordering::SeqCst);
                                Ok(())
                            }
                        },
                    )),
                ),
            )
            .on_error(recovery_fn(move |_ctx, _error| {
                let counter = Arc::clone(&global_counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }))
            .build();

        let outcome = dispatcher.dispatch(message("hello")).await;

        match outcome {
            DispatchOutcome::Recovered { tier, .. } => assert_eq!(tier, RecoveryTier::Method),
            other => panic!("expected Recovered, got {other:?}"),
        }
        assert_eq!(override_calls.load(Ordering::SeqCst), 1);
        assert_eq!(global_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rethrowing_override_leaves_failure_unrecovered() {
        let global_calls = Arc::new(AtomicUsize::new(0));
        let global_counter = Arc::clone(&global_calls);

        let dispatcher = Dispatcher::builder()
            .message_listener(
                Listener::new("billing").handler(
                    failing_def("charge").on_error(recovery_fn(|_ctx, _error| async move {
                        anyhow::bail!("cannot recover")
                    })),
                ),
            )
            .on_error(recovery_fn(move |_ctx, _error| {
                let counter = Arc::clone(&global_counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }))
            .build();

        let outcome = dispatcher.dispatch(message("hello")).await;

        assert!(matches!(outcome, DispatchOutcome::Unrecovered(_)));
        // Tiers never chain: the global function stays untouched.
        assert_eq!(global_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_recovery_configured_is_unrecovered() {
        let dispatcher = Dispatcher::builder()
            .message_listener(
                Listener::new("billing").handler(failing_def("charge")),
            )
            .build();

        let outcome = dispatcher.dispatch(message("hello")).await;

        match outcome {
            DispatchOutcome::Unrecovered(error) => {
                assert!(error.to_string().contains("billing::charge"));
            }
            other => panic!("expected Unrecovered, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_match_is_a_silent_drop() {
        let recovery_calls = Arc::new(AtomicUsize::new(0));
        let recovery_counter = Arc::clone(&recovery_calls);

        let dispatcher = Dispatcher::builder()
            .message_listener(
                Listener::new("commands").handler(
                    failing_def("start").predicate(is_command("start")),
                ),
            )
            .on_error(recovery_fn(move |_ctx, _error| {
                let counter = Arc::clone(&recovery_counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }))
            .build();

        let outcome = dispatcher.dispatch(message("just chatting")).await;

        assert!(matches!(outcome, DispatchOutcome::NoMatch));
        assert!(outcome.is_dropped());
        assert_eq!(recovery_calls.load(Ordering::SeqCst), 0);
    }

    // An empty predicate list matches every event of the lane, subject to
    // declaration order.
    #[tokio::test]
    async fn test_empty_predicates_match_unconditionally() {
        let first_calls = Arc::new(AtomicUsize::new(0));
        let second_calls = Arc::new(AtomicUsize::new(0));

        let dispatcher = Dispatcher::builder()
            .message_listener(
                Listener::new("all")
                    .handler(counting_def("first", &first_calls))
                    .handler(counting_def("second", &second_calls)),
            )
            .build();

        dispatcher.dispatch(message("a")).await;
        dispatcher.dispatch(message("b")).await;

        // At most one handler per event: the first declaration always wins.
        assert_eq!(first_calls.load(Ordering::SeqCst), 2);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generic_listener_serves_both_kinds() {
        let calls = Arc::new(AtomicUsize::new(0));

        let dispatcher = Dispatcher::builder()
            .listener(Listener::new("audit").handler(counting_def("record", &calls)))
            .build();

        assert!(dispatcher.dispatch(message("hi")).await.is_handled());
        assert!(dispatcher.dispatch(callback("confirm")).await.is_handled());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_loaded_contexts_reach_handler() {
        #[derive(Default)]
        struct Tag {
            value: String,
        }

        #[async_trait]
        impl SessionContext for Tag {
            fn name(&self) -> &'static str {
                "tag"
            }

            async fn load(
                &mut self,
                event: &Event,
                _loaded: &LoadedContexts,
            ) -> anyhow::Result<()> {
                self.value = format!("{}:{}", event.kind(), event.chat());
                Ok(())
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        let mut tree = SessionTree::builder();
        tree.root(context_factory(Tag::default));

        let dispatcher = Dispatcher::builder()
            .session_tree(tree.build())
            .message_listener(Listener::new("all").handler(HandlerDef::new(
                "check",
                |ctx: Arc<EventContext>| async move {
                    let tag = ctx
                        .context::<Tag>()
                        .ok_or_else(|| anyhow::anyhow!("tag missing"))?;
                    anyhow::ensure!(tag.value == "message:1");
                    Ok(())
                },
            )))
            .build();

        assert!(dispatcher.dispatch(message("hi")).await.is_handled());
    }
}
