//! Session context tree.
//!
//! Session contexts populate event-scoped derived state (a user profile, a
//! locale, a feature flag) before any routing decision, so handlers receive
//! ready-to-use context.
//!
//! # Tree Shape
//!
//! The tree is a flat table of nodes with explicit child index references,
//! built through [`SessionTreeBuilder`]. Nodes are appended once and only
//! ever reference earlier-created [`NodeId`]s, so the structure is acyclic
//! by construction and traversal stays iterative.
//!
//! # Per-Event Lifecycle
//!
//! Every node is freshly instantiated per event through its
//! [`ContextFactory`]; loaded instances never outlive the event. Traversal
//! is pre-order depth-first: a parent's `load` completes before its children
//! begin, and a child can read what its ancestors loaded through
//! [`LoadedContexts::get`].
//!
//! # Example
//!
//! ```rust,ignore
//! let mut builder = SessionTree::builder();
//! let profile = builder.root(context_factory(UserProfile::default));
//! builder.child(profile, context_factory(Locale::default));
//! let tree = builder.build();
//!
//! let contexts = tree.load_for(&event).await?;
//! ```

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::foundation::error::DispatchError;
use crate::foundation::event::Event;

// ============================================================================
// Session Context Trait
// ============================================================================

/// Event-scoped state loader.
///
/// Implementations mutate their own fields in `load` and are retained in
/// [`LoadedContexts`] for the rest of the event's pipeline. A failing `load`
/// aborts the whole tree traversal.
#[async_trait]
pub trait SessionContext: Any + Send + Sync {
    /// A stable name for this context node, used in error reporting.
    fn name(&self) -> &'static str;

    /// Loads this node's state for the given event.
    ///
    /// `loaded` holds the contexts loaded so far, in pre-order; ancestors
    /// of this node are guaranteed to be present.
    async fn load(&mut self, event: &Event, loaded: &LoadedContexts) -> anyhow::Result<()>;

    /// Returns self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Factory producing a fresh context node instance per event.
pub type ContextFactory = Arc<dyn Fn() -> Box<dyn SessionContext> + Send + Sync>;

/// Wraps a plain constructor function into a [`ContextFactory`].
pub fn context_factory<T, F>(make: F) -> ContextFactory
where
    T: SessionContext,
    F: Fn() -> T + Send + Sync + 'static,
{
    Arc::new(move || Box::new(make()) as Box<dyn SessionContext>)
}

// ============================================================================
// Loaded Contexts
// ============================================================================

/// The session contexts loaded for one event, in pre-order.
#[derive(Default)]
pub struct LoadedContexts {
    items: Vec<Box<dyn SessionContext>>,
}

impl LoadedContexts {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of loaded contexts.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing has been loaded.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Looks up a loaded context by concrete type.
    pub fn get<T: SessionContext>(&self) -> Option<&T> {
        self.items
            .iter()
            .find_map(|ctx| ctx.as_any().downcast_ref::<T>())
    }

    /// Returns the names of the loaded contexts, in load order.
    pub fn names(&self) -> Vec<&'static str> {
        self.items.iter().map(|ctx| ctx.name()).collect()
    }

    fn push(&mut self, ctx: Box<dyn SessionContext>) {
        self.items.push(ctx);
    }
}

impl std::fmt::Debug for LoadedContexts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedContexts")
            .field("names", &self.names())
            .finish()
    }
}

// ============================================================================
// Session Tree
// ============================================================================

/// Index of a node within a [`SessionTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

#[derive(Clone)]
struct SessionNode {
    factory: ContextFactory,
    children: Vec<usize>,
}

/// The configured tree of session context loaders.
///
/// Built once at startup; `load_for` instantiates and loads a fresh set of
/// nodes for every event.
#[derive(Clone, Default)]
pub struct SessionTree {
    nodes: Vec<SessionNode>,
    roots: Vec<usize>,
}

impl SessionTree {
    /// Creates a builder for a new tree.
    pub fn builder() -> SessionTreeBuilder {
        SessionTreeBuilder::default()
    }

    /// Creates an empty tree that loads nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the total number of configured nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Instantiates and loads the tree for one event.
    ///
    /// Traversal is iterative pre-order depth-first. On the first failing
    /// node the traversal aborts: contexts loaded so far are discarded and
    /// a [`DispatchError::SessionLoad`] is returned.
    pub async fn load_for(&self, event: &Event) -> Result<LoadedContexts, DispatchError> {
        let mut loaded = LoadedContexts::new();
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            let mut ctx = (node.factory)();
            let name = ctx.name();

            if let Err(cause) = ctx.load(event, &loaded).await {
                return Err(DispatchError::session_load(name, cause));
            }
            loaded.push(ctx);

            stack.extend(node.children.iter().rev().copied());
        }

        Ok(loaded)
    }
}

impl std::fmt::Debug for SessionTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTree")
            .field("node_count", &self.nodes.len())
            .field("root_count", &self.roots.len())
            .finish()
    }
}

/// Builder for a [`SessionTree`].
///
/// Nodes are created with [`root`](Self::root) and attached with
/// [`child`](Self::child); both return the [`NodeId`] used to reference the
/// new node as a parent later.
#[derive(Default)]
pub struct SessionTreeBuilder {
    nodes: Vec<SessionNode>,
    roots: Vec<usize>,
}

impl SessionTreeBuilder {
    /// Adds a top-level node.
    pub fn root(&mut self, factory: ContextFactory) -> NodeId {
        let index = self.push(factory);
        self.roots.push(index);
        NodeId(index)
    }

    /// Adds a node as a child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` was not produced by this builder.
    pub fn child(&mut self, parent: NodeId, factory: ContextFactory) -> NodeId {
        assert!(
            parent.0 < self.nodes.len(),
            "parent node id does not belong to this builder"
        );
        let index = self.push(factory);
        self.nodes[parent.0].children.push(index);
        NodeId(index)
    }

    /// Finalizes the tree.
    pub fn build(self) -> SessionTree {
        SessionTree {
            nodes: self.nodes,
            roots: self.roots,
        }
    }

    fn push(&mut self, factory: ContextFactory) -> usize {
        let index = self.nodes.len();
        self.nodes.push(SessionNode {
            factory,
            children: Vec::new(),
        });
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::event::{ChatId, Event, MessageEvent, Sender, UserId};
    use crate::foundation::reply::{ApiResult, Replier, ReplyHandle};
    use async_trait::async_trait;
    use std::sync::Mutex;

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

    fn message_event(text: &str) -> Event {
        Event::Message(MessageEvent {
            chat: ChatId(1),
            sender: Sender::new(UserId(1)),
            message_id: 1,
            text: text.to_string(),
            reply: ReplyHandle::new(ChatId(1), Arc::new(NullReplier)),
        })
    }

    struct Recording {
        name: &'static str,
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl SessionContext for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn load(&mut self, _event: &Event, _loaded: &LoadedContexts) -> anyhow::Result<()> {
            self.order.lock().unwrap().push(self.name);
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn recording(name: &'static str, order: &Arc<Mutex<Vec<&'static str>>>) -> ContextFactory {
        let order = Arc::clone(order);
        context_factory(move || Recording {
            name,
            order: Arc::clone(&order),
        })
    }

    #[tokio::test]
    async fn test_preorder_traversal() {
        let order = Arc::new(Mutex::new(Vec::new()));

        // a ── a1, a2
        // b ── b1
        let mut builder = SessionTree::builder();
        let a = builder.root(recording("a", &order));
        builder.child(a, recording("a1", &order));
        builder.child(a, recording("a2", &order));
        let b = builder.root(recording("b", &order));
        builder.child(b, recording("b1", &order));
        let tree = builder.build();

        let loaded = tree.load_for(&message_event("hi")).await.unwrap();

        assert_eq!(loaded.len(), 5);
        assert_eq!(*order.lock().unwrap(), vec!["a", "a1", "a2", "b", "b1"]);
    }

    struct Failing;

    #[async_trait]
    impl SessionContext for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn load(&mut self, _event: &Event, _loaded: &LoadedContexts) -> anyhow::Result<()> {
            anyhow::bail!("backend unavailable")
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[tokio::test]
    async fn test_failure_aborts_traversal() {
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut builder = SessionTree::builder();
        let root = builder.root(recording("first", &order));
        builder.child(root, context_factory(|| Failing));
        builder.root(recording("never", &order));
        let tree = builder.build();

        let err = tree.load_for(&message_event("hi")).await.unwrap_err();

        assert!(err.is_session_load());
        assert!(err.to_string().contains("failing"));
        // Nodes after the failure were never instantiated.
        assert_eq!(*order.lock().unwrap(), vec!["first"]);
    }

    #[derive(Default)]
    struct Profile {
        user_name: String,
    }

    #[async_trait]
    impl SessionContext for Profile {
        fn name(&self) -> &'static str {
            "profile"
        }

        async fn load(&mut self, event: &Event, _loaded: &LoadedContexts) -> anyhow::Result<()> {
            self.user_name = format!("user-{}", event.sender().user_id);
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Default)]
    struct Greeting {
        text: String,
    }

    #[async_trait]
    impl SessionContext for Greeting {
        fn name(&self) -> &'static str {
            "greeting"
        }

        async fn load(&mut self, _event: &Event, loaded: &LoadedContexts) -> anyhow::Result<()> {
            let profile = loaded
                .get::<Profile>()
                .ok_or_else(|| anyhow::anyhow!("profile not loaded"))?;
            self.text = format!("hello, {}", profile.user_name);
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[tokio::test]
    async fn test_child_reads_parent_state() {
        let mut builder = SessionTree::builder();
        let profile = builder.root(context_factory(Profile::default));
        builder.child(profile, context_factory(Greeting::default));
        let tree = builder.build();

        let loaded = tree.load_for(&message_event("hi")).await.unwrap();

        assert_eq!(loaded.get::<Greeting>().unwrap().text, "hello, user-1");
    }

    #[tokio::test]
    async fn test_empty_tree_loads_nothing() {
        let tree = SessionTree::empty();
        let loaded = tree.load_for(&message_event("hi")).await.unwrap();
        assert!(loaded.is_empty());
    }
}
