//! Recovery functions for dispatch failures.
//!
//! A recovery function is the configured reaction to a [`DispatchError`].
//! Two scopes exist: one optional global function for the whole dispatcher,
//! and zero-or-one method-level override per handler. Resolution picks
//! exactly one tier per failure; tiers never chain automatically, so a
//! method-level function that wants the global behavior must invoke it
//! explicitly.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::foundation::context::EventContext;
use crate::foundation::error::DispatchError;

/// A type-erased recovery function.
///
/// Returning `Err` rethrows: the failure escapes the core and surfaces on
/// the event source's own unhandled-failure path.
pub type RecoveryFn =
    Arc<dyn Fn(Arc<EventContext>, Arc<DispatchError>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Wraps an async closure into a [`RecoveryFn`].
///
/// # Example
///
/// ```rust,ignore
/// let global = recovery_fn(|ctx, error| async move {
///     ctx.reply().reply("something went wrong").await?;
///     tracing::warn!(%error, "recovered dispatch failure");
///     Ok(())
/// });
/// ```
pub fn recovery_fn<F, Fut>(f: F) -> RecoveryFn
where
    F: Fn(Arc<EventContext>, Arc<DispatchError>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |ctx, error| Box::pin(f(ctx, error)))
}

/// The scope a failure was resolved at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryTier {
    /// The failing handler's own override.
    Method,
    /// The dispatcher-wide default.
    Global,
}

impl RecoveryTier {
    /// Returns the tier as a lowercase string, for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryTier::Method => "method",
            RecoveryTier::Global => "global",
        }
    }
}

impl std::fmt::Display for RecoveryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
