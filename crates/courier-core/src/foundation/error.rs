//! Error taxonomy for the dispatch pipeline.
//!
//! Only genuine failures become a [`DispatchError`]. A middleware veto and a
//! dispatch miss are deliberate drop outcomes, not errors, and never reach a
//! recovery handler.

use thiserror::Error;

/// A failure raised during an event's dispatch pipeline.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A session context node's `load` failed.
    ///
    /// Fatal to the event: contexts loaded so far are discarded and the
    /// event reaches neither middleware nor dispatch. Only the global
    /// recovery handler is eligible, since no handler has been selected yet.
    #[error("session context '{context}' failed to load: {cause}")]
    SessionLoad {
        /// Name of the failing context node.
        context: String,
        /// The underlying failure.
        cause: anyhow::Error,
    },

    /// A handler's body failed.
    ///
    /// Eligible for method-level-then-global recovery resolution.
    #[error("handler '{listener}::{method}' failed: {cause}")]
    HandlerExecution {
        /// Name of the listener owning the handler.
        listener: String,
        /// Method identifier of the failing handler.
        method: String,
        /// The underlying failure.
        cause: anyhow::Error,
    },
}

impl DispatchError {
    /// Creates a session load error.
    pub fn session_load(context: impl Into<String>, cause: anyhow::Error) -> Self {
        Self::SessionLoad {
            context: context.into(),
            cause,
        }
    }

    /// Creates a handler execution error.
    pub fn handler_execution(
        listener: impl Into<String>,
        method: impl Into<String>,
        cause: anyhow::Error,
    ) -> Self {
        Self::HandlerExecution {
            listener: listener.into(),
            method: method.into(),
            cause,
        }
    }

    /// Returns true for session load failures.
    pub fn is_session_load(&self) -> bool {
        matches!(self, Self::SessionLoad { .. })
    }

    /// Returns the underlying failure.
    pub fn cause(&self) -> &anyhow::Error {
        match self {
            Self::SessionLoad { cause, .. } => cause,
            Self::HandlerExecution { cause, .. } => cause,
        }
    }
}
