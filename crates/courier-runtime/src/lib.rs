//! Courier Runtime - Bootstrap layer for the Courier bot framework.
//!
//! This crate provides:
//! - Configuration loading (`CourierConfig`, `ConfigLoader`) with TOML
//!   files, profiles and `COURIER_*` environment overrides
//! - Logging initialization (`LoggingBuilder`): the injected log sink the
//!   core emits into
//! - Runtime orchestration (`CourierRuntime`): constructs the configured
//!   event source (polling or webhook, matched exhaustively in one place)
//!   and drives one dispatch task per inbound event
//!
//! # Example
//!
//! ```ignore
//! use courier_runtime::CourierRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = CourierRuntime::builder()
//!         .config_file("courier.toml")
//!         .dispatcher(dispatcher)
//!         .build()?;
//!
//!     // Runs until Ctrl+C / SIGTERM
//!     runtime.run(MyPlatform::new()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Transport Features
//!
//! - `webhook`: enables the webhook event source (axum listener)
//! - `http-client`: enables the generic HTTP API client capability

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, CourierConfig, LogFormat, LogLevel, LogOutput,
    LoggingConfig, Profile,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use runtime::{CourierRuntime, RuntimeBuilder};

// Re-export tracing for use by embedders
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
