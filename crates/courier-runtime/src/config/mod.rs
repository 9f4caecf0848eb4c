//! Configuration loading and schema.

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{CourierConfig, LogFormat, LogLevel, LogOutput, LoggingConfig};
