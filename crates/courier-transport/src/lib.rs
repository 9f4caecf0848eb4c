//! # Courier Transport
//!
//! Event source transports for the Courier bot framework.
//!
//! This crate owns *how* events arrive, never *what* they mean: the wire
//! protocol stays with a platform adapter implementing the boundary traits
//! in [`source`].
//!
//! Two source shapes are provided, selected by [`FetchStrategy`]:
//!
//! - [`PollingSource`] pulls update batches through an [`UpdatePuller`] in
//!   a long-poll loop with failure backoff
//! - [`WebhookSource`] *(feature `webhook`)* binds an axum HTTP listener
//!   and decodes pushed updates through an [`UpdateDecoder`]
//!
//! The optional [`HttpApiClient`] *(feature `http-client`)* is a generic
//! token-authenticated JSON client adapters can build on.

pub mod error;
pub mod polling;
pub mod source;

#[cfg(feature = "http-client")]
pub mod http_client;
#[cfg(feature = "webhook")]
pub mod webhook;

pub use error::{DecodeError, TransportError, TransportResult};
pub use polling::PollingSource;
pub use source::{
    EventSink, EventSource, FetchStrategy, PlatformAdapter, PollingConfig, ReadyCallback,
    UpdateDecoder, UpdatePuller, WebhookConfig, ready_callback,
};

#[cfg(feature = "http-client")]
pub use http_client::HttpApiClient;
#[cfg(feature = "webhook")]
pub use webhook::WebhookSource;
