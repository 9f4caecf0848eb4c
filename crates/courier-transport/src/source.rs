//! Event source boundary.
//!
//! An event source acquires events from the bot platform and forwards them
//! into the core through an [`EventSink`]. Two source shapes exist,
//! [`PollingSource`](crate::polling::PollingSource) and
//! [`WebhookSource`](crate::webhook::WebhookSource), selected by the
//! [`FetchStrategy`] configuration.
//!
//! The wire protocol itself stays outside this crate: a
//! [`PlatformAdapter`] supplies the [`UpdatePuller`] and [`UpdateDecoder`]
//! that know how to talk to a concrete platform.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use courier_core::Event;

use crate::error::{DecodeError, TransportError, TransportResult};

// ============================================================================
// Fetch Strategy Configuration
// ============================================================================

/// Configuration for the polling event source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Platform bot token.
    pub token: String,

    /// Discard the pre-existing update backlog once at startup.
    pub drop_pending_updates: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            drop_pending_updates: false,
        }
    }
}

/// Configuration for the webhook event source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Platform bot token; also forms the webhook path.
    pub token: String,

    /// Port to bind the HTTP listener on.
    pub port: u16,

    /// Path to a TLS private key.
    ///
    /// In-process TLS is not supported; setting this fails fast at source
    /// construction with a pointer to terminate TLS at a fronting proxy.
    pub tls_key: Option<PathBuf>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            port: 8443,
            tls_key: None,
        }
    }
}

/// Selects how events are acquired from the platform.
///
/// Uses a tagged union with a `type` field to determine the variant:
///
/// ```toml
/// [fetch]
/// type = "POLLING"
/// token = "${BOT_TOKEN}"
/// drop_pending_updates = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchStrategy {
    /// Pull updates from the platform in a long-poll loop.
    Polling(PollingConfig),

    /// Bind an HTTP listener and let the platform push updates.
    Webhook(WebhookConfig),
}

impl Default for FetchStrategy {
    fn default() -> Self {
        Self::Polling(PollingConfig::default())
    }
}

impl FetchStrategy {
    /// Returns the configured bot token.
    pub fn token(&self) -> &str {
        match self {
            FetchStrategy::Polling(c) => &c.token,
            FetchStrategy::Webhook(c) => &c.token,
        }
    }

    /// Returns the strategy name as a lowercase string, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            FetchStrategy::Polling(_) => "polling",
            FetchStrategy::Webhook(_) => "webhook",
        }
    }
}

/// Callback invoked once the webhook listener is bound, with the bot token
/// and the bound port. Typically used to register the webhook URL with the
/// platform.
pub type ReadyCallback =
    std::sync::Arc<dyn Fn(String, u16) -> futures::future::BoxFuture<'static, ()> + Send + Sync>;

/// Wraps an async closure into a [`ReadyCallback`].
pub fn ready_callback<F, Fut>(f: F) -> ReadyCallback
where
    F: Fn(String, u16) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    std::sync::Arc::new(move |token, port| Box::pin(f(token, port)))
}

// ============================================================================
// Event Sink
// ============================================================================

/// The forwarding half of the source-to-dispatcher channel.
///
/// Cloning is cheap; all clones feed the same receiver. Delivery applies
/// backpressure: when the dispatcher side falls behind, `deliver` waits for
/// buffer space instead of dropping events.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<Event>,
}

impl EventSink {
    /// Creates a sink and the receiver it feeds.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }

    /// Forwards one event toward the dispatcher.
    ///
    /// Fails with [`TransportError::SinkClosed`] once the receiver is
    /// dropped, which is the signal for a source to wind down.
    pub async fn deliver(&self, event: Event) -> TransportResult<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| TransportError::SinkClosed)
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink").finish()
    }
}

// ============================================================================
// Source and Platform Boundaries
// ============================================================================

/// An event source: runs until failure or sink closure, forwarding every
/// acquired event into the sink.
#[async_trait]
pub trait EventSource: Send + 'static {
    /// Runs the source to completion.
    async fn run(self, sink: EventSink) -> TransportResult<()>
    where
        Self: Sized;
}

/// Pulls update batches from the platform (polling mode).
///
/// Implementations own the wire protocol: each pulled batch arrives as
/// decoded [`Event`]s with reply capabilities already attached.
#[async_trait]
pub trait UpdatePuller: Send + 'static {
    /// Pulls one batch of updates, long-polling as the platform allows.
    async fn pull(&mut self) -> TransportResult<Vec<Event>>;

    /// Discards the pre-existing update backlog, returning how many
    /// updates were dropped. Called once at startup when
    /// `drop_pending_updates` is set.
    async fn discard_backlog(&mut self) -> TransportResult<u64> {
        Ok(0)
    }
}

/// Decodes a webhook body into events (webhook mode).
pub trait UpdateDecoder: Send + Sync + 'static {
    /// Decodes one request body into zero or more events.
    fn decode(&self, body: &[u8]) -> Result<Vec<Event>, DecodeError>;
}

/// Supplies the platform-specific halves of both source shapes.
///
/// The runtime matches [`FetchStrategy`] exhaustively at the single point
/// where the source is constructed and asks the adapter for the matching
/// half.
pub trait PlatformAdapter: Send + Sync + 'static {
    /// The puller type used in polling mode.
    type Puller: UpdatePuller;

    /// The decoder type used in webhook mode.
    type Decoder: UpdateDecoder;

    /// Builds the puller for polling mode.
    fn puller(&self, config: &PollingConfig) -> TransportResult<Self::Puller>;

    /// Builds the decoder for webhook mode.
    fn decoder(&self, config: &WebhookConfig) -> TransportResult<Self::Decoder>;
}
