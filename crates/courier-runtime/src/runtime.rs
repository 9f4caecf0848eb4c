//! Runtime orchestration.
//!
//! The [`CourierRuntime`] assembles the configured event source and the
//! dispatcher, then drives per-event dispatch until shutdown.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use courier_runtime::CourierRuntime;
//!
//! // Auto-loads courier.toml from the current directory
//! let runtime = CourierRuntime::new(dispatcher);
//! runtime.run(MyPlatform::new()).await?;
//!
//! // Custom configuration
//! let runtime = CourierRuntime::builder()
//!     .config_file("config/courier.toml")
//!     .profile("production")
//!     .dispatcher(dispatcher)
//!     .build()?;
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use courier_core::{DispatchOutcome, Dispatcher};
use courier_transport::{
    EventSink, EventSource, FetchStrategy, PlatformAdapter, PollingSource, ReadyCallback,
    TransportResult, WebhookConfig,
};

use crate::config::{ConfigLoader, CourierConfig};
use crate::error::RuntimeResult;
use crate::logging;

/// Capacity of the source-to-dispatcher channel.
const EVENT_BUFFER: usize = 128;

/// The runtime that connects an event source to the dispatcher.
///
/// Each inbound event is dispatched on its own spawned task, so events from
/// different chats process concurrently and one event's failure (or
/// slowness) never affects another's pipeline.
pub struct CourierRuntime {
    config: CourierConfig,
    dispatcher: Arc<Dispatcher>,
    on_webhook_ready: Option<ReadyCallback>,
}

impl CourierRuntime {
    /// Creates a runtime with automatic configuration loading.
    ///
    /// Searches the current directory for `courier.toml` and falls back to
    /// defaults when no file is found.
    pub fn new(dispatcher: Dispatcher) -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: failed to load config ({e}), using defaults");
                CourierConfig::default()
            });

        Self::from_config(&config, dispatcher)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from a pre-loaded configuration.
    ///
    /// Initializes logging from the configuration (first initialization
    /// wins; re-initialization is a no-op).
    pub fn from_config(config: &CourierConfig, dispatcher: Dispatcher) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            fetch = config.fetch.name(),
            log_level = config.logging.level.as_str(),
            "runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            dispatcher: Arc::new(dispatcher),
            on_webhook_ready: None,
        }
    }

    /// Sets the callback invoked once the webhook listener is bound.
    pub fn on_webhook_ready(mut self, callback: ReadyCallback) -> Self {
        self.on_webhook_ready = Some(callback);
        self
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    /// Returns the shared dispatcher.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Runs the runtime until Ctrl+C or SIGTERM.
    pub async fn run<P: PlatformAdapter>(&self, platform: P) -> RuntimeResult<()> {
        self.run_until(platform, wait_for_shutdown()).await
    }

    /// Runs the runtime with a custom shutdown future.
    pub async fn run_until<P, F>(&self, platform: P, shutdown: F) -> RuntimeResult<()>
    where
        P: PlatformAdapter,
        F: Future<Output = ()>,
    {
        self.config.validate()?;

        let (sink, mut events) = EventSink::channel(EVENT_BUFFER);

        // The single point where the event source is constructed: the
        // fetch strategy is matched exhaustively.
        let source_task = match self.config.fetch.clone() {
            FetchStrategy::Polling(config) => {
                let puller = platform.puller(&config)?;
                tokio::spawn(PollingSource::new(puller, config).run(sink))
            }
            FetchStrategy::Webhook(config) => {
                spawn_webhook(&platform, config, self.on_webhook_ready.clone(), sink)?
            }
        };

        info!(fetch = self.config.fetch.name(), "courier runtime started");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                inbound = events.recv() => match inbound {
                    Some(event) => {
                        let dispatcher = Arc::clone(&self.dispatcher);
                        tokio::spawn(async move {
                            report_outcome(dispatcher.dispatch(event).await);
                        });
                    }
                    None => {
                        warn!("event source closed the channel");
                        break;
                    }
                },
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
            }
        }

        source_task.abort();
        info!("courier runtime stopped");

        Ok(())
    }
}

impl std::fmt::Debug for CourierRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CourierRuntime")
            .field("fetch", &self.config.fetch.name())
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

/// Logs one event's outcome.
///
/// Silent drops are loggable here, at debug level, by design: the core
/// reports them but never logs them itself. An unrecovered failure is this
/// runtime's unhandled-failure path: logged, never propagated, so no event
/// can crash the process or another event's pipeline.
fn report_outcome(outcome: DispatchOutcome) {
    match outcome {
        DispatchOutcome::Handled { listener, method } => {
            debug!(listener = %listener, method = %method, "event handled");
        }
        DispatchOutcome::Vetoed => {
            debug!("event vetoed by middleware");
        }
        DispatchOutcome::NoMatch => {
            debug!("no handler matched event");
        }
        DispatchOutcome::Recovered { error, tier } => {
            debug!(tier = %tier, error = %error, "dispatch failure recovered");
        }
        DispatchOutcome::Unrecovered(error) => {
            error!(error = %error, "event failed with no recovery configured");
        }
    }
}

#[cfg(feature = "webhook")]
fn spawn_webhook<P: PlatformAdapter>(
    platform: &P,
    config: WebhookConfig,
    on_ready: Option<ReadyCallback>,
    sink: EventSink,
) -> RuntimeResult<JoinHandle<TransportResult<()>>> {
    use courier_transport::WebhookSource;

    let decoder = platform.decoder(&config)?;
    let mut source = WebhookSource::new(decoder, config);
    if let Some(callback) = on_ready {
        source = source.with_ready(callback);
    }
    Ok(tokio::spawn(source.run(sink)))
}

#[cfg(not(feature = "webhook"))]
fn spawn_webhook<P: PlatformAdapter>(
    _platform: &P,
    _config: WebhookConfig,
    _on_ready: Option<ReadyCallback>,
    _sink: EventSink,
) -> RuntimeResult<JoinHandle<TransportResult<()>>> {
    use courier_transport::TransportError;

    Err(crate::error::RuntimeError::Transport(
        TransportError::InvalidConfig(
            "webhook fetch strategy requires the 'webhook' feature".to_string(),
        ),
    ))
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to register SIGTERM handler");

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Received Ctrl+C, shutting down");
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`CourierRuntime`] with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = CourierRuntime::builder()
///     .config_file("config/production.toml")
///     .profile("production")
///     .dispatcher(dispatcher)
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    dispatcher: Option<Dispatcher>,
    on_webhook_ready: Option<ReadyCallback>,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            dispatcher: None,
            on_webhook_ready: None,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: CourierConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Sets the dispatcher.
    pub fn dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Sets the webhook ready callback.
    pub fn on_webhook_ready(mut self, callback: ReadyCallback) -> Self {
        self.on_webhook_ready = Some(callback);
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> RuntimeResult<CourierRuntime> {
        let config = self.config_loader.load()?;
        let dispatcher = self
            .dispatcher
            .unwrap_or_else(|| Dispatcher::builder().build());

        let mut runtime = CourierRuntime::from_config(&config, dispatcher);
        runtime.on_webhook_ready = self.on_webhook_ready;
        Ok(runtime)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
