//! Long-polling event source.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::TransportResult;
use crate::source::{EventSink, EventSource, PollingConfig, UpdatePuller};

/// Delay after the first failed pull; doubles per consecutive failure.
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
/// Upper bound for the failure backoff.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Event source that pulls update batches from the platform in a loop.
///
/// The source delegates the wire protocol to its [`UpdatePuller`] and owns
/// the loop around it: an optional one-time backlog discard at startup,
/// forwarding every pulled event into the sink, and exponential backoff on
/// pull failures. It runs until the sink closes.
pub struct PollingSource<P: UpdatePuller> {
    puller: P,
    config: PollingConfig,
}

impl<P: UpdatePuller> PollingSource<P> {
    /// Creates a polling source.
    pub fn new(puller: P, config: PollingConfig) -> Self {
        Self { puller, config }
    }
}

#[async_trait]
impl<P: UpdatePuller> EventSource for PollingSource<P> {
    async fn run(mut self, sink: EventSink) -> TransportResult<()> {
        if self.config.drop_pending_updates {
            let discarded = self.puller.discard_backlog().await?;
            if discarded > 0 {
                info!(discarded, "discarded pending update backlog");
            }
        }

        let mut backoff = INITIAL_BACKOFF;
        loop {
            match self.puller.pull().await {
                Ok(events) => {
                    backoff = INITIAL_BACKOFF;
                    if !events.is_empty() {
                        debug!(count = events.len(), "pulled update batch");
                    }
                    for event in events {
                        sink.deliver(event).await?;
                    }
                }
                Err(error) => {
                    warn!(
                        error = %error,
                        delay_ms = backoff.as_millis() as u64,
                        "update pull failed, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }
}

impl<P: UpdatePuller> std::fmt::Debug for PollingSource<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingSource")
            .field("drop_pending_updates", &self.config.drop_pending_updates)
            .finish()
    }
}
