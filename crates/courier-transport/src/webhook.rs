//! Webhook event source.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{Router, body::Bytes, extract::State, http::StatusCode, response::IntoResponse,
    routing::post};
use tracing::{info, warn};

use crate::error::{TransportError, TransportResult};
use crate::source::{EventSink, EventSource, ReadyCallback, UpdateDecoder, WebhookConfig};

/// Event source that binds an HTTP listener and receives pushed updates.
///
/// Updates arrive as `POST /{token}`; bodies are decoded by the injected
/// [`UpdateDecoder`] and forwarded into the sink. Requests to any other
/// path get a 404, undecodable bodies a 400.
pub struct WebhookSource<D: UpdateDecoder> {
    decoder: D,
    config: WebhookConfig,
    on_ready: Option<ReadyCallback>,
}

impl<D: UpdateDecoder> WebhookSource<D> {
    /// Creates a webhook source.
    pub fn new(decoder: D, config: WebhookConfig) -> Self {
        Self {
            decoder,
            config,
            on_ready: None,
        }
    }

    /// Sets the ready callback.
    pub fn with_ready(mut self, callback: ReadyCallback) -> Self {
        self.on_ready = Some(callback);
        self
    }
}

struct WebhookState<D> {
    decoder: D,
    sink: EventSink,
}

#[async_trait]
impl<D: UpdateDecoder> EventSource for WebhookSource<D> {
    async fn run(self, sink: EventSink) -> TransportResult<()> {
        let Self {
            decoder,
            config,
            on_ready,
        } = self;

        if config.tls_key.is_some() {
            return Err(TransportError::InvalidConfig(
                "in-process TLS is not supported; terminate TLS at a fronting proxy and leave \
                 tls_key unset"
                    .to_string(),
            ));
        }
        if config.token.is_empty() {
            return Err(TransportError::InvalidConfig(
                "webhook token must not be empty".to_string(),
            ));
        }

        let path = format!("/{}", config.token);
        let state = Arc::new(WebhookState { decoder, sink });
        let router = Router::new()
            .route(&path, post(receive_update::<D>))
            .with_state(state);

        let addr = format!("0.0.0.0:{}", config.port);
        let listener =
            tokio::net::TcpListener::bind(&addr)
                .await
                .map_err(|e| TransportError::BindFailed {
                    addr: addr.clone(),
                    reason: e.to_string(),
                })?;

        info!(addr = %addr, "webhook listener bound");

        if let Some(callback) = &on_ready {
            callback(config.token.clone(), config.port).await;
        }

        axum::serve(listener, router)
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }
}

impl<D: UpdateDecoder> std::fmt::Debug for WebhookSource<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSource")
            .field("port", &self.config.port)
            .field("has_ready_callback", &self.on_ready.is_some())
            .finish()
    }
}

async fn receive_update<D: UpdateDecoder>(
    State(state): State<Arc<WebhookState<D>>>,
    body: Bytes,
) -> impl IntoResponse {
    let events = match state.decoder.decode(&body) {
        Ok(events) => events,
        Err(error) => {
            warn!(error = %error, "rejected undecodable webhook payload");
            return StatusCode::BAD_REQUEST;
        }
    };

    for event in events {
        if state.sink.deliver(event).await.is_err() {
            return StatusCode::SERVICE_UNAVAILABLE;
        }
    }

    StatusCode::OK
}
