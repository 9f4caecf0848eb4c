//! Generic authenticated HTTP API client.
//!
//! Platform adapters build their pullers and repliers on top of this
//! capability; the wire protocol (method names, payload shapes) stays with
//! the adapter.

use std::time::Duration;

use serde_json::Value;

use crate::error::{TransportError, TransportResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Token-authenticated JSON-over-HTTP client.
///
/// # Example
///
/// ```rust,ignore
/// let client = HttpApiClient::new("https://api.example.org", token)?;
/// let updates = client
///     .post_json("getUpdates", serde_json::json!({ "timeout": 25 }))
///     .await?;
/// ```
pub struct HttpApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpApiClient {
    /// Creates a client against the given API base URL.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> TransportResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| TransportError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Calls an API method with a JSON payload and returns the JSON reply.
    ///
    /// Error messages name the method, never the full URL, so the token
    /// cannot leak into logs.
    pub async fn post_json(&self, method: &str, params: Value) -> TransportResult<Value> {
        let url = format!("{}/{}", self.base_url, method);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&params)
            .send()
            .await
            .map_err(|e| TransportError::Request(format!("'{method}': {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Request(format!(
                "'{method}' returned {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| TransportError::Request(format!("'{method}' body: {e}")))
    }
}

impl std::fmt::Debug for HttpApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApiClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
