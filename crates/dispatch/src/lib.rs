//! HTTP dispatch adapter.
//!
//! Implements [`node_core::RequestDispatcher`] over `reqwest`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Request construction, transport, status handling and
//! body decoding live here. The node crates see only
//! [`node_core::RequestDispatcher`]. No retries are performed: failures are
//! classified with [`node_core::DispatchError::retry_policy`] and returned.

use std::time::Duration;

use async_trait::async_trait;
use node_core::{DispatchError, HttpMethod, RequestDescriptor, RequestDispatcher};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Method, Request};
use serde_json::Value;
use tracing::{debug, instrument, warn};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Dispatches [`RequestDescriptor`]s with a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: Client,
}

impl HttpDispatcher {
    /// Creates a dispatcher with [`DEFAULT_TIMEOUT`].
    pub fn new() -> Result<Self, DispatchError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("nasa-pics/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DispatchError::InvalidRequest {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Converts a descriptor into a `reqwest` request without sending it.
    pub fn build(&self, descriptor: &RequestDescriptor) -> Result<Request, DispatchError> {
        let url = descriptor
            .to_url()
            .map_err(|e| DispatchError::InvalidRequest {
                message: e.to_string(),
            })?;

        let mut headers = HeaderMap::new();
        for (name, value) in descriptor.headers() {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                DispatchError::InvalidRequest {
                    message: format!("invalid header name '{name}': {e}"),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| DispatchError::InvalidRequest {
                message: format!("invalid value for header '{name}': {e}"),
            })?;
            headers.insert(name, value);
        }

        self.client
            .request(method(descriptor.method()), url)
            .headers(headers)
            .build()
            .map_err(|e| DispatchError::InvalidRequest {
                message: e.to_string(),
            })
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Parses a `Retry-After` header given in seconds. HTTP-date values are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl RequestDispatcher for HttpDispatcher {
    // The URL carries the credential, so only method and path are recorded.
    #[instrument(
        skip(self, request),
        fields(method = %request.method(), path = %request.path())
    )]
    async fn dispatch(&self, request: &RequestDescriptor) -> Result<Value, DispatchError> {
        let http_request = self.build(request)?;

        let response = self.client.execute(http_request).await.map_err(|e| {
            let timed_out = e.is_timeout();
            let e = e.without_url();
            warn!(error = %e, timed_out, "request failed");
            DispatchError::Transport {
                message: e.to_string(),
                timed_out,
            }
        })?;

        let status = response.status();
        debug!(status = status.as_u16(), "response received");

        if !status.is_success() {
            let retry_after = retry_after(response.headers());
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(status = status.as_u16(), error = %e.without_url(), "failed to read error body");
                    String::new()
                }
            };
            return Err(DispatchError::Status {
                status: status.as_u16(),
                body,
                retry_after,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| DispatchError::InvalidBody {
                message: e.without_url().to_string(),
            })
    }
}
