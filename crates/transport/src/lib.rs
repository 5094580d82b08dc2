//! Record-store HTTP transport.
//!
//! Implements the [`protocol::Transport`] port over `reqwest`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Sockets, TLS, and body streaming live here. Callers
//! see only [`protocol::Transport`]: every completed exchange comes back as a
//! [`ResponseEnvelope`] regardless of status, and every exchange that could
//! not complete comes back as a classified [`TransportError`].
//!
//! Timeouts and connection pooling are whatever the supplied
//! [`reqwest::Client`] is configured with. This crate adds no retries.

use async_trait::async_trait;
use protocol::{
    HttpRequest, Method, ResponseEnvelope, Transport, TransportError, TransportErrorKind,
};
use reqwest::Client;

/// [`Transport`] implementation backed by a [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with a default `reqwest` client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport over a preconfigured client (timeouts, proxies,
    /// TLS roots).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Put => reqwest::Method::PUT,
        Method::Post => reqwest::Method::POST,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Classifies a `reqwest` failure.
fn classify(err: &reqwest::Error) -> TransportErrorKind {
    if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else if err.is_body() || err.is_decode() {
        TransportErrorKind::Body
    } else if err.is_builder() || err.is_request() {
        TransportErrorKind::Request
    } else {
        TransportErrorKind::Other
    }
}

fn transport_error(err: reqwest::Error) -> TransportError {
    let kind = classify(&err);
    tracing::debug!(?kind, error = %err, "exchange failed");
    TransportError::new(kind, err.to_string())
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: HttpRequest) -> Result<ResponseEnvelope, TransportError> {
        let mut builder = self.client.request(method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(transport_error)?;

        tracing::trace!(status, bytes = body.len(), "exchange completed");
        Ok(ResponseEnvelope::new(status, headers, body.to_vec()))
    }
}
