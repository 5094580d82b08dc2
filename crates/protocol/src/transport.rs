//! The transport port.
//!
//! ## Architectural Layer
//!
//! **Port**: implemented by the `transport` crate (reqwest) and by in-memory
//! fakes in tests. Request dispatch only ever talks to a `dyn Transport`.

use async_trait::async_trait;

use crate::errors::TransportError;
use crate::request::Method;
use crate::response::ResponseEnvelope;

/// A fully resolved HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Method.
    pub method: Method,
    /// Absolute URL, query string included.
    pub url: String,
    /// Headers in send order.
    pub headers: Vec<(String, String)>,
    /// Encoded body, if any.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Looks up a header, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Performs one HTTP exchange.
///
/// Implementations report any non-exchange (connection, TLS, timeout, body
/// read) as a [`TransportError`] and return every completed exchange as a
/// [`ResponseEnvelope`], whatever its status. Status interpretation belongs to
/// the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and waits for the complete response.
    async fn execute(&self, request: HttpRequest) -> Result<ResponseEnvelope, TransportError>;
}
