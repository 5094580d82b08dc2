//! Response envelopes.

use std::collections::BTreeMap;

use serde_json::Value;

/// Status, headers and body of a completed exchange.
///
/// Header names are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseEnvelope {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, names lowercased.
    pub headers: BTreeMap<String, String>,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl ResponseEnvelope {
    /// Creates an envelope, lowercasing header names.
    pub fn new<I, K, V>(status: u16, headers: I, body: Vec<u8>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            status,
            headers: headers
                .into_iter()
                .map(|(name, value)| (name.as_ref().to_ascii_lowercase(), value.into()))
                .collect(),
            body,
        }
    }

    /// `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Looks up a header, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The entity tag of the returned document, without quotes.
    pub fn etag(&self) -> Option<&str> {
        self.header("etag").map(|tag| tag.trim().trim_matches('"'))
    }

    /// The body decoded as JSON. `None` for empty or non-JSON bodies.
    pub fn data(&self) -> Option<Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }

    /// The body as text (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The successful outcome of a call: the raw envelope plus decoded data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    /// The response as received.
    pub response: ResponseEnvelope,
    /// Decoded body, when it was JSON. For a walked statement query this is
    /// the aggregated result.
    pub data: Option<Value>,
}

impl Reply {
    /// Wraps an envelope, decoding its body.
    pub fn from_response(response: ResponseEnvelope) -> Self {
        let data = response.data();
        Self { response, data }
    }
}
