//! Client context: endpoint, credentials, and behavioural options.
//!
//! A [`ClientContext`] is an immutable value. The orchestration layer takes a
//! snapshot of it when a call is issued, so replacing a client's context only
//! affects calls issued afterwards. Several independently configured contexts
//! can coexist in one process.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::errors::ContextError;

/// Protocol version sent in `X-Experience-API-Version` unless overridden.
pub const DEFAULT_PROTOCOL_VERSION: &str = "1.0.3";

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// How calls authenticate against the record store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Credentials {
    /// No `Authorization` header.
    #[default]
    Anonymous,
    /// HTTP Basic authentication.
    Basic {
        /// Account name.
        user: String,
        /// Account secret.
        password: String,
    },
    /// A complete `Authorization` header value (e.g. `"Bearer abc"`), sent verbatim.
    Token(String),
}

impl Credentials {
    /// Returns the `Authorization` header value, if any.
    pub fn authorization(&self) -> Option<String> {
        match self {
            Self::Anonymous => None,
            Self::Basic { user, password } => Some(format!(
                "Basic {}",
                STANDARD.encode(format!("{user}:{password}"))
            )),
            Self::Token(token) => Some(token.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Recognised behavioural options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientOptions {
    /// When `true`, pre-dispatch validation failures are always delivered
    /// through the rejection path, even when a completion handler was given.
    ///
    /// When `false` (the default) they go to whichever channel the caller
    /// selected, synchronously if a handler was given.
    pub strict_callbacks: bool,

    /// Value of the `X-Experience-API-Version` request header.
    pub version: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            strict_callbacks: false,
            version: DEFAULT_PROTOCOL_VERSION.to_string(),
        }
    }
}

impl ClientOptions {
    /// Builds options from named values, starting from the defaults.
    ///
    /// Recognised names are `strictCallbacks` (or `strict_callbacks`) and
    /// `version`. Unrecognised names, and recognised names with a value of the
    /// wrong type, are ignored.
    pub fn from_named<I, K>(options: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut resolved = Self::default();
        for (name, value) in options {
            let name = name.as_ref();
            match (name, &value) {
                ("strictCallbacks" | "strict_callbacks", Value::Bool(flag)) => {
                    resolved.strict_callbacks = *flag;
                }
                ("version", Value::String(version)) if !version.is_empty() => {
                    resolved.version = version.clone();
                }
                _ => {
                    tracing::debug!(option = name, "ignoring unrecognised client option");
                }
            }
        }
        resolved
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Endpoint, credentials, and options for record-store calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientContext {
    endpoint: Url,
    credentials: Credentials,
    options: ClientOptions,
}

impl ClientContext {
    /// Creates a context for `endpoint` with anonymous credentials and default
    /// options.
    ///
    /// The endpoint must be an absolute URL with a host. A trailing `/` is
    /// added when missing so resource paths resolve beneath it.
    pub fn new(endpoint: &str) -> Result<Self, ContextError> {
        let invalid = |reason: String| ContextError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason,
        };
        let mut url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(invalid("endpoint must be an absolute URL with a host".to_string()));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self {
            endpoint: url,
            credentials: Credentials::default(),
            options: ClientOptions::default(),
        })
    }

    /// Replaces the credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Replaces the options.
    #[must_use]
    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the normalised endpoint (always ends in `/`).
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Returns the configured credentials.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Returns the configured options.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }
}
