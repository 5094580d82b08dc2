//! Error taxonomy for record-store calls.
//!
//! Every call outcome that is not a success falls into exactly one of three
//! classes:
//!
//! - [`ValidationError`]: raised on the client before any I/O. A call that
//!   fails validation never reaches the transport.
//! - [`ProtocolError`]: the server answered with a non-2xx status. Precondition
//!   failures (412) on conditional writes are a named sub-case.
//! - [`TransportError`]: the exchange could not complete at all (connection,
//!   resolution, TLS, or body failures). Carries no status code.
//!
//! [`ClientError`] wraps the three so a single `Result` type flows through both
//! the deferred and the completion-handler delivery modes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Coarse outcome class of a call.
///
/// Two delivery modes given identical inputs and identical server state must
/// produce the same class; tests compare outcomes through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Rejected on the client before any network activity.
    Validation,
    /// Rejected by the server after a completed round trip.
    Protocol,
    /// The round trip could not be completed.
    Transport,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Client-side rejection of a call's arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationError {
    /// A required parameter is missing or has the wrong shape (for example a
    /// sequence where a single record is expected).
    #[error("invalid parameters: {reason}")]
    InvalidParameters {
        /// Which parameter was rejected and why.
        reason: String,
    },

    /// The identifier addressing an identifier-bearing write is missing or does
    /// not match the record's own identifier.
    #[error("invalid id: {reason}")]
    InvalidId {
        /// Description of the mismatch.
        reason: String,
    },

    /// A timestamp filter (`since`, `until`) is not a valid RFC 3339 timestamp.
    #[error("invalid timestamp: {value:?}")]
    InvalidTimestamp {
        /// The rejected value, verbatim.
        value: String,
    },

    /// The conditional header name is empty, unrecognised, or names both
    /// condition kinds at once.
    #[error("invalid conditional header: {header:?}")]
    InvalidConditionalHeader {
        /// The rejected header name, verbatim.
        header: String,
    },

    /// The conditional match value is empty.
    #[error("invalid conditional match value: must be \"*\" or a non-empty entity tag")]
    InvalidMatchValue,
}

impl ValidationError {
    pub(crate) fn parameters(reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            reason: reason.into(),
        }
    }

    pub(crate) fn id(reason: impl Into<String>) -> Self {
        Self::InvalidId {
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

/// HTTP 412, returned when a conditional write's precondition does not hold.
pub const STATUS_PRECONDITION_FAILED: u16 = 412;

/// A non-2xx response from the record store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record store responded with status {status}: {}", String::from_utf8_lossy(.body))]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Response headers with lowercase names.
    pub headers: BTreeMap<String, String>,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl ProtocolError {
    /// Returns `true` for a rejected conditional write (HTTP 412).
    ///
    /// The resource existed against an "if absent" condition, or its entity
    /// tag did not match an "if current" condition.
    pub fn is_precondition_failed(&self) -> bool {
        self.status == STATUS_PRECONDITION_FAILED
    }

    /// Returns the body decoded as UTF-8, replacing invalid sequences.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Why an exchange could not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// Connection could not be established (refused, DNS, TLS handshake).
    Connect,
    /// The transport's own deadline elapsed.
    Timeout,
    /// The request could not be built or sent.
    Request,
    /// The response body could not be read.
    Body,
    /// Anything the transport could not classify further.
    Other,
}

/// Failure of the underlying exchange. Never carries a status code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport failure ({kind:?}): {message}")]
pub struct TransportError {
    /// Failure classification.
    pub kind: TransportErrorKind,
    /// Human-readable detail from the transport.
    pub message: String,
}

impl TransportError {
    /// Creates a [`TransportError`].
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Call-level error
// ---------------------------------------------------------------------------

/// Any failure of a record-store call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// See [`ValidationError`].
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// See [`ProtocolError`].
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// See [`TransportError`].
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ClientError {
    /// Returns the outcome class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) => ErrorClass::Validation,
            Self::Protocol(_) => ErrorClass::Protocol,
            Self::Transport(_) => ErrorClass::Transport,
        }
    }

    /// Returns the HTTP status for protocol errors, `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Protocol(err) => Some(err.status),
            _ => None,
        }
    }

    /// Returns `true` if the server rejected a conditional write (HTTP 412).
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, Self::Protocol(err) if err.is_precondition_failed())
    }
}

// ---------------------------------------------------------------------------
// Context construction
// ---------------------------------------------------------------------------

/// A client context could not be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The endpoint is not an absolute URL with a host.
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint {
        /// The rejected endpoint, verbatim.
        endpoint: String,
        /// Parser detail.
        reason: String,
    },
}
