//! Optimistic-concurrency preconditions for document writes.
//!
//! A conditional write carries one of two headers:
//!
//! - `If-None-Match`: only write if the document is absent (or, with a
//!   specific tag, if its current tag differs).
//! - `If-Match`: only write if the document exists (wildcard) or its current
//!   entity tag equals the supplied one.
//!
//! The guard only checks that the caller asked for a well-formed condition.
//! Whether the condition holds is decided by the server, which answers HTTP 412
//! when it does not; that outcome is a
//! [`ProtocolError`](crate::ProtocolError), never a validation failure.
//!
//! Entity tags are the lowercase hex SHA-1 of the document's canonical JSON
//! serialization. [`content_hash`] computes the same value so callers can
//! predict the tag a write will produce.

use serde_json::Value;
use sha1::{Digest, Sha1};

use crate::errors::ValidationError;

/// Header name of the "if absent" condition.
pub const IF_NONE_MATCH: &str = "If-None-Match";

/// Header name of the "if current" condition.
pub const IF_MATCH: &str = "If-Match";

/// Match value meaning "any existing version".
pub const WILDCARD: &str = "*";

// ---------------------------------------------------------------------------
// Content hash
// ---------------------------------------------------------------------------

/// Serializes `value` canonically: compact, with object keys in sorted order.
///
/// Request bodies use this same serializer, so the bytes the server hashes are
/// the bytes [`content_hash`] hashes.
pub fn canonical_json(value: &Value) -> Vec<u8> {
    sorted(value).to_string().into_bytes()
}

// Rebuilds objects with keys inserted in sorted order so the output does not
// depend on whether serde_json's `preserve_order` feature is enabled.
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), sorted(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

/// Returns the entity tag a document with this value will carry.
pub fn content_hash(value: &Value) -> String {
    hash_bytes(&canonical_json(value))
}

/// Lowercase hex SHA-1 of arbitrary bytes.
pub fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

// ---------------------------------------------------------------------------
// Conditional header
// ---------------------------------------------------------------------------

/// Which precondition a write asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    /// `If-None-Match`.
    IfAbsent,
    /// `If-Match`.
    IfCurrent,
}

impl ConditionKind {
    /// Parses a header name. Only the exact names [`IF_NONE_MATCH`] and
    /// [`IF_MATCH`] are accepted.
    pub fn from_header_name(name: &str) -> Option<Self> {
        match name {
            IF_NONE_MATCH => Some(Self::IfAbsent),
            IF_MATCH => Some(Self::IfCurrent),
            _ => None,
        }
    }

    /// Returns the canonical header name.
    pub fn header_name(self) -> &'static str {
        match self {
            Self::IfAbsent => IF_NONE_MATCH,
            Self::IfCurrent => IF_MATCH,
        }
    }
}

/// The value a condition is checked against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatchValue {
    /// `*`: only existence or non-existence is checked.
    Any,
    /// A specific entity tag, unquoted.
    Tag(String),
}

/// A validated conditional header, ready to attach to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalHeader {
    kind: ConditionKind,
    value: MatchValue,
    document_tag: String,
}

impl ConditionalHeader {
    /// Returns the condition kind.
    pub fn kind(&self) -> ConditionKind {
        self.kind
    }

    /// Returns the match value.
    pub fn match_value(&self) -> &MatchValue {
        &self.value
    }

    /// Returns the header name to send.
    pub fn header_name(&self) -> &'static str {
        self.kind.header_name()
    }

    /// Returns the header value to send: `*` or the quoted entity tag.
    pub fn header_value(&self) -> String {
        match &self.value {
            MatchValue::Any => WILDCARD.to_string(),
            MatchValue::Tag(tag) => format!("\"{tag}\""),
        }
    }

    /// Returns the entity tag the written document will carry if the write
    /// succeeds.
    pub fn document_tag(&self) -> &str {
        &self.document_tag
    }
}

/// Validates a caller-requested condition and prepares the header to send.
///
/// - `match_value` must not be empty (after stripping surrounding quotes),
///   regardless of `header_name`.
/// - `header_name` must be exactly [`IF_NONE_MATCH`] or [`IF_MATCH`].
/// - A bare `*` becomes [`MatchValue::Any`]. Anything else, including a
///   quoted `"*"`, is an entity tag compared byte-for-byte by the server
///   against the stored document's [`content_hash`].
pub fn prepare_conditional_header(
    header_name: &str,
    match_value: &str,
    document: &Value,
) -> Result<ConditionalHeader, ValidationError> {
    let trimmed = match_value.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed);
    if unquoted.is_empty() {
        return Err(ValidationError::InvalidMatchValue);
    }

    let kind = ConditionKind::from_header_name(header_name).ok_or_else(|| {
        ValidationError::InvalidConditionalHeader {
            header: header_name.to_string(),
        }
    })?;

    let value = if trimmed == WILDCARD {
        MatchValue::Any
    } else {
        MatchValue::Tag(unquoted.to_string())
    };

    Ok(ConditionalHeader {
        kind,
        value,
        document_tag: content_hash(document),
    })
}
