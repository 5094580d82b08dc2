//! Statement attachments and their `multipart/mixed` encoding.
//!
//! A statement write with attachments is sent as one `multipart/mixed` body:
//! the statement JSON first, with an `attachments` metadata entry appended for
//! each attachment, followed by one binary part per attachment carrying its
//! SHA-256 in `X-Experience-API-Hash`.

use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::conditional::canonical_json;

/// Header carrying an attachment part's SHA-256.
pub const ATTACHMENT_HASH_HEADER: &str = "X-Experience-API-Hash";

/// Raw attachment content plus the metadata recorded on the statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Attachment bytes.
    pub content: Vec<u8>,
    /// IRI describing how the attachment is used.
    pub usage_type: String,
    /// Language map of display names, e.g. `{"en-US": "Test Attachment"}`.
    pub display: Value,
    /// Optional language map of descriptions.
    pub description: Option<Value>,
    /// MIME type of `content`.
    pub content_type: String,
}

impl Attachment {
    /// Creates an attachment without a description.
    pub fn new(
        content: impl Into<Vec<u8>>,
        usage_type: impl Into<String>,
        display: Value,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            usage_type: usage_type.into(),
            display,
            description: None,
            content_type: content_type.into(),
        }
    }

    /// Adds a description language map.
    #[must_use]
    pub fn with_description(mut self, description: Value) -> Self {
        self.description = Some(description);
        self
    }

    /// Lowercase hex SHA-256 of the content.
    pub fn sha2(&self) -> String {
        hex::encode(Sha256::digest(&self.content))
    }

    /// The metadata object appended to the statement's `attachments` array.
    pub fn metadata(&self) -> Value {
        let mut meta = Map::new();
        meta.insert("usageType".into(), json!(self.usage_type));
        meta.insert("display".into(), self.display.clone());
        if let Some(description) = &self.description {
            meta.insert("description".into(), description.clone());
        }
        meta.insert("contentType".into(), json!(self.content_type));
        meta.insert("length".into(), json!(self.content.len()));
        meta.insert("sha2".into(), json!(self.sha2()));
        Value::Object(meta)
    }
}

/// Returns a copy of `statement` with metadata for `attachments` appended to
/// its `attachments` array. Non-object statements are returned unchanged.
pub fn with_attachment_metadata(statement: &Value, attachments: &[Attachment]) -> Value {
    let mut statement = statement.clone();
    if let Some(object) = statement.as_object_mut() {
        let entry = object
            .entry("attachments")
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            *entry = Value::Array(Vec::new());
        }
        if let Value::Array(list) = entry {
            list.extend(attachments.iter().map(Attachment::metadata));
        }
    }
    statement
}

/// Encodes a statement and its attachments as a `multipart/mixed` body.
///
/// `statement` is written as-is; callers append metadata first with
/// [`with_attachment_metadata`].
pub fn encode_multipart(statement: &Value, attachments: &[Attachment], boundary: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json\r\n\r\n");
    body.extend_from_slice(&canonical_json(statement));
    body.extend_from_slice(b"\r\n");

    for attachment in attachments {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(format!("Content-Type: {}\r\n", attachment.content_type).as_bytes());
        body.extend_from_slice(b"Content-Transfer-Encoding: binary\r\n");
        body.extend_from_slice(
            format!("{ATTACHMENT_HASH_HEADER}: {}\r\n\r\n", attachment.sha2()).as_bytes(),
        );
        body.extend_from_slice(&attachment.content);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}
