//! Statement result pages and continuation references.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An opaque, server-issued reference to the next page of a statement query.
///
/// Only meaningful to the server that issued it. It is usually a path
/// relative to the server root (`/xapi/statements?more=...`) and is sent
/// back without modification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationRef(String);

impl ContinuationRef {
    /// Returns `None` for an empty (or all-whitespace) reference, which means
    /// "no further pages".
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Returns the reference as sent by the server.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContinuationRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of a statement query result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatementPage {
    /// Records on this page, in server order.
    pub statements: Vec<Value>,
    /// Reference to the next page, if the server issued one.
    pub more: Option<ContinuationRef>,
}

impl StatementPage {
    /// Reads a page from a decoded result body.
    ///
    /// A single-statement response (a record object without a `statements`
    /// array) is read as a one-record page. Anything else without a
    /// `statements` array is read as an empty page; [`StatementPage::is_well_formed`]
    /// tells the two cases apart.
    pub fn from_value(body: &Value) -> Self {
        let statements = match body.get("statements") {
            Some(Value::Array(items)) => items.clone(),
            _ if is_single_statement(body) => vec![body.clone()],
            _ => Vec::new(),
        };
        let more = body
            .get("more")
            .and_then(Value::as_str)
            .and_then(ContinuationRef::new);
        Self { statements, more }
    }

    /// Returns `true` if `body` has the shape of a statement result.
    pub fn is_well_formed(body: &Value) -> bool {
        matches!(body.get("statements"), Some(Value::Array(_))) || is_single_statement(body)
    }
}

fn is_single_statement(body: &Value) -> bool {
    body.get("id").is_some_and(Value::is_string) && body.get("verb").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_with_continuation() {
        let body = json!({
            "statements": [{"id": "a"}, {"id": "b"}],
            "more": "/xapi/statements?more=abc"
        });
        let page = StatementPage::from_value(&body);
        assert_eq!(page.statements.len(), 2);
        assert_eq!(
            page.more.as_ref().map(ContinuationRef::as_str),
            Some("/xapi/statements?more=abc")
        );
        assert!(StatementPage::is_well_formed(&body));
    }

    #[test]
    fn empty_more_means_last_page() {
        for more in [json!(""), json!("  "), Value::Null] {
            let page = StatementPage::from_value(&json!({"statements": [], "more": more}));
            assert!(page.more.is_none());
        }
    }

    #[test]
    fn single_statement_body_is_a_one_record_page() {
        let body = json!({"id": "s-1", "actor": {}, "verb": {"id": "v"}, "object": {}});
        let page = StatementPage::from_value(&body);
        assert_eq!(page.statements, vec![body.clone()]);
        assert!(page.more.is_none());
    }

    #[test]
    fn malformed_body_is_an_empty_page() {
        let body = json!({"unexpected": true});
        assert!(!StatementPage::is_well_formed(&body));
        assert_eq!(StatementPage::from_value(&body), StatementPage::default());
    }
}
