//! Newtype identifiers for record-store resources.
//!
//! Every key the orchestration layer routes on is a distinct newtype, so an
//! activity identifier can never be passed where a profile identifier is
//! expected even though both are strings on the wire. Construction rejects
//! empty values; the validator turns that rejection into a
//! [`ValidationError`](crate::ValidationError).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id! {
    /// IRI identifying an activity (e.g. `"http://adlnet.gov/expapi/activities/attempted"`).
    ActivityId
}

string_id! {
    /// Identifies a state document within an (activity, agent, registration) scope.
    StateId
}

string_id! {
    /// Identifies a profile document within its owner's scope.
    ProfileId
}

string_id! {
    /// Identifies a registration, passed through to the server verbatim.
    RegistrationId
}

string_id! {
    /// Identifies a statement record.
    ///
    /// Once a record carries an identifier it is immutable for that record;
    /// PUT-style writes are addressed by exactly this value.
    StatementId
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// An agent key: a non-null JSON object (e.g. `{"mbox": "mailto:a@example.com"}`).
///
/// The inner shape is not inspected; agents are sent to the server as compact
/// JSON in the query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent(Map<String, Value>);

impl Agent {
    /// Returns `Some` if `value` is a JSON object.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().map(|object| Self(object.clone()))
    }

    /// Returns the compact JSON form used in query parameters.
    pub fn to_query_value(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }
}
