//! Call shapes: the explicit, tagged input of every record-store operation.
//!
//! Record payloads (statements, state values, profile values, agents) are
//! opaque JSON built by the caller, so a [`Call`] can hold exactly what the
//! caller passed, including a `null` or a sequence where a single record was
//! expected. [`crate::validation::validate`] rejects such shapes before any
//! request is built.

use serde_json::Value;

use crate::attachments::Attachment;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Address of a state document, or of a set of them when `state_id` is absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StateKey {
    /// Activity the state belongs to. Required.
    pub activity_id: String,
    /// Agent the state belongs to. Required; must be a JSON object.
    pub agent: Value,
    /// State document identifier. Required for writes.
    pub state_id: Option<String>,
    /// Optional registration scope.
    pub registration: Option<String>,
}

impl StateKey {
    /// Creates a key for a single state document without a registration.
    pub fn new(activity_id: impl Into<String>, agent: Value, state_id: impl Into<String>) -> Self {
        Self {
            activity_id: activity_id.into(),
            agent,
            state_id: Some(state_id.into()),
            registration: None,
        }
    }

    /// Creates a key covering every state document of an activity/agent pair.
    pub fn all(activity_id: impl Into<String>, agent: Value) -> Self {
        Self {
            activity_id: activity_id.into(),
            agent,
            state_id: None,
            registration: None,
        }
    }

    /// Scopes the key to a registration.
    #[must_use]
    pub fn with_registration(mut self, registration: impl Into<String>) -> Self {
        self.registration = Some(registration.into());
        self
    }
}

/// Owner of a profile document.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileOwner {
    /// An activity profile, owned by this activity identifier.
    Activity(String),
    /// An agent profile, owned by this agent object.
    Agent(Value),
}

/// Address of a profile document, or of an owner's profile list when
/// `profile_id` is absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileKey {
    /// Owner of the profile. Required.
    pub owner: ProfileOwner,
    /// Profile document identifier. Required for writes and deletes.
    pub profile_id: Option<String>,
}

impl ProfileKey {
    /// Creates a key for one activity profile.
    pub fn activity(activity_id: impl Into<String>, profile_id: impl Into<String>) -> Self {
        Self {
            owner: ProfileOwner::Activity(activity_id.into()),
            profile_id: Some(profile_id.into()),
        }
    }

    /// Creates a key for one agent profile.
    pub fn agent(agent: Value, profile_id: impl Into<String>) -> Self {
        Self {
            owner: ProfileOwner::Agent(agent),
            profile_id: Some(profile_id.into()),
        }
    }

    /// Creates a key addressing every profile of `owner`.
    pub fn list(owner: ProfileOwner) -> Self {
        Self {
            owner,
            profile_id: None,
        }
    }
}

/// A caller-requested write precondition, as supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// Expected to be `If-None-Match` or `If-Match`.
    pub header: String,
    /// `*` or an entity tag.
    pub match_value: String,
}

impl Condition {
    /// Creates a condition from a header name and match value.
    pub fn new(header: impl Into<String>, match_value: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            match_value: match_value.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Statement query
// ---------------------------------------------------------------------------

/// Ordered statement query parameters, passed to the server largely verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatementQuery {
    params: Vec<(String, String)>,
}

impl StatementQuery {
    /// Creates an empty query (server defaults for everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an arbitrary parameter. A parameter set again keeps its original
    /// position and takes the new value.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.params.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.params.push((name, value)),
        }
        self
    }

    /// Page-size limit.
    #[must_use]
    pub fn limit(self, limit: u32) -> Self {
        self.param("limit", limit.to_string())
    }

    /// Fetch a single statement by identifier.
    #[must_use]
    pub fn statement_id(self, id: impl Into<String>) -> Self {
        self.param("statementId", id)
    }

    /// Filter by agent (serialized as compact JSON).
    #[must_use]
    pub fn agent(self, agent: &Value) -> Self {
        self.param("agent", agent.to_string())
    }

    /// Filter by verb identifier.
    #[must_use]
    pub fn verb(self, verb: impl Into<String>) -> Self {
        self.param("verb", verb)
    }

    /// Filter by activity identifier.
    #[must_use]
    pub fn activity(self, activity_id: impl Into<String>) -> Self {
        self.param("activity", activity_id)
    }

    /// Filter by registration.
    #[must_use]
    pub fn registration(self, registration: impl Into<String>) -> Self {
        self.param("registration", registration)
    }

    /// Only statements stored after this timestamp.
    #[must_use]
    pub fn since(self, timestamp: impl Into<String>) -> Self {
        self.param("since", timestamp)
    }

    /// Only statements stored at or before this timestamp.
    #[must_use]
    pub fn until(self, timestamp: impl Into<String>) -> Self {
        self.param("until", timestamp)
    }

    /// Return results oldest first.
    #[must_use]
    pub fn ascending(self, ascending: bool) -> Self {
        self.param("ascending", ascending.to_string())
    }

    /// Returns the value of `name`, if set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the parameters in insertion order.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

// ---------------------------------------------------------------------------
// Call
// ---------------------------------------------------------------------------

/// Every record-store operation, with its arguments as supplied.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// Store one statement under the caller-supplied identifier.
    PutStatement {
        /// The record; must be a single JSON object whose `id` equals `id`.
        statement: Value,
        /// Identifier addressing the write.
        id: Option<String>,
        /// Attachments sent as multipart parts.
        attachments: Vec<Attachment>,
    },
    /// Store one statement; the server assigns an identifier if absent.
    PostStatement {
        /// The record; must be a single JSON object.
        statement: Value,
        /// Attachments sent as multipart parts.
        attachments: Vec<Attachment>,
    },
    /// Store a batch of statements in one round trip.
    PostStatements {
        /// Must be a non-empty JSON array of objects.
        statements: Value,
    },
    /// Query statements (a single page).
    GetStatements {
        /// Query options.
        query: StatementQuery,
    },
    /// Replace a state document.
    PutState {
        /// State address; `state_id` required.
        key: StateKey,
        /// New value; must not be `null`.
        value: Value,
        /// Optional "if current" entity tag (`*` or a hash).
        match_hash: Option<String>,
    },
    /// Shallow-merge into a state document.
    PostState {
        /// State address; `state_id` required.
        key: StateKey,
        /// Object to merge; must not be `null`.
        value: Value,
    },
    /// Fetch a state document, or the list of state identifiers.
    GetState {
        /// State address.
        key: StateKey,
        /// Only documents stored after this timestamp.
        since: Option<String>,
    },
    /// Delete a state document, or every document under the key.
    DeleteState {
        /// State address.
        key: StateKey,
    },
    /// Fetch the canonical definition of an activity.
    GetActivities {
        /// Activity identifier. Required.
        activity_id: String,
    },
    /// Fetch the combined person object for an agent.
    GetAgents {
        /// Agent object. Required.
        agent: Value,
    },
    /// Replace a profile document, optionally under a precondition.
    PutProfile {
        /// Profile address; `profile_id` required.
        key: ProfileKey,
        /// New value; must not be `null`.
        value: Value,
        /// Optional precondition, checked by the conditional-write guard.
        condition: Option<Condition>,
    },
    /// Shallow-merge into a profile document. Never conditional.
    PostProfile {
        /// Profile address; `profile_id` required.
        key: ProfileKey,
        /// Object to merge; must not be `null`.
        value: Value,
    },
    /// Fetch a profile document, or the owner's profile identifiers.
    GetProfile {
        /// Profile address.
        key: ProfileKey,
        /// Only documents stored after this timestamp.
        since: Option<String>,
    },
    /// Delete a profile document.
    DeleteProfile {
        /// Profile address; `profile_id` required.
        key: ProfileKey,
    },
    /// Fetch server metadata (supported versions).
    GetAbout,
}

impl Call {
    /// Stable operation name, used in tracing spans.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PutStatement { .. } => "put_statement",
            Self::PostStatement { .. } => "post_statement",
            Self::PostStatements { .. } => "post_statements",
            Self::GetStatements { .. } => "get_statements",
            Self::PutState { .. } => "put_state",
            Self::PostState { .. } => "post_state",
            Self::GetState { .. } => "get_state",
            Self::DeleteState { .. } => "delete_state",
            Self::GetActivities { .. } => "get_activities",
            Self::GetAgents { .. } => "get_agents",
            Self::PutProfile { key, .. } => match key.owner {
                ProfileOwner::Activity(_) => "put_activity_profile",
                ProfileOwner::Agent(_) => "put_agent_profile",
            },
            Self::PostProfile { key, .. } => match key.owner {
                ProfileOwner::Activity(_) => "post_activity_profile",
                ProfileOwner::Agent(_) => "post_agent_profile",
            },
            Self::GetProfile { key, .. } => match key.owner {
                ProfileOwner::Activity(_) => "get_activity_profile",
                ProfileOwner::Agent(_) => "get_agent_profile",
            },
            Self::DeleteProfile { key } => match key.owner {
                ProfileOwner::Activity(_) => "delete_activity_profile",
                ProfileOwner::Agent(_) => "delete_agent_profile",
            },
            Self::GetAbout => "get_about",
        }
    }
}
