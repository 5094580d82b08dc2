//! Request descriptors: what to send, independent of how it is sent.
//!
//! [`build_request`] is the single path from a [`Call`] to a
//! [`RequestDescriptor`]: it validates the arguments, runs the
//! conditional-write guard for conditional writes, and routes the call to its
//! resource. A descriptor is immutable once built and owned by the call that
//! built it.

use serde_json::Value;
use uuid::Uuid;

use crate::attachments::{encode_multipart, with_attachment_metadata, Attachment};
use crate::calls::{Call, Condition};
use crate::conditional::{canonical_json, prepare_conditional_header, IF_MATCH};
use crate::errors::ValidationError;
use crate::statements::ContinuationRef;
use crate::validation::{self, OwnerAddress, ProfileAddress, StateAddress};

// ---------------------------------------------------------------------------
// Method and target
// ---------------------------------------------------------------------------

/// HTTP method of a record-store request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `PUT`
    Put,
    /// `POST`
    Post,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Returns the method name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol resources, relative to the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// `statements`
    Statements,
    /// `activities/state`
    ActivityState,
    /// `activities/profile`
    ActivityProfile,
    /// `agents/profile`
    AgentProfile,
    /// `activities`
    Activities,
    /// `agents`
    Agents,
    /// `about`
    About,
}

impl Resource {
    /// Path relative to the endpoint (no leading `/`).
    pub fn path(self) -> &'static str {
        match self {
            Self::Statements => "statements",
            Self::ActivityState => "activities/state",
            Self::ActivityProfile => "activities/profile",
            Self::AgentProfile => "agents/profile",
            Self::Activities => "activities",
            Self::Agents => "agents",
            Self::About => "about",
        }
    }
}

/// Where a request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A protocol resource plus query parameters.
    Resource(Resource),
    /// A server-issued continuation of a statement query, sent back verbatim.
    Continuation(ContinuationRef),
}

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

/// Request body encodings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// `application/json`, canonically serialized.
    Json(Value),
    /// `multipart/mixed`: the statement JSON followed by attachment parts.
    Multipart {
        /// Part delimiter.
        boundary: String,
        /// Statement(s) with attachment metadata already appended.
        statement: Value,
        /// Attachment parts, in metadata order.
        attachments: Vec<Attachment>,
    },
}

impl RequestBody {
    /// Returns the `Content-Type` header value.
    pub fn content_type(&self) -> String {
        match self {
            Self::Json(_) => "application/json".to_string(),
            Self::Multipart { boundary, .. } => format!("multipart/mixed; boundary={boundary}"),
        }
    }

    /// Encodes the body to bytes.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Json(value) => canonical_json(value),
            Self::Multipart {
                boundary,
                statement,
                attachments,
            } => encode_multipart(statement, attachments, boundary),
        }
    }
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// A fully validated request, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// HTTP method.
    pub method: Method,
    /// Resource or continuation.
    pub target: Target,
    /// Query parameters, in order.
    pub query: Vec<(String, String)>,
    /// Call-specific headers (conditional headers). Authentication, version and
    /// content-type headers are added at dispatch.
    pub headers: Vec<(String, String)>,
    /// Optional body.
    pub body: Option<RequestBody>,
}

impl RequestDescriptor {
    fn new(method: Method, resource: Resource) -> Self {
        Self {
            method,
            target: Target::Resource(resource),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// A `GET` of a continuation reference.
    pub fn continuation(reference: ContinuationRef) -> Self {
        Self {
            method: Method::Get,
            target: Target::Continuation(reference),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    fn param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.push((name.to_string(), value.into()));
        self
    }

    fn optional_param(self, name: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    fn json(mut self, value: Value) -> Self {
        self.body = Some(RequestBody::Json(value));
        self
    }

    fn statement_body(mut self, statement: &Value, attachments: &[Attachment]) -> Self {
        self.body = Some(if attachments.is_empty() {
            RequestBody::Json(statement.clone())
        } else {
            RequestBody::Multipart {
                boundary: format!("xapi-{}", Uuid::new_v4().simple()),
                statement: with_attachment_metadata(statement, attachments),
                attachments: attachments.to_vec(),
            }
        });
        self
    }

    fn state(self, address: &StateAddress) -> Self {
        self.param("activityId", address.activity.as_str())
            .param("agent", address.agent.to_query_value())
            .optional_param("stateId", address.state_id.as_ref().map(|id| id.as_str()))
            .optional_param(
                "registration",
                address.registration.as_ref().map(|id| id.as_str()),
            )
    }

    fn profile(self, address: &ProfileAddress) -> Self {
        let request = match &address.owner {
            OwnerAddress::Activity(activity) => self.param("activityId", activity.as_str()),
            OwnerAddress::Agent(agent) => self.param("agent", agent.to_query_value()),
        };
        request.optional_param("profileId", address.profile_id.as_ref().map(|id| id.as_str()))
    }

    // Runs the conditional-write guard and attaches the resulting header.
    fn conditional(
        self,
        condition: Option<&Condition>,
        document: &Value,
    ) -> Result<Self, ValidationError> {
        let Some(condition) = condition else {
            return Ok(self);
        };
        let header =
            prepare_conditional_header(&condition.header, &condition.match_value, document)?;
        tracing::debug!(
            header = header.header_name(),
            value = %header.header_value(),
            document_tag = header.document_tag(),
            "attaching conditional header"
        );
        Ok(self.header(header.header_name(), header.header_value()))
    }
}

fn profile_resource(address: &ProfileAddress) -> Resource {
    match address.owner {
        OwnerAddress::Activity(_) => Resource::ActivityProfile,
        OwnerAddress::Agent(_) => Resource::AgentProfile,
    }
}

/// Validates `call` and builds its request.
///
/// Fails with the same [`ValidationError`] [`validation::validate`] would
/// return, or with a conditional-header error from the guard. Either way no
/// request exists, so nothing can be dispatched.
pub fn build_request(call: &Call) -> Result<RequestDescriptor, ValidationError> {
    validation::validate(call)?;

    let request = match call {
        Call::PutStatement {
            statement,
            id,
            attachments,
        } => {
            let id = validation::statement_id(statement, id.as_deref())?;
            RequestDescriptor::new(Method::Put, Resource::Statements)
                .param("statementId", id.as_str())
                .statement_body(statement, attachments)
        }
        Call::PostStatement {
            statement,
            attachments,
        } => RequestDescriptor::new(Method::Post, Resource::Statements)
            .statement_body(statement, attachments),
        Call::PostStatements { statements } => {
            RequestDescriptor::new(Method::Post, Resource::Statements).json(statements.clone())
        }
        Call::GetStatements { query } => query.params().iter().fold(
            RequestDescriptor::new(Method::Get, Resource::Statements),
            |request, (name, value)| request.param(name, value.as_str()),
        ),
        Call::PutState {
            key,
            value,
            match_hash,
        } => {
            let address = validation::state_address(key, true)?;
            let condition = match_hash.as_deref().map(|hash| Condition::new(IF_MATCH, hash));
            RequestDescriptor::new(Method::Put, Resource::ActivityState)
                .state(&address)
                .conditional(condition.as_ref(), value)?
                .json(value.clone())
        }
        Call::PostState { key, value } => {
            let address = validation::state_address(key, true)?;
            RequestDescriptor::new(Method::Post, Resource::ActivityState)
                .state(&address)
                .json(value.clone())
        }
        Call::GetState { key, since } => {
            let address = validation::state_address(key, false)?;
            RequestDescriptor::new(Method::Get, Resource::ActivityState)
                .state(&address)
                .optional_param("since", since.as_deref())
        }
        Call::DeleteState { key } => {
            let address = validation::state_address(key, false)?;
            RequestDescriptor::new(Method::Delete, Resource::ActivityState).state(&address)
        }
        Call::GetActivities { activity_id } => {
            let activity = validation::activity(activity_id)?;
            RequestDescriptor::new(Method::Get, Resource::Activities)
                .param("activityId", activity.as_str())
        }
        Call::GetAgents { agent } => {
            let agent = validation::agent(agent)?;
            RequestDescriptor::new(Method::Get, Resource::Agents)
                .param("agent", agent.to_query_value())
        }
        Call::PutProfile {
            key,
            value,
            condition,
        } => {
            let address = validation::profile_address(key, true)?;
            RequestDescriptor::new(Method::Put, profile_resource(&address))
                .profile(&address)
                .conditional(condition.as_ref(), value)?
                .json(value.clone())
        }
        Call::PostProfile { key, value } => {
            let address = validation::profile_address(key, true)?;
            RequestDescriptor::new(Method::Post, profile_resource(&address))
                .profile(&address)
                .json(value.clone())
        }
        Call::GetProfile { key, since } => {
            let address = validation::profile_address(key, false)?;
            RequestDescriptor::new(Method::Get, profile_resource(&address))
                .profile(&address)
                .optional_param("since", since.as_deref())
        }
        Call::DeleteProfile { key } => {
            let address = validation::profile_address(key, true)?;
            RequestDescriptor::new(Method::Delete, profile_resource(&address)).profile(&address)
        }
        Call::GetAbout => RequestDescriptor::new(Method::Get, Resource::About),
    };
    Ok(request)
}
