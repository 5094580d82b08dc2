//! Pre-flight validation of call arguments.
//!
//! [`validate`] runs before any I/O and has no side effects; a call it rejects
//! is never dispatched. The typed addresses it produces ([`StateAddress`],
//! [`ProfileAddress`]) are what request building routes on, so a descriptor can
//! only be built from arguments that passed these checks.

use chrono::DateTime;
use serde_json::Value;

use crate::attachments::Attachment;
use crate::calls::{Call, ProfileKey, ProfileOwner, StateKey, StatementQuery};
use crate::errors::ValidationError;
use crate::identifiers::{ActivityId, Agent, ProfileId, RegistrationId, StateId, StatementId};

/// Query parameters that must parse as timestamps.
const TIMESTAMP_PARAMS: [&str; 2] = ["since", "until"];

// ---------------------------------------------------------------------------
// Validated addresses
// ---------------------------------------------------------------------------

/// A validated state-document address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateAddress {
    /// Owning activity.
    pub activity: ActivityId,
    /// Owning agent.
    pub agent: Agent,
    /// Document identifier, absent for list/delete-all requests.
    pub state_id: Option<StateId>,
    /// Registration scope.
    pub registration: Option<RegistrationId>,
}

/// A validated profile owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerAddress {
    /// Activity profile owner.
    Activity(ActivityId),
    /// Agent profile owner.
    Agent(Agent),
}

/// A validated profile-document address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileAddress {
    /// Owner of the document.
    pub owner: OwnerAddress,
    /// Document identifier, absent for list requests.
    pub profile_id: Option<ProfileId>,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Checks a call's arguments. Returns the first failure found.
///
/// Conditional-header checks are not part of this step; they run in the
/// conditional-write guard when the request is built.
pub fn validate(call: &Call) -> Result<(), ValidationError> {
    match call {
        Call::PutStatement {
            statement,
            id,
            attachments,
        } => {
            single_statement(statement)?;
            statement_id(statement, id.as_deref())?;
            attachment_list(attachments)
        }
        Call::PostStatement {
            statement,
            attachments,
        } => {
            single_statement(statement)?;
            attachment_list(attachments)
        }
        Call::PostStatements { statements } => statement_batch(statements),
        Call::GetStatements { query } => statement_query(query),
        Call::PutState { key, value, .. } | Call::PostState { key, value } => {
            state_address(key, true)?;
            document_value(value, "state value")
        }
        Call::GetState { key, since } => {
            state_address(key, false)?;
            optional_timestamp(since.as_deref())
        }
        Call::DeleteState { key } => state_address(key, false).map(drop),
        Call::GetActivities { activity_id } => activity(activity_id).map(drop),
        Call::GetAgents { agent: value } => agent(value).map(drop),
        Call::PutProfile { key, value, .. } | Call::PostProfile { key, value } => {
            profile_address(key, true)?;
            document_value(value, "profile value")
        }
        Call::GetProfile { key, since } => {
            profile_address(key, false)?;
            optional_timestamp(since.as_deref())
        }
        Call::DeleteProfile { key } => profile_address(key, true).map(drop),
        Call::GetAbout => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

/// A singular write takes exactly one record object.
pub(crate) fn single_statement(statement: &Value) -> Result<(), ValidationError> {
    match statement {
        Value::Object(_) => Ok(()),
        Value::Array(_) => Err(ValidationError::parameters(
            "expected a single statement, got a sequence",
        )),
        Value::Null => Err(ValidationError::parameters("statement is required")),
        _ => Err(ValidationError::parameters("statement must be a JSON object")),
    }
}

/// The addressing identifier must be present and equal the record's own `id`.
pub(crate) fn statement_id(
    statement: &Value,
    id: Option<&str>,
) -> Result<StatementId, ValidationError> {
    let id = id
        .and_then(StatementId::new)
        .ok_or_else(|| ValidationError::id("a statement identifier is required"))?;
    match statement.get("id").and_then(Value::as_str) {
        Some(own) if own == id.as_str() => Ok(id),
        Some(own) => Err(ValidationError::id(format!(
            "identifier {id} does not match the statement's own identifier {own}"
        ))),
        None => Err(ValidationError::id("the statement has no identifier of its own")),
    }
}

fn statement_batch(statements: &Value) -> Result<(), ValidationError> {
    let Value::Array(items) = statements else {
        return Err(ValidationError::parameters(
            "expected a sequence of statements",
        ));
    };
    if items.is_empty() {
        return Err(ValidationError::parameters(
            "the statement sequence is empty",
        ));
    }
    if let Some(position) = items.iter().position(|item| !item.is_object()) {
        return Err(ValidationError::parameters(format!(
            "statement at position {position} is not a JSON object"
        )));
    }
    Ok(())
}

fn attachment_list(attachments: &[Attachment]) -> Result<(), ValidationError> {
    for (position, attachment) in attachments.iter().enumerate() {
        if attachment.usage_type.is_empty() || attachment.content_type.is_empty() {
            return Err(ValidationError::parameters(format!(
                "attachment at position {position} needs a usage type and a content type"
            )));
        }
        if !attachment.display.is_object() {
            return Err(ValidationError::parameters(format!(
                "attachment at position {position} needs a display language map"
            )));
        }
    }
    Ok(())
}

pub(crate) fn statement_query(query: &StatementQuery) -> Result<(), ValidationError> {
    for name in TIMESTAMP_PARAMS {
        optional_timestamp(query.get(name))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

pub(crate) fn state_address(
    key: &StateKey,
    require_state_id: bool,
) -> Result<StateAddress, ValidationError> {
    let activity = activity(&key.activity_id)?;
    let agent = agent(&key.agent)?;
    let state_id = optional_id(key.state_id.as_deref(), |raw| StateId::new(raw), "state id")?;
    if require_state_id && state_id.is_none() {
        return Err(ValidationError::parameters("state id is required"));
    }
    let registration = optional_id(
        key.registration.as_deref(),
        |raw| RegistrationId::new(raw),
        "registration",
    )?;
    Ok(StateAddress {
        activity,
        agent,
        state_id,
        registration,
    })
}

pub(crate) fn profile_address(
    key: &ProfileKey,
    require_profile_id: bool,
) -> Result<ProfileAddress, ValidationError> {
    let owner = match &key.owner {
        ProfileOwner::Activity(activity_id) => OwnerAddress::Activity(activity(activity_id)?),
        ProfileOwner::Agent(value) => OwnerAddress::Agent(agent(value)?),
    };
    let profile_id = optional_id(
        key.profile_id.as_deref(),
        |raw| ProfileId::new(raw),
        "profile id",
    )?;
    if require_profile_id && profile_id.is_none() {
        return Err(ValidationError::parameters("profile id is required"));
    }
    Ok(ProfileAddress { owner, profile_id })
}

fn document_value(value: &Value, what: &str) -> Result<(), ValidationError> {
    if value.is_null() {
        return Err(ValidationError::parameters(format!("{what} is required")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

pub(crate) fn activity(activity_id: &str) -> Result<ActivityId, ValidationError> {
    ActivityId::new(activity_id)
        .ok_or_else(|| ValidationError::parameters("activity id is required"))
}

pub(crate) fn agent(value: &Value) -> Result<Agent, ValidationError> {
    Agent::from_value(value).ok_or_else(|| {
        ValidationError::parameters("agent is required and must be a JSON object")
    })
}

// An explicitly supplied identifier must not be empty; absence is allowed.
fn optional_id<T>(
    value: Option<&str>,
    make: fn(String) -> Option<T>,
    what: &str,
) -> Result<Option<T>, ValidationError> {
    match value {
        None => Ok(None),
        Some(raw) => make(raw.to_string())
            .map(Some)
            .ok_or_else(|| ValidationError::parameters(format!("{what} must not be empty"))),
    }
}

/// Accepts `None`; otherwise the value must be an RFC 3339 timestamp.
pub fn optional_timestamp(value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        None => Ok(()),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(drop)
            .map_err(|_| ValidationError::InvalidTimestamp {
                value: raw.to_string(),
            }),
    }
}
