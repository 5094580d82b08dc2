//! Protocol domain for the learning-record store client.
//!
//! Everything needed to turn a caller's request into a well-formed exchange
//! with a record store lives here: call shapes, argument validation, the
//! conditional-write guard, request descriptors, response envelopes, and the
//! error taxonomy shared by every delivery mode.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate performs no I/O. The
//! [`Transport`] trait is the only seam to the network; adapters implement it
//! elsewhere.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`calls`] | [`Call`] and its keys (`StateKey`, `ProfileKey`, `StatementQuery`) |
//! | [`validation`] | Pre-flight argument checks |
//! | [`conditional`] | Conditional-write guard and content hashing |
//! | [`attachments`] | Statement attachments and multipart encoding |
//! | [`request`] | [`RequestDescriptor`] and [`build_request`] |
//! | [`response`] | [`ResponseEnvelope`] and [`Reply`] |
//! | [`statements`] | Statement pages and continuation references |
//! | [`context`] | Endpoint, credentials and per-client options |
//! | [`identifiers`] | Newtype identifiers |
//! | [`errors`] | Validation, protocol and transport errors |
//! | [`transport`] | The [`Transport`] port |

pub mod attachments;
pub mod calls;
pub mod conditional;
pub mod context;
pub mod errors;
pub mod identifiers;
pub mod request;
pub mod response;
pub mod statements;
pub mod transport;
pub mod validation;

pub use attachments::Attachment;
pub use calls::{Call, Condition, ProfileKey, ProfileOwner, StateKey, StatementQuery};
pub use conditional::{
    canonical_json, content_hash, prepare_conditional_header, ConditionKind, ConditionalHeader,
    MatchValue, IF_MATCH, IF_NONE_MATCH, WILDCARD,
};
pub use context::{
    ClientContext, ClientOptions, Credentials, DEFAULT_PROTOCOL_VERSION,
};
pub use errors::{
    ClientError, ContextError, ErrorClass, ProtocolError, TransportError, TransportErrorKind,
    ValidationError, STATUS_PRECONDITION_FAILED,
};
pub use identifiers::{ActivityId, Agent, ProfileId, RegistrationId, StateId, StatementId};
pub use request::{build_request, Method, RequestBody, RequestDescriptor, Resource, Target};
pub use response::{Reply, ResponseEnvelope};
pub use statements::{ContinuationRef, StatementPage};
pub use transport::{HttpRequest, Transport};
pub use validation::validate;
