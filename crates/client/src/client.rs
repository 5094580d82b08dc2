//! The public client surface.
//!
//! [`XapiClient`] binds a [`ClientContext`] to a [`Transport`] and exposes every
//! record-store operation in two delivery modes:
//!
//! - **Deferred**: [`XapiClient::execute`] and the named operations return a
//!   future resolving to `Result<Reply, ClientError>`.
//! - **Completion handler**: [`XapiClient::execute_with`] subscribes a
//!   [`CompletionHandler`] to that same future.
//!
//! Arguments are validated and the context snapshot taken when the call is
//! issued, not when the returned future is first polled. A later
//! [`XapiClient::change_config`] therefore never affects calls already issued.

use std::future::Future;
use std::sync::Arc;

use arc_swap::ArcSwap;
use futures::future::BoxFuture;
use futures::FutureExt;
use protocol::{
    build_request, Attachment, Call, ClientContext, ClientError, Condition, ProfileKey, Reply,
    StateKey, StatementQuery, Transport, ValidationError,
};
use serde_json::Value;
use tracing::Instrument;

use crate::completion::{deliver, CompletionHandler, Pending};
use crate::dispatcher::RequestDispatcher;
use crate::walker::{PaginationWalker, StatementCollection};

/// Outcome of a single-exchange call in deferred mode.
pub type ReplyFuture = BoxFuture<'static, Result<Reply, ClientError>>;

/// A record-store client.
///
/// Cheap to share behind an `Arc`; calls hold no lock and share nothing but
/// the context snapshot they load.
pub struct XapiClient {
    context: ArcSwap<ClientContext>,
    dispatcher: RequestDispatcher,
}

impl XapiClient {
    /// Creates a client for `context` that sends through `transport`.
    pub fn new(context: ClientContext, transport: Arc<dyn Transport>) -> Self {
        Self {
            context: ArcSwap::from_pointee(context),
            dispatcher: RequestDispatcher::new(transport),
        }
    }

    /// Returns the current context snapshot.
    pub fn context(&self) -> Arc<ClientContext> {
        self.context.load_full()
    }

    /// Replaces the context for calls issued from now on.
    pub fn change_config(&self, context: ClientContext) {
        tracing::debug!(endpoint = %context.endpoint(), "client context replaced");
        self.context.store(Arc::new(context));
    }

    // -----------------------------------------------------------------------
    // Core delivery
    // -----------------------------------------------------------------------

    /// Issues `call`, resolving to its outcome.
    ///
    /// A validation failure resolves the returned future to
    /// [`ClientError::Validation`] without any request being sent.
    pub fn execute(&self, call: Call) -> ReplyFuture {
        match self.prepare(&call) {
            Ok(outcome) => outcome.boxed(),
            Err(err) => futures::future::ready(Err(err.into())).boxed(),
        }
    }

    /// Issues `call` and hands its outcome to `handler`.
    ///
    /// On a validation failure no request is sent and:
    ///
    /// - with `strict_callbacks` off (the default), `handler` is invoked
    ///   before this returns and the returned [`Pending`] is already complete;
    /// - with `strict_callbacks` on, the error is returned here and `handler`
    ///   is dropped uninvoked.
    ///
    /// Otherwise `handler` runs exactly once when the returned [`Pending`]
    /// completes.
    pub fn execute_with(
        &self,
        call: Call,
        handler: CompletionHandler,
    ) -> Result<Pending, ClientError> {
        let prepared = self.prepare(&call);
        self.subscribe(prepared, handler)
    }

    /// Fetches a statement query's first page plus up to `hops` continuation
    /// pages.
    pub fn get_more_statements(
        &self,
        query: StatementQuery,
        hops: usize,
    ) -> BoxFuture<'static, Result<StatementCollection, ClientError>> {
        match self.prepare_walk(&query, hops) {
            Ok(walk) => walk.boxed(),
            Err(err) => futures::future::ready(Err(err.into())).boxed(),
        }
    }

    /// Completion-handler form of [`XapiClient::get_more_statements`].
    ///
    /// The handler's data is the aggregated result,
    /// `{"statements": [...], "more": "..."}`, and its response the envelope
    /// of the last page.
    pub fn get_more_statements_with(
        &self,
        query: StatementQuery,
        hops: usize,
        handler: CompletionHandler,
    ) -> Result<Pending, ClientError> {
        let prepared = self
            .prepare_walk(&query, hops)
            .map(|walk| walk.map(|collection| collection.map(StatementCollection::into_reply)));
        self.subscribe(prepared, handler)
    }

    // Validates, builds and binds the context snapshot. The returned future
    // owns everything it needs.
    fn prepare(
        &self,
        call: &Call,
    ) -> Result<impl Future<Output = Result<Reply, ClientError>> + Send + 'static, ValidationError>
    {
        let operation = call.kind();
        let descriptor = build_request(call).inspect_err(|err| {
            tracing::debug!(operation, error = %err, "call rejected before dispatch");
        })?;
        let context = self.context.load_full();
        let dispatcher = self.dispatcher.clone();

        Ok(async move { dispatcher.send(&descriptor, &context).await }
            .instrument(tracing::info_span!("xapi.call", operation)))
    }

    fn prepare_walk(
        &self,
        query: &StatementQuery,
        hops: usize,
    ) -> Result<
        impl Future<Output = Result<StatementCollection, ClientError>> + Send + 'static,
        ValidationError,
    > {
        let initial = PaginationWalker::initial_request(query).inspect_err(|err| {
            tracing::debug!(
                operation = "get_more_statements",
                error = %err,
                "call rejected before dispatch"
            );
        })?;
        let context = self.context.load_full();
        let walker = PaginationWalker::new(self.dispatcher.clone());

        Ok(async move { walker.walk(initial, hops, &context).await }
            .instrument(tracing::info_span!("xapi.call", operation = "get_more_statements", hops)))
    }

    fn subscribe<F>(
        &self,
        prepared: Result<F, ValidationError>,
        handler: CompletionHandler,
    ) -> Result<Pending, ClientError>
    where
        F: Future<Output = Result<Reply, ClientError>> + Send + 'static,
    {
        match prepared {
            Ok(outcome) => Ok(Pending::subscribe(outcome, handler)),
            Err(err) if self.context.load().options().strict_callbacks => Err(err.into()),
            Err(err) => {
                deliver(handler, Err(err.into()));
                Ok(Pending::ready())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    /// Stores `statement` under `id`, which must equal the statement's own `id`.
    pub fn put_statement(&self, statement: Value, id: impl Into<String>) -> ReplyFuture {
        self.put_statement_with_attachments(statement, id, Vec::new())
    }

    /// [`XapiClient::put_statement`] with attachments, sent as `multipart/mixed`.
    pub fn put_statement_with_attachments(
        &self,
        statement: Value,
        id: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> ReplyFuture {
        self.execute(Call::PutStatement {
            statement,
            id: Some(id.into()),
            attachments,
        })
    }

    /// Stores one statement; the server assigns an identifier if it has none.
    pub fn post_statement(&self, statement: Value) -> ReplyFuture {
        self.execute(Call::PostStatement {
            statement,
            attachments: Vec::new(),
        })
    }

    /// Stores a non-empty array of statements in one round trip.
    pub fn post_statements(&self, statements: Value) -> ReplyFuture {
        self.execute(Call::PostStatements { statements })
    }

    /// Fetches one page of statements.
    pub fn get_statements(&self, query: StatementQuery) -> ReplyFuture {
        self.execute(Call::GetStatements { query })
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    /// Replaces a state document, optionally only if its current entity tag
    /// equals `match_hash`.
    pub fn put_state(
        &self,
        key: StateKey,
        value: Value,
        match_hash: Option<String>,
    ) -> ReplyFuture {
        self.execute(Call::PutState {
            key,
            value,
            match_hash,
        })
    }

    /// Merges `value` into a state document.
    pub fn post_state(&self, key: StateKey, value: Value) -> ReplyFuture {
        self.execute(Call::PostState { key, value })
    }

    /// Fetches a state document, or the list of state ids when the key has none.
    pub fn get_state(&self, key: StateKey, since: Option<String>) -> ReplyFuture {
        self.execute(Call::GetState { key, since })
    }

    /// Deletes a state document, or every document under the key.
    pub fn delete_state(&self, key: StateKey) -> ReplyFuture {
        self.execute(Call::DeleteState { key })
    }

    // -----------------------------------------------------------------------
    // Activities and agents
    // -----------------------------------------------------------------------

    /// Fetches an activity definition.
    pub fn get_activities(&self, activity_id: impl Into<String>) -> ReplyFuture {
        self.execute(Call::GetActivities {
            activity_id: activity_id.into(),
        })
    }

    /// Fetches the combined person object for `agent`.
    pub fn get_agents(&self, agent: Value) -> ReplyFuture {
        self.execute(Call::GetAgents { agent })
    }

    // -----------------------------------------------------------------------
    // Profiles
    // -----------------------------------------------------------------------

    /// Replaces a profile document, optionally under `condition`.
    pub fn put_profile(
        &self,
        key: ProfileKey,
        value: Value,
        condition: Option<Condition>,
    ) -> ReplyFuture {
        self.execute(Call::PutProfile {
            key,
            value,
            condition,
        })
    }

    /// Merges `value` into a profile document.
    pub fn post_profile(&self, key: ProfileKey, value: Value) -> ReplyFuture {
        self.execute(Call::PostProfile { key, value })
    }

    /// Fetches a profile document, or the owner's profile ids.
    pub fn get_profile(&self, key: ProfileKey, since: Option<String>) -> ReplyFuture {
        self.execute(Call::GetProfile { key, since })
    }

    /// Deletes a profile document.
    pub fn delete_profile(&self, key: ProfileKey) -> ReplyFuture {
        self.execute(Call::DeleteProfile { key })
    }

    /// Fetches server metadata.
    pub fn about(&self) -> ReplyFuture {
        self.execute(Call::GetAbout)
    }
}

impl std::fmt::Debug for XapiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XapiClient")
            .field("endpoint", &self.context.load().endpoint().as_str())
            .finish_non_exhaustive()
    }
}
