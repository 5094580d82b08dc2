//! Multi-page statement retrieval.
//!
//! ## Behaviour
//!
//! 1. The initial query is sent with the caller's options verbatim.
//! 2. For each of up to `hops` further steps, the previous page's continuation
//!    reference is dereferenced and its records appended in server order.
//! 3. A page without a continuation ends the walk early. Running out of pages
//!    is the normal end of results, not an error.
//!
//! Hops are strictly sequential: the next target is only known once the
//! previous response has arrived. Each walk starts from an empty accumulator.

use protocol::{
    build_request, Call, ClientContext, ClientError, ContinuationRef, Reply, RequestDescriptor,
    ResponseEnvelope, StatementPage, StatementQuery, ValidationError,
};
use serde_json::{json, Value};

use crate::dispatcher::RequestDispatcher;

/// The records gathered by one walk.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatementCollection {
    /// Every record received, in server order.
    pub statements: Vec<Value>,
    /// Continuation left unfollowed when the hop budget ran out.
    pub more: Option<ContinuationRef>,
    /// Number of round trips performed.
    pub pages: usize,
    /// Envelope of the last page received.
    pub last_response: ResponseEnvelope,
}

impl StatementCollection {
    /// Shapes the collection like a single statement result:
    /// `{"statements": [...], "more": "..."}` with an empty `more` when the
    /// results are exhausted.
    pub fn to_value(&self) -> Value {
        json!({
            "statements": self.statements,
            "more": self.more.as_ref().map(ContinuationRef::as_str).unwrap_or(""),
        })
    }

    /// Converts into a [`Reply`] carrying the aggregated result as its data.
    pub fn into_reply(self) -> Reply {
        let data = self.to_value();
        Reply {
            response: self.last_response,
            data: Some(data),
        }
    }
}

/// Follows continuation references through a [`RequestDispatcher`].
#[derive(Debug, Clone)]
pub struct PaginationWalker {
    dispatcher: RequestDispatcher,
}

impl PaginationWalker {
    /// Creates a walker that dispatches through `dispatcher`.
    pub fn new(dispatcher: RequestDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Validates `query` and builds the first request of a walk.
    pub fn initial_request(query: &StatementQuery) -> Result<RequestDescriptor, ValidationError> {
        build_request(&Call::GetStatements {
            query: query.clone(),
        })
    }

    /// Fetches the first page of `query` plus up to `hops` continuation pages.
    pub async fn fetch_with_continuation(
        &self,
        query: &StatementQuery,
        hops: usize,
        context: &ClientContext,
    ) -> Result<StatementCollection, ClientError> {
        let initial = Self::initial_request(query)?;
        self.walk(initial, hops, context).await
    }

    /// Runs a walk from an already built first request.
    pub async fn walk(
        &self,
        initial: RequestDescriptor,
        hops: usize,
        context: &ClientContext,
    ) -> Result<StatementCollection, ClientError> {
        let mut collection = StatementCollection::default();
        let mut next = Some(initial);
        let mut hops_left = hops;

        while let Some(request) = next.take() {
            let reply = self.dispatcher.send(&request, context).await?;
            collection.pages += 1;

            let page = read_page(&reply);
            tracing::debug!(
                page = collection.pages,
                records = page.statements.len(),
                has_more = page.more.is_some(),
                "received statement page"
            );
            collection.statements.extend(page.statements);
            collection.last_response = reply.response;

            match page.more {
                Some(more) if hops_left > 0 => {
                    hops_left -= 1;
                    next = Some(RequestDescriptor::continuation(more));
                }
                more => collection.more = more,
            }
        }

        Ok(collection)
    }
}

fn read_page(reply: &Reply) -> StatementPage {
    match &reply.data {
        Some(body) if StatementPage::is_well_formed(body) => StatementPage::from_value(body),
        _ => {
            tracing::warn!(
                status = reply.response.status,
                "statement response has no statements array; treating it as an empty final page"
            );
            StatementPage::default()
        }
    }
}
