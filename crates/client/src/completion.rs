//! Completion-handler delivery layered over deferred results.
//!
//! Every operation is implemented once, as a future resolving to
//! `Result<Reply, ClientError>`. Callers who prefer a completion handler get a
//! thin adapter: the handler subscribes to that same future and receives its
//! outcome as `(error, response, data)`. The handler is consumed by the call,
//! so it runs at most once, and [`Pending`] runs it exactly once when driven to
//! completion.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::FutureExt;
use protocol::{ClientError, Reply, ResponseEnvelope};
use serde_json::Value;

/// Receives a call's outcome: `error` is `None` on success.
///
/// On a protocol error the response envelope is passed alongside the error;
/// validation and transport errors carry no response.
pub type CompletionHandler =
    Box<dyn FnOnce(Option<ClientError>, Option<ResponseEnvelope>, Option<Value>) + Send + 'static>;

/// A call whose outcome will be handed to a completion handler.
///
/// Drive it by awaiting or spawning it. Dropping it unpolled cancels the
/// request and the handler is never invoked.
#[must_use = "the request is not sent and the handler not called unless this is awaited or spawned"]
pub struct Pending(BoxFuture<'static, ()>);

impl Pending {
    /// A pending call whose handler has already run.
    pub fn ready() -> Self {
        Self(futures::future::ready(()).boxed())
    }

    /// Subscribes `handler` to `outcome`.
    pub(crate) fn subscribe<F>(outcome: F, handler: CompletionHandler) -> Self
    where
        F: Future<Output = Result<Reply, ClientError>> + Send + 'static,
    {
        Self(async move { deliver(handler, outcome.await) }.boxed())
    }
}

impl Future for Pending {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.0.as_mut().poll(cx)
    }
}

impl std::fmt::Debug for Pending {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pending").finish_non_exhaustive()
    }
}

/// Hands `outcome` to `handler`.
pub(crate) fn deliver(handler: CompletionHandler, outcome: Result<Reply, ClientError>) {
    match outcome {
        Ok(reply) => handler(None, Some(reply.response), reply.data),
        Err(err) => {
            let response = match &err {
                ClientError::Protocol(rejection) => Some(ResponseEnvelope {
                    status: rejection.status,
                    headers: rejection.headers.clone(),
                    body: rejection.body.clone(),
                }),
                _ => None,
            };
            handler(Some(err), response, None)
        }
    }
}
