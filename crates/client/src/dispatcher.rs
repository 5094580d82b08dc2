//! Request dispatch: one descriptor in, one exchange out.
//!
//! [`RequestDispatcher::send`] resolves a [`RequestDescriptor`] against a
//! [`ClientContext`] snapshot, adds the headers every request carries, and
//! performs exactly one [`Transport::execute`]. Nothing here retries, caches,
//! or times out.

use std::sync::Arc;

use protocol::{
    ClientContext, ClientError, HttpRequest, ProtocolError, Reply, RequestDescriptor, Target,
    Transport, TransportError, TransportErrorKind,
};
use tracing::Instrument;
use url::Url;

/// Header carrying the protocol version.
pub const VERSION_HEADER: &str = "X-Experience-API-Version";

/// Sends request descriptors through a [`Transport`].
#[derive(Clone)]
pub struct RequestDispatcher {
    transport: Arc<dyn Transport>,
}

impl RequestDispatcher {
    /// Creates a dispatcher over `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Performs one round trip for `descriptor`.
    ///
    /// 2xx responses become a [`Reply`]; any other status becomes a
    /// [`ProtocolError`] carrying the status, headers and body.
    pub async fn send(
        &self,
        descriptor: &RequestDescriptor,
        context: &ClientContext,
    ) -> Result<Reply, ClientError> {
        let request = prepare(descriptor, context)?;
        let span = tracing::info_span!(
            "xapi.request",
            method = %descriptor.method,
            resource = resource_label(descriptor),
            status = tracing::field::Empty,
        );

        self.exchange(request).instrument(span).await
    }

    async fn exchange(&self, request: HttpRequest) -> Result<Reply, ClientError> {
        let response = self.transport.execute(request).await?;
        tracing::Span::current().record("status", response.status);

        if !response.is_success() {
            tracing::debug!(status = response.status, "record store rejected request");
            return Err(ProtocolError {
                status: response.status,
                headers: response.headers,
                body: response.body,
            }
            .into());
        }
        Ok(Reply::from_response(response))
    }
}

impl std::fmt::Debug for RequestDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDispatcher").finish_non_exhaustive()
    }
}

fn resource_label(descriptor: &RequestDescriptor) -> &'static str {
    match &descriptor.target {
        Target::Resource(resource) => resource.path(),
        Target::Continuation(_) => "statements (continuation)",
    }
}

/// Resolves the absolute URL of `descriptor` under the context's endpoint.
///
/// Resource paths are joined beneath the endpoint. Continuation references
/// are resolved against the endpoint as the server issued them (a
/// root-relative reference replaces the endpoint's path) and must stay on
/// the endpoint's origin: credentials are never sent to another host.
pub fn resolve_url(
    descriptor: &RequestDescriptor,
    context: &ClientContext,
) -> Result<Url, ClientError> {
    let endpoint = context.endpoint();
    let joined = match &descriptor.target {
        Target::Resource(resource) => endpoint.join(resource.path()),
        Target::Continuation(reference) => endpoint.join(reference.as_str()),
    };
    let mut url = joined.map_err(|e| unresolvable(format!("cannot resolve request URL: {e}")))?;

    if url.origin() != endpoint.origin() {
        return Err(unresolvable(format!(
            "continuation {url} leaves the record store at {}",
            endpoint.origin().ascii_serialization()
        ))
        .into());
    }

    if !descriptor.query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in &descriptor.query {
            pairs.append_pair(name, value);
        }
    }
    Ok(url)
}

fn unresolvable(message: String) -> TransportError {
    TransportError::new(TransportErrorKind::Request, message)
}

/// Builds the concrete HTTP request for `descriptor`.
///
/// Header order: authorization (if any), protocol version, content type (if
/// there is a body), then the descriptor's own headers.
pub fn prepare(
    descriptor: &RequestDescriptor,
    context: &ClientContext,
) -> Result<HttpRequest, ClientError> {
    let url = resolve_url(descriptor, context)?;

    let mut headers = Vec::with_capacity(descriptor.headers.len() + 3);
    if let Some(authorization) = context.credentials().authorization() {
        headers.push(("Authorization".to_string(), authorization));
    }
    headers.push((VERSION_HEADER.to_string(), context.options().version.clone()));
    if let Some(body) = &descriptor.body {
        headers.push(("Content-Type".to_string(), body.content_type()));
    }
    headers.extend(descriptor.headers.iter().cloned());

    Ok(HttpRequest {
        method: descriptor.method,
        url: url.into(),
        headers,
        body: descriptor.body.as_ref().map(|body| body.encode()),
    })
}
