#![allow(dead_code)]

use async_trait::async_trait;
use protocol::{
    content_hash, ClientContext, Credentials, HttpRequest, Method, ResponseEnvelope, Transport,
    TransportError, TransportErrorKind,
};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

pub const ENDPOINT: &str = "http://lrs.test/xapi/";
const DEFAULT_PAGE_SIZE: usize = 10;

pub fn context() -> ClientContext {
    ClientContext::new(ENDPOINT)
        .expect("valid endpoint")
        .with_credentials(Credentials::Basic {
            user: "tom".into(),
            password: "1234".into(),
        })
}

pub fn agent() -> Value {
    json!({"objectType": "Agent", "mbox": "mailto:userone@example.com"})
}

pub fn statement(id: &str) -> Value {
    json!({
        "id": id,
        "actor": agent(),
        "verb": {
            "id": "http://adlnet.gov/expapi/verbs/attempted",
            "display": {"en-US": "attempted"}
        },
        "object": {"id": "http://adlnet.gov/expapi/activities/act"},
    })
}

// ---------------------------------------------------------------------------
// In-memory record store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Document {
    resource: String,
    owner: Vec<(String, String)>,
    id: String,
    value: Value,
}

#[derive(Debug, Default)]
struct Store {
    statements: Vec<Value>,
    documents: Vec<Document>,
    requests: Vec<HttpRequest>,
}

/// A record store held in memory, speaking the protocol over [`Transport`].
///
/// Statement pages continue through `more` references of the form
/// `/xapi/statements?more=<offset>&limit=<n>`. Documents carry SHA-1 entity
/// tags and honour `If-Match` / `If-None-Match` with 412.
#[derive(Default)]
pub struct MemoryLrs {
    store: Mutex<Store>,
}

impl MemoryLrs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_statements(count: usize) -> Arc<Self> {
        let lrs = Self::default();
        lrs.store.lock().expect("store mutex").statements =
            (0..count).map(|i| statement(&format!("stmt-{i}"))).collect();
        Arc::new(lrs)
    }

    pub fn request_count(&self) -> usize {
        self.store.lock().expect("store mutex").requests.len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.store.lock().expect("store mutex").requests.clone()
    }

    pub fn statement_count(&self) -> usize {
        self.store.lock().expect("store mutex").statements.len()
    }

    fn handle(&self, request: &HttpRequest) -> ResponseEnvelope {
        if request.header("X-Experience-API-Version").is_none() {
            return respond(400, json!({"message": "missing version header"}));
        }
        let url = match Url::parse(&request.url) {
            Ok(url) => url,
            Err(_) => return respond(400, json!({"message": "bad url"})),
        };
        let resource = url.path().trim_start_matches("/xapi/").to_string();
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let param = |name: &str| {
            query
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        };
        let body = request
            .body
            .as_deref()
            .and_then(|bytes| serde_json::from_slice::<Value>(bytes).ok());

        let mut store = self.store.lock().expect("store mutex");
        match (request.method, resource.as_str()) {
            (Method::Get, "statements") => store.get_statements(&param),
            (Method::Put, "statements") => {
                let multipart = request
                    .header("content-type")
                    .is_some_and(|value| value.starts_with("multipart/mixed"));
                if multipart {
                    return empty(204);
                }
                store.put_statement(param("statementId"), body)
            }
            (Method::Post, "statements") => store.post_statements(body),
            (_, "activities/state") => {
                store.document(request, "activities/state", "stateId", &query, body)
            }
            (_, "activities/profile") => {
                store.document(request, "activities/profile", "profileId", &query, body)
            }
            (_, "agents/profile") => {
                store.document(request, "agents/profile", "profileId", &query, body)
            }
            (Method::Get, "activities") => respond(
                200,
                json!({"objectType": "Activity", "id": param("activityId")}),
            ),
            (Method::Get, "agents") => {
                let agent = param("agent")
                    .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
                    .unwrap_or(Value::Null);
                respond(200, json!({"objectType": "Person", "mbox": [agent["mbox"]]}))
            }
            (Method::Get, "about") => respond(200, json!({"version": ["1.0.3"]})),
            _ => respond(404, json!({"message": "no such resource"})),
        }
    }
}

impl Store {
    fn get_statements(&self, param: &dyn Fn(&str) -> Option<String>) -> ResponseEnvelope {
        if let Some(id) = param("statementId") {
            return match self.statements.iter().find(|s| s["id"] == json!(id)) {
                Some(statement) => respond(200, statement.clone()),
                None => respond(404, json!({"message": "statement not found"})),
            };
        }
        let limit = param("limit")
            .and_then(|raw| raw.parse::<usize>().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let offset = param("more")
            .and_then(|raw| raw.parse::<usize>().ok())
            .unwrap_or(0);
        let end = (offset + limit).min(self.statements.len());
        let page = self.statements.get(offset..end).unwrap_or_default().to_vec();
        let more = if end < self.statements.len() {
            format!("/xapi/statements?more={end}&limit={limit}")
        } else {
            String::new()
        };
        respond(200, json!({"statements": page, "more": more}))
    }

    fn put_statement(&mut self, id: Option<String>, body: Option<Value>) -> ResponseEnvelope {
        let (Some(id), Some(statement)) = (id, body) else {
            return respond(400, json!({"message": "statementId and body required"}));
        };
        if self.statements.iter().any(|s| s["id"] == json!(id)) {
            return respond(409, json!({"message": "statement already exists"}));
        }
        self.statements.push(statement);
        empty(204)
    }

    fn post_statements(&mut self, body: Option<Value>) -> ResponseEnvelope {
        let records = match body {
            Some(Value::Array(items)) => items,
            Some(item @ Value::Object(_)) => vec![item],
            _ => return respond(400, json!({"message": "statement body required"})),
        };
        let mut ids = Vec::with_capacity(records.len());
        for mut record in records {
            let id = match record.get("id").and_then(Value::as_str) {
                Some(id) => id.to_string(),
                None => {
                    let id = format!("generated-{}", self.statements.len());
                    record["id"] = json!(id);
                    id
                }
            };
            ids.push(id);
            self.statements.push(record);
        }
        respond(200, json!(ids))
    }

    fn document(
        &mut self,
        request: &HttpRequest,
        resource: &str,
        id_param: &str,
        query: &[(String, String)],
        body: Option<Value>,
    ) -> ResponseEnvelope {
        let mut owner: Vec<(String, String)> = query
            .iter()
            .filter(|(key, _)| key != id_param && key != "since")
            .cloned()
            .collect();
        owner.sort();
        let id = query
            .iter()
            .find(|(key, _)| key == id_param)
            .map(|(_, value)| value.clone());
        let position = id.as_ref().and_then(|id| {
            self.documents
                .iter()
                .position(|doc| doc.resource == resource && doc.owner == owner && doc.id == *id)
        });

        match request.method {
            Method::Get => match (id, position) {
                (Some(_), Some(index)) => {
                    let value = &self.documents[index].value;
                    let mut response = respond(200, value.clone());
                    response
                        .headers
                        .insert("etag".into(), format!("\"{}\"", content_hash(value)));
                    response
                }
                (Some(_), None) => respond(404, json!({"message": "document not found"})),
                (None, _) => {
                    let ids: Vec<&str> = self
                        .documents
                        .iter()
                        .filter(|doc| doc.resource == resource && doc.owner == owner)
                        .map(|doc| doc.id.as_str())
                        .collect();
                    respond(200, json!(ids))
                }
            },
            Method::Delete => {
                match id {
                    Some(_) => {
                        if let Some(index) = position {
                            self.documents.remove(index);
                        }
                    }
                    None => self
                        .documents
                        .retain(|doc| !(doc.resource == resource && doc.owner == owner)),
                }
                empty(204)
            }
            Method::Put | Method::Post => {
                let (Some(id), Some(value)) = (id, body) else {
                    return respond(400, json!({"message": "document id and body required"}));
                };
                let current = position.map(|index| &self.documents[index].value);
                if request.method == Method::Put {
                    if let Some(rejection) = check_preconditions(request, current) {
                        return rejection;
                    }
                }
                let value = match (request.method, current) {
                    (Method::Post, Some(Value::Object(existing))) => match value {
                        Value::Object(update) => {
                            let mut merged: Map<String, Value> = existing.clone();
                            merged.extend(update);
                            Value::Object(merged)
                        }
                        _ => return respond(400, json!({"message": "merge requires objects"})),
                    },
                    (Method::Post, Some(_)) => {
                        return respond(400, json!({"message": "merge requires objects"}))
                    }
                    _ => value,
                };
                match position {
                    Some(index) => self.documents[index].value = value,
                    None => self.documents.push(Document {
                        resource: resource.to_string(),
                        owner,
                        id,
                        value,
                    }),
                }
                empty(204)
            }
        }
    }
}

fn check_preconditions(request: &HttpRequest, current: Option<&Value>) -> Option<ResponseEnvelope> {
    let failed = || respond(412, json!({"message": "precondition failed"}));
    if let Some(expected) = request.header("If-None-Match") {
        let conflict = match (expected, current) {
            (_, None) => false,
            ("*", Some(_)) => true,
            (tag, Some(value)) => tag.trim_matches('"') == content_hash(value),
        };
        if conflict {
            return Some(failed());
        }
    }
    if let Some(expected) = request.header("If-Match") {
        let holds = match (expected, current) {
            (_, None) => false,
            ("*", Some(_)) => true,
            (tag, Some(value)) => tag.trim_matches('"') == content_hash(value),
        };
        if !holds {
            return Some(failed());
        }
    }
    None
}

fn respond(status: u16, body: Value) -> ResponseEnvelope {
    ResponseEnvelope::new(
        status,
        [("content-type", "application/json")],
        body.to_string().into_bytes(),
    )
}

fn empty(status: u16) -> ResponseEnvelope {
    ResponseEnvelope::new(status, Vec::<(String, String)>::new(), Vec::new())
}

#[async_trait]
impl Transport for MemoryLrs {
    async fn execute(&self, request: HttpRequest) -> Result<ResponseEnvelope, TransportError> {
        let response = self.handle(&request);
        self.store.lock().expect("store mutex").requests.push(request);
        Ok(response)
    }
}

// ---------------------------------------------------------------------------
// Failing transport
// ---------------------------------------------------------------------------

/// Fails every exchange as a refused connection.
#[derive(Default)]
pub struct FailingTransport {
    calls: AtomicUsize,
}

impl FailingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FailingTransport {
    async fn execute(&self, _request: HttpRequest) -> Result<ResponseEnvelope, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::new(
            TransportErrorKind::Connect,
            "connection refused",
        ))
    }
}
