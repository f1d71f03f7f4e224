use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::mem;
use std::rc::Rc;

use serde_json::Value;
use tracing::trace;

use crate::error::{ViewerError, ViewerResult};

use super::request::{ApiRequest, Endpoint};

/// Contract implemented by any backend request layer.
///
/// Implementations send one request and return the parsed JSON body, or a
/// `ViewerError::RequestFailure` for transport errors and non-2xx statuses.
/// `send` takes `&self` so a nested call issued while a request is
/// outstanding can reach the same transport.
pub trait Transport {
    fn send(&self, request: &ApiRequest) -> ViewerResult<Value>;
}

/// Extracts a human-readable message from a failed response body.
///
/// `{"error": "..."}` yields the error string, other JSON is kept compact,
/// plain text is trimmed and an empty body falls back to the status.
#[must_use]
pub fn failure_message(status: Option<u16>, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status.map_or_else(
            || "empty response".to_owned(),
            |code| format!("HTTP status {code}"),
        );
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => match map.get("error") {
            Some(Value::String(message)) => message.clone(),
            Some(other) => other.to_string(),
            None => Value::Object(map).to_string(),
        },
        Ok(Value::String(message)) => message,
        Ok(other) => other.to_string(),
        Err(_) => trimmed.to_owned(),
    }
}

/// Canned outcome served by `RecordingTransport`.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedResponse {
    Success(Value),
    Failure { status: u16, body: String },
    /// Failure before any status was received.
    Unreachable(String),
}

impl ScriptedResponse {
    fn resolve(self, endpoint: Endpoint) -> ViewerResult<Value> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure { status, body } => Err(ViewerError::request_failure(
                endpoint.path(),
                Some(status),
                failure_message(Some(status), &body),
            )),
            Self::Unreachable(message) => Err(ViewerError::request_failure(
                endpoint.path(),
                None,
                message,
            )),
        }
    }
}

type SendHook = Box<dyn FnMut(&ApiRequest)>;

#[derive(Default)]
struct RecordingState {
    requests: Vec<ApiRequest>,
    queued: HashMap<Endpoint, VecDeque<ScriptedResponse>>,
    fallback: HashMap<Endpoint, ScriptedResponse>,
    hooks: HashMap<Endpoint, Vec<SendHook>>,
}

/// In-memory transport for headless use and tests.
///
/// Records every request. Responses come from the per-endpoint queue first,
/// then the endpoint's fallback, then `Value::Null`. Hooks registered with
/// `on_send` run after the request is recorded and before its response is
/// returned, which is where a nested action can be issued.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    state: Rc<RefCell<RecordingState>>,
}

impl RecordingTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a one-shot successful response.
    pub fn respond(&self, endpoint: Endpoint, body: Value) -> &Self {
        self.enqueue(endpoint, ScriptedResponse::Success(body))
    }

    /// Serves `body` whenever the queue for `endpoint` is empty.
    pub fn respond_always(&self, endpoint: Endpoint, body: Value) -> &Self {
        self.state
            .borrow_mut()
            .fallback
            .insert(endpoint, ScriptedResponse::Success(body));
        self
    }

    /// Queues a one-shot failure with the given status and raw body.
    pub fn fail(&self, endpoint: Endpoint, status: u16, body: impl Into<String>) -> &Self {
        self.enqueue(
            endpoint,
            ScriptedResponse::Failure {
                status,
                body: body.into(),
            },
        )
    }

    pub fn enqueue(&self, endpoint: Endpoint, response: ScriptedResponse) -> &Self {
        self.state
            .borrow_mut()
            .queued
            .entry(endpoint)
            .or_default()
            .push_back(response);
        self
    }

    pub fn on_send<F>(&self, endpoint: Endpoint, hook: F) -> &Self
    where
        F: FnMut(&ApiRequest) + 'static,
    {
        self.state
            .borrow_mut()
            .hooks
            .entry(endpoint)
            .or_default()
            .push(Box::new(hook));
        self
    }

    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.borrow().requests.clone()
    }

    #[must_use]
    pub fn last_request(&self) -> Option<ApiRequest> {
        self.state.borrow().requests.last().cloned()
    }

    #[must_use]
    pub fn request_count(&self, endpoint: Endpoint) -> usize {
        self.state
            .borrow()
            .requests
            .iter()
            .filter(|request| request.endpoint == endpoint)
            .count()
    }

    pub fn clear_requests(&self) {
        self.state.borrow_mut().requests.clear();
    }
}

impl Transport for RecordingTransport {
    fn send(&self, request: &ApiRequest) -> ViewerResult<Value> {
        let endpoint = request.endpoint;
        let (response, mut hooks) = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            state.requests.push(request.clone());
            let response = state
                .queued
                .get_mut(&endpoint)
                .and_then(VecDeque::pop_front)
                .or_else(|| state.fallback.get(&endpoint).cloned())
                .unwrap_or(ScriptedResponse::Success(Value::Null));
            let hooks = state.hooks.remove(&endpoint).unwrap_or_default();
            (response, hooks)
        };
        trace!(endpoint = endpoint.path(), context = %request.context, "recorded request");

        for hook in &mut hooks {
            hook(request);
        }
        if !hooks.is_empty() {
            let mut state = self.state.borrow_mut();
            let entry = state.hooks.entry(endpoint).or_default();
            let added_meanwhile = mem::replace(entry, hooks);
            entry.extend(added_meanwhile);
        }

        response.resolve(endpoint)
    }
}
