//! Shared test helpers and scripted transport.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use askflow::ask::Client;
use askflow::config::ClientConfig;
use askflow::error::AskflowError;
use askflow::provider::{ChatRequest, ChatResponse, ChatTransport, Choice};
use askflow::trace::{SpanHandle, TraceContext, Tracer};
use askflow::types::{ToolCallRequest, Usage};
use askflow::util::RetryPolicy;

/// A transport that replays queued outcomes and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    outcomes: Mutex<VecDeque<Result<ChatResponse, AskflowError>>>,
    requests: Mutex<Vec<ChatRequest>>,
    calls: AtomicU32,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a text answer.
    pub fn queue_text(&self, text: &str) {
        self.queue(Ok(response(Choice::text(text))));
    }

    /// Queue a turn requesting the given `(id, name, arguments)` tool calls.
    pub fn queue_tool_calls(&self, calls: &[(&str, &str, serde_json::Value)]) {
        let calls = calls
            .iter()
            .map(|(id, name, args)| ToolCallRequest {
                id: id.to_string(),
                name: name.to_string(),
                arguments: args.to_string(),
            })
            .collect();
        self.queue(Ok(response(Choice::tool_calls(calls))));
    }

    /// Queue a failed attempt.
    pub fn queue_error(&self, error: AskflowError) {
        self.queue(Err(error));
    }

    pub fn queue(&self, outcome: Result<ChatResponse, AskflowError>) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    /// Number of `complete` calls made so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AskflowError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AskflowError::api(503, "script exhausted")))
    }
}

/// A one-choice response with fixed usage.
pub fn response(choice: Choice) -> ChatResponse {
    ChatResponse {
        choices: vec![choice],
        usage: Usage {
            input_tokens: 10,
            output_tokens: 5,
            total_tokens: 15,
        },
    }
}

/// Config with a default model and near-zero backoff.
pub fn test_config() -> ClientConfig {
    ClientConfig::default()
        .with_default_model("test-model")
        .with_retry_policy(RetryPolicy::default().with_initial_backoff(Duration::from_millis(1)))
}

/// Client over a scripted transport.
pub fn scripted_client(config: ClientConfig) -> (Client, Arc<ScriptedTransport>) {
    let transport = ScriptedTransport::new();
    let client = Client::with_transport(config, transport.clone());
    (client, transport)
}

/// A tracer that records every call as a flat event string.
///
/// Spans are logged as `span:<name>:<parent span id or "root">` and get ids
/// `span-1`, `span-2`, ... in start order.
#[derive(Default)]
pub struct RecordingTracer {
    events: Mutex<Vec<String>>,
    spans: AtomicU32,
}

impl RecordingTracer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl Tracer for RecordingTracer {
    fn start_trace(&self, name: &str, _input: &serde_json::Value) -> Result<String, AskflowError> {
        self.events.lock().unwrap().push(format!("trace:{name}"));
        Ok("trace-1".into())
    }

    fn end_trace(&self, trace_id: &str, _output: &serde_json::Value) -> Result<(), AskflowError> {
        self.events.lock().unwrap().push(format!("end-trace:{trace_id}"));
        Ok(())
    }

    fn start_span(
        &self,
        parent: &TraceContext,
        name: &str,
        _input: &serde_json::Value,
    ) -> Result<SpanHandle, AskflowError> {
        let id = self.spans.fetch_add(1, Ordering::SeqCst) + 1;
        let parent_id = parent.parent_span_id.as_deref().unwrap_or("root");
        self.events.lock().unwrap().push(format!("span:{name}:{parent_id}"));
        Ok(SpanHandle {
            trace_id: parent.trace_id.clone().unwrap_or_default(),
            span_id: format!("span-{id}"),
            name: name.to_string(),
        })
    }

    fn end_span(
        &self,
        span: &SpanHandle,
        _output: &serde_json::Value,
        _usage: Option<&Usage>,
    ) -> Result<(), AskflowError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("end-span:{}", span.span_id));
        Ok(())
    }
}
