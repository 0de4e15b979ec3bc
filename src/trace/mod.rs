//! Trace linkage shared by ask calls, tool invocations and graph runs.
//!
//! [`TraceContext`] is a plain record passed explicitly down the call chain:
//! graph run → node → ask call → tool invocation → nested ask call. A
//! [`Tracer`] is the collaborator that actually records traces and spans; it
//! is driven from the hook pipeline by [`TraceHook`] and from graph runs.

mod log;
mod plugin;

pub use log::LogTracer;
pub use plugin::TraceHook;

use serde::{Deserialize, Serialize};

use crate::error::AskflowError;
use crate::types::Usage;

/// Where the current unit of work sits in a trace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    /// Trace this work belongs to, once one has been opened.
    pub trace_id: Option<String>,
    /// Span the next span should be nested under.
    pub parent_span_id: Option<String>,
    /// Label for the next observation (e.g. the tool that triggered a nested call).
    pub observation_name: Option<String>,
}

impl TraceContext {
    /// Context rooted at an existing trace.
    pub fn in_trace(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: Some(trace_id.into()),
            ..Self::default()
        }
    }

    /// Context for work nested under `span`.
    pub fn child_of(&self, span: &SpanHandle) -> Self {
        Self {
            trace_id: Some(span.trace_id.clone()),
            parent_span_id: Some(span.span_id.clone()),
            observation_name: None,
        }
    }

    pub fn with_observation_name(mut self, name: impl Into<String>) -> Self {
        self.observation_name = Some(name.into());
        self
    }
}

/// An open span as reported by a [`Tracer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanHandle {
    pub trace_id: String,
    pub span_id: String,
    pub name: String,
}

/// Observability backend contract.
///
/// Implementations must be cheap to call; failures are reported back and
/// logged by the caller, never propagated into the ask call or graph run.
pub trait Tracer: Send + Sync {
    /// Open a trace, returning its id.
    fn start_trace(&self, name: &str, input: &serde_json::Value) -> Result<String, AskflowError>;

    /// Close a trace with its final output.
    fn end_trace(&self, trace_id: &str, output: &serde_json::Value) -> Result<(), AskflowError>;

    /// Open a span inside `parent.trace_id`, nested under `parent.parent_span_id`.
    fn start_span(
        &self,
        parent: &TraceContext,
        name: &str,
        input: &serde_json::Value,
    ) -> Result<SpanHandle, AskflowError>;

    /// Close a span with its output and, for model generations, usage.
    fn end_span(
        &self,
        span: &SpanHandle,
        output: &serde_json::Value,
        usage: Option<&Usage>,
    ) -> Result<(), AskflowError>;
}
