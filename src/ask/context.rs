//! Per-call context handed to hooks.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::trace::{SpanHandle, TraceContext};

/// State of one ask call, visible to every hook.
#[derive(Debug, Clone)]
pub struct AskContext {
    pub run_id: Uuid,
    pub model: String,
    /// Label for this call's generations (defaults to the observation name).
    pub generation_name: Option<String>,
    pub trace: TraceContext,
    /// Whether the trace was opened for this call rather than inherited.
    pub owns_trace: bool,
    /// Generation span currently open, if a tracer opened one.
    pub span: Option<SpanHandle>,
    /// Most recently closed generation span.
    pub last_span: Option<SpanHandle>,
    /// 1-based index of the current model turn.
    pub turn: u32,
    pub cancel: CancellationToken,
}

impl AskContext {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            model: model.into(),
            generation_name: None,
            trace: TraceContext::default(),
            owns_trace: false,
            span: None,
            last_span: None,
            turn: 0,
            cancel: CancellationToken::new(),
        }
    }

    /// Trace linkage for work spawned by the turn that just finished (tool
    /// calls), nested under that turn's generation span.
    pub fn child_trace(&self) -> TraceContext {
        match self.last_span.as_ref().or(self.span.as_ref()) {
            Some(span) => self.trace.child_of(span),
            None => TraceContext {
                observation_name: None,
                ..self.trace.clone()
            },
        }
    }
}
