//! A [`Tracer`] that records traces and spans as `tracing` events.

use uuid::Uuid;

use super::{SpanHandle, TraceContext, Tracer};
use crate::error::AskflowError;
use crate::types::Usage;

/// Emits one `tracing` event per trace/span transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn start_trace(&self, name: &str, _input: &serde_json::Value) -> Result<String, AskflowError> {
        let trace_id = Uuid::new_v4().to_string();
        tracing::info!(trace_id = %trace_id, name, "trace started");
        Ok(trace_id)
    }

    fn end_trace(&self, trace_id: &str, _output: &serde_json::Value) -> Result<(), AskflowError> {
        tracing::info!(trace_id, "trace ended");
        Ok(())
    }

    fn start_span(
        &self,
        parent: &TraceContext,
        name: &str,
        _input: &serde_json::Value,
    ) -> Result<SpanHandle, AskflowError> {
        let trace_id = parent
            .trace_id
            .clone()
            .ok_or_else(|| AskflowError::InvalidArgument("span started outside a trace".into()))?;
        let span = SpanHandle {
            trace_id,
            span_id: Uuid::new_v4().to_string(),
            name: name.to_string(),
        };
        tracing::debug!(
            trace_id = %span.trace_id,
            span_id = %span.span_id,
            parent_span_id = parent.parent_span_id.as_deref(),
            name,
            "span started"
        );
        Ok(span)
    }

    fn end_span(
        &self,
        span: &SpanHandle,
        _output: &serde_json::Value,
        usage: Option<&Usage>,
    ) -> Result<(), AskflowError> {
        tracing::debug!(
            trace_id = %span.trace_id,
            span_id = %span.span_id,
            name = %span.name,
            total_tokens = usage.map(|u| u.total_tokens),
            "span ended"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_need_an_open_trace() {
        let tracer = LogTracer;
        let err = tracer
            .start_span(&TraceContext::default(), "x", &serde_json::Value::Null)
            .unwrap_err();
        assert!(matches!(err, AskflowError::InvalidArgument(_)));
    }

    #[test]
    fn span_inherits_trace_id() {
        let tracer = LogTracer;
        let trace_id = tracer.start_trace("t", &serde_json::Value::Null).unwrap();
        let span = tracer
            .start_span(&TraceContext::in_trace(&trace_id), "gen", &serde_json::Value::Null)
            .unwrap();

        assert_eq!(span.trace_id, trace_id);
        assert_ne!(span.span_id, trace_id);
        tracer.end_span(&span, &serde_json::Value::Null, None).unwrap();
    }
}
