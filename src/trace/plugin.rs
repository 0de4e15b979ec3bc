//! Drives a [`Tracer`] from the hook pipeline.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::warn;

use super::{TraceContext, Tracer};
use crate::ask::AskContext;
use crate::hooks::HookPipeline;
use crate::provider::ChatResponse;

const DEFAULT_GENERATION_NAME: &str = "chat-completion";

/// Records one generation span per model turn.
///
/// The before-stage opens a trace when the call has none and starts the
/// first generation span with the request messages as input. The after-stage
/// closes the open span with the turn's output and usage; a turn that asked
/// for tools opens the next turn's span before the tool round runs. A trace
/// opened here is closed once the call's last turn is seen: an error, or a
/// response without tool calls.
#[derive(Clone)]
pub struct TraceHook {
    tracer: Arc<dyn Tracer>,
}

impl TraceHook {
    pub fn new(tracer: Arc<dyn Tracer>) -> Self {
        Self { tracer }
    }

    /// Hooks to register on a client.
    pub fn hooks(&self) -> HookPipeline {
        let before_tracer = self.tracer.clone();
        let after_tracer = self.tracer.clone();

        HookPipeline::new()
            .before(move |ctx, request| {
                let input = serde_json::to_value(&request.messages).unwrap_or(Value::Null);
                if ctx.trace.trace_id.is_none() {
                    let trace_id = before_tracer.start_trace(&generation_name(ctx), &input)?;
                    ctx.trace = TraceContext {
                        trace_id: Some(trace_id),
                        ..ctx.trace.clone()
                    };
                    ctx.owns_trace = true;
                }
                ctx.span = Some(before_tracer.start_span(&ctx.trace, &generation_name(ctx), &input)?);
                Ok(request)
            })
            .after(move |ctx, response, error| {
                let span = match ctx.span.take() {
                    Some(span) => span,
                    None => after_tracer.start_span(&ctx.trace, &generation_name(ctx), &json!({ "turn": ctx.turn }))?,
                };

                let output = match (response, error) {
                    (Some(response), _) => turn_output(response),
                    (None, Some(err)) => json!({ "error": err.to_string() }),
                    (None, None) => Value::Null,
                };
                if let Err(e) = after_tracer.end_span(&span, &output, response.map(|r| &r.usage)) {
                    warn!(span_id = %span.span_id, error = %e, "failed to close generation span");
                }
                ctx.last_span = Some(span);

                let last_turn = response
                    .map(|r| r.choices.first().map_or(true, |c| c.tool_calls.is_empty()))
                    .unwrap_or(true);
                if !last_turn {
                    // The next model call starts once the tool round joins.
                    let next = json!({ "turn": ctx.turn + 1 });
                    ctx.span = Some(after_tracer.start_span(&ctx.trace, &generation_name(ctx), &next)?);
                } else if ctx.owns_trace {
                    if let Some(trace_id) = ctx.trace.trace_id.clone() {
                        after_tracer.end_trace(&trace_id, &output)?;
                    }
                }
                Ok(None)
            })
    }
}

fn generation_name(ctx: &AskContext) -> String {
    ctx.generation_name
        .clone()
        .or_else(|| ctx.trace.observation_name.clone())
        .unwrap_or_else(|| DEFAULT_GENERATION_NAME.to_string())
}

fn turn_output(response: &ChatResponse) -> Value {
    match response.choices.first() {
        Some(choice) if !choice.tool_calls.is_empty() => json!({ "tool_calls": choice.tool_calls }),
        Some(choice) => Value::String(choice.text.clone()),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AskflowError;
    use crate::provider::{ChatRequest, Choice};
    use crate::trace::SpanHandle;
    use crate::types::{Message, SamplingSettings, Usage};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Tracer for Recorder {
        fn start_trace(&self, name: &str, _input: &Value) -> Result<String, AskflowError> {
            self.events.lock().unwrap().push(format!("trace:{name}"));
            Ok("t1".into())
        }

        fn end_trace(&self, trace_id: &str, _output: &Value) -> Result<(), AskflowError> {
            self.events.lock().unwrap().push(format!("end-trace:{trace_id}"));
            Ok(())
        }

        fn start_span(&self, parent: &TraceContext, name: &str, _input: &Value) -> Result<SpanHandle, AskflowError> {
            let mut events = self.events.lock().unwrap();
            events.push(format!("span:{name}"));
            Ok(SpanHandle {
                trace_id: parent.trace_id.clone().unwrap_or_default(),
                span_id: format!("s{}", events.len()),
                name: name.to_string(),
            })
        }

        fn end_span(&self, span: &SpanHandle, _output: &Value, usage: Option<&Usage>) -> Result<(), AskflowError> {
            self.events
                .lock()
                .unwrap()
                .push(format!("end-span:{}:{}", span.name, usage.map_or(0, |u| u.total_tokens)));
            Ok(())
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "m".into(),
            messages: vec![Message::user("hi")],
            settings: SamplingSettings::default(),
            response_format: None,
            tools: Vec::new(),
            parallel_tool_calls: None,
            extra: Default::default(),
        }
    }

    #[test]
    fn single_turn_call_opens_and_closes_trace_and_span() {
        let recorder = Arc::new(Recorder::default());
        let hooks = TraceHook::new(recorder.clone()).hooks();
        let mut ctx = AskContext::new("m");
        ctx.generation_name = Some("summarize".into());

        hooks.run_before(&mut ctx, request());
        ctx.turn = 1;
        hooks
            .run_after(
                &mut ctx,
                Ok(ChatResponse {
                    choices: vec![Choice::text("done")],
                    usage: Usage {
                        input_tokens: 1,
                        output_tokens: 2,
                        total_tokens: 3,
                    },
                }),
            )
            .unwrap();

        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec![
                "trace:summarize".to_string(),
                "span:summarize".to_string(),
                "end-span:summarize:3".to_string(),
                "end-trace:t1".to_string(),
            ]
        );
        assert_eq!(ctx.child_trace().parent_span_id.as_deref(), Some("s2"));
    }

    #[test]
    fn tool_turn_opens_the_next_generation_span_before_the_tool_round() {
        let recorder = Arc::new(Recorder::default());
        let hooks = TraceHook::new(recorder.clone()).hooks();
        let mut ctx = AskContext::new("m");

        hooks.run_before(&mut ctx, request());
        ctx.turn = 1;
        let call = crate::types::ToolCallRequest {
            id: "c1".into(),
            name: "lookup".into(),
            arguments: "{}".into(),
        };
        hooks
            .run_after(
                &mut ctx,
                Ok(ChatResponse {
                    choices: vec![Choice::tool_calls(vec![call])],
                    usage: Usage::default(),
                }),
            )
            .unwrap();

        assert_eq!(ctx.span.as_ref().map(|s| s.span_id.as_str()), Some("s4"));
        assert_eq!(ctx.child_trace().parent_span_id.as_deref(), Some("s2"));

        ctx.turn = 2;
        hooks
            .run_after(
                &mut ctx,
                Ok(ChatResponse {
                    choices: vec![Choice::text("done")],
                    usage: Usage::default(),
                }),
            )
            .unwrap();

        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec![
                "trace:chat-completion".to_string(),
                "span:chat-completion".to_string(),
                "end-span:chat-completion:0".to_string(),
                "span:chat-completion".to_string(),
                "end-span:chat-completion:0".to_string(),
                "end-trace:t1".to_string(),
            ]
        );
        assert!(ctx.span.is_none());
        assert_eq!(ctx.last_span.as_ref().map(|s| s.span_id.as_str()), Some("s4"));
    }

    #[test]
    fn inherited_trace_is_left_open() {
        let recorder = Arc::new(Recorder::default());
        let hooks = TraceHook::new(recorder.clone()).hooks();
        let mut ctx = AskContext::new("m");
        ctx.trace = TraceContext::in_trace("outer").with_observation_name("lookup");

        hooks.run_before(&mut ctx, request());
        ctx.turn = 1;
        let _ = hooks.run_after(&mut ctx, Err(AskflowError::NoChoices));

        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec!["span:lookup".to_string(), "end-span:lookup:0".to_string()]
        );
    }
}
