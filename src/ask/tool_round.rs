//! Concurrent execution of one assistant turn's tool calls.

use futures::future::try_join_all;
use tracing::{debug, error};

use super::{AskContext, Client};
use crate::error::AskflowError;
use crate::provider::format::tool_result_to_string;
use crate::tools::{ToolContext, ToolSet};
use crate::types::{Message, ToolCallRequest};

/// Run every call of the round concurrently and return one tool result
/// message per call, in call order.
///
/// Every name is resolved before anything runs. The first failure aborts
/// the round: sibling invocations still in flight are dropped and their
/// cancellation tokens fired, and no result of the round is returned.
pub(crate) async fn run_tool_round(
    client: &Client,
    tools: &ToolSet,
    calls: &[ToolCallRequest],
    ctx: &AskContext,
) -> Result<Vec<Message>, AskflowError> {
    let resolved = calls
        .iter()
        .map(|call| {
            tools
                .get(&call.name)
                .cloned()
                .map(|tool| (call, tool))
                .ok_or_else(|| AskflowError::ToolNotFound(call.name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let round_cancel = ctx.cancel.child_token();
    let trace = ctx.child_trace();

    let invocations = resolved.into_iter().map(|(call, tool)| {
        let tool_ctx = ToolContext::new(
            call.id.clone(),
            call.name.clone(),
            trace.clone(),
            round_cancel.child_token(),
            client.clone(),
        );
        let cancel = round_cancel.clone();

        async move {
            debug!(tool = %call.name, call_id = %call.id, arguments = %call.arguments, "tool call started");
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(AskflowError::Canceled),
                result = tool.invoke(&call.arguments, tool_ctx) => result,
            };

            match result {
                Ok(value) => {
                    let content = tool_result_to_string(&value);
                    debug!(tool = %call.name, call_id = %call.id, result = %content, "tool call result");
                    Ok(Message::tool_result(call.id.clone(), content))
                }
                Err(e) => {
                    error!(tool = %call.name, call_id = %call.id, error = %e, "tool call failed");
                    Err(stage_error(&call.name, e))
                }
            }
        }
    });

    let joined = try_join_all(invocations).await;
    if joined.is_err() {
        round_cancel.cancel();
    }
    joined
}

fn stage_error(tool_name: &str, err: AskflowError) -> AskflowError {
    match err {
        AskflowError::Canceled
        | AskflowError::ToolNotFound(_)
        | AskflowError::ToolArgumentDecode { .. }
        | AskflowError::ToolExecution { .. } => err,
        other => AskflowError::tool_execution(tool_name, other),
    }
}
