//! The multi-turn ask loop.

use tracing::debug;

use super::tool_round::run_tool_round;
use super::{AskContext, AskOptions, AskResponse, Client};
use crate::error::AskflowError;
use crate::provider::ChatRequest;
use crate::schema::OutputSchema;
use crate::tools::ToolSet;
use crate::types::{AttachmentKind, Message, ResponseFormat, Usage};

/// How the final answer is produced, fixed before the first turn.
pub(crate) enum OutputMode {
    Text,
    Structured(OutputSchema),
}

/// Drive one ask call to its final assistant content.
pub(crate) async fn drive(
    client: &Client,
    opts: AskOptions,
    mode: OutputMode,
) -> Result<AskResponse<String>, AskflowError> {
    if opts.prompt.trim().is_empty() {
        return Err(AskflowError::Configuration("prompt is required".into()));
    }
    let config = client.config();
    let model = opts
        .model
        .clone()
        .filter(|m| !m.trim().is_empty())
        .or_else(|| config.default_model.clone())
        .ok_or_else(|| {
            AskflowError::Configuration("no model given and no default model configured".into())
        })?;

    let tools = ToolSet::from_tools(opts.tools.iter().cloned())?;
    let messages = build_messages(&opts)?;
    let structured = matches!(mode, OutputMode::Structured(_));

    let mut request = ChatRequest {
        model: model.clone(),
        messages,
        settings: opts.settings.clone(),
        response_format: match mode {
            OutputMode::Text => None,
            OutputMode::Structured(schema) => Some(ResponseFormat::JsonSchema {
                name: schema.name,
                schema: schema.schema,
                strict: true,
            }),
        },
        parallel_tool_calls: (!tools.is_empty()).then_some(true),
        tools: tools.definitions(),
        extra: opts.extra.clone(),
    };

    let mut ctx = AskContext::new(model);
    ctx.generation_name = opts.generation_name.clone();
    ctx.trace = opts.trace.clone().unwrap_or_default();
    if let Some(cancel) = &opts.cancel {
        ctx.cancel = cancel.clone();
    }

    let mut retry = opts.retry.clone().unwrap_or_else(|| config.retry.clone());
    if let Some(max_attempts) = opts.max_attempts {
        retry.max_attempts = max_attempts;
    }

    debug!(
        run_id = %ctx.run_id,
        model = %ctx.model,
        tools = tools.len(),
        structured,
        "ask started"
    );

    let hooks = &config.hooks;
    let transport = client.transport();
    request = hooks.run_before(&mut ctx, request);

    let mut usage = Usage::default();
    loop {
        ctx.turn += 1;

        let outcome = {
            let request = &request;
            let run_id = ctx.run_id;
            let turn = ctx.turn;
            retry
                .execute(&ctx.cancel, move |attempt| {
                    debug!(run_id = %run_id, turn, attempt, "model call");
                    transport.complete(request)
                })
                .await
        };
        let response = hooks.run_after(&mut ctx, outcome)?;
        usage.merge(&response.usage);

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(AskflowError::NoChoices)?;
        request
            .messages
            .push(Message::assistant(choice.text.clone(), choice.tool_calls.clone()));

        if choice.tool_calls.is_empty() {
            debug!(run_id = %ctx.run_id, turns = ctx.turn, total_tokens = usage.total_tokens, "ask finished");
            return Ok(AskResponse {
                value: choice.text,
                usage,
                turns: ctx.turn,
                messages: request.messages,
            });
        }

        debug!(run_id = %ctx.run_id, count = choice.tool_calls.len(), "got tool calls");
        let results = run_tool_round(client, &tools, &choice.tool_calls, &ctx).await?;
        request.messages.extend(results);
    }
}

/// System message, user prompt, then attachments prepended as extra user
/// messages: documents first, images ahead of them.
fn build_messages(opts: &AskOptions) -> Result<Vec<Message>, AskflowError> {
    let mut messages = Vec::new();
    if let Some(system) = opts.system.as_ref().filter(|s| !s.is_empty()) {
        messages.push(Message::system(system.clone()));
    }
    messages.push(Message::user(opts.prompt.clone()));

    let mut documents = Vec::new();
    let mut images = Vec::new();
    for attachment in &opts.attachments {
        match attachment.kind() {
            Some(AttachmentKind::Pdf) => documents.push(attachment.to_content_part()),
            Some(AttachmentKind::Image) => images.push(attachment.to_content_part()),
            None => {
                return Err(AskflowError::Configuration(format!(
                    "unsupported attachment type: {}",
                    attachment.name
                )))
            }
        }
    }
    if !documents.is_empty() {
        messages.insert(0, Message::user_parts(documents));
    }
    if !images.is_empty() {
        messages.insert(0, Message::user_parts(images));
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Attachment, ContentPart, Role};

    #[test]
    fn attachments_are_prepended_images_first() {
        let opts = AskOptions::new("describe")
            .with_system("sys")
            .with_attachment(Attachment::pdf("a.pdf", b"%PDF"))
            .with_attachment(Attachment::png("b.png", &[0]));

        let messages = build_messages(&opts).unwrap();

        assert_eq!(messages.len(), 4);
        assert!(matches!(messages[0].content[0], ContentPart::Image { .. }));
        assert!(matches!(messages[1].content[0], ContentPart::File { .. }));
        assert_eq!(messages[2].role, Role::System);
        assert_eq!(messages[3].text(), "describe");
    }

    #[test]
    fn unknown_attachment_type_is_rejected() {
        let opts = AskOptions::new("x").with_attachment(Attachment::from_bytes("a.txt", "text/plain", b"hi"));

        assert!(matches!(
            build_messages(&opts),
            Err(AskflowError::Configuration(_))
        ));
    }
}
