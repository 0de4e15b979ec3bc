//! OpenAI-compatible Chat Completions transport.
//!
//! Works against api.openai.com and any endpoint speaking the same
//! `/chat/completions` dialect (OpenRouter, vLLM, LiteLLM proxies).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::AskflowError;
use crate::types::*;

use super::http::{bearer_headers, build_client, shared_client, status_to_error, DEFAULT_REQUEST_TIMEOUT};
use super::{ChatRequest, ChatResponse, ChatTransport, Choice};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// HTTP transport for OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct OpenAiChatTransport {
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl std::fmt::Debug for OpenAiChatTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChatTransport")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiChatTransport {
    pub fn new(api_key: Option<String>, base_url: Option<String>) -> Self {
        Self {
            api_key,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            http: shared_client().clone(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let transport = Self::new(config.api_key.clone(), config.base_url.clone());
        if config.request_timeout == DEFAULT_REQUEST_TIMEOUT {
            return transport;
        }
        match build_client(config.request_timeout) {
            Ok(http) => transport.with_http_client(http, config.request_timeout),
            Err(e) => {
                warn!(error = %e, "failed to build HTTP client; using the shared one");
                transport
            }
        }
    }

    /// Use a dedicated HTTP client whose requests time out after `timeout`.
    pub fn with_http_client(mut self, http: reqwest::Client, timeout: Duration) -> Self {
        self.http = http;
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn build_request_body(&self, request: &ChatRequest) -> Value {
        let messages = request.messages.iter().map(message_to_openai).collect::<Vec<_>>();

        let mut obj = Map::new();
        obj.insert("model".into(), request.model.clone().into());
        obj.insert("messages".into(), messages.into());

        let settings = &request.settings;
        if let Some(max) = settings.max_tokens {
            obj.insert("max_tokens".into(), max.into());
        }
        if let Some(temp) = settings.temperature {
            obj.insert("temperature".into(), temp.into());
        }
        if let Some(top_p) = settings.top_p {
            obj.insert("top_p".into(), top_p.into());
        }
        if let Some(pp) = settings.presence_penalty {
            obj.insert("presence_penalty".into(), pp.into());
        }
        if let Some(fp) = settings.frequency_penalty {
            obj.insert("frequency_penalty".into(), fp.into());
        }
        if let Some(seed) = settings.seed {
            obj.insert("seed".into(), seed.into());
        }
        if let Some(effort) = settings.reasoning_effort {
            obj.insert("reasoning_effort".into(), effort.to_string().into());
        }
        if let Some(ref user) = settings.user {
            obj.insert("user".into(), user.clone().into());
        }

        if !request.tools.is_empty() {
            let tool_defs: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                            "strict": t.strict,
                        }
                    })
                })
                .collect();
            obj.insert("tools".into(), tool_defs.into());
            if let Some(parallel) = request.parallel_tool_calls {
                obj.insert("parallel_tool_calls".into(), parallel.into());
            }
        }

        if let Some(ResponseFormat::JsonSchema {
            name,
            schema,
            strict,
        }) = &request.response_format
        {
            obj.insert(
                "response_format".into(),
                json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": name,
                        "schema": schema,
                        "strict": strict,
                    }
                }),
            );
        }

        for (key, value) in &request.extra {
            obj.insert(key.clone(), value.clone());
        }

        Value::Object(obj)
    }
}

#[async_trait]
impl ChatTransport for OpenAiChatTransport {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AskflowError> {
        let body = self.build_request_body(request);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %request.model, url = %url, "chat completion request");

        let resp = self
            .http
            .post(&url)
            .headers(bearer_headers(self.api_key.as_deref()))
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let data: OpenAiChatResponse = resp.json().await?;
        Ok(data.into())
    }
}

fn map_send_error(err: reqwest::Error, timeout: Duration) -> AskflowError {
    if err.is_timeout() {
        AskflowError::Timeout(timeout.as_millis() as u64)
    } else {
        AskflowError::Network(err)
    }
}

fn parse_finish_reason(s: &str) -> Option<FinishReason> {
    match s {
        "stop" => Some(FinishReason::Stop),
        "length" => Some(FinishReason::Length),
        "tool_calls" | "function_call" => Some(FinishReason::ToolCalls),
        "content_filter" => Some(FinishReason::ContentFilter),
        _ => None,
    }
}

fn message_to_openai(msg: &Message) -> Value {
    let role = msg.role.to_string();

    if msg.role == Role::Tool {
        if let Some(ContentPart::ToolResult(tr)) = msg.content.first() {
            return json!({
                "role": "tool",
                "tool_call_id": tr.tool_call_id,
                "content": tr.content,
            });
        }
    }

    if !msg.tool_calls.is_empty() {
        let tc_json: Vec<Value> = msg
            .tool_calls
            .iter()
            .map(|tc| {
                json!({
                    "id": tc.id,
                    "type": "function",
                    "function": {
                        "name": tc.name,
                        "arguments": tc.arguments,
                    }
                })
            })
            .collect();
        let text = msg.text();
        return json!({
            "role": role,
            "content": if text.is_empty() { Value::Null } else { Value::String(text) },
            "tool_calls": tc_json,
        });
    }

    // Simple single-text message
    if let [ContentPart::Text { text }] = msg.content.as_slice() {
        return json!({ "role": role, "content": text });
    }

    let parts: Vec<Value> = msg
        .content
        .iter()
        .filter_map(|part| match part {
            ContentPart::Text { text } => Some(json!({
                "type": "text",
                "text": text,
            })),
            ContentPart::Image { data_uri } => Some(json!({
                "type": "image_url",
                "image_url": { "url": data_uri }
            })),
            ContentPart::File { name, data_uri } => Some(json!({
                "type": "file",
                "file": { "filename": name, "file_data": data_uri }
            })),
            ContentPart::ToolResult(_) => None,
        })
        .collect();

    json!({ "role": role, "content": parts })
}

// Wire response types (internal)

#[derive(Deserialize)]
struct OpenAiChatResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Deserialize)]
struct OpenAiToolCall {
    id: String,
    function: OpenAiFunction,
}

#[derive(Deserialize)]
struct OpenAiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

impl From<OpenAiChatResponse> for ChatResponse {
    fn from(data: OpenAiChatResponse) -> Self {
        let choices = data
            .choices
            .into_iter()
            .map(|choice| Choice {
                text: choice.message.content.unwrap_or_default(),
                tool_calls: choice
                    .message
                    .tool_calls
                    .unwrap_or_default()
                    .into_iter()
                    .map(|tc| ToolCallRequest {
                        id: tc.id,
                        name: tc.function.name,
                        arguments: tc.function.arguments,
                    })
                    .collect(),
                finish_reason: choice.finish_reason.as_deref().and_then(parse_finish_reason),
            })
            .collect();

        ChatResponse {
            choices,
            usage: data
                .usage
                .map(|u| Usage {
                    input_tokens: u.prompt_tokens,
                    output_tokens: u.completion_tokens,
                    total_tokens: u.total_tokens,
                })
                .unwrap_or_default(),
        }
    }
}
