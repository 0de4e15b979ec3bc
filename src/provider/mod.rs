//! Model endpoint transport.
//!
//! The driver speaks chat-completion semantics through [`ChatTransport`];
//! [`openai::OpenAiChatTransport`] implements it over HTTP for any
//! OpenAI-compatible endpoint.

pub mod format;
pub mod http;
pub mod openai;

pub use openai::OpenAiChatTransport;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AskflowError;
use crate::types::{FinishReason, Message, ResponseFormat, SamplingSettings, ToolCallRequest, Usage};

/// One chat-completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub settings: SamplingSettings,
    pub response_format: Option<ResponseFormat>,
    pub tools: Vec<ToolDefinition>,
    pub parallel_tool_calls: Option<bool>,
    /// Provider-specific fields merged into the request body verbatim.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ChatRequest {
    /// Fields the endpoint cannot do without.
    pub(crate) fn validate(&self) -> Result<(), AskflowError> {
        if self.model.trim().is_empty() {
            return Err(AskflowError::Configuration("model is required".into()));
        }
        if self.messages.is_empty() {
            return Err(AskflowError::Configuration("at least one message is required".into()));
        }
        Ok(())
    }
}

/// Tool declaration sent to the endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
    pub strict: bool,
}

/// One chat-completion response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

/// One answer choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    pub tool_calls: Vec<ToolCallRequest>,
    pub finish_reason: Option<FinishReason>,
}

impl Choice {
    /// A plain text answer.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
            finish_reason: Some(FinishReason::Stop),
        }
    }

    /// An answer requesting tool calls.
    pub fn tool_calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            text: String::new(),
            tool_calls,
            finish_reason: Some(FinishReason::ToolCalls),
        }
    }
}

/// Core trait implemented by model endpoint transports.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Transport name (e.g., "openai").
    fn name(&self) -> &str;

    /// Perform one request/response exchange. Called once per attempt.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AskflowError>;
}
