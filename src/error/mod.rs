//! Error types for askflow.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all askflow operations.
///
/// Every variant belongs to exactly one [`ErrorCategory`], which names the
/// stage that failed. Callers decide whether to retry with
/// [`AskflowError::is_retryable`].
#[derive(Error, Debug)]
pub enum AskflowError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Model call failed after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: Box<AskflowError>,
    },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Canceled")]
    Canceled,

    #[error("Model response contained no choices")]
    NoChoices,

    #[error("Failed to decode model response content: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Model response does not match the output schema: {0}")]
    DecodeSchema(String),

    #[error("Unsupported output shape: {0}")]
    Schema(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid arguments for tool {tool_name}: {message}")]
    ToolArgumentDecode { tool_name: String, message: String },

    #[error("Tool {tool_name} failed: {source}")]
    ToolExecution {
        tool_name: String,
        #[source]
        source: Box<AskflowError>,
    },

    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    #[error("Node '{node}' not found in graph '{graph}'")]
    GraphNodeNotFound { graph: String, node: String },

    #[error("Failed to run node {node} of graph {graph}: {source}")]
    GraphNode {
        graph: String,
        node: String,
        #[source]
        source: Box<AskflowError>,
    },

    #[error("Prompt generation failed: {0}")]
    PromptGeneration(#[source] Box<AskflowError>),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AskflowError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Wrap a handler failure for the named tool.
    pub fn tool_execution(tool_name: impl Into<String>, source: AskflowError) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            source: Box::new(source),
        }
    }

    /// Classify this error into the stage that produced it.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) | Self::InvalidArgument(_) | Self::Schema(_) => {
                ErrorCategory::Configuration
            }
            Self::Transport { .. }
            | Self::Network(_)
            | Self::Timeout(_)
            | Self::RateLimited { .. }
            | Self::Authentication(_)
            | Self::Api { .. } => ErrorCategory::Transport,
            Self::Canceled => ErrorCategory::Canceled,
            Self::NoChoices => ErrorCategory::Response,
            Self::Decode(_) | Self::DecodeSchema(_) | Self::Serialization(_) => ErrorCategory::Decode,
            Self::ToolNotFound(_)
            | Self::ToolArgumentDecode { .. }
            | Self::ToolExecution { .. } => ErrorCategory::Tool,
            Self::InvalidGraph(_)
            | Self::GraphNodeNotFound { .. }
            | Self::GraphNode { .. }
            | Self::PromptGeneration(_) => ErrorCategory::Graph,
            Self::Io(_) => ErrorCategory::Io,
        }
    }

    /// Whether a single transport attempt that failed with this error may
    /// succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => matches!(status, 408 | 409 | 429 | 500..=599),
            Self::Transport { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// The innermost error in a chain of stage wrappers.
    pub fn root_cause(&self) -> &AskflowError {
        match self {
            Self::Transport { source, .. }
            | Self::ToolExecution { source, .. }
            | Self::GraphNode { source, .. }
            | Self::PromptGeneration(source) => source.root_cause(),
            other => other,
        }
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Transport if self.is_retryable() => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Transport => match self.root_cause() {
                Self::Authentication(_) | Self::Api { status: 401 | 403, .. } => {
                    RecoverySuggestion::CheckCredentials
                }
                _ => RecoverySuggestion::CheckConfiguration,
            },
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::Tool => RecoverySuggestion::CheckToolImplementation,
            ErrorCategory::Graph => RecoverySuggestion::CheckGraphDefinition,
            ErrorCategory::Decode | ErrorCategory::Response => RecoverySuggestion::AdjustPrompt,
            ErrorCategory::Canceled | ErrorCategory::Io => RecoverySuggestion::None,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, AskflowError>;
