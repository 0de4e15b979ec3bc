//! Stage classification and recovery hints.

use strum::Display;

/// The stage of an ask call or graph run that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    /// Missing or invalid option, unsupported output shape.
    Configuration,
    /// Network or endpoint failure, possibly after retries.
    Transport,
    /// The endpoint answered but the answer was unusable (no choices).
    Response,
    /// Model content did not match the declared output shape.
    Decode,
    /// Tool lookup, argument decoding or handler failure.
    Tool,
    /// Graph construction or node execution failure.
    Graph,
    /// The caller's cancellation signal fired.
    Canceled,
    Io,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    RetryWithBackoff,
    CheckCredentials,
    CheckConfiguration,
    CheckToolImplementation,
    CheckGraphDefinition,
    AdjustPrompt,
    None,
}
