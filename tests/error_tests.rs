//! Error classification tests.

use askflow::error::{AskflowError, ErrorCategory, RecoverySuggestion};

#[test]
fn retryable_errors() {
    assert!(AskflowError::RateLimited { retry_after_ms: None }.is_retryable());
    assert!(AskflowError::Timeout(5000).is_retryable());
    assert!(AskflowError::api(503, "unavailable").is_retryable());
    assert!(!AskflowError::api(400, "bad request").is_retryable());
    assert!(!AskflowError::Authentication("bad key".into()).is_retryable());
    assert!(!AskflowError::Canceled.is_retryable());
}

#[test]
fn stage_wrappers_keep_the_root_cause() {
    let err = AskflowError::GraphNode {
        graph: "g".into(),
        node: "n".into(),
        source: Box::new(AskflowError::tool_execution(
            "lookup",
            AskflowError::Transport {
                attempts: 3,
                source: Box::new(AskflowError::Timeout(100)),
            },
        )),
    };

    assert_eq!(err.category(), ErrorCategory::Graph);
    assert!(matches!(err.root_cause(), AskflowError::Timeout(100)));
    assert_eq!(
        err.to_string(),
        "Failed to run node n of graph g: Tool lookup failed: Model call failed after 3 attempt(s): Timeout after 100ms"
    );
}

#[test]
fn categories_name_the_failing_stage() {
    assert_eq!(
        AskflowError::Configuration("x".into()).category(),
        ErrorCategory::Configuration
    );
    assert_eq!(AskflowError::NoChoices.category(), ErrorCategory::Response);
    assert_eq!(AskflowError::ToolNotFound("x".into()).category(), ErrorCategory::Tool);
    assert_eq!(AskflowError::Canceled.category(), ErrorCategory::Canceled);
}

#[test]
fn recovery_suggestions() {
    assert_eq!(
        AskflowError::Transport {
            attempts: 1,
            source: Box::new(AskflowError::Authentication("no".into())),
        }
        .recovery_suggestion(),
        RecoverySuggestion::CheckCredentials
    );
    assert_eq!(
        AskflowError::api(500, "boom").recovery_suggestion(),
        RecoverySuggestion::RetryWithBackoff
    );
    assert_eq!(
        AskflowError::InvalidGraph("empty".into()).recovery_suggestion(),
        RecoverySuggestion::CheckGraphDefinition
    );
}
