//! Tool trait and closure-based tool wrappers.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::validation::validate_arguments;
use crate::ask::{AskOptions, Client};
use crate::error::AskflowError;
use crate::schema::{infer_schema, to_strict, Shape};
use crate::trace::TraceContext;

/// Scope handed to a tool handler for one invocation.
#[derive(Clone, Debug)]
pub struct ToolContext {
    /// Id of the tool call being answered.
    pub tool_call_id: String,
    pub tool_name: String,
    /// Linkage to the generation that requested the call.
    pub trace: TraceContext,
    /// Fires when the enclosing ask call is canceled or its tool round aborts.
    pub cancel: CancellationToken,
    client: Client,
}

impl ToolContext {
    pub(crate) fn new(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        trace: TraceContext,
        cancel: CancellationToken,
        client: Client,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            trace,
            cancel,
            client,
        }
    }

    /// Client of the enclosing ask call, for nested calls.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Options for a nested ask call linked into this invocation's trace and
    /// governed by its cancellation.
    pub fn ask_options(&self, prompt: impl Into<String>) -> AskOptions {
        AskOptions::new(prompt)
            .with_trace_parent(self.trace.clone().with_observation_name(self.tool_name.clone()))
            .with_cancellation(self.cancel.clone())
    }
}

/// A capability the model can call by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls, after normalization).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Strict JSON Schema of the arguments object.
    fn parameters(&self) -> &Value;

    /// Decode `arguments` (the raw text the model produced) and execute.
    async fn invoke(&self, arguments: &str, ctx: ToolContext) -> Result<Value, AskflowError>;
}

type ToolHandler = dyn Fn(Value, ToolContext) -> BoxFuture<'static, Result<Value, AskflowError>> + Send + Sync;

/// Closure-based tool whose arguments are checked against its schema before
/// the handler runs.
pub struct FunctionTool {
    name: String,
    description: String,
    parameters: Value,
    handler: Arc<ToolHandler>,
}

impl FunctionTool {
    /// Create a tool whose arguments decode into `A`.
    ///
    /// The argument schema is inferred from `A`; shapes strict mode cannot
    /// express fail here.
    pub fn new<A, R, F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: F,
    ) -> Result<Self, AskflowError>
    where
        A: DeserializeOwned + JsonSchema + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(A, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, AskflowError>> + Send + 'static,
    {
        let name = name.into();
        let parameters = infer_schema::<A>()?;
        let tool_name = name.clone();
        let handler = Arc::new(move |args: Value, ctx: ToolContext| -> BoxFuture<'static, Result<Value, AskflowError>> {
            let decoded = serde_json::from_value::<A>(args).map_err(|e| AskflowError::ToolArgumentDecode {
                tool_name: tool_name.clone(),
                message: e.to_string(),
            });
            match decoded {
                Ok(args) => {
                    let fut = handler(args, ctx);
                    Box::pin(async move { Ok(serde_json::to_value(fut.await?)?) })
                }
                Err(e) => Box::pin(async move { Err(e) }),
            }
        });

        Ok(Self {
            name,
            description: description.into(),
            parameters,
            handler,
        })
    }

    /// Create a tool from a hand-declared argument shape. The handler receives
    /// the validated arguments object.
    pub fn from_shape<R, F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        shape: &Shape,
        handler: F,
    ) -> Result<Self, AskflowError>
    where
        R: Serialize + Send + 'static,
        F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, AskflowError>> + Send + 'static,
    {
        let parameters = to_strict(shape.to_json_schema())?;
        Ok(Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |args: Value, ctx: ToolContext| -> BoxFuture<'static, Result<Value, AskflowError>> {
                let fut = handler(args, ctx);
                Box::pin(async move { Ok(serde_json::to_value(fut.await?)?) })
            }),
        })
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &Value {
        &self.parameters
    }

    async fn invoke(&self, arguments: &str, ctx: ToolContext) -> Result<Value, AskflowError> {
        let decode_error = |message: String| AskflowError::ToolArgumentDecode {
            tool_name: self.name.clone(),
            message,
        };

        let raw = if arguments.trim().is_empty() { "{}" } else { arguments };
        let args: Value = serde_json::from_str(raw).map_err(|e| decode_error(e.to_string()))?;
        validate_arguments(&args, &self.parameters).map_err(decode_error)?;

        (self.handler)(args, ctx).await
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::schema::Field;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct CapitalArgs {
        country: String,
    }

    fn ctx() -> ToolContext {
        ToolContext::new(
            "call_1",
            "get_capital",
            TraceContext::default(),
            CancellationToken::new(),
            Client::new(ClientConfig::default().with_default_model("m")),
        )
    }

    fn capital_tool() -> FunctionTool {
        FunctionTool::new("get_capital", "Capital city of a country", |args: CapitalArgs, _ctx| async move {
            Ok(if args.country == "France" { "Paris" } else { "unknown" })
        })
        .unwrap()
    }

    #[tokio::test]
    async fn decodes_and_runs_handler() {
        let out = capital_tool().invoke(r#"{"country":"France"}"#, ctx()).await.unwrap();
        assert_eq!(out, Value::String("Paris".into()));
    }

    #[tokio::test]
    async fn unknown_and_missing_fields_fail_decode() {
        let tool = capital_tool();

        let err = tool
            .invoke(r#"{"country":"France","extra":1}"#, ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, AskflowError::ToolArgumentDecode { .. }));

        let err = tool.invoke("{}", ctx()).await.unwrap_err();
        assert!(matches!(err, AskflowError::ToolArgumentDecode { .. }));

        let err = tool.invoke("{not json", ctx()).await.unwrap_err();
        assert!(matches!(err, AskflowError::ToolArgumentDecode { .. }));
    }

    #[tokio::test]
    async fn handler_errors_pass_through() {
        let tool = FunctionTool::new("fails", "Always fails", |_: CapitalArgs, _ctx| async move {
            Err::<String, _>(AskflowError::InvalidArgument("nope".into()))
        })
        .unwrap();

        let err = tool.invoke(r#"{"country":"x"}"#, ctx()).await.unwrap_err();
        assert!(matches!(err, AskflowError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn shape_tools_receive_validated_object() {
        let shape = Shape::object()
            .field(Field::new("a", Shape::Integer))
            .field(Field::new("b", Shape::Integer));
        let tool = FunctionTool::from_shape("add", "Add two numbers", &shape, |args, _ctx| async move {
            let a = args["a"].as_i64().unwrap_or_default();
            let b = args["b"].as_i64().unwrap_or_default();
            Ok(a + b)
        })
        .unwrap();

        assert_eq!(tool.invoke(r#"{"a":2,"b":3}"#, ctx()).await.unwrap(), Value::from(5));
        assert!(tool.invoke(r#"{"a":2}"#, ctx()).await.is_err());
    }

    #[test]
    fn nested_options_inherit_trace_and_cancellation() {
        let mut context = ctx();
        context.trace = TraceContext::in_trace("t1");
        let opts = context.ask_options("nested");

        let trace = opts.trace.unwrap();
        assert_eq!(trace.trace_id.as_deref(), Some("t1"));
        assert_eq!(trace.observation_name.as_deref(), Some("get_capital"));
        assert!(opts.cancel.is_some());
    }
}
