//! Per-call request options.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use strum::{Display, EnumString};
use tokio_util::sync::CancellationToken;

use crate::tools::Tool;
use crate::trace::TraceContext;
use crate::types::{Attachment, ReasoningEffort, SamplingSettings};
use crate::util::RetryPolicy;

/// Document parsing engine of OpenRouter's `file-parser` plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum ParserEngine {
    MistralOcr,
    Native,
}

/// Options of one ask call, overriding client defaults.
///
/// Built fresh per call and consumed by it.
#[derive(Clone, Default)]
pub struct AskOptions {
    pub prompt: String,
    pub system: Option<String>,
    /// Overrides the client's default model.
    pub model: Option<String>,
    pub settings: SamplingSettings,
    /// Provider-specific fields merged into the request body.
    pub extra: Map<String, Value>,
    pub attachments: Vec<Attachment>,
    pub tools: Vec<Arc<dyn Tool>>,
    /// Overrides the client's retry policy.
    pub retry: Option<RetryPolicy>,
    /// Overrides the attempt budget of whichever policy applies.
    pub max_attempts: Option<u32>,
    /// Label for this call's generations in traces.
    pub generation_name: Option<String>,
    pub cancel: Option<CancellationToken>,
    /// Trace this call should be nested under.
    pub trace: Option<TraceContext>,
}

impl std::fmt::Debug for AskOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AskOptions")
            .field("prompt", &self.prompt)
            .field("system", &self.system)
            .field("model", &self.model)
            .field("settings", &self.settings)
            .field("extra", &self.extra)
            .field("attachments", &self.attachments.len())
            .field("tools", &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>())
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl AskOptions {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_settings(mut self, settings: SamplingSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.settings.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.settings.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.settings.top_p = Some(top_p);
        self
    }

    pub fn with_presence_penalty(mut self, penalty: f64) -> Self {
        self.settings.presence_penalty = Some(penalty);
        self
    }

    pub fn with_frequency_penalty(mut self, penalty: f64) -> Self {
        self.settings.frequency_penalty = Some(penalty);
        self
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.settings.seed = Some(seed);
        self
    }

    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.settings.reasoning_effort = Some(effort);
        self
    }

    /// End-user identifier forwarded to the endpoint.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.settings.user = Some(user.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Restrict OpenRouter routing to the given providers.
    pub fn with_openrouter_providers<I, S>(self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let only: Vec<String> = providers.into_iter().map(Into::into).collect();
        self.with_extra("provider", json!({ "only": only }))
    }

    /// Have OpenRouter parse PDF and image attachments with `engine`.
    pub fn with_openrouter_file_parser(self, engine: ParserEngine) -> Self {
        let engine = engine.to_string();
        self.with_extra(
            "plugins",
            json!([{
                "id": "file-parser",
                "image": { "engine": engine },
                "pdf": { "engine": engine },
            }]),
        )
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn with_shared_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Attempt budget for each model turn (default 3).
    pub fn with_retries(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_generation_name(mut self, name: impl Into<String>) -> Self {
        self.generation_name = Some(name.into());
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_trace_parent(mut self, trace: TraceContext) -> Self {
        self.trace = Some(trace);
        self
    }
}
