//! Client handle: configuration plus transport, cheap to clone.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::driver::{drive, OutputMode};
use super::{AskOptions, AskResponse};
use crate::config::ClientConfig;
use crate::error::AskflowError;
use crate::provider::{ChatTransport, OpenAiChatTransport};
use crate::schema::OutputSchema;
use crate::tools::validation::validate_arguments;

/// Entry point for ask calls.
///
/// Configuration is shared read-only by every call made through the client
/// and its clones.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    transport: Arc<dyn ChatTransport>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("transport", &self.inner.transport.name())
            .field("default_model", &self.inner.config.default_model)
            .field("hooks", &self.inner.config.hooks)
            .finish()
    }
}

impl Client {
    /// Client talking to the OpenAI-compatible endpoint described by `config`.
    pub fn new(config: ClientConfig) -> Self {
        let transport = Arc::new(OpenAiChatTransport::from_config(&config));
        Self::with_transport(config, transport)
    }

    /// Client configured from the config file and environment.
    pub fn from_env() -> Result<Self, AskflowError> {
        Ok(Self::new(ClientConfig::from_env()?))
    }

    /// Client using a custom transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            inner: Arc::new(ClientInner { config, transport }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn transport(&self) -> &Arc<dyn ChatTransport> {
        &self.inner.transport
    }

    /// Free-text answer, returned verbatim.
    pub async fn ask_text(&self, opts: AskOptions) -> Result<String, AskflowError> {
        Ok(self.ask_text_with_usage(opts).await?.value)
    }

    pub async fn ask_text_with_usage(&self, opts: AskOptions) -> Result<AskResponse<String>, AskflowError> {
        drive(self, opts, OutputMode::Text).await
    }

    /// Structured answer decoded into `T`; the response is constrained to
    /// `T`'s strict schema.
    pub async fn ask<T>(&self, opts: AskOptions) -> Result<T, AskflowError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        Ok(self.ask_with_usage::<T>(opts).await?.value)
    }

    pub async fn ask_with_usage<T>(&self, opts: AskOptions) -> Result<AskResponse<T>, AskflowError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let schema = OutputSchema::for_type::<T>()?;
        let response = drive(self, opts, OutputMode::Structured(schema)).await?;
        let value = serde_json::from_str::<T>(&response.value).map_err(AskflowError::Decode)?;
        Ok(response.map(|_| value))
    }

    /// Structured answer for a schema built at runtime (see [`crate::schema::Shape`]).
    ///
    /// The decoded value is checked against the schema; content that does
    /// not conform fails with [`AskflowError::DecodeSchema`].
    pub async fn ask_with_schema(&self, opts: AskOptions, schema: OutputSchema) -> Result<Value, AskflowError> {
        let constraint = schema.schema.clone();
        let response = drive(self, opts, OutputMode::Structured(schema)).await?;
        let value: Value = serde_json::from_str(&response.value).map_err(AskflowError::Decode)?;
        validate_arguments(&value, &constraint).map_err(AskflowError::DecodeSchema)?;
        Ok(value)
    }
}
