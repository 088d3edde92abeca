pub mod anthropic;
pub mod openai;
pub mod types;

use crate::config::{Provider, Station};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use types::{Message, OutputSchema};

/// A chat model the pipeline can talk to.
///
/// Constructed once per process and shared by every pipeline step.
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier, for logs
    fn model_name(&self) -> &str;

    /// Plain-text completion
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// Completion constrained to `schema`; returns the raw JSON value
    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &OutputSchema,
    ) -> Result<serde_json::Value, LlmError>;
}

/// LLM-related errors
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Missing API key for station '{0}'")]
    MissingApiKey(String),

    #[error("Unauthorized (401): invalid or missing API key. {0}")]
    Unauthorized(String),

    #[error("Rate limit exceeded (429): {0}")]
    RateLimited(String),

    #[error("API request failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Model returned no content")]
    EmptyResponse,

    #[error("Model output did not match schema '{schema}': {message}")]
    Schema { schema: String, message: String },
}

impl LlmError {
    /// Map a non-success HTTP status to an error, the same way for every provider.
    pub(crate) fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = crate::logging::redact_secrets(body);
        match status.as_u16() {
            401 => LlmError::Unauthorized(message),
            429 => LlmError::RateLimited(message),
            code => LlmError::Api { status: code, message },
        }
    }
}

/// Invoke `llm` in structured mode and deserialize into `T`.
pub async fn invoke_structured<T>(
    llm: &dyn LanguageModel,
    messages: &[Message],
    schema: &OutputSchema,
) -> Result<T, LlmError>
where
    T: DeserializeOwned,
{
    let value = llm.complete_structured(messages, schema).await?;
    serde_json::from_value(value).map_err(|e| LlmError::Schema {
        schema: schema.name.clone(),
        message: e.to_string(),
    })
}

/// Build the client for a configured station.
pub fn from_station(station: &Station) -> Arc<dyn LanguageModel> {
    match station.provider {
        Provider::OpenAI => Arc::new(openai::OpenAiClient::new(station.clone())),
        Provider::Anthropic => Arc::new(anthropic::AnthropicClient::new(station.clone())),
    }
}

/// Whether a station carries a usable key (checked at call time, not startup).
pub(crate) fn has_api_key(station: &Station) -> bool {
    let key = station.api_key.trim();
    !key.is_empty() && key != crate::config::station::API_KEY_PLACEHOLDER
}
