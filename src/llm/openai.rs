use crate::config::station::Station;
use crate::llm::types::{Message, OutputSchema};
use crate::llm::{has_api_key, LanguageModel, LlmError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// OpenAI-compatible Chat Completions client (OpenAI, vLLM, LiteLLM, ...)
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    station: Station,
}

impl OpenAiClient {
    pub fn new(station: Station) -> Self {
        Self {
            client: Client::new(),
            station,
        }
    }

    async fn chat(
        &self,
        messages: &[Message],
        response_format: Option<serde_json::Value>,
    ) -> Result<String, LlmError> {
        if !has_api_key(&self.station) {
            return Err(LlmError::MissingApiKey(self.station.id.clone()));
        }

        let api_base = self
            .station
            .api_base
            .as_deref()
            .unwrap_or(self.station.provider.default_base_url())
            .trim_end_matches('/');
        let url = format!("{}/v1/chat/completions", api_base);

        tracing::debug!(
            api_base = %api_base,
            model = %self.station.model,
            message_count = messages.len(),
            structured = response_format.is_some(),
            "openai chat request"
        );

        let request_body = ChatCompletionRequest {
            model: &self.station.model,
            messages,
            max_tokens: self.station.max_tokens,
            temperature: self.station.temperature,
            response_format,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.station.api_key)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            tracing::warn!(
                status = %status,
                error = %crate::logging::redact_secrets(&error_text),
                "openai api returned error"
            );
            return Err(LlmError::from_status(status, &error_text));
        }

        let body: ChatCompletionResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        Ok(content)
    }
}

#[async_trait::async_trait]
impl LanguageModel for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.station.model
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.chat(messages, None).await
    }

    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &OutputSchema,
    ) -> Result<serde_json::Value, LlmError> {
        let text = self.chat(messages, Some(response_format(schema))).await?;
        serde_json::from_str(&text).map_err(|e| LlmError::Schema {
            schema: schema.name.clone(),
            message: e.to_string(),
        })
    }
}

fn response_format(schema: &OutputSchema) -> serde_json::Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": schema.name,
            "description": schema.description,
            "schema": schema.schema,
        }
    })
}

/// Request body for a chat completion
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}
