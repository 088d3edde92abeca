use crate::config::station::Station;
use crate::llm::types::{Message, OutputSchema, Role};
use crate::llm::{has_api_key, LanguageModel, LlmError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Anthropic Messages API client
#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    station: Station,
}

impl AnthropicClient {
    pub fn new(station: Station) -> Self {
        Self {
            client: Client::new(),
            station,
        }
    }

    async fn create_message(
        &self,
        messages: &[Message],
        tool: Option<&OutputSchema>,
    ) -> Result<Vec<ResponseBlock>, LlmError> {
        if !has_api_key(&self.station) {
            return Err(LlmError::MissingApiKey(self.station.id.clone()));
        }

        let api_base = self
            .station
            .api_base
            .as_deref()
            .unwrap_or(self.station.provider.default_base_url())
            .trim_end_matches('/');
        let url = format!("{}/v1/messages", api_base);

        tracing::debug!(
            api_base = %api_base,
            model = %self.station.model,
            message_count = messages.len(),
            structured = tool.is_some(),
            "anthropic create_message request"
        );

        let (system, turns) = split_system(messages);
        let request_body = CreateMessageRequest {
            model: &self.station.model,
            system,
            messages: turns,
            max_tokens: self.station.max_tokens.unwrap_or(8192),
            temperature: self.station.temperature,
            tools: tool.map(|schema| {
                vec![json!({
                    "name": schema.name,
                    "description": schema.description,
                    "input_schema": schema.schema,
                })]
            }),
            tool_choice: tool.map(|schema| json!({ "type": "tool", "name": schema.name })),
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.station.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
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
                "anthropic api returned error"
            );
            return Err(LlmError::from_status(status, &error_text));
        }

        let body: CreateMessageResponse = response.json().await?;
        Ok(body.content)
    }
}

#[async_trait::async_trait]
impl LanguageModel for AnthropicClient {
    fn model_name(&self) -> &str {
        &self.station.model
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let blocks = self.create_message(messages, None).await?;
        let text: String = blocks
            .into_iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(text),
                _ => None,
            })
            .collect();

        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }

    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &OutputSchema,
    ) -> Result<serde_json::Value, LlmError> {
        let blocks = self.create_message(messages, Some(schema)).await?;
        blocks
            .into_iter()
            .find_map(|block| match block {
                ResponseBlock::ToolUse { name, input } if name == schema.name => Some(input),
                _ => None,
            })
            .ok_or_else(|| LlmError::Schema {
                schema: schema.name.clone(),
                message: "no tool_use block in response".to_string(),
            })
    }
}

/// Anthropic takes system prompts out-of-band; join them and keep the rest in order.
fn split_system(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    let turns = messages.iter().filter(|m| m.role != Role::System).collect();

    let system = if system.is_empty() {
        None
    } else {
        Some(system.join("\n\n"))
    };
    (system, turns)
}

/// Request body for creating a message
#[derive(Debug, Serialize)]
struct CreateMessageRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<&'a Message>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CreateMessageResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        name: String,
        #[serde(default = "default_tool_input")]
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

fn default_tool_input() -> serde_json::Value {
    json!({})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompts_are_lifted_out_of_turns() {
        let messages = vec![
            Message::system("a"),
            Message::user("q"),
            Message::system("b"),
            Message::assistant("r"),
        ];
        let (system, turns) = split_system(&messages);
        assert_eq!(system.as_deref(), Some("a\n\nb"));
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].role, Role::Assistant);
    }

    #[test]
    fn parses_tool_use_and_ignores_unknown_blocks() {
        let body: CreateMessageResponse = serde_json::from_value(json!({
            "content": [
                { "type": "thinking", "thinking": "..." },
                { "type": "tool_use", "id": "toolu_1", "name": "trip_request", "input": { "destination": "Lisbon" } }
            ]
        }))
        .unwrap();

        assert!(matches!(body.content[0], ResponseBlock::Other));
        match &body.content[1] {
            ResponseBlock::ToolUse { name, input } => {
                assert_eq!(name, "trip_request");
                assert_eq!(input["destination"], "Lisbon");
            }
            other => panic!("unexpected block: {other:?}"),
        }
    }
}
