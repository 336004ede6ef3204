//! OpenAI-compatible chat completions client
//!
//! `POST {base_url}/chat/completions` with a bearer key; the reply is the
//! first choice's message content.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::prompts::{self, ChatMessage};
use super::{Assistant, AssistantError};
use crate::config::AssistantConfig;
use crate::types::{InspectionStatus, Measurement};

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionResponse {
    fn into_text(self) -> Result<String, AssistantError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(AssistantError::EmptyResponse)
    }
}

/// HTTP assistant backend
#[derive(Clone)]
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    suggestion_temperature: f32,
    suggestion_max_tokens: u32,
    chat_temperature: f32,
    chat_max_tokens: u32,
}

impl std::fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl ChatCompletionsClient {
    pub fn new(config: &AssistantConfig, api_key: impl Into<String>) -> Result<Self, AssistantError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: config.model.clone(),
            suggestion_temperature: config.suggestion_temperature,
            suggestion_max_tokens: config.suggestion_max_tokens,
            chat_temperature: config.chat_temperature,
            chat_max_tokens: config.chat_max_tokens,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, AssistantError> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature,
            max_tokens,
        };

        let started = std::time::Instant::now();
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AssistantError::Status { status, body });
        }

        let body = resp.bytes().await?;
        let parsed: CompletionResponse = serde_json::from_slice(&body)?;
        let text = parsed.into_text()?;

        tracing::debug!(
            model = %self.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            chars = text.len(),
            "Chat completion received"
        );
        Ok(text)
    }
}

#[async_trait]
impl Assistant for ChatCompletionsClient {
    async fn generate_suggestions(
        &self,
        measurements: &[Measurement],
        status: InspectionStatus,
    ) -> Result<String, AssistantError> {
        let messages = prompts::suggestion_messages(measurements, status)?;
        self.complete(&messages, self.suggestion_temperature, self.suggestion_max_tokens)
            .await
    }

    async fn chat_reply(&self, user_text: &str) -> Result<String, AssistantError> {
        let messages = prompts::chat_messages(user_text);
        self.complete(&messages, self.chat_temperature, self.chat_max_tokens)
            .await
    }

    fn backend_name(&self) -> &'static str {
        "chat-completions"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_first_choice_trimmed() {
        let raw = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"  Check bearings.\n"}}]}"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.into_text().unwrap(), "Check bearings.");
    }

    #[test]
    fn test_empty_choices_is_error() {
        for raw in [r#"{"choices":[]}"#, r#"{}"#, r#"{"choices":[{"message":{"content":null}}]}"#] {
            let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
            assert!(matches!(parsed.into_text(), Err(AssistantError::EmptyResponse)), "{raw}");
        }
    }

    #[test]
    fn test_request_shape() {
        let messages = prompts::chat_messages("hi");
        let req = CompletionRequest {
            model: "llama-3.1-8b-instant",
            messages: &messages,
            temperature: 0.2,
            max_tokens: 300,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["model"], "llama-3.1-8b-instant");
        assert_eq!(v["max_tokens"], 300);
        assert_eq!(v["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_endpoint_from_config() {
        let config = AssistantConfig {
            base_url: "http://localhost:9999/v1/".to_string(),
            ..AssistantConfig::default()
        };
        let client = ChatCompletionsClient::new(&config, "test-key").unwrap();
        assert_eq!(client.endpoint(), "http://localhost:9999/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        let config = AssistantConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..AssistantConfig::default()
        };
        let client = ChatCompletionsClient::new(&config, "test-key").unwrap();
        assert!(matches!(client.chat_reply("hi").await, Err(AssistantError::Http(_))));
    }
}
