//! Suggestion and chat assistant
//!
//! ## Architecture
//!
//! - [`Assistant`]: capability trait used by the inspection service
//! - [`ChatCompletionsClient`]: OpenAI-compatible HTTP backend (Groq by default)
//! - [`DisabledAssistant`]: used when no API key is configured; every call
//!   fails with [`AssistantError::Disabled`]
//!
//! Suggestion failures never block saving an inspection. Callers go through
//! [`suggestions_or_none`], which logs the failure and degrades to `None`.

mod chat_client;
pub mod prompts;

pub use chat_client::ChatCompletionsClient;

use async_trait::async_trait;

use crate::types::{InspectionStatus, Measurement};

/// Assistant errors
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("Assistant is disabled (no API key configured)")]
    Disabled,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Assistant returned status {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },
    #[error("Assistant returned an empty response")]
    EmptyResponse,
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Text generation used by the inspection workflow.
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Short actionable QA suggestions for an evaluated inspection.
    async fn generate_suggestions(
        &self,
        measurements: &[Measurement],
        status: InspectionStatus,
    ) -> Result<String, AssistantError>;

    /// Reply to a free-text question, restricted to machinery QA topics.
    async fn chat_reply(&self, user_text: &str) -> Result<String, AssistantError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Assistant that refuses every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledAssistant;

#[async_trait]
impl Assistant for DisabledAssistant {
    async fn generate_suggestions(
        &self,
        _measurements: &[Measurement],
        _status: InspectionStatus,
    ) -> Result<String, AssistantError> {
        Err(AssistantError::Disabled)
    }

    async fn chat_reply(&self, _user_text: &str) -> Result<String, AssistantError> {
        Err(AssistantError::Disabled)
    }

    fn backend_name(&self) -> &'static str {
        "disabled"
    }
}

/// Request suggestions, logging and swallowing any failure.
pub async fn suggestions_or_none(
    assistant: &dyn Assistant,
    measurements: &[Measurement],
    status: InspectionStatus,
) -> Option<String> {
    match assistant.generate_suggestions(measurements, status).await {
        Ok(text) if !text.trim().is_empty() => Some(text),
        Ok(_) => {
            tracing::warn!(backend = assistant.backend_name(), "Assistant returned blank suggestions");
            None
        }
        Err(AssistantError::Disabled) => {
            tracing::debug!("Assistant disabled, skipping suggestions");
            None
        }
        Err(e) => {
            tracing::warn!(backend = assistant.backend_name(), error = %e, "Suggestion request failed");
            None
        }
    }
}
