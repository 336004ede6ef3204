//! Prompt text for the assistant

use serde::Serialize;

use crate::config::defaults::CHAT_REFUSAL;
use crate::types::{InspectionStatus, Measurement};

/// Chat message in the OpenAI wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

pub fn chat_system_prompt() -> String {
    format!(
        "You are a digital quality assurance assistant for the MachineryQA project. \
         You ONLY answer questions related to machine inspection, QA processes, and this project. \
         If asked about unrelated topics, respond with: '{CHAT_REFUSAL}'"
    )
}

pub fn suggestion_prompt(
    measurements: &[Measurement],
    status: InspectionStatus,
) -> Result<String, serde_json::Error> {
    let readings = serde_json::to_string_pretty(measurements)?;
    Ok(format!(
        "The inspection status is {status}.\n\
         Measurements:\n{readings}\n\
         Give short actionable QA improvement suggestions."
    ))
}

pub fn suggestion_messages(
    measurements: &[Measurement],
    status: InspectionStatus,
) -> Result<Vec<ChatMessage>, serde_json::Error> {
    Ok(vec![ChatMessage::user(suggestion_prompt(measurements, status)?)])
}

pub fn chat_messages(user_text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(chat_system_prompt()),
        ChatMessage::user(user_text),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Parameter;

    #[test]
    fn test_suggestion_prompt_contains_status_and_readings() {
        let m = vec![Measurement::new(Parameter::new("Pressure", 100.0, 200.0).unwrap(), 250.0)];
        let prompt = suggestion_prompt(&m, InspectionStatus::Fail).unwrap();
        assert!(prompt.starts_with("The inspection status is Fail.\nMeasurements:\n"));
        assert!(prompt.contains("\"name\": \"Pressure\""));
        assert!(prompt.contains("\"value\": 250.0"));
        assert!(prompt.ends_with("Give short actionable QA improvement suggestions."));
    }

    #[test]
    fn test_chat_messages_lead_with_system_prompt() {
        let msgs = chat_messages("Why does vibration matter?");
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, "system");
        assert!(msgs[0].content.contains("I can only help with MachineryQA-related queries."));
        assert_eq!(msgs[1], ChatMessage::user("Why does vibration matter?"));
    }
}
