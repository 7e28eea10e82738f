use serde::{Deserialize, Serialize};

use crate::chunk::Usage;

/// The non-streaming counterpart to `CanonicalChunk`: same envelope,
/// `message` instead of `delta`, no `finish_reason` split across
/// choices beyond the single completed message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalResponse {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_chat_id: Option<String>,
    pub choices: Vec<CanonicalFinalChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl CanonicalResponse {
    pub fn new(
        id: String,
        created: i64,
        model: String,
        message: CanonicalMessage,
        finish_reason: Option<String>,
    ) -> Self {
        Self {
            id,
            object: "chat.completion",
            created,
            model,
            provider_chat_id: None,
            choices: vec![CanonicalFinalChoice {
                index: 0,
                message,
                finish_reason,
            }],
            usage: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalFinalChoice {
    pub index: u32,
    pub message: CanonicalMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanonicalMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_message_with_chat_completion_object() {
        let response = CanonicalResponse::new(
            "chatcmpl-1".into(),
            0,
            "demo".into(),
            CanonicalMessage {
                role: "assistant".into(),
                content: Some("hi".into()),
                reasoning_content: None,
            },
            Some("stop".into()),
        );
        assert_eq!(response.object, "chat.completion");
        assert_eq!(response.choices[0].message.content.as_deref(), Some("hi"));
    }
}
