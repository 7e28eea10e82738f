use serde::{Deserialize, Serialize};

/// One `chat.completion.chunk` event. Every chunk on a given stream
/// shares `id`, `created`, and `model`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalChunk {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_chat_id: Option<String>,
    pub choices: Vec<CanonicalChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl CanonicalChunk {
    pub fn new(id: String, created: i64, model: String, choices: Vec<CanonicalChoice>) -> Self {
        Self {
            id,
            object: "chat.completion.chunk",
            created,
            model,
            provider_chat_id: None,
            choices,
            usage: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalChoice {
    pub index: u32,
    pub delta: CanonicalDelta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// The only fields a delta may carry. Any field appearing outside this
/// set would violate the subset invariant the gateway guarantees to
/// callers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanonicalDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
}

impl CanonicalDelta {
    pub fn role(role: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            ..Default::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn reasoning(content: impl Into<String>) -> Self {
        Self {
            reasoning_content: Some(content.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens_details: Option<UsageDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens_details: Option<UsageDetails>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageDetails {
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omits_absent_fields_on_serialize() {
        let chunk = CanonicalChunk::new(
            "chatcmpl-1".into(),
            0,
            "demo".into(),
            vec![CanonicalChoice {
                index: 0,
                delta: CanonicalDelta::content("hi"),
                finish_reason: None,
            }],
        );
        let value = serde_json::to_value(&chunk).unwrap();
        let choice = &value["choices"][0];
        assert!(choice.get("finish_reason").is_none());
        assert!(choice["delta"].get("role").is_none());
        assert!(choice["delta"].get("reasoning_content").is_none());
        assert_eq!(choice["delta"]["content"], "hi");
    }
}
