use relay_protocol::{CanonicalDelta, CanonicalMessage, Usage};
use serde_json::Value;

use super::NormalizedEvent;

/// Tracks the `provider_chat_id`/`role` captured from `message_start` across
/// a stream's typed SSE events, then maps each subsequent event per
/// spec.md §4.2's anthropic normalization rules.
#[derive(Debug, Default)]
pub struct AnthropicNormalizer {
    provider_chat_id: Option<String>,
    role: Option<String>,
}

impl AnthropicNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, json: &Value) -> Option<NormalizedEvent> {
        let event_type = json.get("type").and_then(Value::as_str).unwrap_or("");

        match event_type {
            "message_start" => {
                let message = json.get("message")?;
                self.provider_chat_id = message.get("id").and_then(Value::as_str).map(String::from);
                self.role = message.get("role").and_then(Value::as_str).map(String::from);
                Some(NormalizedEvent {
                    provider_chat_id: self.provider_chat_id.clone(),
                    delta: Some(CanonicalDelta::role(
                        self.role.clone().unwrap_or_else(|| "assistant".into()),
                    )),
                    index: 0,
                    finish_reason: None,
                    usage: None,
                })
            }
            "ping" | "content_block_start" | "content_block_stop" | "message_stop" => None,
            _ => self.process_delta_bearing(json),
        }
    }

    fn process_delta_bearing(&self, json: &Value) -> Option<NormalizedEvent> {
        let index = json.get("index").and_then(Value::as_u64).unwrap_or(0) as u32;
        let usage = json.get("usage").and_then(parse_usage);

        let Some(delta) = json.get("delta") else {
            return usage.map(|usage| NormalizedEvent {
                usage: Some(usage),
                index,
                ..Default::default()
            });
        };

        if delta.get("type").and_then(Value::as_str) == Some("input_json_delta") {
            return None;
        }

        let canon = CanonicalDelta {
            role: None,
            content: delta.get("text").and_then(Value::as_str).map(String::from),
            reasoning_content: delta
                .get("thinking")
                .and_then(Value::as_str)
                .map(String::from),
        };
        let finish_reason = delta
            .get("stop_reason")
            .and_then(Value::as_str)
            .map(String::from);

        let event = NormalizedEvent {
            provider_chat_id: None,
            delta: Some(canon),
            index,
            finish_reason,
            usage,
        };
        if event.is_empty() { None } else { Some(event) }
    }
}

fn parse_usage(v: &Value) -> Option<Usage> {
    if !v.is_object() {
        return None;
    }
    let input = v.get("input_tokens").and_then(Value::as_u64);
    let output = v.get("output_tokens").and_then(Value::as_u64);
    if input.is_none() && output.is_none() {
        return None;
    }
    let total = match (input, output) {
        (Some(i), Some(o)) => Some(i + o),
        _ => None,
    };
    Some(Usage {
        prompt_tokens: input,
        completion_tokens: output,
        total_tokens: total,
        prompt_tokens_details: None,
        completion_tokens_details: None,
    })
}

/// Non-streaming decode. Per spec.md §9's open question, an empty
/// `content` array fails with a `ClientApiError` rather than an
/// unchecked `content[0]` index.
pub fn decode_final(
    json: &Value,
) -> Result<(CanonicalMessage, Option<String>, Option<Usage>, Option<String>), String> {
    let content = json
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| "missing content array".to_string())?;
    let block = content
        .first()
        .ok_or_else(|| "empty content array in non-streaming response".to_string())?;

    let role = json
        .get("role")
        .and_then(Value::as_str)
        .unwrap_or("assistant")
        .to_string();
    let block_type = block.get("type").and_then(Value::as_str).unwrap_or("text");
    let (text, thinking) = if block_type == "thinking" {
        (None, block.get("thinking").and_then(Value::as_str).map(String::from))
    } else {
        (block.get("text").and_then(Value::as_str).map(String::from), None)
    };

    let message = CanonicalMessage {
        role,
        content: text,
        reasoning_content: thinking,
    };
    let finish_reason = json
        .get("stop_reason")
        .and_then(Value::as_str)
        .map(String::from);
    let usage = json.get("usage").and_then(parse_usage);
    let provider_chat_id = json.get("id").and_then(Value::as_str).map(String::from);
    Ok((message, finish_reason, usage, provider_chat_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_start_captures_provider_chat_id_and_role() {
        let mut normalizer = AnthropicNormalizer::new();
        let event = normalizer
            .process(&json!({"type": "message_start", "message": {"id": "msg_1", "role": "assistant"}}))
            .unwrap();
        assert_eq!(event.provider_chat_id.as_deref(), Some("msg_1"));
        assert_eq!(event.delta.unwrap().role.as_deref(), Some("assistant"));
    }

    #[test]
    fn skips_input_json_delta() {
        let mut normalizer = AnthropicNormalizer::new();
        let event = normalizer.process(&json!({
            "type": "content_block_delta",
            "index": 0,
            "delta": {"type": "input_json_delta", "partial_json": "{}"}
        }));
        assert!(event.is_none());
    }

    #[test]
    fn maps_text_and_thinking_deltas() {
        let mut normalizer = AnthropicNormalizer::new();
        let text = normalizer
            .process(&json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "hi"}}))
            .unwrap();
        assert_eq!(text.delta.unwrap().content.as_deref(), Some("hi"));

        let thinking = normalizer
            .process(&json!({"type": "content_block_delta", "index": 0, "delta": {"type": "thinking_delta", "thinking": "because"}}))
            .unwrap();
        assert_eq!(thinking.delta.unwrap().reasoning_content.as_deref(), Some("because"));
    }

    #[test]
    fn empty_content_array_fails_without_panicking() {
        let err = decode_final(&json!({"content": []})).unwrap_err();
        assert!(err.contains("empty"));
    }
}
