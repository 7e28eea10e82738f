use relay_protocol::{CanonicalDelta, Usage, UsageDetails};
use serde_json::Value;

use super::NormalizedEvent;

/// openai-family chunks are already canonical shape — direct field copy,
/// no reasoning extraction.
pub fn process(json: &Value) -> Option<NormalizedEvent> {
    let choice = json.get("choices").and_then(|c| c.get(0));
    let delta = choice.and_then(|c| c.get("delta"));

    let canon_delta = delta.map(|delta| CanonicalDelta {
        role: delta.get("role").and_then(Value::as_str).map(String::from),
        content: delta
            .get("content")
            .and_then(Value::as_str)
            .map(String::from),
        reasoning_content: delta
            .get("reasoning_content")
            .and_then(Value::as_str)
            .map(String::from),
    });

    let finish_reason = choice
        .and_then(|c| c.get("finish_reason"))
        .and_then(Value::as_str)
        .map(String::from);
    let index = choice
        .and_then(|c| c.get("index"))
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;
    let usage = json.get("usage").and_then(parse_usage);
    let provider_chat_id = json.get("id").and_then(Value::as_str).map(String::from);

    let event = NormalizedEvent {
        provider_chat_id,
        delta: canon_delta,
        index,
        finish_reason,
        usage,
    };
    if event.is_empty() { None } else { Some(event) }
}

pub fn parse_usage(v: &Value) -> Option<Usage> {
    if !v.is_object() {
        return None;
    }
    Some(Usage {
        prompt_tokens: v.get("prompt_tokens").and_then(Value::as_u64),
        completion_tokens: v.get("completion_tokens").and_then(Value::as_u64),
        total_tokens: v.get("total_tokens").and_then(Value::as_u64),
        prompt_tokens_details: v
            .get("prompt_tokens_details")
            .and_then(|d| d.as_object())
            .map(|fields| UsageDetails {
                fields: fields.clone(),
            }),
        completion_tokens_details: v
            .get("completion_tokens_details")
            .and_then(|d| d.as_object())
            .map(|fields| UsageDetails {
                fields: fields.clone(),
            }),
    })
}

/// Maps a full non-streaming `chat.completion` body into the canonical
/// `(message, finish_reason, usage, provider_chat_id)` tuple.
pub fn decode_final(
    json: &Value,
) -> Option<(relay_protocol::CanonicalMessage, Option<String>, Option<Usage>, Option<String>)> {
    let choice = json.get("choices")?.get(0)?;
    let message = choice.get("message")?;
    let canon = relay_protocol::CanonicalMessage {
        role: message
            .get("role")
            .and_then(Value::as_str)
            .unwrap_or("assistant")
            .to_string(),
        content: message.get("content").and_then(Value::as_str).map(String::from),
        reasoning_content: message
            .get("reasoning_content")
            .and_then(Value::as_str)
            .map(String::from),
    };
    let finish_reason = choice
        .get("finish_reason")
        .and_then(Value::as_str)
        .map(String::from);
    let usage = json.get("usage").and_then(parse_usage);
    let provider_chat_id = json.get("id").and_then(Value::as_str).map(String::from);
    Some((canon, finish_reason, usage, provider_chat_id))
}
