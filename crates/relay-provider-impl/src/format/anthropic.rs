use http::{HeaderMap, HeaderName, HeaderValue};
use relay_common::ParamMap;
use relay_provider_core::client::Message;
use serde_json::{Map, Value};

use super::{FormattedRequest, alias_into, passthrough};

const PASSTHROUGH: &[&str] = &[
    "max_tokens",
    "container",
    "mcp_servers",
    "metadata",
    "service_tier",
    "stop_sequences",
    "stream",
    "system",
    "temperature",
    "thinking",
    "tool_choice",
    "tools",
    "top_p",
    "top_k",
];

const DEFAULT_MAX_TOKENS: i64 = 8192;

pub fn format_anthropic(
    api_key: &str,
    model: &str,
    mut messages: Vec<Message>,
    stream: bool,
    model_args: &ParamMap,
) -> FormattedRequest {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(api_key) {
        headers.insert(HeaderName::from_static("x-api-key"), value);
    }
    headers.insert(
        HeaderName::from_static("anthropic-version"),
        HeaderValue::from_static("2023-06-01"),
    );
    headers.insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );

    // Lift the first system-role message out of `messages` into top-level
    // `system`, matching anthropic's own message schema.
    let system = messages
        .iter()
        .position(|m| m.get("role").and_then(Value::as_str) == Some("system"))
        .map(|idx| messages.remove(idx))
        .and_then(|m| m.get("content").cloned());

    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));
    body.insert("messages".to_string(), Value::Array(messages));
    body.insert("stream".to_string(), Value::Bool(stream));
    if let Some(system) = system {
        body.insert("system".to_string(), system);
    }

    passthrough(&mut body, model_args, PASSTHROUGH);
    alias_into(&mut body, model_args, "max_completion_tokens", "max_tokens");
    alias_into(&mut body, model_args, "stop", "stop_sequences");

    if !body.contains_key("max_tokens") {
        body.insert(
            "max_tokens".to_string(),
            Value::Number(DEFAULT_MAX_TOKENS.into()),
        );
    }

    (headers, Value::Object(body))
}
