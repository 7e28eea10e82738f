use http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
use relay_common::ParamMap;
use relay_provider_core::client::Message;
use serde_json::{Map, Value};

use super::{FormattedRequest, alias_into, messages_json, passthrough};

const PASSTHROUGH: &[&str] = &[
    "frequency_penalty",
    "temperature",
    "top_p",
    "top_k",
    "max_tokens",
    "presence_penalty",
    "stop",
    "stream_options",
    "response_format",
    "tools",
    "tool_choice",
    "logprobs",
    "top_logprobs",
];

pub fn format_reasoner(
    api_key: &str,
    model: &str,
    messages: Vec<Message>,
    stream: bool,
    model_args: &ParamMap,
) -> FormattedRequest {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, value);
    }

    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));
    body.insert("messages".to_string(), messages_json(messages));
    body.insert("stream".to_string(), Value::Bool(stream));
    passthrough(&mut body, model_args, PASSTHROUGH);
    alias_into(&mut body, model_args, "max_completion_tokens", "max_tokens");

    (headers, Value::Object(body))
}
