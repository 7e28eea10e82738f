use http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
use relay_common::ParamMap;
use relay_provider_core::client::Message;
use serde_json::{Map, Value};

use super::{FormattedRequest, messages_json, passthrough_all};

pub fn format_openai(
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
    passthrough_all(&mut body, model_args);

    (headers, Value::Object(body))
}
