//! Pure per-family request formatters: canonical inputs in, provider-native
//! `(headers, body)` out. None of these can fail — unsupported parameters
//! are dropped or passed through per family, never rejected; validation is
//! the dispatcher's job (spec.md §4.1).

mod anthropic;
mod openai;
mod reasoner;

pub use anthropic::format_anthropic;
pub use openai::format_openai;
pub use reasoner::format_reasoner;

use http::HeaderMap;
use relay_common::ParamMap;
use relay_provider_core::client::Message;
use serde_json::Value;

/// Shared shape every formatter returns.
pub type FormattedRequest = (HeaderMap, Value);

/// Reads a numeric-or-string "max tokens" alias out of `model_args` under
/// `from_key`, only when `to_key` itself is absent from `model_args` — the
/// `max_completion_tokens` → `max_tokens` alias both `reasoner` and
/// `anthropic` apply.
pub(crate) fn alias_into(body: &mut serde_json::Map<String, Value>, model_args: &ParamMap, from_key: &str, to_key: &str) {
    if body.contains_key(to_key) {
        return;
    }
    if let Some(value) = model_args.get(from_key) {
        body.insert(to_key.to_string(), value.clone().into_json());
    }
}

pub(crate) fn passthrough(
    body: &mut serde_json::Map<String, Value>,
    model_args: &ParamMap,
    allowlist: &[&str],
) {
    for key in allowlist {
        if let Some(value) = model_args.get(*key) {
            let json = value.clone().into_json();
            if !json.is_null() {
                body.insert(key.to_string(), json);
            }
        }
    }
}

/// Used by the `openai` family, which passes through everything the caller
/// sent with a non-null value rather than allowlisting.
pub(crate) fn passthrough_all(body: &mut serde_json::Map<String, Value>, model_args: &ParamMap) {
    for (key, value) in model_args.iter() {
        let json = value.clone().into_json();
        if !json.is_null() {
            body.insert(key.clone(), json);
        }
    }
}

pub(crate) fn messages_json(messages: Vec<Message>) -> Value {
    Value::Array(messages)
}
