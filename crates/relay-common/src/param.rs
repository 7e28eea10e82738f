use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Statically-typed stand-in for the caller's open-ended `model_args`
/// map. The wire contract lets a caller pass any JSON value for any
/// parameter name; we keep that flexibility but give it a named shape
/// so formatters can allowlist by key without re-parsing raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(serde_json::Number),
    Str(String),
    Array(Vec<Value>),
    Object(serde_json::Map<String, Value>),
    Null,
}

impl ParamValue {
    pub fn into_json(self) -> Value {
        match self {
            ParamValue::Bool(b) => Value::Bool(b),
            ParamValue::Number(n) => Value::Number(n),
            ParamValue::Str(s) => Value::String(s),
            ParamValue::Array(a) => Value::Array(a),
            ParamValue::Object(o) => Value::Object(o),
            ParamValue::Null => Value::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(b) => ParamValue::Bool(b),
            Value::Number(n) => ParamValue::Number(n),
            Value::String(s) => ParamValue::Str(s),
            Value::Array(a) => ParamValue::Array(a),
            Value::Object(o) => ParamValue::Object(o),
            Value::Null => ParamValue::Null,
        }
    }
}

pub type ParamMap = HashMap<String, ParamValue>;

/// Builds a `ParamMap` from a request body, excluding the keys already
/// extracted as first-class fields. Everything the caller sent that
/// isn't one of those fields passes through to the upstream formatter
/// untouched.
pub fn extract_params(body: &serde_json::Map<String, Value>, excluded: &[&str]) -> ParamMap {
    body.iter()
        .filter(|(key, _)| !excluded.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), ParamValue::from(value.clone())))
        .collect()
}
