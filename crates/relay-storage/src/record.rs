use relay_common::{ModelType, ProviderFormat};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub id: i64,
    pub name: String,
    pub api_key: String,
    pub base_url: String,
    pub request_path: String,
    pub format: ProviderFormat,
    pub proxy_enabled: bool,
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub id: i64,
    pub name: String,
    pub model_id: String,
    pub provider_id: i64,
    pub model_type: ModelType,
    pub format: ProviderFormat,
    pub origin_reasoning: bool,
    pub origin_output: bool,
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeRecord {
    pub id: i64,
    pub name: String,
    pub reasoner_model_id: i64,
    pub general_model_id: i64,
    pub valid: bool,
}

/// A named record in the shared provider/model/composite namespace, used
/// when a lookup needs to report *what* collided without the caller
/// depending on all three record types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceKind {
    Provider,
    Model,
    Composite,
}

/// Typed system setting value. The `value_kind` column on the row tells a
/// reader which variant to expect without inspecting the JSON payload's
/// shape (a string `"7"` and an int `7` would otherwise be ambiguous).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SettingValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Json(Value),
}

impl SettingValue {
    pub fn kind_str(&self) -> &'static str {
        match self {
            SettingValue::Str(_) => "str",
            SettingValue::Int(_) => "int",
            SettingValue::Float(_) => "float",
            SettingValue::Bool(_) => "bool",
            SettingValue::Json(_) => "json",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SettingValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            SettingValue::Str(s) => Value::String(s.clone()),
            SettingValue::Int(n) => Value::from(*n),
            SettingValue::Float(f) => Value::from(*f),
            SettingValue::Bool(b) => Value::Bool(*b),
            SettingValue::Json(v) => v.clone(),
        }
    }

    pub fn from_kind_and_json(kind: &str, value: Value) -> Option<Self> {
        Some(match kind {
            "str" => SettingValue::Str(value.as_str()?.to_string()),
            "int" => SettingValue::Int(value.as_i64()?),
            "float" => SettingValue::Float(value.as_f64()?),
            "bool" => SettingValue::Bool(value.as_bool()?),
            "json" => SettingValue::Json(value),
            _ => return None,
        })
    }
}

/// Well-known system setting keys, per spec.
pub mod setting_keys {
    pub const API_KEY: &str = "api_key";
    pub const PROXY_ADDRESS: &str = "proxy_address";
    pub const LOG_LEVEL: &str = "log_level";
    pub const TCP_CONNECTOR_LIMIT: &str = "tcp_connector_limit";
    pub const TCP_CONNECTOR_LIMIT_PER_HOST: &str = "tcp_connector_limit_per_host";
    pub const TCP_KEEPALIVE_TIMEOUT: &str = "tcp_keepalive_timeout";
}
