use serde::{Deserialize, Serialize};

/// Upstream wire family a provider/model speaks. Shared across storage,
/// the provider-core trait boundary, and the concrete clients so the
/// dispatcher can resolve a model's provider to the right client type
/// without either side depending on the other's internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFormat {
    Reasoner,
    Anthropic,
    Openai,
}

impl ProviderFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderFormat::Reasoner => "reasoner",
            ProviderFormat::Anthropic => "anthropic",
            ProviderFormat::Openai => "openai",
        }
    }
}

impl std::str::FromStr for ProviderFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reasoner" => Ok(ProviderFormat::Reasoner),
            "anthropic" => Ok(ProviderFormat::Anthropic),
            "openai" => Ok(ProviderFormat::Openai),
            other => Err(format!("unknown provider format: {other}")),
        }
    }
}

impl std::fmt::Display for ProviderFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A model record's role. `Reasoner` models are meant to sit in the
/// reasoning slot of a composite; `General` models can serve either
/// slot directly or stand alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    Reasoner,
    General,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Reasoner => "reasoner",
            ModelType::General => "general",
        }
    }
}

impl std::str::FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reasoner" => Ok(ModelType::Reasoner),
            "general" => Ok(ModelType::General),
            other => Err(format!("unknown model type: {other}")),
        }
    }
}
