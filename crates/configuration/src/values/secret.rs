use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A value that is either written inline in the configuration, or read from an environment
/// variable when the configuration is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum Secret {
    Plain(String),
    FromEnvironment { variable: String },
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self::Plain(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}
