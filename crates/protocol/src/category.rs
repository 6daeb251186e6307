use crate::error::ProtocolError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse classification of capabilities.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Linting,
    Formatting,
    Testing,
    Security,
    Analysis,
    Dependencies,
}

impl Category {
    /// Every category, in the order a full run visits them.
    pub const ALL: [Category; 6] = [
        Category::Linting,
        Category::Formatting,
        Category::Testing,
        Category::Security,
        Category::Analysis,
        Category::Dependencies,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linting => "linting",
            Self::Formatting => "formatting",
            Self::Testing => "testing",
            Self::Security => "security",
            Self::Analysis => "analysis",
            Self::Dependencies => "dependencies",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == lowered)
            .ok_or_else(|| ProtocolError::UnknownCategory(s.to_string()))
    }
}

/// How aggressively the AI pass marks findings as fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum AiMode {
    Off,
    #[default]
    SafeOnly,
    Suggest,
}

impl AiMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::SafeOnly => "safe-only",
            Self::Suggest => "suggest",
        }
    }
}

impl fmt::Display for AiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiMode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "off" => Ok(Self::Off),
            "safe-only" | "safe" => Ok(Self::SafeOnly),
            "suggest" => Ok(Self::Suggest),
            _ => Err(ProtocolError::UnknownAiMode(s.to_string())),
        }
    }
}
