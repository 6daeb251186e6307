use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Normalized severity. Tool-native levels are always coerced onto one of
/// these three values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    /// Coerce a textual level from any tool onto the closest severity.
    /// Unrecognized labels become `Warning`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "error" | "err" | "fatal" | "critical" | "high" | "blocker" | "failure" | "failed" => {
                Self::Error
            }
            "info" | "information" | "informational" | "note" | "hint" | "low" | "minor"
            | "suggestion" | "style" | "none" => Self::Info,
            _ => Self::Warning,
        }
    }

    /// Numeric levels: `>= 2` is an error, `1` a warning, anything lower info.
    pub fn from_level(level: i64) -> Self {
        match level {
            l if l >= 2 => Self::Error,
            1 => Self::Warning,
            _ => Self::Info,
        }
    }

    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::from_label(s),
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map(Self::from_level)
                .unwrap_or(Self::Warning),
            _ => Self::Warning,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Fix {
    pub applied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Fix {
    pub fn applied(description: impl Into<String>) -> Self {
        Self {
            applied: true,
            description: Some(description.into()),
        }
    }
}

/// One normalized finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Tool-relative or absolute path, as reported.
    pub file: String,
    /// 1-based line; tools that report none get 1.
    pub line: u32,
    pub rule: String,
    pub message: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<Fix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_suggestion: Option<String>,
}

impl Issue {
    pub fn new(
        file: impl Into<String>,
        line: u32,
        rule: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            file: file.into(),
            line: line.max(1),
            rule: rule.into(),
            message: message.into(),
            severity,
            fix: None,
            ai_suggestion: None,
        }
    }

    pub fn with_fix(mut self, fix: Fix) -> Self {
        self.fix = Some(fix);
        self
    }

    pub fn is_fixed(&self) -> bool {
        self.fix.as_ref().is_some_and(|f| f.applied)
    }
}
