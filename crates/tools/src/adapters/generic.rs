use crate::registry::ToolAdapter;
use crate::value::{array_at, line_at, parse_json, str_at};
use codeguard_protocol::{Fix, Issue, Severity};
use serde_json::{json, Value};

/// Fallback for tools without a dedicated adapter: reads a top-level
/// `issues` array and has no local command.
pub(crate) struct GenericAdapter;

impl ToolAdapter for GenericAdapter {
    fn local_command(&self, _args: &Value) -> Option<String> {
        None
    }

    fn parse_output(&self, stdout: &str, stderr: &str) -> serde_json::Result<Value> {
        Ok(json!({ "success": true, "output": stdout, "error": stderr }))
    }

    fn normalize(&self, tool: &str, raw: &Value) -> Vec<Issue> {
        normalize_issue_list(tool, raw)
    }
}

/// Locally runnable tool defined only by its command line. Stdout is
/// expected to be JSON in the generic `{"issues": [...]}` shape.
#[derive(Debug, Clone)]
pub struct CommandAdapter {
    command: String,
}

impl CommandAdapter {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl ToolAdapter for CommandAdapter {
    fn local_command(&self, _args: &Value) -> Option<String> {
        Some(self.command.clone())
    }

    fn parse_output(&self, stdout: &str, _stderr: &str) -> serde_json::Result<Value> {
        match parse_json(stdout)? {
            Value::Array(issues) => Ok(json!({ "issues": issues })),
            other => Ok(other),
        }
    }

    fn normalize(&self, tool: &str, raw: &Value) -> Vec<Issue> {
        normalize_issue_list(tool, raw)
    }
}

pub(crate) fn normalize_issue_list(tool: &str, raw: &Value) -> Vec<Issue> {
    array_at(raw, "issues")
        .iter()
        .map(|entry| {
            let severity = entry
                .get("severity")
                .map(Severity::from_value)
                .unwrap_or(Severity::Warning);
            let issue = Issue::new(
                str_at(entry, "file").unwrap_or("unknown"),
                line_at(entry, "line").unwrap_or(1),
                str_at(entry, "rule")
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{tool}-rule")),
                str_at(entry, "message")
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Issue detected by {tool}")),
                severity,
            );
            match entry.get("fix") {
                Some(fix) => match fix.get("applied").and_then(Value::as_bool) {
                    Some(applied) => issue.with_fix(Fix {
                        applied,
                        description: str_at(fix, "description").map(str::to_string),
                    }),
                    None => issue,
                },
                None => issue,
            }
        })
        .collect()
}
