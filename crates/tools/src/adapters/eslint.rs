use crate::registry::ToolAdapter;
use crate::value::{array_at, line_at, parse_json, str_at, u64_at};
use codeguard_protocol::{Issue, Severity};
use serde_json::{json, Map, Value};

pub(crate) struct Eslint;

impl ToolAdapter for Eslint {
    fn local_command(&self, _args: &Value) -> Option<String> {
        Some("npx eslint . --ext .ts,.js,.tsx,.jsx --format json".to_string())
    }

    /// Flattens ESLint's per-file report into one `messages` list, each
    /// message tagged with its `filePath`.
    fn parse_output(&self, stdout: &str, _stderr: &str) -> serde_json::Result<Value> {
        let report = parse_json(stdout)?;
        let files = match report.as_array() {
            Some(files) if !files.is_empty() => files,
            _ => return Ok(json!({ "messages": [] })),
        };

        let mut messages = Vec::new();
        let (mut errors, mut warnings) = (0u64, 0u64);
        for file in files {
            errors += u64_at(file, "errorCount").unwrap_or(0);
            warnings += u64_at(file, "warningCount").unwrap_or(0);
            let path = file.get("filePath").cloned().unwrap_or(Value::Null);
            for message in array_at(file, "messages") {
                let mut flat = message.as_object().cloned().unwrap_or_else(Map::new);
                flat.insert("filePath".to_string(), path.clone());
                messages.push(Value::Object(flat));
            }
        }

        Ok(json!({
            "success": true,
            "messages": messages,
            "errorCount": errors,
            "warningCount": warnings,
        }))
    }

    fn normalize(&self, _tool: &str, raw: &Value) -> Vec<Issue> {
        array_at(raw, "messages")
            .iter()
            .map(|msg| {
                let level = msg
                    .get("severity")
                    .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)));
                let severity = match level {
                    Some(2) => Severity::Error,
                    _ => Severity::Warning,
                };
                Issue::new(
                    str_at(msg, "filePath").unwrap_or("unknown"),
                    line_at(msg, "line").unwrap_or(1),
                    str_at(msg, "ruleId").unwrap_or("eslint-rule"),
                    str_at(msg, "message").unwrap_or("ESLint issue detected"),
                    severity,
                )
            })
            .collect()
    }
}
