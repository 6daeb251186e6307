use crate::registry::ToolAdapter;
use crate::value::{array_at, line_at, parse_json, str_at, u64_at};
use codeguard_protocol::{Fix, Issue, Severity};
use serde_json::{json, Value};

pub(crate) struct Biome;

impl ToolAdapter for Biome {
    fn local_command(&self, _args: &Value) -> Option<String> {
        Some("npx @biomejs/biome check . --reporter json".to_string())
    }

    fn parse_output(&self, stdout: &str, _stderr: &str) -> serde_json::Result<Value> {
        let report = parse_json(stdout)?;
        let summary = report.get("summary").cloned().unwrap_or(Value::Null);
        Ok(json!({
            "diagnostics": array_at(&report, "diagnostics"),
            "summary": {
                "changed": array_at(&summary, "changed"),
                "fixed": u64_at(&summary, "fixed").unwrap_or(0),
                "errors": u64_at(&summary, "errors").unwrap_or(0),
            },
        }))
    }

    fn normalize(&self, _tool: &str, raw: &Value) -> Vec<Issue> {
        array_at(raw, "diagnostics")
            .iter()
            .map(|diag| {
                let category = str_at(diag, "category").unwrap_or("diagnostic");
                let location = diag.get("location").unwrap_or(&Value::Null);
                // Older reporters emit `path` as a string, newer ones as `{file}`.
                let file = str_at(location, "path")
                    .or_else(|| location.get("path").and_then(|p| str_at(p, "file")))
                    .unwrap_or("unknown");
                let severity = match str_at(diag, "severity") {
                    Some("error") | Some("fatal") => Severity::Error,
                    Some("warning") | Some("warn") => Severity::Warning,
                    _ => Severity::Info,
                };
                let issue = Issue::new(
                    file,
                    line_at(location, "line").unwrap_or(1),
                    format!("biome-{category}"),
                    str_at(diag, "description")
                        .or_else(|| str_at(diag, "message"))
                        .unwrap_or("Biome diagnostic"),
                    severity,
                );
                if category == "format" {
                    issue.with_fix(Fix::applied("Biome formatting applied"))
                } else {
                    issue
                }
            })
            .collect()
    }
}
