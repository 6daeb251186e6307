use crate::registry::ToolAdapter;
use crate::value::{array_at, parse_json};
use codeguard_protocol::{Issue, Severity};
use serde_json::{json, Value};

pub(crate) struct Madge;

impl ToolAdapter for Madge {
    fn local_command(&self, _args: &Value) -> Option<String> {
        Some("npx madge --circular --json .".to_string())
    }

    fn parse_output(&self, stdout: &str, _stderr: &str) -> serde_json::Result<Value> {
        let cycles = parse_json(stdout)?;
        let count = cycles.as_array().map_or(0, Vec::len);
        Ok(json!({
            "circular": cycles,
            "summary": format!("Found {count} circular dependencies"),
        }))
    }

    fn normalize(&self, _tool: &str, raw: &Value) -> Vec<Issue> {
        array_at(raw, "circular")
            .iter()
            .filter_map(Value::as_array)
            .filter(|chain| !chain.is_empty())
            .map(|chain| {
                let modules: Vec<&str> = chain.iter().filter_map(Value::as_str).collect();
                let first = modules.first().copied().unwrap_or("unknown");
                let mut path = modules.join(" -> ");
                path.push_str(" -> ");
                path.push_str(first);
                Issue::new(
                    first,
                    1,
                    "circular-dependency",
                    format!("Circular dependency: {path}"),
                    Severity::Warning,
                )
            })
            .collect()
    }
}

pub(crate) struct Depcheck;

impl ToolAdapter for Depcheck {
    fn local_command(&self, _args: &Value) -> Option<String> {
        Some("npx depcheck --json".to_string())
    }

    fn parse_output(&self, stdout: &str, _stderr: &str) -> serde_json::Result<Value> {
        let report = parse_json(stdout)?;
        let section = |key: &str, empty: Value| report.get(key).cloned().unwrap_or(empty);
        Ok(json!({
            "dependencies": section("dependencies", json!([])),
            "devDependencies": section("devDependencies", json!([])),
            "missing": section("missing", json!({})),
            "using": section("using", json!({})),
        }))
    }

    fn normalize(&self, _tool: &str, raw: &Value) -> Vec<Issue> {
        let unused = |key: &str, rule: &str, label: &str, severity: Severity| {
            array_at(raw, key)
                .iter()
                .filter_map(Value::as_str)
                .map(|name| {
                    Issue::new("package.json", 1, rule, format!("{label}: {name}"), severity)
                })
                .collect::<Vec<_>>()
        };
        let mut issues = unused(
            "dependencies",
            "unused-dependency",
            "Unused dependency",
            Severity::Warning,
        );
        issues.extend(unused(
            "devDependencies",
            "unused-dev-dependency",
            "Unused devDependency",
            Severity::Info,
        ));
        if let Some(missing) = raw.get("missing").and_then(Value::as_object) {
            for (name, users) in missing {
                let file = users
                    .as_array()
                    .and_then(|files| files.iter().find_map(Value::as_str))
                    .unwrap_or("package.json");
                issues.push(Issue::new(
                    file,
                    1,
                    "missing-dependency",
                    format!("Missing dependency: {name}"),
                    Severity::Error,
                ));
            }
        }
        issues
    }
}
