use crate::registry::ToolAdapter;
use codeguard_protocol::{Fix, Issue, Severity};
use serde_json::{json, Value};

pub(crate) struct Prettier;

impl ToolAdapter for Prettier {
    fn local_command(&self, _args: &Value) -> Option<String> {
        Some("npx prettier --check . --list-different".to_string())
    }

    /// `--list-different` prints one path per line. A check run reformats
    /// nothing, so `changed` is false and normalization yields no issues.
    fn parse_output(&self, stdout: &str, _stderr: &str) -> serde_json::Result<Value> {
        let files: Vec<&str> = stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        Ok(json!({
            "changed": false,
            "files": files,
            "summary": format!("{} files need formatting", files.len()),
        }))
    }

    fn normalize(&self, _tool: &str, raw: &Value) -> Vec<Issue> {
        if raw.get("changed").and_then(Value::as_bool) != Some(true) {
            return Vec::new();
        }
        let Some(files) = raw.get("files").and_then(Value::as_array) else {
            return Vec::new();
        };
        files
            .iter()
            .map(|file| {
                Issue::new(
                    file.as_str().unwrap_or("unknown"),
                    1,
                    "prettier-format",
                    "formatted",
                    Severity::Info,
                )
                .with_fix(Fix::applied("Prettier formatting applied"))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_files_become_fixed_info_issues() {
        let raw = json!({"changed": true, "files": ["a.ts", "b.css"]});
        let issues = Prettier.normalize("prettier", &raw);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.is_fixed() && i.severity == Severity::Info));
        assert_eq!(issues[1].file, "b.css");
    }

    #[test]
    fn unchanged_or_malformed_reports_yield_nothing() {
        assert!(Prettier.normalize("prettier", &json!({"changed": false, "files": ["a"]})).is_empty());
        assert!(Prettier.normalize("prettier", &json!({"changed": true, "files": "a"})).is_empty());
    }

    #[test]
    fn local_check_lists_files_without_changing_them() {
        let raw = Prettier.parse_output("src/a.ts\n\nsrc/b.ts\n", "").unwrap();
        assert_eq!(raw["files"], json!(["src/a.ts", "src/b.ts"]));
        assert!(Prettier.normalize("prettier", &raw).is_empty());
    }
}
