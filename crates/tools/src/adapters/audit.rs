use crate::registry::ToolAdapter;
use crate::value::{array_at, parse_json, str_at, u64_at};
use codeguard_protocol::{Issue, Severity};
use serde_json::{json, Value};

pub(crate) struct NpmAudit;

impl ToolAdapter for NpmAudit {
    fn local_command(&self, _args: &Value) -> Option<String> {
        Some("npm audit --json".to_string())
    }

    fn parse_output(&self, stdout: &str, _stderr: &str) -> serde_json::Result<Value> {
        let report = parse_json(stdout)?;
        Ok(json!({
            "vulnerabilities": report.get("vulnerabilities").cloned().unwrap_or_else(|| json!({})),
            "metadata": report.get("metadata").cloned().unwrap_or_else(|| json!({})),
            "auditReportVersion": u64_at(&report, "auditReportVersion").unwrap_or(2),
        }))
    }

    /// One issue per vulnerable package, attributed to `package.json`.
    fn normalize(&self, _tool: &str, raw: &Value) -> Vec<Issue> {
        let Some(vulnerabilities) = raw.get("vulnerabilities").and_then(Value::as_object) else {
            return Vec::new();
        };
        vulnerabilities
            .iter()
            .map(|(name, vuln)| {
                let level = str_at(vuln, "severity").unwrap_or("moderate");
                let mut message = format!("{name}: {level} severity vulnerability");
                if let Some(range) = str_at(vuln, "range") {
                    message.push_str(&format!(" ({range})"));
                }
                if vuln.get("fixAvailable").is_some_and(|f| f.as_bool() != Some(false)) {
                    message.push_str(", fix available via `npm audit fix`");
                }
                Issue::new(
                    "package.json",
                    1,
                    format!("npm-audit/{name}"),
                    message,
                    Severity::from_label(level),
                )
            })
            .collect()
    }
}

pub(crate) struct Retire;

impl ToolAdapter for Retire {
    fn local_command(&self, _args: &Value) -> Option<String> {
        Some("npx retire --outputformat json".to_string())
    }

    /// Older releases print a bare array of file entries, newer ones wrap it
    /// in `{"data": [...]}`.
    fn parse_output(&self, stdout: &str, _stderr: &str) -> serde_json::Result<Value> {
        let report = parse_json(stdout)?;
        let entries = match &report {
            Value::Array(entries) => entries.as_slice(),
            other => array_at(other, "data"),
        };
        Ok(json!({
            "vulnerabilities": entries,
            "summary": format!("Found {} potential vulnerabilities", entries.len()),
        }))
    }

    fn normalize(&self, _tool: &str, raw: &Value) -> Vec<Issue> {
        let mut issues = Vec::new();
        for entry in array_at(raw, "vulnerabilities") {
            let file = str_at(entry, "file").unwrap_or("unknown");
            for component in array_at(entry, "results") {
                let name = str_at(component, "component").unwrap_or("component");
                let version = str_at(component, "version").unwrap_or("?");
                for vuln in array_at(component, "vulnerabilities") {
                    let ids = vuln.get("identifiers").unwrap_or(&Value::Null);
                    let summary = str_at(ids, "summary")
                        .or_else(|| array_at(ids, "CVE").iter().find_map(Value::as_str))
                        .unwrap_or("known vulnerability");
                    issues.push(Issue::new(
                        file,
                        1,
                        format!("retire/{name}"),
                        format!("{name} {version}: {summary}"),
                        str_at(vuln, "severity")
                            .map(Severity::from_label)
                            .unwrap_or(Severity::Warning),
                    ));
                }
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn audit_levels_map_onto_severities() {
        let raw = json!({"vulnerabilities": {
            "lodash": {"severity": "critical", "range": "<4.17.21", "fixAvailable": true},
            "minimist": {"severity": "moderate", "fixAvailable": false},
            "debug": {"severity": "low"}
        }});
        let issues = NpmAudit.normalize("npm-audit", &raw);
        let by_rule = |rule: &str| issues.iter().find(|i| i.rule == rule).unwrap();
        assert_eq!(by_rule("npm-audit/lodash").severity, Severity::Error);
        assert!(by_rule("npm-audit/lodash").message.contains("fix available"));
        assert!(by_rule("npm-audit/lodash").message.contains("<4.17.21"));
        assert_eq!(by_rule("npm-audit/minimist").severity, Severity::Warning);
        assert!(!by_rule("npm-audit/minimist").message.contains("fix available"));
        assert_eq!(by_rule("npm-audit/debug").severity, Severity::Info);
        assert!(issues.iter().all(|i| i.file == "package.json"));
    }

    #[test]
    fn audit_issues_keep_report_order() {
        let stdout = r#"{"vulnerabilities": {
            "zlib": {"severity": "high"},
            "abc": {"severity": "low"},
            "minimist": {"severity": "moderate"}
        }}"#;
        let raw = NpmAudit.parse_output(stdout, "").unwrap();
        let rules: Vec<String> = NpmAudit
            .normalize("npm-audit", &raw)
            .into_iter()
            .map(|i| i.rule)
            .collect();
        assert_eq!(rules, vec!["npm-audit/zlib", "npm-audit/abc", "npm-audit/minimist"]);
    }

    #[test]
    fn audit_parse_defaults_missing_sections() {
        let raw = NpmAudit.parse_output("{}", "").unwrap();
        assert_eq!(raw["auditReportVersion"], 2);
        assert!(NpmAudit.normalize("audit", &raw).is_empty());
    }

    #[test]
    fn retire_accepts_both_report_shapes() {
        let entry = json!({"file": "public/jquery.js", "results": [{
            "component": "jquery", "version": "1.8.1",
            "vulnerabilities": [{"severity": "medium",
                                 "identifiers": {"summary": "XSS in selector"}}]
        }]});
        let bare = Retire.parse_output(&json!([entry.clone()]).to_string(), "").unwrap();
        let wrapped = Retire
            .parse_output(&json!({"version": "4", "data": [entry]}).to_string(), "")
            .unwrap();
        assert_eq!(bare, wrapped);

        let issues = Retire.normalize("retire", &bare);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].file, "public/jquery.js");
        assert_eq!(issues[0].message, "jquery 1.8.1: XSS in selector");
        assert_eq!(issues[0].severity, Severity::Warning);
    }
}
