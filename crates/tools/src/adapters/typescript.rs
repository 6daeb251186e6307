use crate::registry::ToolAdapter;
use crate::value::{array_at, line_at, str_at, text_at, u64_at};
use codeguard_protocol::{Issue, Severity};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

/// Remote servers report diagnostics with a packed `start` offset
/// (`line * 100 + column`) when they have no explicit line.
const START_LINE_FACTOR: u64 = 100;

pub(crate) struct TypeScript;

fn diagnostic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.+?)\((\d+),(\d+)\):\s+(error|warning)\s+TS(\d+):\s+(.+)$")
            .unwrap_or_else(|e| panic!("invalid tsc diagnostic regex: {e}"))
    })
}

impl ToolAdapter for TypeScript {
    fn local_command(&self, _args: &Value) -> Option<String> {
        Some("npx tsc --noEmit --pretty false".to_string())
    }

    /// tsc prints `file(line,col): error TSxxxx: message` lines. Depending
    /// on version they land on stdout or stderr, so both are scanned.
    fn parse_output(&self, stdout: &str, stderr: &str) -> serde_json::Result<Value> {
        let re = diagnostic_re();
        let diagnostics: Vec<Value> = stdout
            .lines()
            .chain(stderr.lines())
            .filter_map(|line| re.captures(line.trim_end()))
            .map(|caps| {
                let line: u64 = caps[2].parse().unwrap_or(1);
                let column: u64 = caps[3].parse().unwrap_or(1);
                json!({
                    "file": { "fileName": &caps[1] },
                    "line": line,
                    "column": column,
                    "start": line.saturating_mul(START_LINE_FACTOR).saturating_add(column),
                    "category": &caps[4],
                    "code": caps[5].parse::<u64>().unwrap_or(0),
                    "messageText": &caps[6],
                })
            })
            .collect();
        let count = diagnostics.len();
        Ok(json!({
            "diagnostics": diagnostics,
            "summary": format!("Found {count} TypeScript errors"),
        }))
    }

    fn normalize(&self, _tool: &str, raw: &Value) -> Vec<Issue> {
        array_at(raw, "diagnostics")
            .iter()
            .map(|diag| {
                let file = diag
                    .get("file")
                    .and_then(|f| str_at(f, "fileName").or_else(|| f.as_str()))
                    .unwrap_or("unknown");
                let line = line_at(diag, "line")
                    .or_else(|| {
                        u64_at(diag, "start")
                            .map(|start| u32::try_from(start / START_LINE_FACTOR).unwrap_or(u32::MAX))
                    })
                    .unwrap_or(1);
                let code = text_at(diag, "code").unwrap_or_else(|| "unknown".to_string());
                Issue::new(
                    file,
                    line,
                    format!("typescript-{code}"),
                    message_text(diag).unwrap_or("TypeScript error"),
                    category_severity(diag.get("category")),
                )
            })
            .collect()
    }
}

/// `messageText` is either a string or a chain object with its own
/// `messageText`.
fn message_text(diag: &Value) -> Option<&str> {
    let text = diag.get("messageText")?;
    text.as_str()
        .or_else(|| str_at(text, "messageText"))
        .filter(|s| !s.is_empty())
}

/// Textual `"error"` or the compiler's numeric error category (1).
fn category_severity(category: Option<&Value>) -> Severity {
    match category {
        Some(Value::String(s)) if s.eq_ignore_ascii_case("error") => Severity::Error,
        Some(Value::Number(n)) if n.as_i64() == Some(1) => Severity::Error,
        _ => Severity::Warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn start_offset_maps_to_line() {
        let raw = json!({"diagnostics": [{
            "file": {"fileName": "src/x.ts"}, "start": 1234, "code": 2322,
            "messageText": "Type 'string' is not assignable to type 'number'.",
            "category": "error"
        }]});
        let issues = TypeScript.normalize("typescript", &raw);
        assert_eq!(issues[0].line, 12);
        assert_eq!(issues[0].rule, "typescript-2322");
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[0].file, "src/x.ts");
    }

    #[test]
    fn small_offsets_clamp_to_first_line() {
        let raw = json!({"diagnostics": [{"start": 42, "category": "warning"}]});
        let issues = TypeScript.normalize("tsc", &raw);
        assert_eq!(issues[0].line, 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert_eq!(issues[0].message, "TypeScript error");
        assert_eq!(issues[0].rule, "typescript-unknown");
    }

    #[test]
    fn parses_compiler_lines_with_exact_positions() {
        let stdout = "src/app.ts(14,105): error TS2304: Cannot find name 'foo'.\n\
                      Found 1 error in src/app.ts:14\n";
        let raw = TypeScript.parse_output(stdout, "").unwrap();
        let issues = TypeScript.normalize("tsc", &raw);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].file, "src/app.ts");
        assert_eq!(issues[0].line, 14);
        assert_eq!(issues[0].message, "Cannot find name 'foo'.");
        assert_eq!(issues[0].rule, "typescript-2304");
    }

    #[test]
    fn chained_message_text_and_numeric_category() {
        let raw = json!({"diagnostics": [{
            "file": "a.ts", "line": 3, "category": 1,
            "messageText": {"messageText": "Outer message", "next": []}
        }]});
        let issues = TypeScript.normalize("typescript", &raw);
        assert_eq!(issues[0].message, "Outer message");
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[0].file, "a.ts");
    }
}
