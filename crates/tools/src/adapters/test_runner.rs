use crate::registry::ToolAdapter;
use crate::value::{array_at, line_at, parse_json, str_at, u64_at};
use codeguard_protocol::{Issue, Severity};
use serde_json::{json, Value};

/// JavaScript test runners. All of them normalize from the Jest-shaped
/// `testResults` envelope; Mocha's reporter output is reshaped into it.
pub(crate) enum TestRunner {
    Jest,
    Vitest,
    Mocha,
}

impl ToolAdapter for TestRunner {
    fn local_command(&self, _args: &Value) -> Option<String> {
        let command = match self {
            Self::Jest => "npx jest --json --passWithNoTests",
            Self::Vitest => "npx vitest run --reporter json",
            Self::Mocha => "npx mocha --reporter json",
        };
        Some(command.to_string())
    }

    fn parse_output(&self, stdout: &str, _stderr: &str) -> serde_json::Result<Value> {
        let report = parse_json(stdout)?;
        Ok(match self {
            Self::Jest | Self::Vitest => json!({
                "testResults": {
                    "numTotalTests": u64_at(&report, "numTotalTests").unwrap_or(0),
                    "numPassedTests": u64_at(&report, "numPassedTests").unwrap_or(0),
                    "numFailedTests": u64_at(&report, "numFailedTests").unwrap_or(0),
                    "testResults": array_at(&report, "testResults"),
                }
            }),
            Self::Mocha => reshape_mocha(&report),
        })
    }

    fn normalize(&self, _tool: &str, raw: &Value) -> Vec<Issue> {
        let envelope = raw.get("testResults").unwrap_or(&Value::Null);
        let mut issues = Vec::new();
        for entry in array_at(envelope, "testResults") {
            match entry.get("assertionResults").and_then(Value::as_array) {
                // Jest file-level result: the file is on the entry.
                Some(assertions) => {
                    let file = str_at(entry, "name").or_else(|| str_at(entry, "testFilePath"));
                    issues.extend(
                        assertions
                            .iter()
                            .filter(|a| is_failed(a))
                            .map(|a| failure_issue(a, file)),
                    );
                }
                None if is_failed(entry) => issues.push(failure_issue(entry, None)),
                None => {}
            }
        }
        issues
    }
}

fn is_failed(test: &Value) -> bool {
    str_at(test, "status") == Some("failed")
}

fn failure_issue(test: &Value, file: Option<&str>) -> Issue {
    let title = str_at(test, "fullName")
        .or_else(|| str_at(test, "title"))
        .unwrap_or("unnamed test");
    let message = array_at(test, "failureMessages")
        .iter()
        .find_map(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Test failed: {title}"));
    let line = test
        .get("location")
        .and_then(|loc| line_at(loc, "line"))
        .unwrap_or(1);
    Issue::new(
        str_at(test, "file").or(file).unwrap_or("unknown"),
        line,
        "test-failure",
        message,
        Severity::Error,
    )
}

fn reshape_mocha(report: &Value) -> Value {
    let stats = report.get("stats").unwrap_or(&Value::Null);
    let mocha_test = |test: &Value, status: &str| {
        let failure = test
            .get("err")
            .and_then(|err| str_at(err, "message"))
            .map(|m| vec![m.to_string()])
            .unwrap_or_default();
        json!({
            "title": str_at(test, "title"),
            "fullName": str_at(test, "fullTitle"),
            "file": str_at(test, "file"),
            "status": status,
            "failureMessages": if status == "failed" { failure } else { Vec::new() },
        })
    };
    let mut tests: Vec<Value> = array_at(report, "failures")
        .iter()
        .map(|t| mocha_test(t, "failed"))
        .collect();
    tests.extend(array_at(report, "passes").iter().map(|t| mocha_test(t, "passed")));
    json!({
        "testResults": {
            "numTotalTests": u64_at(stats, "tests").unwrap_or(0),
            "numPassedTests": u64_at(stats, "passes").unwrap_or(0),
            "numFailedTests": u64_at(stats, "failures").unwrap_or(0),
            "testResults": tests,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn runner_command_lines() {
        let args = json!({});
        assert_eq!(
            TestRunner::Jest.local_command(&args).as_deref(),
            Some("npx jest --json --passWithNoTests")
        );
        assert_eq!(
            TestRunner::Vitest.local_command(&args).as_deref(),
            Some("npx vitest run --reporter json")
        );
        assert_eq!(
            TestRunner::Mocha.local_command(&args).as_deref(),
            Some("npx mocha --reporter json")
        );
    }

    #[test]
    fn only_failed_tests_become_issues() {
        let raw = json!({"testResults": {"testResults": [
            {"status": "passed", "title": "ok"},
            {"status": "failed", "title": "adds", "file": "sum.test.js",
             "failureMessages": ["expected 3, got 4"], "location": {"line": 8}},
            {"status": "failed", "title": "subtracts"}
        ]}});
        let issues = TestRunner::Jest.normalize("jest", &raw);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].file, "sum.test.js");
        assert_eq!(issues[0].line, 8);
        assert_eq!(issues[0].message, "expected 3, got 4");
        assert_eq!(issues[0].rule, "test-failure");
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[1].message, "Test failed: subtracts");
        assert_eq!(issues[1].file, "unknown");
    }

    #[test]
    fn jest_file_results_attribute_assertions_to_file() {
        let stdout = r#"{
            "numTotalTests": 2, "numPassedTests": 1, "numFailedTests": 1,
            "testResults": [{
                "name": "/repo/math.test.ts",
                "assertionResults": [
                    {"status": "passed", "fullName": "math adds"},
                    {"status": "failed", "fullName": "math divides", "failureMessages": []}
                ]
            }]
        }"#;
        let raw = TestRunner::Jest.parse_output(stdout, "").unwrap();
        assert_eq!(raw["testResults"]["numFailedTests"], 1);
        let issues = TestRunner::Jest.normalize("jest", &raw);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].file, "/repo/math.test.ts");
        assert_eq!(issues[0].message, "Test failed: math divides");
    }

    #[test]
    fn mocha_report_is_reshaped() {
        let stdout = r#"{
            "stats": {"tests": 2, "passes": 1, "failures": 1},
            "failures": [{"title": "works", "fullTitle": "api works", "file": "/repo/test/api.js",
                          "err": {"message": "boom"}}],
            "passes": [{"title": "ok", "fullTitle": "api ok", "file": "/repo/test/api.js", "err": {}}]
        }"#;
        let raw = TestRunner::Mocha.parse_output(stdout, "").unwrap();
        assert_eq!(raw["testResults"]["numTotalTests"], 2);
        let issues = TestRunner::Mocha.normalize("mocha", &raw);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].file, "/repo/test/api.js");
        assert_eq!(issues[0].message, "boom");
    }
}
