use crate::issue::{Issue, Severity};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution path that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Backend {
    #[serde(rename = "MCP")]
    Mcp,
    /// Local process execution.
    #[serde(rename = "IDE")]
    Ide,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mcp => f.write_str("MCP"),
            Self::Ide => f.write_str("IDE"),
        }
    }
}

/// Outcome of one execution request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub tool: String,
    pub command: String,
    /// False iff both remote and local execution failed (or local was disabled).
    pub success: bool,
    /// In the order the tool reported them.
    pub issues: Vec<Issue>,
    pub fixed: usize,
    /// Wall-clock milliseconds for the whole attempt.
    pub duration: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub backend: Backend,
}

impl RunResult {
    pub fn count_fixed(&self) -> usize {
        self.issues.iter().filter(|i| i.is_fixed()).count()
    }

    pub fn recount_fixed(&mut self) {
        self.fixed = self.count_fixed();
    }
}

/// Top-level aggregate handed to presentation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ResultsModel {
    /// One per executed request, in execution order.
    pub results: Vec<RunResult>,
    /// Issues whose fix was not applied.
    pub remaining: Vec<Issue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ResultsSummary {
    pub runs: usize,
    pub failed_runs: usize,
    pub issues: usize,
    pub fixed: usize,
    pub remaining: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

impl ResultsModel {
    pub fn summary(&self) -> ResultsSummary {
        let mut summary = ResultsSummary {
            runs: self.results.len(),
            failed_runs: self.results.iter().filter(|r| !r.success).count(),
            issues: self.results.iter().map(|r| r.issues.len()).sum(),
            fixed: self.results.iter().map(|r| r.fixed).sum(),
            remaining: self.remaining.len(),
            ..Default::default()
        };
        for issue in &self.remaining {
            match issue.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Info => summary.infos += 1,
            }
        }
        summary
    }

    pub fn is_clean(&self) -> bool {
        let summary = self.summary();
        summary.failed_runs == 0 && summary.errors == 0
    }
}
