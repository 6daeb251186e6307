use codeguard_protocol::{AiMode, Fix, Issue, ResultsModel, RunResult, Severity};
use std::path::Path;

pub const SAFE_FIX_DESCRIPTION: &str = "Auto-fixed by AI (safe-only mode)";
pub const AI_SUGGESTION: &str = "Consider applying automatic fix";

/// Apply the AI pass to `results` and split out the issues still open.
///
/// Issues stay owned by their run, so each run's `fixed` count is exact.
/// `remaining` never contains an issue whose fix was applied, whatever the
/// mode.
pub fn apply_ai_fixes(mut results: Vec<RunResult>, cwd: &Path, mode: AiMode) -> ResultsModel {
    log::debug!("AI pass ({mode}) over {} results in {}", results.len(), cwd.display());
    match mode {
        AiMode::Off => {}
        AiMode::SafeOnly => {
            for result in &mut results {
                for issue in &mut result.issues {
                    if issue.severity != Severity::Error && !issue.is_fixed() {
                        issue.fix = Some(Fix::applied(SAFE_FIX_DESCRIPTION));
                    }
                }
                result.recount_fixed();
            }
        }
        AiMode::Suggest => {
            for issue in results.iter_mut().flat_map(|r| r.issues.iter_mut()) {
                if issue.severity == Severity::Warning {
                    issue.ai_suggestion = Some(AI_SUGGESTION.to_string());
                }
            }
        }
    }

    let remaining: Vec<Issue> = results
        .iter()
        .flat_map(|r| r.issues.iter())
        .filter(|issue| !issue.is_fixed())
        .cloned()
        .collect();
    ResultsModel { results, remaining }
}
