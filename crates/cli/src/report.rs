use anyhow::Result;
use codeguard_discovery::Provider;
use codeguard_protocol::{serialize_json_pretty, ExecutionRequest, Issue, ResultsModel, RunResult};
use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::Arc;

/// Presentation boundary for results.
pub trait ResultsView {
    /// Render a complete model.
    fn show_results(&mut self, model: &ResultsModel) -> Result<()>;

    /// Render a model that supersedes one shown (or partly shown) earlier.
    fn update_results_view(&mut self, model: &ResultsModel) -> Result<()> {
        self.show_results(model)
    }
}

/// Plain-text view for terminals.
pub struct HumanView<W: Write> {
    out: W,
}

impl<W: Write> HumanView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ResultsView for HumanView<W> {
    fn show_results(&mut self, model: &ResultsModel) -> Result<()> {
        write_text(&mut self.out, &render_results(model))
    }

    /// Progress only: one line per update.
    fn update_results_view(&mut self, model: &ResultsModel) -> Result<()> {
        let summary = model.summary();
        write_text(
            &mut self.out,
            &format!("… {} runs so far, {} issues", summary.runs, summary.issues),
        )
    }
}

/// Pretty JSON document of the whole model.
pub struct JsonView<W: Write> {
    out: W,
}

impl<W: Write> JsonView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ResultsView for JsonView<W> {
    fn show_results(&mut self, model: &ResultsModel) -> Result<()> {
        write_text(&mut self.out, &serialize_json_pretty(model)?)
    }

    /// Stdout carries exactly one JSON document, so partial updates are dropped.
    fn update_results_view(&mut self, _model: &ResultsModel) -> Result<()> {
        Ok(())
    }
}

/// Write `text` plus a newline; a closed pipe is not an error.
pub fn write_text(out: &mut impl Write, text: &str) -> Result<()> {
    if let Err(err) = out
        .write_all(text.as_bytes())
        .and_then(|_| out.write_all(b"\n"))
        .and_then(|_| out.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

pub fn render_results(model: &ResultsModel) -> String {
    let mut text = String::new();
    if model.results.is_empty() {
        text.push_str("No tools ran.\n");
    }
    for result in &model.results {
        text.push_str(&render_run(result));
        text.push('\n');
    }

    if !model.remaining.is_empty() {
        text.push_str("\nRemaining issues:\n");
        for issue in &model.remaining {
            text.push_str(&render_issue(issue));
            text.push('\n');
        }
    }

    let summary = model.summary();
    let _ = write!(
        text,
        "\nSummary: {} runs ({} failed), {} issues, {} fixed, {} remaining \
         ({} errors, {} warnings, {} info)",
        summary.runs,
        summary.failed_runs,
        summary.issues,
        summary.fixed,
        summary.remaining,
        summary.errors,
        summary.warnings,
        summary.infos
    );
    text
}

fn render_run(result: &RunResult) -> String {
    let mut line = format!("{} {} [{}] ", result.tool, result.command, result.backend);
    if result.success {
        let _ = write!(
            line,
            "ok {} issues, {} fixed ({}ms)",
            result.issues.len(),
            result.fixed,
            result.duration
        );
        if let Some(output) = &result.output {
            let _ = write!(line, " - {}", one_line(output));
        }
    } else {
        let _ = write!(
            line,
            "FAILED ({}ms): {}",
            result.duration,
            result.error.as_deref().map(one_line).unwrap_or_default()
        );
    }
    line
}

fn render_issue(issue: &Issue) -> String {
    let mut line = format!(
        "  {:<7} {}:{} {} {}",
        issue.severity.as_str(),
        issue.file,
        issue.line,
        issue.rule,
        one_line(&issue.message)
    );
    if let Some(suggestion) = &issue.ai_suggestion {
        let _ = write!(line, " (ai: {suggestion})");
    }
    line
}

pub fn render_providers(providers: &[Arc<dyn Provider>], warnings: &[String]) -> String {
    let mut text = String::new();
    for provider in providers {
        let _ = writeln!(text, "{}", provider.name());
        for cap in provider.capabilities() {
            let _ = writeln!(
                text,
                "  {:<20} {:<12} {:<8} {}",
                cap.id,
                cap.category.as_str(),
                if cap.mutates { "mutates" } else { "reads" },
                cap.commands.join(", ")
            );
        }
    }
    for warning in warnings {
        let _ = writeln!(text, "warning: {warning}");
    }
    text.trim_end().to_string()
}

pub fn render_plan(plan: &[ExecutionRequest]) -> String {
    if plan.is_empty() {
        return "Nothing to run.".to_string();
    }
    plan.iter()
        .enumerate()
        .map(|(i, req)| {
            format!(
                "{}. {}/{} {}{}",
                i + 1,
                req.provider,
                req.tool,
                req.command,
                if req.mutates { " (mutates)" } else { "" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn one_line(text: &str) -> String {
    text.lines().next().unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeguard_discovery::builtin_providers;
    use codeguard_protocol::{Backend, Capability, Category, Fix, Severity};
    use pretty_assertions::assert_eq;

    fn model() -> ResultsModel {
        let warn = Issue {
            ai_suggestion: Some("Consider applying automatic fix".into()),
            ..Issue::new("src/a.ts", 4, "quotes", "Strings must use singlequote.", Severity::Warning)
        };
        let fixed = Issue::new("b.css", 1, "prettier-format", "m", Severity::Info)
            .with_fix(Fix::applied("Prettier formatting applied"));
        ResultsModel {
            results: vec![
                RunResult {
                    tool: "eslint".into(),
                    command: "lint".into(),
                    success: true,
                    issues: vec![warn.clone(), fixed],
                    fixed: 1,
                    duration: 12,
                    output: Some("2 problems\nmore".into()),
                    error: None,
                    backend: Backend::Mcp,
                },
                RunResult {
                    tool: "jest".into(),
                    command: "test".into(),
                    success: false,
                    issues: vec![],
                    fixed: 0,
                    duration: 3,
                    output: None,
                    error: Some("MCP failed: x; local fallback failed: y".into()),
                    backend: Backend::Mcp,
                },
            ],
            remaining: vec![warn],
        }
    }

    #[test]
    fn human_rendering_lists_runs_remaining_and_summary() {
        assert_eq!(
            render_results(&model()),
            "eslint lint [MCP] ok 2 issues, 1 fixed (12ms) - 2 problems\n\
             jest test [MCP] FAILED (3ms): MCP failed: x; local fallback failed: y\n\
             \n\
             Remaining issues:\n  \
             warning src/a.ts:4 quotes Strings must use singlequote. (ai: Consider applying automatic fix)\n\
             \n\
             Summary: 2 runs (1 failed), 2 issues, 1 fixed, 1 remaining (0 errors, 1 warnings, 0 info)"
        );
    }

    #[test]
    fn empty_model_says_nothing_ran() {
        assert!(render_results(&ResultsModel::default()).starts_with("No tools ran.\n"));
    }

    #[test]
    fn json_view_emits_one_document_and_ignores_updates() {
        let mut view = JsonView::new(Vec::new());
        view.update_results_view(&model()).unwrap();
        view.show_results(&model()).unwrap();
        let out = String::from_utf8(view.into_inner()).unwrap();
        let parsed: ResultsModel = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, model());
    }

    #[test]
    fn human_updates_are_single_progress_lines() {
        let mut view = HumanView::new(Vec::new());
        view.update_results_view(&model()).unwrap();
        let out = String::from_utf8(view.into_inner()).unwrap();
        assert_eq!(out, "… 2 runs so far, 2 issues\n");
    }

    #[test]
    fn providers_and_plans_render_one_line_per_entry() {
        let text = render_providers(&builtin_providers(), &["lint-server: timeout".to_string()]);
        assert!(text.starts_with("mock-eslint\n  eslint"));
        assert!(text.contains("mock-prettier"));
        assert!(text.ends_with("warning: lint-server: timeout"));

        let cap = Capability::new("eslint", Category::Linting, true, ["lint"]);
        let plan = vec![ExecutionRequest::new("mock-eslint", &cap, "lint", "/w")];
        assert_eq!(render_plan(&plan), "1. mock-eslint/eslint lint (mutates)");
        assert_eq!(render_plan(&[]), "Nothing to run.");
    }
}
