use async_trait::async_trait;
use codeguard_discovery::{BuiltinProvider, DiscoveryError, Provider};
use codeguard_pipeline::{
    DispatchConfig, Dispatcher, LocalExecutor, PipelineError, Session, ToolSelection,
};
use codeguard_protocol::{AiMode, Backend, Capability, Category, ExecutionRequest, Severity};
use codeguard_tools::{ToolError, ToolRegistry};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Provider whose runs reply with a fixed payload or fail.
struct Scripted {
    name: String,
    capabilities: Vec<Capability>,
    reply: Option<Value>,
    delay: Duration,
    log: Arc<Mutex<Vec<String>>>,
}

impl Scripted {
    fn new(name: &str, capabilities: Vec<Capability>, reply: Option<Value>) -> Self {
        Self {
            name: name.to_string(),
            capabilities,
            reply,
            delay: Duration::ZERO,
            log: Arc::default(),
        }
    }
}

#[async_trait]
impl Provider for Scripted {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    async fn run(&self, capability_id: &str, _command: &str, _args: &Value) -> codeguard_discovery::Result<Value> {
        self.log.lock().unwrap().push(format!("start {capability_id}"));
        tokio::time::sleep(self.delay).await;
        self.log.lock().unwrap().push(format!("end {capability_id}"));
        self.reply
            .clone()
            .ok_or_else(|| DiscoveryError::Rpc("connection refused".to_string()))
    }
}

/// Local executor that counts calls and replies with a fixed outcome.
#[derive(Default)]
struct CountingLocal {
    calls: AtomicUsize,
    reply: Option<Value>,
}

#[async_trait]
impl LocalExecutor for CountingLocal {
    async fn run_local(&self, tool: &str, _args: &Value, _cwd: &Path) -> codeguard_tools::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .clone()
            .ok_or_else(|| ToolError::NotFound(tool.to_string()))
    }
}

fn eslint() -> Capability {
    Capability::new("eslint", Category::Linting, true, ["lint"])
}

fn request_for(provider: &str, cap: &Capability) -> ExecutionRequest {
    ExecutionRequest::new(provider, cap, cap.commands[0].clone(), "/repo")
}

fn dispatcher(
    providers: Vec<Arc<dyn Provider>>,
    local: Arc<CountingLocal>,
    config: DispatchConfig,
) -> Dispatcher {
    Dispatcher::new(providers, Arc::new(ToolRegistry::builtin()), local, config)
}

fn eslint_report() -> Value {
    json!({"messages": [{"ruleId": "semi", "severity": 2, "message": "Missing semicolon.",
                         "line": 3, "filePath": "a.js"}]})
}

#[tokio::test]
async fn remote_success_is_normalized() {
    let local = Arc::new(CountingLocal::default());
    let provider: Arc<dyn Provider> = Arc::new(Scripted::new("p", vec![eslint()], Some(eslint_report())));
    let d = dispatcher(vec![provider], local.clone(), DispatchConfig::default());

    let result = d.run_one(&request_for("p", &eslint())).await;
    assert!(result.success);
    assert_eq!(result.backend, Backend::Mcp);
    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].message, "Missing semicolon.");
    assert_eq!(result.issues[0].severity, Severity::Error);
    assert_eq!(result.error, None);
    assert_eq!(local.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failing_remote_falls_back_to_local() {
    let local = Arc::new(CountingLocal {
        calls: AtomicUsize::new(0),
        reply: Some(json!({"success": true, "messages": eslint_report()["messages"].clone(),
                           "summary": "1 problem"})),
    });
    let provider: Arc<dyn Provider> = Arc::new(Scripted::new("p", vec![eslint()], None));
    let d = dispatcher(vec![provider], local.clone(), DispatchConfig::default());

    let result = d.run_one(&request_for("p", &eslint())).await;
    assert!(result.success);
    assert_eq!(result.backend, Backend::Ide);
    assert_eq!(result.issues[0].message, "Missing semicolon. (local)");
    assert_eq!(result.output.as_deref(), Some("[local fallback] 1 problem"));
    assert_eq!(local.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn disabled_fallback_never_runs_local() {
    let local = Arc::new(CountingLocal {
        calls: AtomicUsize::new(0),
        reply: Some(json!({"messages": []})),
    });
    let provider: Arc<dyn Provider> = Arc::new(Scripted::new("p", vec![eslint()], None));
    let config = DispatchConfig {
        prefer_remote: false,
        ..DispatchConfig::default()
    };
    let d = dispatcher(vec![provider], local.clone(), config);

    let result = d.run_one(&request_for("p", &eslint())).await;
    assert!(!result.success);
    assert_eq!(result.backend, Backend::Mcp);
    assert!(result.issues.is_empty());
    assert_eq!(result.error.as_deref(), Some("RPC error: connection refused"));
    assert_eq!(local.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn both_paths_failing_combines_messages() {
    let local = Arc::new(CountingLocal::default());
    let d = dispatcher(Vec::new(), local.clone(), DispatchConfig::default());

    let result = d.run_one(&request_for("gone", &eslint())).await;
    assert!(!result.success);
    assert_eq!(result.backend, Backend::Mcp);
    assert_eq!(
        result.error.as_deref(),
        Some(
            "MCP failed: Unknown provider: gone; local fallback failed: \
             Tool 'eslint' not found. Please install it first."
        )
    );
    assert_eq!(local.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reader_pool_keeps_plan_order_and_runs_mutators_first() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let caps = vec![
        Capability::new("reader-a", Category::Analysis, false, ["run"]),
        Capability::new("fixer", Category::Analysis, true, ["run"]),
        Capability::new("reader-b", Category::Analysis, false, ["run"]),
    ];
    let mut scripted = Scripted::new("p", caps.clone(), Some(json!({"issues": []})));
    scripted.delay = Duration::from_millis(50);
    scripted.log = Arc::clone(&log);
    let provider: Arc<dyn Provider> = Arc::new(scripted);
    let config = DispatchConfig {
        reader_concurrency: 4,
        ..DispatchConfig::default()
    };
    let d = dispatcher(vec![provider], Arc::new(CountingLocal::default()), config);

    let plan: Vec<ExecutionRequest> = caps.iter().map(|c| request_for("p", c)).collect();
    let results = d.run_category_plan(&plan).await;
    let tools: Vec<&str> = results.iter().map(|r| r.tool.as_str()).collect();
    assert_eq!(tools, vec!["reader-a", "fixer", "reader-b"]);
    assert!(results.iter().all(|r| r.success));

    let log = log.lock().unwrap();
    assert_eq!(&log[..2], &["start fixer".to_string(), "end fixer".to_string()]);
    // Both readers started before either finished.
    let first_end = log.iter().skip(2).position(|e| e.starts_with("end")).unwrap();
    assert_eq!(first_end, 2);
}

#[tokio::test]
async fn sequential_dispatch_runs_one_at_a_time() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let caps = vec![
        Capability::new("a", Category::Analysis, false, ["run"]),
        Capability::new("b", Category::Analysis, false, ["run"]),
    ];
    let mut scripted = Scripted::new("p", caps.clone(), Some(json!({})));
    scripted.log = Arc::clone(&log);
    let d = dispatcher(
        vec![Arc::new(scripted) as Arc<dyn Provider>],
        Arc::new(CountingLocal::default()),
        DispatchConfig::default(),
    );
    let plan: Vec<ExecutionRequest> = caps.iter().map(|c| request_for("p", c)).collect();
    d.run_category_plan(&plan).await;
    assert_eq!(*log.lock().unwrap(), vec!["start a", "end a", "start b", "end b"]);
}

fn session(providers: Vec<Arc<dyn Provider>>, mode: AiMode) -> Session {
    Session::new(
        Arc::new(ToolRegistry::builtin()),
        Arc::new(CountingLocal::default()),
        DispatchConfig::default(),
        mode,
    )
    .with_providers(providers)
}

#[tokio::test]
async fn session_run_category_applies_ai_pass_and_stores_results() {
    let report = json!({"messages": [
        {"ruleId": "semi", "severity": 2, "message": "m1", "line": 1, "filePath": "a.js"},
        {"ruleId": "quotes", "severity": 1, "message": "m2", "line": 2, "filePath": "a.js"}
    ]});
    let provider: Arc<dyn Provider> = Arc::new(Scripted::new("p", vec![eslint()], Some(report)));
    let mut session = session(vec![provider], AiMode::SafeOnly);
    assert!(session.last_results().is_none());

    let model = session
        .run_category(Category::Linting, Path::new("/repo"), &ToolSelection::All)
        .await
        .clone();
    assert_eq!(model.results[0].fixed, 1);
    assert_eq!(model.remaining.len(), 1);
    assert_eq!(model.remaining[0].rule, "semi");
    assert_eq!(session.last_results(), Some(&model));
}

#[tokio::test]
async fn session_run_all_visits_categories_in_order() {
    let provider: Arc<dyn Provider> = Arc::new(BuiltinProvider::new(
        "multi",
        vec![
            Capability::new("audit", Category::Security, false, ["scan"]),
            Capability::new("jest", Category::Testing, false, ["test"]),
            Capability::new("prettier", Category::Formatting, true, ["format"]),
            Capability::new("eslint", Category::Linting, true, ["lint"]),
        ],
        "ok",
    ));
    let mut session = session(vec![provider], AiMode::Off);
    let mut selections = HashMap::new();
    selections.insert(Category::Testing, ToolSelection::from_ids(["mocha"]));

    let model = session.run_all(Path::new("/repo"), &selections).await;
    let tools: Vec<&str> = model.results.iter().map(|r| r.tool.as_str()).collect();
    assert_eq!(tools, vec!["eslint", "prettier", "audit"]);
    assert!(model.results.iter().all(|r| r.output.as_deref() == Some("ok")));
}

#[tokio::test]
async fn session_run_provider_rejects_unknown_names() {
    let provider: Arc<dyn Provider> = Arc::new(Scripted::new("p", vec![eslint()], Some(json!({}))));
    let mut session = session(vec![provider], AiMode::Off);

    let err = session.run_provider("nope", Path::new("/repo")).await.unwrap_err();
    assert_eq!(err, PipelineError::UnknownProvider("nope".to_string()));

    let model = session.run_provider("p", Path::new("/repo")).await.unwrap();
    assert_eq!(model.results.len(), 1);
    assert_eq!(model.results[0].tool, "eslint");
}

#[tokio::test]
async fn run_all_reports_progress_per_category() {
    let provider: Arc<dyn Provider> = Arc::new(BuiltinProvider::new(
        "multi",
        vec![
            Capability::new("eslint", Category::Linting, true, ["lint"]),
            Capability::new("audit", Category::Security, false, ["scan"]),
        ],
        "ok",
    ));
    let mut session = session(vec![provider], AiMode::Off);
    let mut seen = Vec::new();
    session
        .run_all_with_progress(Path::new("/repo"), &HashMap::new(), |category, results| {
            seen.push((category, results.len()));
        })
        .await;
    assert_eq!(
        seen,
        vec![
            (Category::Linting, 1),
            (Category::Formatting, 1),
            (Category::Testing, 1),
            (Category::Security, 2),
            (Category::Analysis, 2),
            (Category::Dependencies, 2),
        ]
    );
}
