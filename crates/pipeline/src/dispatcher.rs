use async_trait::async_trait;
use codeguard_discovery::Provider;
use codeguard_protocol::{Backend, ExecutionRequest, Issue, RunResult};
use codeguard_tools::{ProcessExecutor, ToolRegistry};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

const LOCAL_OUTPUT_PREFIX: &str = "[local fallback] ";
const LOCAL_MESSAGE_SUFFIX: &str = " (local)";

/// Local execution seam used when the remote run fails.
#[async_trait]
pub trait LocalExecutor: Send + Sync {
    async fn run_local(&self, tool: &str, args: &Value, cwd: &Path) -> codeguard_tools::Result<Value>;
}

#[async_trait]
impl LocalExecutor for ProcessExecutor {
    async fn run_local(&self, tool: &str, args: &Value, cwd: &Path) -> codeguard_tools::Result<Value> {
        ProcessExecutor::run_local(self, tool, args, cwd).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Fall back to local execution when the remote run fails.
    pub prefer_remote: bool,
    /// Upper bound on concurrently running non-mutating requests. `1` keeps
    /// dispatch fully sequential.
    pub reader_concurrency: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            prefer_remote: true,
            reader_concurrency: 1,
        }
    }
}

/// Executes planned requests against providers, falling back to local
/// tools. Never fails; every request yields a `RunResult`.
#[derive(Clone)]
pub struct Dispatcher {
    providers: Arc<Vec<Arc<dyn Provider>>>,
    registry: Arc<ToolRegistry>,
    local: Arc<dyn LocalExecutor>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        providers: Vec<Arc<dyn Provider>>,
        registry: Arc<ToolRegistry>,
        local: Arc<dyn LocalExecutor>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            providers: Arc::new(providers),
            registry,
            local,
            config,
        }
    }

    pub fn config(&self) -> DispatchConfig {
        self.config
    }

    pub async fn run_one(&self, request: &ExecutionRequest) -> RunResult {
        let started = Instant::now();
        let mut result = match self.run_remote(request).await {
            Ok(raw) => {
                let issues = self.registry.normalize(&request.tool, &raw);
                self.result(request, true, issues, Backend::Mcp)
                    .with_output(summary_text(&raw))
            }
            Err(remote_err) if !self.config.prefer_remote => {
                log::warn!("{} failed remotely: {remote_err}", request.tool);
                self.result(request, false, Vec::new(), Backend::Mcp)
                    .with_error(remote_err)
            }
            Err(remote_err) => {
                log::info!("{} failed remotely ({remote_err}); trying local", request.tool);
                self.run_fallback(request, remote_err).await
            }
        };
        result.duration = started.elapsed().as_millis() as u64;
        result
    }

    async fn run_fallback(&self, request: &ExecutionRequest, remote_err: String) -> RunResult {
        match self
            .local
            .run_local(&request.tool, &request.args_value(), &request.cwd)
            .await
        {
            Ok(raw) => {
                let issues = self
                    .registry
                    .normalize(&request.tool, &raw)
                    .into_iter()
                    .map(|mut issue| {
                        issue.message.push_str(LOCAL_MESSAGE_SUFFIX);
                        issue
                    })
                    .collect();
                let output = format!(
                    "{LOCAL_OUTPUT_PREFIX}{}",
                    summary_text(&raw).unwrap_or_default()
                );
                self.result(request, true, issues, Backend::Ide)
                    .with_output(Some(output))
            }
            Err(local_err) => {
                log::warn!("{} failed locally: {local_err}", request.tool);
                self.result(request, false, Vec::new(), Backend::Mcp).with_error(format!(
                    "MCP failed: {remote_err}; local fallback failed: {local_err}"
                ))
            }
        }
    }

    async fn run_remote(&self, request: &ExecutionRequest) -> Result<Value, String> {
        let provider = self
            .providers
            .iter()
            .find(|p| p.name() == request.provider)
            .ok_or_else(|| format!("Unknown provider: {}", request.provider))?;
        provider
            .run(&request.tool, &request.command, &request.args_value())
            .await
            .map_err(|err| err.to_string())
    }

    fn result(
        &self,
        request: &ExecutionRequest,
        success: bool,
        issues: Vec<Issue>,
        backend: Backend,
    ) -> RunResult {
        let mut result = RunResult {
            tool: request.tool.clone(),
            command: request.command.clone(),
            success,
            issues,
            fixed: 0,
            duration: 0,
            output: None,
            error: None,
            backend,
        };
        result.recount_fixed();
        result
    }

    /// Run a plan; results come back in plan order.
    pub async fn run_category_plan(&self, plan: &[ExecutionRequest]) -> Vec<RunResult> {
        if self.config.reader_concurrency <= 1 {
            let mut results = Vec::with_capacity(plan.len());
            for request in plan {
                results.push(self.run_one(request).await);
            }
            return results;
        }
        self.run_with_reader_pool(plan).await
    }

    /// Mutators run one at a time first; readers then share a bounded pool.
    async fn run_with_reader_pool(&self, plan: &[ExecutionRequest]) -> Vec<RunResult> {
        let mut slots: Vec<Option<RunResult>> = plan.iter().map(|_| None).collect();
        for (index, request) in plan.iter().enumerate().filter(|(_, r)| r.mutates) {
            slots[index] = Some(self.run_one(request).await);
        }

        let permits = Arc::new(Semaphore::new(self.config.reader_concurrency));
        let mut readers = JoinSet::new();
        for (index, request) in plan.iter().enumerate().filter(|(_, r)| !r.mutates) {
            let this = self.clone();
            let request = request.clone();
            let permits = Arc::clone(&permits);
            readers.spawn(async move {
                let _permit = permits.acquire_owned().await;
                (index, this.run_one(&request).await)
            });
        }
        while let Some(joined) = readers.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(err) => log::warn!("Reader task failed: {err}"),
            }
        }

        plan.iter()
            .zip(slots)
            .map(|(request, slot)| {
                slot.unwrap_or_else(|| {
                    self.result(request, false, Vec::new(), Backend::Mcp)
                        .with_error("execution task aborted".to_string())
                })
            })
            .collect()
    }
}

trait RunResultExt {
    fn with_output(self, output: Option<String>) -> Self;
    fn with_error(self, error: String) -> Self;
}

impl RunResultExt for RunResult {
    fn with_output(mut self, output: Option<String>) -> Self {
        self.output = output;
        self
    }

    fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }
}

/// Human-readable one-liner carried by a raw response, if any.
fn summary_text(raw: &Value) -> Option<String> {
    ["output", "summary", "message"]
        .iter()
        .find_map(|key| raw.get(*key).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}
