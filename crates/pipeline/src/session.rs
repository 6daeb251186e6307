use crate::ai_fixer::apply_ai_fixes;
use crate::dispatcher::{DispatchConfig, Dispatcher, LocalExecutor};
use crate::error::{PipelineError, Result};
use crate::planner::{plan_category, plan_provider, ToolSelection};
use codeguard_discovery::{Discovery, DiscoveryReport, Provider, ServerConfig};
use codeguard_protocol::{AiMode, Category, ExecutionRequest, ResultsModel, RunResult};
use codeguard_tools::ToolRegistry;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Host-owned pipeline state: the current providers and the last results.
pub struct Session {
    providers: Vec<Arc<dyn Provider>>,
    registry: Arc<ToolRegistry>,
    local: Arc<dyn LocalExecutor>,
    dispatch: DispatchConfig,
    ai_mode: AiMode,
    last: Option<ResultsModel>,
}

impl Session {
    pub fn new(
        registry: Arc<ToolRegistry>,
        local: Arc<dyn LocalExecutor>,
        dispatch: DispatchConfig,
        ai_mode: AiMode,
    ) -> Self {
        Self {
            providers: Vec::new(),
            registry,
            local,
            dispatch,
            ai_mode,
            last: None,
        }
    }

    pub fn with_providers(mut self, providers: Vec<Arc<dyn Provider>>) -> Self {
        self.providers = providers;
        self
    }

    pub fn providers(&self) -> &[Arc<dyn Provider>] {
        &self.providers
    }

    pub fn ai_mode(&self) -> AiMode {
        self.ai_mode
    }

    pub fn set_ai_mode(&mut self, mode: AiMode) {
        self.ai_mode = mode;
    }

    /// Rediscover and replace the provider list wholesale.
    pub async fn refresh(&mut self, discovery: &Discovery, servers: &[ServerConfig]) -> DiscoveryReport {
        let found = discovery.discover_with_report(servers).await;
        log::debug!("Session now has {} providers", found.providers.len());
        self.providers = found.providers;
        found.report
    }

    pub fn plan(&self, category: Category, cwd: &Path, enabled: &ToolSelection) -> Vec<ExecutionRequest> {
        plan_category(&self.providers, category, cwd, enabled)
    }

    pub async fn run_category(
        &mut self,
        category: Category,
        cwd: &Path,
        enabled: &ToolSelection,
    ) -> &ResultsModel {
        let plan = self.plan(category, cwd, enabled);
        if plan.is_empty() {
            log::info!("No enabled {category} tools");
        }
        let results = self.dispatcher().run_category_plan(&plan).await;
        self.store(apply_ai_fixes(results, cwd, self.ai_mode))
    }

    /// Every category in [`Category::ALL`] order with one AI pass at the end.
    /// Categories missing from `selections` run all their tools.
    pub async fn run_all(
        &mut self,
        cwd: &Path,
        selections: &HashMap<Category, ToolSelection>,
    ) -> &ResultsModel {
        self.run_all_with_progress(cwd, selections, |_, _| {}).await
    }

    /// Like [`Session::run_all`], calling `progress` after each category with
    /// every raw result gathered so far.
    pub async fn run_all_with_progress<F>(
        &mut self,
        cwd: &Path,
        selections: &HashMap<Category, ToolSelection>,
        mut progress: F,
    ) -> &ResultsModel
    where
        F: FnMut(Category, &[RunResult]),
    {
        let dispatcher = self.dispatcher();
        let mut results = Vec::new();
        for category in Category::ALL {
            let enabled = selections.get(&category).cloned().unwrap_or_default();
            let plan = self.plan(category, cwd, &enabled);
            results.extend(dispatcher.run_category_plan(&plan).await);
            progress(category, &results);
        }
        self.store(apply_ai_fixes(results, cwd, self.ai_mode))
    }

    pub async fn run_provider(&mut self, name: &str, cwd: &Path) -> Result<&ResultsModel> {
        let provider = self
            .providers
            .iter()
            .find(|p| p.name() == name)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownProvider(name.to_string()))?;
        let plan = plan_provider(provider.as_ref(), cwd);
        let results = self.dispatcher().run_category_plan(&plan).await;
        Ok(self.store(apply_ai_fixes(results, cwd, self.ai_mode)))
    }

    pub fn last_results(&self) -> Option<&ResultsModel> {
        self.last.as_ref()
    }

    fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            self.providers.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&self.local),
            self.dispatch,
        )
    }

    fn store(&mut self, model: ResultsModel) -> &ResultsModel {
        self.last.insert(model)
    }
}
