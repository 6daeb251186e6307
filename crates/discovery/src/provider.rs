use crate::error::Result;
use async_trait::async_trait;
use codeguard_protocol::{Capability, Category};
use serde_json::{json, Value};
use std::sync::Arc;

/// A source of capabilities: a remote server or a built-in stand-in.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> &[Capability];

    /// Run one capability and return its raw, tool-specific response.
    async fn run(&self, capability_id: &str, command: &str, args: &Value) -> Result<Value>;

    fn capability(&self, id: &str) -> Option<&Capability> {
        self.capabilities().iter().find(|c| c.id == id)
    }
}

/// Offline provider used when no server answers. Every run succeeds with
/// an empty report.
#[derive(Debug, Clone)]
pub struct BuiltinProvider {
    name: String,
    capabilities: Vec<Capability>,
    message: String,
}

impl BuiltinProvider {
    pub fn new(name: impl Into<String>, capabilities: Vec<Capability>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities,
            message: message.into(),
        }
    }
}

#[async_trait]
impl Provider for BuiltinProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    async fn run(&self, _capability_id: &str, _command: &str, _args: &Value) -> Result<Value> {
        Ok(json!({
            "success": true,
            "issues": [],
            "fixed": 0,
            "message": self.message,
        }))
    }
}

/// The built-in ESLint and Prettier stand-ins.
pub fn builtin_providers() -> Vec<Arc<dyn Provider>> {
    vec![
        Arc::new(BuiltinProvider::new(
            "mock-eslint",
            vec![Capability::new("eslint", Category::Linting, true, ["lint", "fix"])],
            "Built-in ESLint stand-in (configure MCP servers in codeguard.toml)",
        )),
        Arc::new(BuiltinProvider::new(
            "mock-prettier",
            vec![Capability::new("prettier", Category::Formatting, true, ["format"])],
            "Built-in Prettier stand-in (configure MCP servers in codeguard.toml)",
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builtin_run_reports_nothing() {
        let providers = builtin_providers();
        assert_eq!(providers.len(), 2);
        assert_eq!(providers[0].name(), "mock-eslint");
        assert_eq!(providers[0].capability("eslint").map(|c| c.mutates), Some(true));

        let raw = providers[1].run("prettier", "format", &json!({})).await.unwrap();
        assert_eq!(raw["success"], true);
        assert_eq!(raw["issues"], json!([]));
        assert_eq!(raw["fixed"], 0);
    }
}
