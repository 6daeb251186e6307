use crate::adapters::{self, GenericAdapter};
use codeguard_protocol::Issue;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Everything CodeGuard knows about one tool.
pub trait ToolAdapter: Send + Sync {
    /// Shell line that runs the tool locally and prints machine-readable
    /// output. `None` means the tool cannot run locally.
    fn local_command(&self, args: &Value) -> Option<String>;

    /// Turn captured process output into the tool's intermediate JSON.
    fn parse_output(&self, stdout: &str, stderr: &str) -> serde_json::Result<Value>;

    /// Map a raw response (remote or locally parsed) onto issues. Must not
    /// panic for any input.
    fn normalize(&self, tool: &str, raw: &Value) -> Vec<Issue>;
}

/// Case-insensitive id → adapter table with a generic fallback.
pub struct ToolRegistry {
    adapters: HashMap<String, Arc<dyn ToolAdapter>>,
    fallback: Arc<dyn ToolAdapter>,
}

impl ToolRegistry {
    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
            fallback: Arc::new(GenericAdapter),
        }
    }

    /// Registry with every built-in adapter.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        adapters::register_builtin(&mut registry);
        registry
    }

    /// Register `adapter` under each id, replacing earlier registrations.
    pub fn register<I, S>(&mut self, ids: I, adapter: Arc<dyn ToolAdapter>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for id in ids {
            self.adapters
                .insert(id.as_ref().trim().to_ascii_lowercase(), Arc::clone(&adapter));
        }
    }

    pub fn is_known(&self, tool: &str) -> bool {
        self.adapters.contains_key(&tool.trim().to_ascii_lowercase())
    }

    pub fn adapter(&self, tool: &str) -> &dyn ToolAdapter {
        self.adapters
            .get(&tool.trim().to_ascii_lowercase())
            .unwrap_or(&self.fallback)
            .as_ref()
    }

    pub fn known_tools(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn local_command(&self, tool: &str, args: &Value) -> Option<String> {
        self.adapter(tool).local_command(args)
    }

    /// Parse captured output. Output the adapter cannot parse is passed
    /// through verbatim together with the parse error.
    pub fn parse_output(&self, tool: &str, stdout: &str, stderr: &str) -> Value {
        match self.adapter(tool).parse_output(stdout, stderr) {
            Ok(value) => value,
            Err(err) => {
                log::debug!("Unparseable output from {tool}: {err}");
                json!({
                    "success": !stdout.trim().is_empty(),
                    "output": stdout,
                    "error": stderr,
                    "parseError": err.to_string(),
                })
            }
        }
    }

    pub fn normalize(&self, tool: &str, raw: &Value) -> Vec<Issue> {
        self.adapter(tool).normalize(tool, raw)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.known_tools())
            .finish()
    }
}

/// Shared registry of built-in adapters.
pub fn builtin_registry() -> &'static ToolRegistry {
    static REGISTRY: OnceLock<ToolRegistry> = OnceLock::new();
    REGISTRY.get_or_init(ToolRegistry::builtin)
}
