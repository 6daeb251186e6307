use anyhow::{bail, Context, Result};
use codeguard_discovery::{DiscoveryConfig, ServerConfig};
use codeguard_pipeline::{DispatchConfig, ToolSelection};
use codeguard_protocol::{AiMode, Category};
use codeguard_tools::{CommandAdapter, LocalConfig, ToolRegistry};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const CONFIG_FILE: &str = "codeguard.toml";
pub const ENV_CONFIG: &str = "CODEGUARD_CONFIG";
pub const ENV_PREFER_REMOTE: &str = "CODEGUARD_PREFER_REMOTE";
pub const ENV_AI_MODE: &str = "CODEGUARD_AI_MODE";

/// Contents of `codeguard.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub prefer_remote: bool,
    pub ai_mode: AiMode,
    pub discovery_timeout_ms: u64,
    pub run_timeout_ms: u64,
    pub max_output_bytes: usize,
    pub reader_concurrency: usize,
    pub servers: Vec<ServerConfig>,
    /// Category name → enabled capability ids.
    pub tools: BTreeMap<String, Vec<String>>,
    /// Extra locally runnable tools: id → shell command printing
    /// `{"issues": [...]}` JSON.
    pub local_commands: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefer_remote: true,
            ai_mode: AiMode::default(),
            discovery_timeout_ms: 5_000,
            run_timeout_ms: 60_000,
            max_output_bytes: 1024 * 1024,
            reader_concurrency: 1,
            servers: Vec::new(),
            tools: BTreeMap::new(),
            local_commands: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load from `explicit`, else `$CODEGUARD_CONFIG`, else
    /// `<root>/codeguard.toml`. Only the implicit default file may be
    /// missing.
    pub fn load(explicit: Option<&Path>, root: &Path) -> Result<Self> {
        let requested = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(ENV_CONFIG).map(PathBuf::from));
        let path = match requested {
            Some(path) => path,
            None => {
                let default = root.join(CONFIG_FILE);
                if !default.exists() {
                    log::debug!("No {CONFIG_FILE} in {}; using defaults", root.display());
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.selections()?;
        let mut names = HashSet::new();
        for server in &config.servers {
            if !names.insert(server.name.as_str()) {
                bail!("[[servers]] name '{}' is used more than once", server.name);
            }
        }
        Ok(config)
    }

    /// Apply `CODEGUARD_PREFER_REMOTE` / `CODEGUARD_AI_MODE` overrides.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = lookup(ENV_PREFER_REMOTE) {
            self.prefer_remote = parse_bool(&raw)
                .with_context(|| format!("{ENV_PREFER_REMOTE}={raw} is not a boolean"))?;
        }
        if let Some(raw) = lookup(ENV_AI_MODE) {
            self.ai_mode = raw
                .parse::<AiMode>()
                .with_context(|| format!("{ENV_AI_MODE}={raw} is not an AI mode"))?;
        }
        Ok(())
    }

    pub fn selections(&self) -> Result<HashMap<Category, ToolSelection>> {
        self.tools
            .iter()
            .map(|(category, ids)| {
                let category: Category = category
                    .parse()
                    .with_context(|| format!("[tools] has unknown category '{category}'"))?;
                Ok::<_, anyhow::Error>((category, ToolSelection::from_ids(ids.iter().cloned())))
            })
            .collect()
    }

    pub fn selection(&self, category: Category) -> Result<ToolSelection> {
        Ok(self.selections()?.remove(&category).unwrap_or_default())
    }

    pub fn registry(&self) -> ToolRegistry {
        let mut registry = ToolRegistry::builtin();
        for (id, command) in &self.local_commands {
            registry.register([id], Arc::new(CommandAdapter::new(command.clone())));
        }
        registry
    }

    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            probe_timeout: Duration::from_millis(self.discovery_timeout_ms),
            run_timeout: Duration::from_millis(self.run_timeout_ms),
        }
    }

    pub fn local_config(&self) -> LocalConfig {
        LocalConfig {
            timeout: Duration::from_millis(self.run_timeout_ms),
            max_output_bytes: self.max_output_bytes,
        }
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            prefer_remote: self.prefer_remote,
            reader_concurrency: self.reader_concurrency.max(1),
        }
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("expected true/false"),
    }
}
