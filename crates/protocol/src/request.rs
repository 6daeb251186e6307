use crate::category::Category;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// One runnable analysis/fix action exposed by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub id: String,
    pub category: Category,
    /// True when running the capability may modify files on disk.
    #[serde(default)]
    pub mutates: bool,
    /// Supported commands; the first one is the default.
    pub commands: Vec<String>,
}

impl Capability {
    pub fn new<I, S>(id: impl Into<String>, category: Category, mutates: bool, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            category,
            mutates,
            commands: commands.into_iter().map(Into::into).collect(),
        }
    }

    pub fn default_command(&self) -> Option<&str> {
        self.commands.first().map(String::as_str)
    }
}

/// One planned invocation of a capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    /// Provider that advertised the capability.
    pub provider: String,
    pub tool: String,
    pub command: String,
    pub cwd: PathBuf,
    pub mutates: bool,
    /// Free-form tool configuration; always carries `workingDirectory` and
    /// `category`.
    pub args: Map<String, Value>,
}

impl ExecutionRequest {
    pub fn new(
        provider: impl Into<String>,
        capability: &Capability,
        command: impl Into<String>,
        cwd: impl Into<PathBuf>,
    ) -> Self {
        let cwd = cwd.into();
        let mut args = Map::new();
        args.insert(
            "workingDirectory".to_string(),
            Value::String(cwd.to_string_lossy().into_owned()),
        );
        args.insert(
            "category".to_string(),
            Value::String(capability.category.as_str().to_string()),
        );
        Self {
            provider: provider.into(),
            tool: capability.id.clone(),
            command: command.into(),
            cwd,
            mutates: capability.mutates,
            args,
        }
    }

    pub fn args_value(&self) -> Value {
        Value::Object(self.args.clone())
    }
}
