//! # CodeGuard Tools
//!
//! Tool adapter layer: how each known quality tool is launched locally, how
//! its raw output is parsed, and how the parsed (or remotely returned)
//! response is normalized into [`Issue`] records.
//!
//! ## Architecture
//!
//! ```text
//! tool id ──> ToolRegistry ──> ToolAdapter { local_command, parse_output, normalize }
//!                  │
//!                  └─> unknown ids fall through to the generic adapter
//!
//! ProcessExecutor::run_local(tool, args, cwd)
//!     ├─> registry.local_command      (shell line)
//!     ├─> sh -c <line>                (timeout, output cap)
//!     └─> registry.parse_output       (tool-specific intermediate JSON)
//! ```
//!
//! Normalization is pure and total: any input yields a (possibly empty)
//! list of issues whose severity is always error, warning or info.

mod adapters;
mod error;
mod local;
mod registry;
mod value;

pub use adapters::CommandAdapter;
pub use error::{Result, ToolError};
pub use local::{builtin_local_command, LocalConfig, ProcessExecutor};
pub use registry::{builtin_registry, ToolAdapter, ToolRegistry};

use codeguard_protocol::Issue;
use serde_json::Value;

/// Normalize a raw tool response with the built-in registry.
pub fn normalize(tool: &str, raw: &Value) -> Vec<Issue> {
    builtin_registry().normalize(tool, raw)
}
