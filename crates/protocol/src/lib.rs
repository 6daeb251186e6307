//! # CodeGuard Protocol
//!
//! Shared data model for the quality pipeline: capabilities advertised by
//! providers, planned execution requests, normalized issues and the
//! aggregated results handed to presentation.
//!
//! ## Flow
//!
//! ```text
//! Capability[] (per provider)
//!     │
//!     ├──> ExecutionRequest[]   (category plan, mutators first)
//!     │
//!     ├──> RunResult[]          (one per request, issues normalized)
//!     │
//!     └──> ResultsModel         (results + remaining after the AI pass)
//! ```
//!
//! Every type here is plain data. Behaviour lives in `codeguard-tools`,
//! `codeguard-discovery` and `codeguard-pipeline`.

mod category;
mod error;
mod issue;
mod request;
mod result;

pub use category::{AiMode, Category};
pub use error::{ProtocolError, Result};
pub use issue::{Fix, Issue, Severity};
pub use request::{Capability, ExecutionRequest};
pub use result::{Backend, ResultsModel, ResultsSummary, RunResult};

/// Version string used for `clientInfo` and diagnostics.
pub const CODEGUARD_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP protocol revision sent in the `initialize` handshake.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

pub fn serialize_json<T: serde::Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string(value)
}

pub fn serialize_json_pretty<T: serde::Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

/// JSON Schema of [`ResultsModel`], the contract consumed by result views.
pub fn results_schema() -> serde_json::Value {
    let schema = schemars::schema_for!(ResultsModel);
    serde_json::to_value(schema).unwrap_or(serde_json::Value::Null)
}
