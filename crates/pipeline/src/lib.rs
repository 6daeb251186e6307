//! # CodeGuard Pipeline
//!
//! Turns discovered providers into results:
//!
//! ```text
//! providers ──> plan_category ──> [ExecutionRequest] ──> Dispatcher ──> [RunResult]
//!                (mutators first)                          │  remote run
//!                                                          │  └─> local fallback
//!                                                          ▼
//!                                               apply_ai_fixes ──> ResultsModel
//! ```
//!
//! Planning, dispatch and the AI pass take all inputs as parameters. The
//! only mutable state lives in [`Session`], owned by the host.

mod ai_fixer;
mod dispatcher;
mod error;
mod planner;
mod session;

pub use ai_fixer::{apply_ai_fixes, AI_SUGGESTION, SAFE_FIX_DESCRIPTION};
pub use dispatcher::{DispatchConfig, Dispatcher, LocalExecutor};
pub use error::{PipelineError, Result};
pub use planner::{plan_category, plan_provider, ToolSelection};
pub use session::Session;
