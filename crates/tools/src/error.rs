use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolError>;

/// Local execution failures. A tool that ran and reported findings through a
/// non-zero exit code is not an error; its output is parsed normally.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Local execution not supported for tool: {0}")]
    Unsupported(String),

    #[error("Tool '{0}' not found. Please install it first.")]
    NotFound(String),

    #[error("Tool '{tool}' timed out after {timeout_ms}ms")]
    Timeout { tool: String, timeout_ms: u64 },

    #[error("Tool '{tool}' produced more than {limit} bytes of output")]
    OutputTooLarge { tool: String, limit: usize },

    #[error("Tool '{tool}' failed ({status}) without output")]
    Failed { tool: String, status: String },

    #[error("Working directory does not exist: {0}")]
    InvalidWorkingDirectory(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// True when the user can fix the failure by installing the tool.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
