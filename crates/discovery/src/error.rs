use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiscoveryError>;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid server URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Server returned invalid capabilities response")]
    MissingCapabilities,

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Unknown capability '{capability}' on provider '{provider}'")]
    UnknownCapability { provider: String, capability: String },
}

impl DiscoveryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}
