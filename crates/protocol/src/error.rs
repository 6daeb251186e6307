use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Unknown category: {0} (expected linting|formatting|testing|security|analysis|dependencies)")]
    UnknownCategory(String),

    #[error("Unknown AI mode: {0} (expected off|safe-only|suggest)")]
    UnknownAiMode(String),
}
