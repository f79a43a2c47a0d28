use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("LOCK_CONFLICT: {0}")]
    LockConflict(String),
    #[error("LOCK_EXPIRED: {0}")]
    LockExpired(String),
    #[error("PERMISSION_DENIED: {0}")]
    PermissionDenied(String),
    #[error("VALIDATION: {0}")]
    Validation(String),
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("CONFLICT: {0}")]
    Conflict(String),
    #[error("TRANSPORT: {0}")]
    Transport(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<anyhow::Error> for ClientError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
