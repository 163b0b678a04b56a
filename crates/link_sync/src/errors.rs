use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinkSyncError {
    #[error("Graph store error: {0}")]
    Store(String),
    #[error("Signature verification failed: {0}")]
    Verification(String),
    #[error("Signing failed: {0}")]
    Signing(String),
    #[error("Adapter is not bound to a store yet")]
    NotBound,
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error("Internal error: {0}")]
    InternalError(&'static str),
}

pub type LinkSyncResult<T> = Result<T, LinkSyncError>;
