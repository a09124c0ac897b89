/// Failure talking to the backing key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store connection error: {0}")]
    Connection(String),
    #[error("store query error: {0}")]
    Query(String),
    #[error("internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Short label used in traces and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Connection(_) => "connection_error",
            StoreError::Query(_) => "query_error",
            StoreError::Internal(_) => "internal_error",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("client '{0}' already exists")]
    AlreadyExists(String),
    #[error("client '{0}' not found")]
    NotFound(String),
    #[error("{0}")]
    Password(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
