use registry::{NameError, RegistryError, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    InvalidName(#[from] NameError),
    #[error("client '{0}' not found")]
    NotFound(String),
    #[error("client '{0}' already exists")]
    AlreadyExists(String),
    #[error("unsupported protocol '{0}', expected one of: openvpn, shadowsocks, v2ray")]
    Protocol(String),
    /// The backend command failed or timed out. Carries its captured stderr.
    #[error("backend command failed: {stderr}")]
    Backend { stderr: String },
    #[error(transparent)]
    Store(StoreError),
    #[error("failed to read client artifact: {0}")]
    Artifact(#[source] std::io::Error),
}

impl From<RegistryError> for CoordinatorError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::AlreadyExists(name) => CoordinatorError::AlreadyExists(name),
            RegistryError::NotFound(name) => CoordinatorError::NotFound(name),
            RegistryError::Store(error) => CoordinatorError::Store(error),
            RegistryError::Password(message) => CoordinatorError::Store(StoreError::Internal(message)),
        }
    }
}
