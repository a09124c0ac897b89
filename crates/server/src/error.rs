use registry::StoreError;

/// Failures that stop the server from starting or running.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to bind to address: {0}")]
    Bind(#[source] std::io::Error),

    #[error("Server error: {0}")]
    Server(#[source] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Failed to open the client store: {0}")]
    Store(#[from] StoreError),

    #[error("Startup failed: {0}")]
    Bootstrap(String),
}
