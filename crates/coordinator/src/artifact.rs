use std::{io, path::PathBuf};

use config::ArtifactsConfig;
use registry::{ClientName, Registry};

use crate::CoordinatorError;

/// A per-client credential file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Download name, `<client>.<extension>`.
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Reads credential files written by the certificate backend.
pub(crate) struct ArtifactStore {
    registry: Registry,
    directory: PathBuf,
    extension: String,
}

impl ArtifactStore {
    pub fn new(registry: Registry, config: &ArtifactsConfig) -> Self {
        Self {
            registry,
            directory: config.directory.clone(),
            extension: config.extension.clone(),
        }
    }

    fn file_name(&self, name: &ClientName) -> String {
        format!("{name}.{}", self.extension)
    }

    pub async fn fetch(&self, name: &ClientName) -> Result<Artifact, CoordinatorError> {
        let identity = self.registry.get(name).await?;

        // Shared-secret protocols never get a file of their own.
        if !identity.protocol.is_certificate_based() {
            return Err(CoordinatorError::NotFound(name.to_string()));
        }

        let file_name = self.file_name(name);
        let path = self.directory.join(&file_name);

        match tokio::fs::read(&path).await {
            Ok(content) => Ok(Artifact { file_name, content }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::warn!("client '{name}' is registered but {} does not exist", path.display());
                Err(CoordinatorError::NotFound(name.to_string()))
            }
            Err(e) => Err(CoordinatorError::Artifact(e)),
        }
    }
}
