use std::sync::Arc;

use config::ProvisioningConfig;
use gateway::{CommandGateway, CommandTemplate, TemplateError};
use registry::{ClientName, Registry};
use serde::Serialize;

use crate::CoordinatorError;

/// Outcome of a deletion. The client is gone from the registry in every case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Revocation {
    pub name: ClientName,
    /// Set when the backend revocation failed and the certificate may still be valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub(crate) struct Revoker {
    registry: Registry,
    gateway: Arc<dyn CommandGateway>,
    revoke: CommandTemplate,
}

impl Revoker {
    pub fn new(
        registry: Registry,
        gateway: Arc<dyn CommandGateway>,
        config: &ProvisioningConfig,
    ) -> Result<Self, TemplateError> {
        Ok(Self {
            registry,
            gateway,
            revoke: CommandTemplate::new(&config.revoke)?,
        })
    }

    /// Revokes the certificate of `name` and removes the client.
    ///
    /// The removal does not depend on the backend: a failed revocation is
    /// reported as a warning next to a successful deletion.
    pub async fn revoke(&self, name: &ClientName) -> Result<Revocation, CoordinatorError> {
        if !self.registry.exists(name).await? {
            return Err(CoordinatorError::NotFound(name.to_string()));
        }

        let command = self.revoke.render(&[("name", name.as_str())]);
        let output = self.gateway.execute(&command).await;

        let warning = if output.succeeded {
            None
        } else {
            let stderr = output.stderr.trim();
            log::warn!("certificate revocation for '{name}' failed, removing the client anyway: {stderr}");

            Some(format!("certificate revocation failed: {stderr}"))
        };

        self.registry.remove(name).await?;

        log::info!("deleted client '{name}'");

        Ok(Revocation {
            name: name.clone(),
            warning,
        })
    }
}
