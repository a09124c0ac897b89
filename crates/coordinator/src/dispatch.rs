use std::{sync::Arc, time::Duration};

use config::ProvisioningConfig;
use gateway::{CommandGateway, CommandTemplate, TemplateError};
use registry::{ClientIdentity, ClientName, Protocol, Registry};

use crate::CoordinatorError;

/// Creates per-protocol credentials and commits the identity afterwards.
pub(crate) struct Dispatcher {
    registry: Registry,
    gateway: Arc<dyn CommandGateway>,
    issue: CommandTemplate,
    reservation_ttl: Duration,
}

impl Dispatcher {
    pub fn new(
        registry: Registry,
        gateway: Arc<dyn CommandGateway>,
        config: &ProvisioningConfig,
    ) -> Result<Self, TemplateError> {
        Ok(Self {
            registry,
            gateway,
            issue: CommandTemplate::new(&config.issue)?,
            reservation_ttl: config.reservation_ttl,
        })
    }

    /// Provisions `name` for `protocol`.
    ///
    /// The registry is written only after the backend confirmed the
    /// credential. While the attempt runs the name is reserved in the store,
    /// so a concurrent attempt for the same name fails with `AlreadyExists`
    /// before it reaches the backend.
    pub async fn provision(&self, name: &ClientName, protocol: &str) -> Result<ClientIdentity, CoordinatorError> {
        if self.registry.exists(name).await? {
            return Err(CoordinatorError::AlreadyExists(name.to_string()));
        }

        let protocol: Protocol = protocol
            .parse()
            .map_err(|_| CoordinatorError::Protocol(protocol.to_string()))?;

        let Some(reservation) = self.registry.reserve(name, self.reservation_ttl).await? else {
            log::debug!("client '{name}' is already being provisioned");
            return Err(CoordinatorError::AlreadyExists(name.to_string()));
        };

        let result = self.provision_reserved(name, protocol).await;

        if let Err(e) = self.registry.release(reservation).await {
            // the claim expires on its own
            log::warn!("failed to release the provisioning claim for '{name}': {e}");
        }

        result
    }

    async fn provision_reserved(&self, name: &ClientName, protocol: Protocol) -> Result<ClientIdentity, CoordinatorError> {
        // The first check ran before the claim was taken.
        if self.registry.exists(name).await? {
            return Err(CoordinatorError::AlreadyExists(name.to_string()));
        }

        self.issue(name, protocol).await?;

        let identity = ClientIdentity::new(name.clone(), protocol);
        self.registry.insert(&identity).await?;

        log::info!("provisioned client '{name}' ({protocol})");

        Ok(identity)
    }

    async fn issue(&self, name: &ClientName, protocol: Protocol) -> Result<(), CoordinatorError> {
        match protocol {
            Protocol::OpenVpn => {
                let command = self.issue.render(&[("name", name.as_str())]);
                let output = self.gateway.execute(&command).await;

                if output.succeeded {
                    Ok(())
                } else {
                    log::warn!("certificate issuance for '{name}' failed: {}", output.stderr.trim());

                    Err(CoordinatorError::Backend { stderr: output.stderr })
                }
            }
            // Shared secrets, nothing to create per client.
            Protocol::Shadowsocks | Protocol::V2Ray => Ok(()),
        }
    }
}
