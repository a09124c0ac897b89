//! Client lifecycle operations on top of the registry and the command gateway.
//!
//! Every entry point takes raw operator input, validates the client name
//! before touching the store or a backend, and reports failures as a
//! [`CoordinatorError`].

mod artifact;
mod dispatch;
mod error;
mod revoke;
mod status;

use std::{collections::BTreeMap, sync::Arc};

use config::Config;
use gateway::{CommandGateway, TemplateError};
use registry::{ClientIdentity, ClientName, Registry};
use serde::Serialize;

pub use artifact::Artifact;
pub use error::CoordinatorError;
pub use revoke::Revocation;
pub use status::ServiceStatus;

use artifact::ArtifactStore;
use dispatch::Dispatcher;
use revoke::Revoker;
use status::StatusAggregator;

/// Host overview for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub uptime: String,
    pub total_clients: usize,
    pub services: BTreeMap<String, ServiceStatus>,
}

pub struct Coordinator {
    registry: Registry,
    status: StatusAggregator,
    dispatcher: Dispatcher,
    artifacts: ArtifactStore,
    revoker: Revoker,
}

impl Coordinator {
    pub fn new(config: &Config, registry: Registry, gateway: Arc<dyn CommandGateway>) -> Result<Self, TemplateError> {
        Ok(Self {
            status: StatusAggregator::new(gateway.clone(), &config.status, &config.services)?,
            dispatcher: Dispatcher::new(registry.clone(), gateway.clone(), &config.provisioning)?,
            artifacts: ArtifactStore::new(registry.clone(), &config.provisioning.artifacts),
            revoker: Revoker::new(registry.clone(), gateway, &config.provisioning)?,
            registry,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// All clients with readable metadata, ordered by name.
    pub async fn list_clients(&self) -> Result<Vec<ClientIdentity>, CoordinatorError> {
        Ok(self.registry.identities().await?)
    }

    pub async fn get_client(&self, name: &str) -> Result<ClientIdentity, CoordinatorError> {
        let name: ClientName = name.parse()?;
        Ok(self.registry.get(&name).await?)
    }

    pub async fn create_client(&self, name: &str, protocol: &str) -> Result<ClientIdentity, CoordinatorError> {
        let name: ClientName = name.parse()?;
        self.dispatcher.provision(&name, protocol).await
    }

    pub async fn fetch_artifact(&self, name: &str) -> Result<Artifact, CoordinatorError> {
        let name: ClientName = name.parse()?;
        self.artifacts.fetch(&name).await
    }

    pub async fn delete_client(&self, name: &str) -> Result<Revocation, CoordinatorError> {
        let name: ClientName = name.parse()?;
        self.revoker.revoke(&name).await
    }

    pub async fn service_statuses(&self) -> BTreeMap<String, ServiceStatus> {
        self.status.statuses().await
    }

    pub async fn stats(&self) -> Result<Stats, CoordinatorError> {
        let (uptime, services, clients) = futures::join!(
            self.status.uptime(),
            self.status.statuses(),
            self.registry.list(),
        );

        Ok(Stats {
            uptime,
            total_clients: clients?.len(),
            services,
        })
    }
}
