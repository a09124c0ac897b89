use std::{collections::BTreeMap, sync::Arc};

use config::{ServiceConfig, StatusConfig};
use gateway::{CommandGateway, CommandOutput, CommandTemplate, TemplateError};
use serde::Serialize;

/// Observed state of one backend service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ServiceStatus {
    /// The query succeeded and printed something.
    Running,
    /// The query succeeded and printed nothing.
    Stopped,
    /// The query itself failed.
    Unknown,
}

impl From<&CommandOutput> for ServiceStatus {
    fn from(output: &CommandOutput) -> Self {
        match (output.succeeded, output.stdout.trim().is_empty()) {
            (true, false) => ServiceStatus::Running,
            (true, true) => ServiceStatus::Stopped,
            (false, _) => ServiceStatus::Unknown,
        }
    }
}

/// Asks the gateway about each configured service. Nothing is cached.
pub(crate) struct StatusAggregator {
    gateway: Arc<dyn CommandGateway>,
    query: CommandTemplate,
    uptime: CommandTemplate,
    services: BTreeMap<String, ServiceConfig>,
}

impl StatusAggregator {
    pub fn new(
        gateway: Arc<dyn CommandGateway>,
        config: &StatusConfig,
        services: &BTreeMap<String, ServiceConfig>,
    ) -> Result<Self, TemplateError> {
        Ok(Self {
            gateway,
            query: CommandTemplate::new(&config.query)?,
            uptime: CommandTemplate::new(&config.uptime)?,
            services: services.clone(),
        })
    }

    pub async fn status(&self, container: &str) -> ServiceStatus {
        let command = self.query.render(&[("service", container)]);
        let output = self.gateway.execute(&command).await;

        let status = ServiceStatus::from(&output);

        if status == ServiceStatus::Unknown {
            log::debug!("status query for '{container}' failed: {}", output.stderr.trim());
        }

        status
    }

    /// Status of every configured service, keyed by service name.
    ///
    /// Queries run concurrently and a failed query only affects its own entry.
    pub async fn statuses(&self) -> BTreeMap<String, ServiceStatus> {
        let lookups = self.services.iter().map(|(name, service)| async move {
            let status = self.status(&service.container).await;
            (name.clone(), status)
        });

        futures::future::join_all(lookups).await.into_iter().collect()
    }

    /// Host uptime as printed by the uptime command, empty when it fails.
    pub async fn uptime(&self) -> String {
        let output = self.gateway.execute(&self.uptime.render(&[])).await;

        if output.succeeded {
            output.stdout.trim().to_string()
        } else {
            log::debug!("uptime query failed: {}", output.stderr.trim());
            String::new()
        }
    }
}
