mod admin;
mod loader;
mod provisioning;
mod server;
mod services;
mod store;
mod telemetry;

use std::{collections::BTreeMap, path::Path, time::Duration};

use duration_str::deserialize_duration;
use serde::Deserialize;

pub use admin::AdminConfig;
pub use provisioning::{ArtifactsConfig, ProvisioningConfig};
pub use server::{AuthConfig, HealthConfig, ServerConfig, TlsServerConfig};
pub use services::{ServiceConfig, StatusConfig, default_services};
pub use store::{MemoryConfig, RedisConfig, RedisPoolConfig, StorageConfig};
pub use telemetry::TelemetryConfig;

/// Placeholder replaced by the client name in provisioning commands.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Placeholder replaced by the container name in the status query command.
pub const SERVICE_PLACEHOLDER: &str = "{service}";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StorageConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default = "default_services")]
    pub services: BTreeMap<String, ServiceConfig>,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StorageConfig::default(),
            gateway: GatewayConfig::default(),
            provisioning: ProvisioningConfig::default(),
            status: StatusConfig::default(),
            services: default_services(),
            admin: AdminConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        loader::load(path)
    }
}

/// Settings for the command execution gateway.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// Upper bound for a single external command.
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}
