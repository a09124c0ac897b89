use std::{path::PathBuf, time::Duration};

use duration_str::deserialize_duration;
use serde::Deserialize;

/// Backend commands used to issue and revoke per-client credentials.
///
/// Commands are argument vectors, never shell strings. `{name}` inside any
/// argument is replaced by the validated client name.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisioningConfig {
    pub issue: Vec<String>,
    pub revoke: Vec<String>,
    pub artifacts: ArtifactsConfig,
    /// Lifetime of the in-store claim held while a client is being provisioned.
    #[serde(deserialize_with = "deserialize_duration")]
    pub reservation_ttl: Duration,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            issue: argv(&[
                "docker",
                "exec",
                "openvpn-server",
                "/usr/local/bin/generate-client.sh",
                "{name}",
            ]),
            revoke: argv(&[
                "docker",
                "exec",
                "openvpn-server",
                "/usr/local/share/easy-rsa/easyrsa",
                "--batch",
                "revoke",
                "{name}",
            ]),
            artifacts: ArtifactsConfig::default(),
            reservation_ttl: Duration::from_secs(60),
        }
    }
}

/// Where the certificate backend writes per-client configuration files.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactsConfig {
    pub directory: PathBuf,
    pub extension: String,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("/etc/openvpn/client"),
            extension: "ovpn".to_string(),
        }
    }
}

pub(crate) fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}
