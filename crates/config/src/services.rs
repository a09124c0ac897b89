use std::collections::BTreeMap;

use serde::Deserialize;

use crate::provisioning::argv;

/// Commands used to observe the backends.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatusConfig {
    /// Prints something when `{service}` is live, nothing when it is not.
    pub query: Vec<String>,
    /// Prints the host uptime.
    pub uptime: Vec<String>,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            query: argv(&["docker", "ps", "--filter", "name={service}", "--format", "{{.Status}}"]),
            uptime: argv(&["uptime", "-p"]),
        }
    }
}

/// A backend service shown on the dashboard.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Name the status query matches against.
    pub container: String,
}

pub fn default_services() -> BTreeMap<String, ServiceConfig> {
    [
        ("openvpn", "openvpn-server"),
        ("shadowsocks", "shadowsocks-server"),
        ("v2ray", "v2ray-server"),
        ("stunnel", "stunnel-wrapper"),
        ("dnscrypt", "dnscrypt-proxy"),
        ("dpi-bypass", "dpi-bypass"),
    ]
    .into_iter()
    .map(|(name, container)| {
        (
            name.to_string(),
            ServiceConfig {
                container: container.to_string(),
            },
        )
    })
    .collect()
}
