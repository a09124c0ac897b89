//! Key-value store holding the client registry.

use std::time::Duration;

use duration_str::deserialize_duration;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Process-local store. State is lost on restart.
    Memory(MemoryConfig),
    /// Shared redis instance.
    Redis(RedisConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Redis(RedisConfig::default())
    }
}

/// The memory store takes no settings.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RedisConfig {
    pub url: String,
    /// Prepended to every key written by the registry.
    pub key_prefix: String,
    pub pool: RedisPoolConfig,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://redis:6379/0".to_string(),
            key_prefix: "vpn:".to_string(),
            pool: RedisPoolConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RedisPoolConfig {
    pub max_size: usize,
    /// How long to wait for a free connection.
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for RedisPoolConfig {
    fn default() -> Self {
        Self {
            max_size: 16,
            timeout: Duration::from_secs(5),
        }
    }
}
