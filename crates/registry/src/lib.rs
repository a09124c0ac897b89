//! The authoritative record of provisioned clients.
//!
//! A client exists when its name is in the membership set. Its metadata
//! (creation time and protocol) lives next to it in the store. Backend file
//! state never decides whether a client exists.

mod admin;
mod error;
mod identity;
mod storage;

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use config::StorageConfig;
use secrecy::{ExposeSecret, SecretString};

pub use admin::{hash_password, verify_password};
pub use error::{RegistryError, StoreError};
pub use identity::{ClientIdentity, ClientName, NameError, Protocol};
pub use storage::{Fields, MemoryStorage, RedisStorage, RegistryStorage};

use admin::FIELD_PASSWORD;
use storage::TracedStorage;

/// Shared handle to the registry. Cloning is cheap.
#[derive(Clone)]
pub struct Registry {
    storage: Arc<dyn RegistryStorage>,
}

/// A provisioning claim on a client name, held until released or expired.
#[derive(Debug)]
pub struct Reservation {
    name: ClientName,
    token: String,
}

impl Registry {
    pub fn new(storage: impl RegistryStorage + 'static) -> Self {
        Self {
            storage: Arc::new(TracedStorage::new(Box::new(storage))),
        }
    }

    pub async fn from_config(config: &StorageConfig) -> Result<Self, StoreError> {
        match config {
            StorageConfig::Memory(_) => {
                log::warn!("using the in-memory store, clients are lost on restart");
                Ok(Self::new(MemoryStorage::new()))
            }
            StorageConfig::Redis(redis) => {
                let storage = RedisStorage::connect(redis).await?;
                Ok(Self::new(storage))
            }
        }
    }

    /// Short label of the backing store.
    pub fn store_kind(&self) -> &'static str {
        self.storage.kind()
    }

    pub async fn exists(&self, name: &ClientName) -> Result<bool, RegistryError> {
        Ok(self.storage.contains(name.as_str()).await?)
    }

    /// Names of all registered clients.
    ///
    /// Members that are not valid client names are left out.
    pub async fn list(&self) -> Result<BTreeSet<ClientName>, RegistryError> {
        let members = self.storage.members().await?;

        let names = members
            .into_iter()
            .filter_map(|member| match member.parse::<ClientName>() {
                Ok(name) => Some(name),
                Err(e) => {
                    log::warn!("skipping registry member: {e}");
                    None
                }
            })
            .collect();

        Ok(names)
    }

    /// The stored identity of `name`.
    ///
    /// A member whose metadata is missing or unreadable is reported as not found.
    pub async fn get(&self, name: &ClientName) -> Result<ClientIdentity, RegistryError> {
        let not_found = || RegistryError::NotFound(name.to_string());

        let fields = self.storage.load(name.as_str()).await?.ok_or_else(not_found)?;

        match ClientIdentity::from_fields(name.clone(), &fields) {
            Some(identity) => Ok(identity),
            None => {
                log::warn!("client '{name}' is registered without readable metadata");
                Err(not_found())
            }
        }
    }

    /// Every registered client with readable metadata, ordered by name.
    pub async fn identities(&self) -> Result<Vec<ClientIdentity>, RegistryError> {
        let mut identities = Vec::new();

        for name in self.list().await? {
            match self.get(&name).await {
                Ok(identity) => identities.push(identity),
                Err(RegistryError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(identities)
    }

    /// Adds the name to the membership set together with its metadata.
    pub async fn insert(&self, identity: &ClientIdentity) -> Result<(), RegistryError> {
        let name = identity.name.as_str();

        if self.storage.insert(name, &identity.to_fields()).await? {
            log::debug!("registered client '{name}' ({})", identity.protocol);
            Ok(())
        } else {
            Err(RegistryError::AlreadyExists(name.to_string()))
        }
    }

    /// Removes the name and its metadata. Absent names are not an error.
    pub async fn remove(&self, name: &ClientName) -> Result<(), RegistryError> {
        self.storage.remove(name.as_str()).await?;
        log::debug!("removed client '{name}' from the registry");

        Ok(())
    }

    /// Claims `name` for provisioning. `None` while someone else holds the claim.
    pub async fn reserve(&self, name: &ClientName, ttl: Duration) -> Result<Option<Reservation>, RegistryError> {
        let token = format!("{:016x}", rand::random::<u64>());

        if !self.storage.reserve(name.as_str(), &token, ttl).await? {
            return Ok(None);
        }

        Ok(Some(Reservation {
            name: name.clone(),
            token,
        }))
    }

    pub async fn release(&self, reservation: Reservation) -> Result<(), RegistryError> {
        self.storage
            .release(reservation.name.as_str(), &reservation.token)
            .await?;

        Ok(())
    }

    /// Stores a password hash for `username` unless the user already has one.
    ///
    /// Returns `true` when a new credential was written.
    pub async fn ensure_admin(&self, username: &str, password: &SecretString) -> Result<bool, RegistryError> {
        if self.storage.user_field(username, FIELD_PASSWORD).await?.is_some() {
            return Ok(false);
        }

        let password = password.expose_secret().to_string();

        let hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| RegistryError::Password(format!("password hashing task failed: {e}")))??;

        Ok(self
            .storage
            .set_user_field_if_absent(username, FIELD_PASSWORD, &hash)
            .await?)
    }

    /// Checks a credential against the stored hash of `username`.
    pub async fn verify_admin(&self, username: &str, password: &str) -> Result<bool, RegistryError> {
        let Some(hash) = self.storage.user_field(username, FIELD_PASSWORD).await? else {
            return Ok(false);
        };

        let password = password.to_string();

        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| RegistryError::Password(format!("password verification task failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use insta::assert_debug_snapshot;
    use secrecy::SecretString;

    use crate::{ClientIdentity, ClientName, MemoryStorage, Protocol, Registry, RegistryError, RegistryStorage};

    fn name(value: &str) -> ClientName {
        value.parse().unwrap()
    }

    fn identity(value: &str, protocol: Protocol) -> ClientIdentity {
        ClientIdentity {
            name: name(value),
            protocol,
            created_at: "2024-05-01T10:00:00Z".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn insert_then_get() {
        let registry = Registry::new(MemoryStorage::new());
        let alice = identity("alice", Protocol::OpenVpn);

        registry.insert(&alice).await.unwrap();

        assert!(registry.exists(&name("alice")).await.unwrap());
        assert_eq!(registry.get(&name("alice")).await.unwrap(), alice);
    }

    #[tokio::test]
    async fn duplicate_insert_keeps_first_identity() {
        let registry = Registry::new(MemoryStorage::new());

        registry.insert(&identity("alice", Protocol::OpenVpn)).await.unwrap();
        let error = registry.insert(&identity("alice", Protocol::V2Ray)).await.unwrap_err();

        assert!(matches!(error, RegistryError::AlreadyExists(ref name) if name == "alice"));
        assert_eq!(registry.get(&name("alice")).await.unwrap().protocol, Protocol::OpenVpn);
    }

    #[tokio::test]
    async fn get_unknown_client() {
        let registry = Registry::new(MemoryStorage::new());
        let error = registry.get(&name("ghost")).await.unwrap_err();

        assert!(matches!(error, RegistryError::NotFound(_)));
    }

    #[tokio::test]
    async fn remove_clears_membership_and_metadata() {
        let registry = Registry::new(MemoryStorage::new());

        registry.insert(&identity("alice", Protocol::Shadowsocks)).await.unwrap();
        registry.remove(&name("alice")).await.unwrap();
        registry.remove(&name("alice")).await.unwrap();

        assert!(!registry.exists(&name("alice")).await.unwrap());
        assert!(registry.list().await.unwrap().is_empty());
        assert!(matches!(
            registry.get(&name("alice")).await.unwrap_err(),
            RegistryError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn identities_skip_unreadable_members() {
        let storage = MemoryStorage::new();

        storage.insert("bad name", &[("protocol", "openvpn".to_string())]).await.unwrap();
        storage.insert("broken", &[("protocol", "ipsec".to_string())]).await.unwrap();
        storage.insert("empty", &[]).await.unwrap();

        let registry = Registry::new(storage);

        registry.insert(&identity("bob", Protocol::V2Ray)).await.unwrap();
        registry.insert(&identity("alice", Protocol::OpenVpn)).await.unwrap();

        let names: Vec<_> = registry.list().await.unwrap().into_iter().map(|n| n.to_string()).collect();

        assert_debug_snapshot!(names, @r#"
        [
            "alice",
            "bob",
            "broken",
            "empty",
        ]
        "#);

        let identities: Vec<_> = registry
            .identities()
            .await
            .unwrap()
            .into_iter()
            .map(|identity| format!("{} {} {}", identity.name, identity.protocol, identity.created_at))
            .collect();

        assert_debug_snapshot!(identities, @r#"
        [
            "alice openvpn 2024-05-01T10:00:00Z",
            "bob v2ray 2024-05-01T10:00:00Z",
        ]
        "#);
    }

    #[tokio::test]
    async fn reservation_is_exclusive() {
        let registry = Registry::new(MemoryStorage::new());
        let ttl = Duration::from_secs(60);

        let held = registry.reserve(&name("alice"), ttl).await.unwrap().unwrap();
        assert!(registry.reserve(&name("alice"), ttl).await.unwrap().is_none());
        assert!(registry.reserve(&name("bob"), ttl).await.unwrap().is_some());

        registry.release(held).await.unwrap();
        assert!(registry.reserve(&name("alice"), ttl).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn admin_is_bootstrapped_once() {
        let registry = Registry::new(MemoryStorage::new());

        let first = SecretString::from("s3cret".to_string());
        let second = SecretString::from("other".to_string());

        assert!(registry.ensure_admin("admin", &first).await.unwrap());
        assert!(!registry.ensure_admin("admin", &second).await.unwrap());

        assert!(registry.verify_admin("admin", "s3cret").await.unwrap());
        assert!(!registry.verify_admin("admin", "other").await.unwrap());
        assert!(!registry.verify_admin("root", "s3cret").await.unwrap());
    }
}
