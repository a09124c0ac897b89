//! Storage backends for the client registry.
//!
//! The backend owns all atomicity. The registry never layers its own locks on
//! top: membership checks, inserts, removals and reservations are each a
//! single atomic operation in the store.

mod memory;
mod redis;
mod tracing;

use std::{collections::HashMap, time::Duration};

pub use memory::MemoryStorage;
pub use redis::RedisStorage;
pub(crate) use tracing::TracedStorage;

use crate::StoreError;

/// Stored metadata of one client, field name to value.
pub type Fields = HashMap<String, String>;

#[async_trait::async_trait]
pub trait RegistryStorage: Send + Sync {
    /// Short backend label, e.g. `redis`.
    fn kind(&self) -> &'static str;

    /// Whether `name` is in the membership set.
    async fn contains(&self, name: &str) -> Result<bool, StoreError>;

    /// All names in the membership set, in no particular order.
    async fn members(&self) -> Result<Vec<String>, StoreError>;

    /// Metadata for a member, read atomically with its membership.
    ///
    /// `None` when `name` is not a member. A member without metadata yields an
    /// empty map.
    async fn load(&self, name: &str) -> Result<Option<Fields>, StoreError>;

    /// Adds `name` to the membership set and writes its metadata in one step.
    ///
    /// Returns `false` without writing anything when `name` is already a member.
    async fn insert(&self, name: &str, fields: &[(&'static str, String)]) -> Result<bool, StoreError>;

    /// Removes `name` and its metadata. Absent names are not an error.
    async fn remove(&self, name: &str) -> Result<(), StoreError>;

    /// Claims `name` for `ttl` unless an unexpired claim exists.
    async fn reserve(&self, name: &str, token: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Drops the claim on `name` if it is still held with `token`.
    async fn release(&self, name: &str, token: &str) -> Result<(), StoreError>;

    /// Writes a user record field unless it already exists.
    async fn set_user_field_if_absent(&self, user: &str, field: &str, value: &str) -> Result<bool, StoreError>;

    async fn user_field(&self, user: &str, field: &str) -> Result<Option<String>, StoreError>;
}
