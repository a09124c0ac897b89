use std::time::{Duration, Instant};

use dashmap::{DashMap, mapref::entry::Entry};

use super::{Fields, RegistryStorage};
use crate::StoreError;

struct Reservation {
    token: String,
    expires_at: Instant,
}

/// Process-local storage. Each operation is atomic per key through the map's
/// entry API, which mirrors the guarantees of the redis backend.
#[derive(Default)]
pub struct MemoryStorage {
    clients: DashMap<String, Fields>,
    reservations: DashMap<String, Reservation>,
    users: DashMap<String, Fields>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RegistryStorage for MemoryStorage {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn contains(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.clients.contains_key(name))
    }

    async fn members(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.clients.iter().map(|entry| entry.key().clone()).collect())
    }

    async fn load(&self, name: &str) -> Result<Option<Fields>, StoreError> {
        Ok(self.clients.get(name).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, name: &str, fields: &[(&'static str, String)]) -> Result<bool, StoreError> {
        match self.clients.entry(name.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(entry) => {
                let fields = fields
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.clone()))
                    .collect();

                entry.insert(fields);

                Ok(true)
            }
        }
    }

    async fn remove(&self, name: &str) -> Result<(), StoreError> {
        self.clients.remove(name);
        Ok(())
    }

    async fn reserve(&self, name: &str, token: &str, ttl: Duration) -> Result<bool, StoreError> {
        let now = Instant::now();

        let reservation = Reservation {
            token: token.to_string(),
            expires_at: now + ttl,
        };

        match self.reservations.entry(name.to_string()) {
            Entry::Occupied(mut entry) if entry.get().expires_at <= now => {
                entry.insert(reservation);
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(entry) => {
                entry.insert(reservation);
                Ok(true)
            }
        }
    }

    async fn release(&self, name: &str, token: &str) -> Result<(), StoreError> {
        self.reservations
            .remove_if(name, |_, reservation| reservation.token == token);

        Ok(())
    }

    async fn set_user_field_if_absent(&self, user: &str, field: &str, value: &str) -> Result<bool, StoreError> {
        let mut record = self.users.entry(user.to_string()).or_default();

        if record.contains_key(field) {
            return Ok(false);
        }

        record.insert(field.to_string(), value.to_string());

        Ok(true)
    }

    async fn user_field(&self, user: &str, field: &str) -> Result<Option<String>, StoreError> {
        Ok(self.users.get(user).and_then(|record| record.get(field).cloned()))
    }
}
