use std::{future::Future, time::Duration};

use fastrace::{Span, future::FutureExt, prelude::LocalSpan};

use super::{Fields, RegistryStorage};
use crate::StoreError;

/// Wrapper that adds a span to every storage operation
pub(crate) struct TracedStorage {
    inner: Box<dyn RegistryStorage>,
}

impl TracedStorage {
    pub fn new(inner: Box<dyn RegistryStorage>) -> Self {
        Self { inner }
    }

    async fn traced<T, F>(&self, span_name: &'static str, client: &str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let span = Span::enter_with_local_parent(span_name);

        span.add_property(|| ("registry.store", self.inner.kind()));

        if !client.is_empty() {
            span.add_property(|| ("registry.client", client.to_string()));
        }

        let fut = async move {
            let result = fut.await;

            if let Err(e) = &result {
                LocalSpan::add_property(|| ("error", "true"));
                LocalSpan::add_property(|| ("error.type", e.kind()));
            }

            result
        };

        fut.in_span(span).await
    }
}

#[async_trait::async_trait]
impl RegistryStorage for TracedStorage {
    fn kind(&self) -> &'static str {
        self.inner.kind()
    }

    async fn contains(&self, name: &str) -> Result<bool, StoreError> {
        self.traced("registry:contains", name, self.inner.contains(name)).await
    }

    async fn members(&self) -> Result<Vec<String>, StoreError> {
        let result = self.traced("registry:members", "", self.inner.members()).await;

        if let Ok(members) = &result {
            log::trace!("registry holds {} clients", members.len());
        }

        result
    }

    async fn load(&self, name: &str) -> Result<Option<Fields>, StoreError> {
        self.traced("registry:load", name, self.inner.load(name)).await
    }

    async fn insert(&self, name: &str, fields: &[(&'static str, String)]) -> Result<bool, StoreError> {
        let fut = async {
            let inserted = self.inner.insert(name, fields).await?;
            LocalSpan::add_property(|| ("registry.inserted", inserted.to_string()));

            Ok(inserted)
        };

        self.traced("registry:insert", name, fut).await
    }

    async fn remove(&self, name: &str) -> Result<(), StoreError> {
        self.traced("registry:remove", name, self.inner.remove(name)).await
    }

    async fn reserve(&self, name: &str, token: &str, ttl: Duration) -> Result<bool, StoreError> {
        let fut = async {
            let acquired = self.inner.reserve(name, token, ttl).await?;

            LocalSpan::add_property(|| ("registry.reservation.ttl_ms", ttl.as_millis().to_string()));
            LocalSpan::add_property(|| ("registry.reservation.acquired", acquired.to_string()));

            Ok(acquired)
        };

        self.traced("registry:reserve", name, fut).await
    }

    async fn release(&self, name: &str, token: &str) -> Result<(), StoreError> {
        self.traced("registry:release", name, self.inner.release(name, token)).await
    }

    async fn set_user_field_if_absent(&self, user: &str, field: &str, value: &str) -> Result<bool, StoreError> {
        // user names stay out of span properties
        let fut = self.inner.set_user_field_if_absent(user, field, value);
        self.traced("registry:set_user_field", "", fut).await
    }

    async fn user_field(&self, user: &str, field: &str) -> Result<Option<String>, StoreError> {
        self.traced("registry:user_field", "", self.inner.user_field(user, field)).await
    }
}
