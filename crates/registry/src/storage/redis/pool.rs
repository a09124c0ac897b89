use deadpool::managed::{self, Metrics, RecycleError, RecycleResult};
use redis::{Client, RedisError, aio::MultiplexedConnection};

/// Hands out multiplexed connections to the pool and health checks them on return.
pub(super) struct RedisManager {
    client: Client,
}

impl RedisManager {
    pub(super) fn new(client: Client) -> Self {
        Self { client }
    }
}

impl managed::Manager for RedisManager {
    type Type = MultiplexedConnection;
    type Error = RedisError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        self.client.get_multiplexed_async_connection().await
    }

    async fn recycle(&self, conn: &mut Self::Type, _: &Metrics) -> RecycleResult<Self::Error> {
        redis::cmd("PING")
            .query_async::<()>(conn)
            .await
            .map_err(RecycleError::Backend)
    }
}
