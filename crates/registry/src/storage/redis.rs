mod pool;

use std::{sync::LazyLock, time::Duration};

use config::RedisConfig;
use deadpool::{
    Runtime,
    managed::{Object, Pool, PoolError},
};
use redis::Script;

use super::{Fields, RegistryStorage};
use crate::StoreError;

use pool::RedisManager;

/// Membership check, `SADD` and `HSET` as one atomic step.
static INSERT_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        if redis.call('SISMEMBER', KEYS[1], ARGV[1]) == 1 then
            return 0
        end
        redis.call('SADD', KEYS[1], ARGV[1])
        redis.call('DEL', KEYS[2])
        redis.call('HSET', KEYS[2], unpack(ARGV, 2))
        return 1
        ",
    )
});

/// Deletes a reservation only while it still carries the caller's token.
static RELEASE_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        if redis.call('GET', KEYS[1]) == ARGV[1] then
            return redis.call('DEL', KEYS[1])
        end
        return 0
        ",
    )
});

/// Registry storage in a shared redis instance.
///
/// Layout under the configured prefix:
/// - `clients`: set of client names
/// - `client:<name>`: hash with `created` and `protocol`
/// - `reservation:<name>`: provisioning claim with a TTL
/// - `user:<name>`: administrative user records
pub struct RedisStorage {
    pool: Pool<RedisManager>,
    key_prefix: String,
}

impl RedisStorage {
    /// Creates the pool and verifies the store answers.
    pub async fn connect(config: &RedisConfig) -> Result<Self, StoreError> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| StoreError::Connection(format!("invalid redis url: {e}")))?;

        let pool = Pool::builder(RedisManager::new(client))
            .max_size(config.pool.max_size)
            .wait_timeout(Some(config.pool.timeout))
            .create_timeout(Some(config.pool.timeout))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| StoreError::Internal(format!("failed to build redis pool: {e}")))?;

        let storage = Self {
            pool,
            key_prefix: config.key_prefix.clone(),
        };

        let mut conn = storage.connection().await?;

        redis::cmd("PING")
            .query_async::<()>(&mut *conn)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        log::debug!("connected to redis, key prefix '{}'", storage.key_prefix);

        Ok(storage)
    }

    async fn connection(&self) -> Result<Object<RedisManager>, StoreError> {
        self.pool.get().await.map_err(|e| match e {
            PoolError::Backend(e) => StoreError::Connection(e.to_string()),
            PoolError::Timeout(_) => StoreError::Connection("timed out waiting for a redis connection".to_string()),
            other => StoreError::Internal(other.to_string()),
        })
    }

    fn clients_key(&self) -> String {
        format!("{}clients", self.key_prefix)
    }

    fn client_key(&self, name: &str) -> String {
        format!("{}client:{name}", self.key_prefix)
    }

    fn reservation_key(&self, name: &str) -> String {
        format!("{}reservation:{name}", self.key_prefix)
    }

    fn user_key(&self, user: &str) -> String {
        format!("{}user:{user}", self.key_prefix)
    }
}

fn query_error(error: redis::RedisError) -> StoreError {
    if error.is_io_error() || error.is_connection_dropped() || error.is_connection_refusal() {
        StoreError::Connection(error.to_string())
    } else {
        StoreError::Query(error.to_string())
    }
}

#[async_trait::async_trait]
impl RegistryStorage for RedisStorage {
    fn kind(&self) -> &'static str {
        "redis"
    }

    async fn contains(&self, name: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;

        redis::cmd("SISMEMBER")
            .arg(self.clients_key())
            .arg(name)
            .query_async(&mut *conn)
            .await
            .map_err(query_error)
    }

    async fn members(&self) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection().await?;

        redis::cmd("SMEMBERS")
            .arg(self.clients_key())
            .query_async(&mut *conn)
            .await
            .map_err(query_error)
    }

    async fn load(&self, name: &str) -> Result<Option<Fields>, StoreError> {
        let mut conn = self.connection().await?;

        let (member, fields): (bool, Fields) = redis::pipe()
            .atomic()
            .cmd("SISMEMBER")
            .arg(self.clients_key())
            .arg(name)
            .cmd("HGETALL")
            .arg(self.client_key(name))
            .query_async(&mut *conn)
            .await
            .map_err(query_error)?;

        Ok(member.then_some(fields))
    }

    async fn insert(&self, name: &str, fields: &[(&'static str, String)]) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;

        let mut invocation = INSERT_SCRIPT.key(self.clients_key());
        invocation.key(self.client_key(name)).arg(name);

        for (field, value) in fields {
            invocation.arg(*field).arg(value);
        }

        let inserted: i64 = invocation.invoke_async(&mut *conn).await.map_err(query_error)?;

        Ok(inserted == 1)
    }

    async fn remove(&self, name: &str) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;

        redis::pipe()
            .atomic()
            .cmd("SREM")
            .arg(self.clients_key())
            .arg(name)
            .ignore()
            .cmd("DEL")
            .arg(self.client_key(name))
            .ignore()
            .query_async::<()>(&mut *conn)
            .await
            .map_err(query_error)
    }

    async fn reserve(&self, name: &str, token: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;

        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);

        let reply: Option<String> = redis::cmd("SET")
            .arg(self.reservation_key(name))
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(millis)
            .query_async(&mut *conn)
            .await
            .map_err(query_error)?;

        Ok(reply.is_some())
    }

    async fn release(&self, name: &str, token: &str) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;

        RELEASE_SCRIPT
            .key(self.reservation_key(name))
            .arg(token)
            .invoke_async::<i64>(&mut *conn)
            .await
            .map_err(query_error)?;

        Ok(())
    }

    async fn set_user_field_if_absent(&self, user: &str, field: &str, value: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;

        redis::cmd("HSETNX")
            .arg(self.user_key(user))
            .arg(field)
            .arg(value)
            .query_async(&mut *conn)
            .await
            .map_err(query_error)
    }

    async fn user_field(&self, user: &str, field: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;

        redis::cmd("HGET")
            .arg(self.user_key(user))
            .arg(field)
            .query_async(&mut *conn)
            .await
            .map_err(query_error)
    }
}
