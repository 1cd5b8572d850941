// Redis hash-namespace store: one outer key groups every record of a store

use crate::core::constants::store::{CONNECT_BACKOFF_MS, MAX_CONNECT_ATTEMPTS, MAX_UPSERT_ATTEMPTS};
use crate::core::errors::StoreError;
use crate::state::serializer::{KeySerializer, ValueSerializer};
use crate::state::store::{KeyValueStore, MergeFn, Upserted};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Writes the new field value only if the field still holds what the caller read.
/// ARGV: field, expected-present flag, expected raw value, new raw value.
const COMPARE_AND_SET: &str = r#"
local current = redis.call('HGET', KEYS[1], ARGV[1])
if ARGV[2] == '1' then
  if current ~= ARGV[3] then return 0 end
elseif current then
  return 0
end
redis.call('HSET', KEYS[1], ARGV[1], ARGV[4])
return 1
"#;

/// Reads and deletes a field in one step. ARGV: field.
const TAKE: &str = r#"
local current = redis.call('HGET', KEYS[1], ARGV[1])
if current then redis.call('HDEL', KEYS[1], ARGV[1]) end
return current
"#;

/// Open a managed Redis connection
///
/// Retries with linear backoff and verifies each candidate with PING before
/// handing it out. The connection is cheap to clone and is shared by every
/// store built on top of it.
pub async fn connect(redis_url: &str, connect_timeout: Duration) -> Result<ConnectionManager, StoreError> {
    let mut connection_errors = Vec::new();

    for attempt in 0..MAX_CONNECT_ATTEMPTS {
        if attempt > 0 {
            sleep(Duration::from_millis(CONNECT_BACKOFF_MS * attempt as u64)).await;
        }

        match try_connect(redis_url, connect_timeout).await {
            Ok(mut manager) => match ping(&mut manager).await {
                Ok(()) => {
                    if attempt > 0 {
                        info!("Redis connection succeeded on attempt {}", attempt + 1);
                    }
                    return Ok(manager);
                }
                Err(e) => {
                    connection_errors.push(format!("Connection created but ping failed: {}", e));
                }
            },
            Err(e) => {
                if attempt < MAX_CONNECT_ATTEMPTS - 1 {
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = MAX_CONNECT_ATTEMPTS,
                        error = %e,
                        "Redis connection attempt failed, retrying..."
                    );
                }
                connection_errors.push(format!("Attempt {} failed: {}", attempt + 1, e));
            }
        }
    }

    Err(StoreError::Unavailable(format!(
        "Failed to connect to Redis after {} attempts: {}",
        MAX_CONNECT_ATTEMPTS,
        connection_errors.join("; ")
    )))
}

async fn try_connect(redis_url: &str, connect_timeout: Duration) -> Result<ConnectionManager, StoreError> {
    let client = Client::open(redis_url)
        .map_err(|e| StoreError::Unavailable(format!("Invalid Redis URL: {}", e)))?;

    timeout(connect_timeout, ConnectionManager::new(client))
        .await
        .map_err(|_| {
            StoreError::Unavailable(format!(
                "Redis connection timed out after {} seconds",
                connect_timeout.as_secs()
            ))
        })?
        .map_err(StoreError::from)
}

/// Round-trip a PING to verify connectivity
pub async fn ping(conn: &mut ConnectionManager) -> Result<(), StoreError> {
    let reply: String = redis::cmd("PING").query_async(conn).await?;
    if reply == "PONG" {
        Ok(())
    } else {
        Err(StoreError::Unavailable(format!(
            "Redis ping returned unexpected response: {}",
            reply
        )))
    }
}

/// Key-value store living in a single Redis hash
///
/// Logical keys become hash fields (after the key serializer), values are
/// encoded by the value serializer. Connectivity failures surface as
/// [`StoreError::Unavailable`].
pub struct RedisHashStore<T> {
    connection: ConnectionManager,
    namespace: String,
    values: Arc<dyn ValueSerializer<T>>,
    keys: Arc<dyn KeySerializer>,
    compare_and_set: Script,
    take_field: Script,
}

impl<T> RedisHashStore<T> {
    pub fn new(
        connection: ConnectionManager,
        namespace: impl Into<String>,
        values: Arc<dyn ValueSerializer<T>>,
        keys: Arc<dyn KeySerializer>,
    ) -> Self {
        Self {
            connection,
            namespace: namespace.into(),
            values,
            keys,
            compare_and_set: Script::new(COMPARE_AND_SET),
            take_field: Script::new(TAKE),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Health check for the underlying connection
    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        ping(&mut conn).await
    }

    fn decode(&self, raw: Option<String>) -> Result<Option<T>, StoreError> {
        raw.map(|raw| self.values.deserialize(&raw)).transpose()
    }
}

#[async_trait]
impl<T> KeyValueStore<T> for RedisHashStore<T>
where
    T: Send + Sync + 'static,
{
    async fn has_key(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        let exists: bool = conn.hexists(&self.namespace, self.keys.serialize(key)).await?;
        Ok(exists)
    }

    async fn get(&self, key: &str) -> Result<Option<T>, StoreError> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn.hget(&self.namespace, self.keys.serialize(key)).await?;
        self.decode(raw)
    }

    async fn put(&self, key: &str, value: T) -> Result<(), StoreError> {
        let raw = self.values.serialize(&value)?;
        let mut conn = self.connection.clone();
        conn.hset::<_, _, _, ()>(&self.namespace, self.keys.serialize(key), raw)
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        let removed: u64 = conn.hdel(&self.namespace, self.keys.serialize(key)).await?;
        Ok(removed > 0)
    }

    async fn take(&self, key: &str) -> Result<Option<T>, StoreError> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = self
            .take_field
            .key(&self.namespace)
            .arg(self.keys.serialize(key))
            .invoke_async(&mut conn)
            .await?;
        self.decode(raw)
    }

    async fn put_if_absent(&self, key: &str, value: T) -> Result<bool, StoreError> {
        let raw = self.values.serialize(&value)?;
        let mut conn = self.connection.clone();
        let inserted: bool = conn
            .hset_nx(&self.namespace, self.keys.serialize(key), raw)
            .await?;
        Ok(inserted)
    }

    async fn values(&self) -> Result<Vec<T>, StoreError> {
        let mut conn = self.connection.clone();
        let raw: Vec<String> = conn.hvals(&self.namespace).await?;
        raw.iter().map(|item| self.values.deserialize(item)).collect()
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection.clone();
        let stored: Vec<String> = conn.hkeys(&self.namespace).await?;
        stored.iter().map(|item| self.keys.deserialize(item)).collect()
    }

    async fn upsert(&self, key: &str, merge: MergeFn<'_, T>) -> Result<Upserted<T>, StoreError> {
        let field = self.keys.serialize(key);
        let mut conn = self.connection.clone();

        for attempt in 1..=MAX_UPSERT_ATTEMPTS {
            let current_raw: Option<String> = conn.hget(&self.namespace, &field).await?;
            let created = current_raw.is_none();
            let value = merge(self.decode(current_raw.clone())?);
            let new_raw = self.values.serialize(&value)?;

            let applied: i64 = self
                .compare_and_set
                .key(&self.namespace)
                .arg(&field)
                .arg(if created { "0" } else { "1" })
                .arg(current_raw.unwrap_or_default())
                .arg(new_raw)
                .invoke_async(&mut conn)
                .await?;

            if applied == 1 {
                return Ok(Upserted { created, value });
            }

            debug!(
                namespace = %self.namespace,
                attempt,
                "Concurrent write detected during upsert, retrying"
            );
        }

        warn!(
            namespace = %self.namespace,
            attempts = MAX_UPSERT_ATTEMPTS,
            "Upsert abandoned after repeated concurrent writes"
        );
        Err(StoreError::Contention {
            attempts: MAX_UPSERT_ATTEMPTS,
        })
    }
}
