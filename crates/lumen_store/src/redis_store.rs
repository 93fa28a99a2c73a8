//! Redis-backed store.
//!
//! Commands go through a [`ConnectionManager`], which multiplexes one async
//! connection and reconnects on failure. Cloning the manager per call is the
//! supported sharing pattern, so the store itself is `Clone` and can be held
//! by the HTTP state and the processor at the same time.

use redis::aio::ConnectionManager;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::store::KeyValueStore;

/// Production [`KeyValueStore`] over a Redis server.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Connect to the Redis server at `url` (e.g. `redis://127.0.0.1/`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        debug!("connecting key-value store at {}", url);
        let client = redis::Client::open(url)
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;
        let manager = client.get_connection_manager().await?;
        info!("key-value store connection established");
        Ok(Self { manager })
    }

    fn connection(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection();
        Ok(redis::cmd("GET").arg(key).query_async(&mut conn).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.connection();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection();
        Ok(redis::cmd("HGET")
            .arg(key)
            .arg(field)
            .query_async(&mut conn)
            .await?)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.connection();
        let _: () = redis::cmd("HSET")
            .arg(key)
            .arg(field)
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn hmget(&self, key: &str, fields: &[&str]) -> Result<Vec<Option<String>>, StoreError> {
        let mut conn = self.connection();
        let mut cmd = redis::cmd("HMGET");
        cmd.arg(key);
        for field in fields {
            cmd.arg(*field);
        }
        Ok(cmd.query_async(&mut conn).await?)
    }

    async fn hmset(&self, key: &str, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        let mut conn = self.connection();
        let mut cmd = redis::cmd("HMSET");
        cmd.arg(key);
        for (field, value) in entries {
            cmd.arg(*field).arg(*value);
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.connection();
        let _: () = redis::cmd("LPUSH")
            .arg(key)
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection();
        Ok(redis::cmd("LRANGE")
            .arg(key)
            .arg(start)
            .arg(stop)
            .query_async(&mut conn)
            .await?)
    }

    async fn ltrim(&self, key: &str, start: isize, stop: isize) -> Result<(), StoreError> {
        let mut conn = self.connection();
        let _: () = redis::cmd("LTRIM")
            .arg(key)
            .arg(start)
            .arg(stop)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn lrem(&self, key: &str, count: isize, value: &str) -> Result<(), StoreError> {
        let mut conn = self.connection();
        let _: () = redis::cmd("LREM")
            .arg(key)
            .arg(count)
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn llen(&self, key: &str) -> Result<usize, StoreError> {
        let mut conn = self.connection();
        Ok(redis::cmd("LLEN").arg(key).query_async(&mut conn).await?)
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.connection();
        let _: () = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection();
        Ok(redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection();
        Ok(redis::cmd("KEYS")
            .arg(pattern)
            .query_async(&mut conn)
            .await?)
    }
}
