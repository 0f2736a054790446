//! Redis-backed `CacheAdapter`, built on `redis`'s async connection manager
//! so a dropped connection is transparently reconnected.

use crate::CacheAdapter;
use anheyu_types::errors::CacheError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::time::Duration;

pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(|e| CacheError::Backend(e.to_string()))?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(Self { manager })
    }

    fn conn(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

fn backend_err(e: redis::RedisError) -> CacheError {
    CacheError::Backend(e.to_string())
}

#[async_trait]
impl CacheAdapter for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.conn().get(key).await.map_err(backend_err)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.conn();
        match ttl {
            Some(d) => conn
                .set_ex::<_, _, ()>(key, value, d.as_secs().max(1))
                .await
                .map_err(backend_err),
            None => conn.set::<_, _, ()>(key, value).await.map_err(backend_err),
        }
    }

    async fn incr(&self, key: &str, delta: i64, ttl: Option<Duration>) -> Result<i64, CacheError> {
        // Atomic "INCRBY, and if this created the key, EXPIRE" via a Lua script.
        const SCRIPT: &str = r#"
            local existed = redis.call('EXISTS', KEYS[1])
            local n = redis.call('INCRBY', KEYS[1], ARGV[1])
            if existed == 0 and tonumber(ARGV[2]) > 0 then
                redis.call('EXPIRE', KEYS[1], ARGV[2])
            end
            return n
        "#;
        let ttl_secs = ttl.map(|d| d.as_secs()).unwrap_or(0);
        Script::new(SCRIPT)
            .key(key)
            .arg(delta)
            .arg(ttl_secs)
            .invoke_async(&mut self.conn())
            .await
            .map_err(backend_err)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        self.conn()
            .expire::<_, ()>(key, ttl.as_secs() as i64)
            .await
            .map_err(backend_err)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.conn().del::<_, ()>(key).await.map_err(backend_err)
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        let added: i64 = self.conn().sadd(key, member).await.map_err(backend_err)?;
        Ok(added > 0)
    }

    async fn set_card(&self, key: &str) -> Result<u64, CacheError> {
        self.conn().scard(key).await.map_err(backend_err)
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.conn()
            .rpush::<_, _, ()>(key, value)
            .await
            .map_err(backend_err)
    }

    async fn list_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, CacheError> {
        self.conn()
            .lrange(key, start, stop)
            .await
            .map_err(backend_err)
    }

    async fn list_len(&self, key: &str) -> Result<u64, CacheError> {
        self.conn().llen(key).await.map_err(backend_err)
    }

    async fn get_and_delete_many(&self, pattern: &str) -> Result<Vec<(String, String)>, CacheError> {
        // SCAN for matching keys, then drain each atomically with GETDEL.
        let keys = self.scan(pattern).await?;
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let value: Option<String> = redis::cmd("GETDEL")
                .arg(&key)
                .query_async(&mut self.conn())
                .await
                .map_err(backend_err)?;
            if let Some(v) = value {
                out.push((key, v));
            }
        }
        Ok(out)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await
                .map_err(backend_err)?;
            keys.extend(batch);
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        Ok(keys)
    }
}
