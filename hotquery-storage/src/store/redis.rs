//! Redis-backed [`KvStore`].

use std::fmt;
use std::time::Duration;

use ::redis::aio::ConnectionManager;
use ::redis::{Cmd, FromRedisValue, RedisError};
use async_trait::async_trait;
use hotquery_core::{HotqueryResult, StorageError};

use super::KvStore;

/// Keys fetched per `SCAN` round trip.
const SCAN_BATCH: usize = 500;

/// [`KvStore`] over a multiplexed, auto-reconnecting Redis connection.
///
/// Cloning the connection manager is cheap; every call works on its own
/// clone so the store can be shared freely.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("conn", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisStore {
    /// Connect to `redis_url`.
    pub async fn connect(redis_url: &str) -> HotqueryResult<Self> {
        let client = ::redis::Client::open(redis_url).map_err(|e| map_error("CONNECT", e))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| map_error("CONNECT", e))?;
        tracing::info!(url = %redact(redis_url), "Connected to Redis");
        Ok(Self { conn })
    }

    async fn run<T: FromRedisValue>(&self, operation: &str, cmd: &Cmd) -> HotqueryResult<T> {
        cmd.query_async(&mut self.conn.clone())
            .await
            .map_err(|e| map_error(operation, e).into())
    }
}

/// Strip credentials from a connection URL before logging it.
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

fn map_error(operation: &str, err: RedisError) -> StorageError {
    if err.is_timeout() {
        StorageError::Timeout {
            operation: operation.to_string(),
        }
    } else if err.code() == Some("WRONGTYPE") {
        StorageError::WrongType {
            key: operation.to_string(),
            expected: "matching type".to_string(),
            found: "other".to_string(),
        }
    } else {
        StorageError::Unavailable {
            reason: format!("{} failed: {}", operation, err),
        }
    }
}

/// Whole milliseconds, at least one, so short TTLs never mean "no expiry".
fn ttl_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> HotqueryResult<Option<String>> {
        self.run("GET", ::redis::cmd("GET").arg(key)).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> HotqueryResult<()> {
        let mut cmd = ::redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        self.run("SET", &cmd).await
    }

    async fn exists(&self, key: &str) -> HotqueryResult<bool> {
        let count: u64 = self.run("EXISTS", ::redis::cmd("EXISTS").arg(key)).await?;
        Ok(count > 0)
    }

    async fn delete(&self, key: &str) -> HotqueryResult<bool> {
        let count: u64 = self.run("DEL", ::redis::cmd("DEL").arg(key)).await?;
        Ok(count > 0)
    }

    async fn delete_many(&self, keys: &[String]) -> HotqueryResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.run("DEL", ::redis::cmd("DEL").arg(keys)).await
    }

    async fn scan_keys(&self, pattern: &str) -> HotqueryResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut cursor = 0u64;
        loop {
            let (next_cursor, batch): (u64, Vec<String>) = self
                .run(
                    "SCAN",
                    ::redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH),
                )
                .await?;
            keys.extend(batch);
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        // SCAN may return a key more than once.
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn db_size(&self) -> HotqueryResult<u64> {
        self.run("DBSIZE", &::redis::cmd("DBSIZE")).await
    }

    async fn flush_all(&self) -> HotqueryResult<()> {
        self.run("FLUSHALL", &::redis::cmd("FLUSHALL")).await
    }

    async fn list_push(&self, key: &str, value: &str) -> HotqueryResult<u64> {
        self.run("LPUSH", ::redis::cmd("LPUSH").arg(key).arg(value))
            .await
    }

    async fn list_pop(&self, key: &str) -> HotqueryResult<Option<String>> {
        self.run("RPOP", ::redis::cmd("RPOP").arg(key)).await
    }

    async fn list_len(&self, key: &str) -> HotqueryResult<u64> {
        self.run("LLEN", ::redis::cmd("LLEN").arg(key)).await
    }

    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> HotqueryResult<()> {
        let _: u64 = self
            .run("ZADD", ::redis::cmd("ZADD").arg(key).arg(score).arg(member))
            .await?;
        Ok(())
    }

    async fn sorted_set_top(&self, key: &str, n: usize) -> HotqueryResult<Vec<(String, f64)>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        self.run(
            "ZREVRANGE",
            ::redis::cmd("ZREVRANGE")
                .arg(key)
                .arg(0)
                .arg(n as i64 - 1)
                .arg("WITHSCORES"),
        )
        .await
    }

    async fn sorted_set_score(&self, key: &str, member: &str) -> HotqueryResult<Option<f64>> {
        self.run("ZSCORE", ::redis::cmd("ZSCORE").arg(key).arg(member))
            .await
    }
}

// =============================================================================
// TESTS
// =============================================================================
