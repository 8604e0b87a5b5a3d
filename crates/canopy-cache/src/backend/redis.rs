//! Redis-backed cache backend.
//!
//! # What this module is
//! The production [`CacheBackend`]: the model map is a Redis hash, authority
//! values are plain string keys written with `SET ... EX`, and the ancestry
//! walk runs as a Lua script so it costs one round trip and executes
//! atomically on the server.
//!
//! # Connection handling
//! Connections come from a `deadpool-redis` pool. Pool wait/create timeouts
//! bound every call; there are no retries here.
//!
//! # Security notes
//! - Redis URLs may carry credentials; never log them.
use super::CacheBackend;
use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use deadpool_redis::{Config, Pool, PoolConfig, Runtime, Timeouts};
use redis::AsyncCommands;
use std::time::Duration;

/// Walks first-owner links inside the model hash.
///
/// KEYS[1] = model map, ARGV[1] = start field, ARGV[2] = max hops.
/// Returns a flat `field, value, field, value, ...` array, nearest parent
/// first. A record whose owner list
/// cannot be read ends the walk; the caller decides what to do with records
/// it cannot decode.
const WALK_OWNERS_SCRIPT: &str = r"
local map = KEYS[1]
local current = ARGV[1]
local max_hops = tonumber(ARGV[2]) or 0
local chain = {}
for _ = 1, max_hops do
  local raw = redis.call('HGET', map, current)
  if not raw then break end
  local ok, node = pcall(cjson.decode, raw)
  if not ok or type(node) ~= 'table' or type(node.owners) ~= 'table' then break end
  local owner = node.owners[1]
  if type(owner) ~= 'table' or type(owner.kind) ~= 'string' then break end
  local id = tonumber(owner.id)
  if not id then break end
  current = owner.kind .. '_' .. string.format('%d', id)
  local parent = redis.call('HGET', map, current)
  if not parent then break end
  table.insert(chain, current)
  table.insert(chain, parent)
end
return chain
";

/// Splits the script's flat reply into `(field, value)` pairs.
fn pair_fields(flat: Vec<Vec<u8>>) -> Vec<(String, Vec<u8>)> {
    let mut pairs = Vec::with_capacity(flat.len() / 2);
    let mut items = flat.into_iter();
    while let (Some(field), Some(value)) = (items.next(), items.next()) {
        pairs.push((String::from_utf8_lossy(&field).into_owned(), value));
    }
    pairs
}

/// Connection settings for [`RedisBackend`].
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub pool_size: usize,
    pub wait_timeout_ms: u64,
}

/// Durable, shared cache backend on Redis.
///
/// # Example
/// ```rust,no_run
/// use canopy_cache::backend::redis::{RedisBackend, RedisConfig};
///
/// fn open(cfg: RedisConfig) {
///     let _ = RedisBackend::connect(&cfg);
/// }
/// ```
pub struct RedisBackend {
    pool: Pool,
    walk_script: redis::Script,
}

impl RedisBackend {
    /// Build the connection pool. Connections are opened lazily, so a bad
    /// host only shows up on the first call (use `health_check` at startup).
    pub fn connect(config: &RedisConfig) -> CacheResult<Self> {
        let mut pool_config = PoolConfig::new(config.pool_size);
        let wait = Some(Duration::from_millis(config.wait_timeout_ms));
        pool_config.timeouts = Timeouts {
            wait,
            create: wait,
            recycle: wait,
        };
        let mut redis_config = Config::from_url(config.url.clone());
        redis_config.pool = Some(pool_config);
        let pool = redis_config.create_pool(Some(Runtime::Tokio1))?;
        Ok(Self {
            pool,
            walk_script: redis::Script::new(WALK_OWNERS_SCRIPT),
        })
    }

    async fn connection(&self) -> CacheResult<deadpool_redis::Connection> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn map_exists(&self, map: &str) -> CacheResult<bool> {
        let mut conn = self.connection().await?;
        let exists: bool = conn.exists(map).await?;
        Ok(exists)
    }

    async fn put_entries(&self, map: &str, entries: Vec<(String, Vec<u8>)>) -> CacheResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        // One HSET carrying every field keeps the write atomic.
        let _: () = conn.hset_multiple(map, &entries).await?;
        Ok(())
    }

    async fn get_entry(&self, map: &str, field: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = conn.hget(map, field).await?;
        Ok(value)
    }

    async fn remove_entries(&self, map: &str, fields: &[String]) -> CacheResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        let _: () = conn.hdel(map, fields).await?;
        Ok(())
    }

    async fn walk_owners(
        &self,
        map: &str,
        start: &str,
        max_hops: usize,
    ) -> CacheResult<Vec<(String, Vec<u8>)>> {
        let mut conn = self.connection().await?;
        let flat: Vec<Vec<u8>> = self
            .walk_script
            .key(map)
            .arg(start)
            .arg(max_hops)
            .invoke_async(&mut conn)
            .await?;
        Ok(pair_fields(flat))
    }

    async fn get_value(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn put_value(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        // SET EX rejects 0; round sub-second TTLs up to one second.
        let seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, seconds).await?;
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
