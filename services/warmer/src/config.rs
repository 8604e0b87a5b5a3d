//! Warmer configuration sourced from environment variables, with an optional
//! YAML file (`CANOPY_CONFIG`) overriding individual fields.
use anyhow::{Context, Result, bail};
use canopy_cache::{DEFAULT_AUTHORITY_TTL, PostgresConfig, RedisConfig};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_METRICS_BIND: &str = "0.0.0.0:9090";
pub const DEFAULT_REDIS_POOL_SIZE: usize = 16;
pub const DEFAULT_REDIS_WAIT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_POSTGRES_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_POSTGRES_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    Memory,
    Redis,
}

impl FromStr for CacheBackendKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => bail!("unknown cache backend: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceBackendKind {
    Memory,
    Postgres,
}

impl FromStr for SourceBackendKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" => Ok(Self::Postgres),
            other => bail!("unknown source backend: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WarmerConfig {
    pub metrics_bind: SocketAddr,
    pub cache_backend: CacheBackendKind,
    /// Required when `cache_backend` is Redis.
    pub redis: Option<RedisConfig>,
    pub source_backend: SourceBackendKind,
    /// Required when `source_backend` is Postgres.
    pub postgres: Option<PostgresConfig>,
    pub authority_ttl: Duration,
}

#[derive(Debug, Default, Deserialize)]
struct WarmerConfigOverride {
    metrics_bind: Option<String>,
    cache_backend: Option<CacheBackendKind>,
    redis_url: Option<String>,
    redis_pool_size: Option<usize>,
    redis_wait_timeout_ms: Option<u64>,
    source_backend: Option<SourceBackendKind>,
    postgres_url: Option<String>,
    postgres_max_connections: Option<u32>,
    postgres_connect_timeout_ms: Option<u64>,
    postgres_acquire_timeout_ms: Option<u64>,
    authority_ttl_minutes: Option<u64>,
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|err| anyhow::anyhow!("parse {key}: {err}")),
        Err(_) => Ok(default),
    }
}

impl WarmerConfig {
    /// True when neither the cache nor the source outlives the process.
    ///
    /// Both backends default to memory, so an unset environment yields a
    /// warmer that bootstraps nothing shared.
    pub fn is_ephemeral(&self) -> bool {
        self.cache_backend == CacheBackendKind::Memory
            && self.source_backend == SourceBackendKind::Memory
    }

    pub fn from_env() -> Result<Self> {
        let metrics_bind = std::env::var("CANOPY_METRICS_BIND")
            .unwrap_or_else(|_| DEFAULT_METRICS_BIND.to_string())
            .parse()
            .with_context(|| "parse CANOPY_METRICS_BIND")?;
        let cache_backend = match std::env::var("CANOPY_CACHE_BACKEND") {
            Ok(raw) => raw
                .parse::<CacheBackendKind>()
                .with_context(|| "parse CANOPY_CACHE_BACKEND")?,
            Err(_) => CacheBackendKind::Memory,
        };
        let source_backend = match std::env::var("CANOPY_SOURCE_BACKEND") {
            Ok(raw) => raw
                .parse::<SourceBackendKind>()
                .with_context(|| "parse CANOPY_SOURCE_BACKEND")?,
            Err(_) => SourceBackendKind::Memory,
        };

        let redis = match std::env::var("CANOPY_REDIS_URL") {
            Ok(url) => Some(RedisConfig {
                url,
                pool_size: env_parse("CANOPY_REDIS_POOL_SIZE", DEFAULT_REDIS_POOL_SIZE)?,
                wait_timeout_ms: env_parse(
                    "CANOPY_REDIS_WAIT_TIMEOUT_MS",
                    DEFAULT_REDIS_WAIT_TIMEOUT_MS,
                )?,
            }),
            Err(_) => None,
        };
        let postgres = match std::env::var("CANOPY_POSTGRES_URL") {
            Ok(url) => Some(PostgresConfig {
                url,
                max_connections: env_parse(
                    "CANOPY_POSTGRES_MAX_CONNECTIONS",
                    DEFAULT_POSTGRES_MAX_CONNECTIONS,
                )?,
                connect_timeout_ms: env_parse(
                    "CANOPY_POSTGRES_CONNECT_TIMEOUT_MS",
                    DEFAULT_POSTGRES_TIMEOUT_MS,
                )?,
                acquire_timeout_ms: env_parse(
                    "CANOPY_POSTGRES_ACQUIRE_TIMEOUT_MS",
                    DEFAULT_POSTGRES_TIMEOUT_MS,
                )?,
            }),
            Err(_) => None,
        };

        let authority_ttl = match std::env::var("CANOPY_AUTHORITY_TTL_MINUTES") {
            Ok(raw) => ttl_from_minutes(
                raw.parse()
                    .with_context(|| "parse CANOPY_AUTHORITY_TTL_MINUTES")?,
            )?,
            Err(_) => DEFAULT_AUTHORITY_TTL,
        };

        Ok(Self {
            metrics_bind,
            cache_backend,
            redis,
            source_backend,
            postgres,
            authority_ttl,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("CANOPY_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read CANOPY_CONFIG: {path}"))?;
            let override_cfg: WarmerConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse warmer config yaml")?;
            config.apply(override_cfg)?;
        }
        Ok(config)
    }

    fn apply(&mut self, override_cfg: WarmerConfigOverride) -> Result<()> {
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.cache_backend {
            self.cache_backend = value;
        }
        if let Some(value) = override_cfg.source_backend {
            self.source_backend = value;
        }
        if let Some(url) = override_cfg.redis_url {
            let redis = self.redis.get_or_insert_with(|| RedisConfig {
                url: String::new(),
                pool_size: DEFAULT_REDIS_POOL_SIZE,
                wait_timeout_ms: DEFAULT_REDIS_WAIT_TIMEOUT_MS,
            });
            redis.url = url;
        }
        if let Some(redis) = self.redis.as_mut() {
            if let Some(value) = override_cfg.redis_pool_size {
                redis.pool_size = value;
            }
            if let Some(value) = override_cfg.redis_wait_timeout_ms {
                redis.wait_timeout_ms = value;
            }
        }
        if let Some(url) = override_cfg.postgres_url {
            let pg = self.postgres.get_or_insert_with(|| PostgresConfig {
                url: String::new(),
                max_connections: DEFAULT_POSTGRES_MAX_CONNECTIONS,
                connect_timeout_ms: DEFAULT_POSTGRES_TIMEOUT_MS,
                acquire_timeout_ms: DEFAULT_POSTGRES_TIMEOUT_MS,
            });
            pg.url = url;
        }
        if let Some(pg) = self.postgres.as_mut() {
            if let Some(value) = override_cfg.postgres_max_connections {
                pg.max_connections = value;
            }
            if let Some(value) = override_cfg.postgres_connect_timeout_ms {
                pg.connect_timeout_ms = value;
            }
            if let Some(value) = override_cfg.postgres_acquire_timeout_ms {
                pg.acquire_timeout_ms = value;
            }
        }
        if let Some(minutes) = override_cfg.authority_ttl_minutes {
            self.authority_ttl = ttl_from_minutes(minutes)?;
        }
        Ok(())
    }
}

fn ttl_from_minutes(minutes: u64) -> Result<Duration> {
    if minutes == 0 {
        bail!("authority ttl must be at least one minute");
    }
    Ok(Duration::from_secs(minutes.saturating_mul(60)))
}
