//! The model cache: tenancy tree projection plus per-user authority.
//!
//! # Purpose
//! [`ModelCache`] ties a [`CacheBackend`] to a [`RelationalSource`] and
//! exposes the operations the rest of the platform calls:
//! - bootstrap: [`ModelCache::build_cache_if_not_exist`]
//! - incremental writes: `upsert_*` / `del_*`
//! - reads: [`ModelCache::find_parents`], [`ModelCache::find_resource`],
//!   [`ModelCache::find_environment`]
//! - authority: [`ModelCache::get_user_authority`],
//!   [`ModelCache::flush_user_authority`]
//!
//! # Consistency model
//! - The relational store is authoritative; the cache is eventually
//!   consistent and is kept current by callers invoking the mutation API after
//!   every relational write.
//! - No client-side locks: every operation relies on the backend's per-call
//!   atomicity. Concurrent writes to one key are last-write-wins.
//! - Nothing here retries or spawns background work.
//!
//! # Known races (accepted)
//! - Two processes bootstrapping a cold cache at once can both pass the
//!   existence check and both bulk-write. Both writes come from the same
//!   snapshot and land on the same keys.
//! - Role-assignment changes do not invalidate cached authority; entries
//!   expire after [`ModelCacheConfig::authority_ttl`] unless a caller flushes.
use crate::backend::CacheBackend;
use crate::source::RelationalSource;
use std::sync::Arc;
use std::time::Duration;

mod aggregator;
mod builder;
mod mutation;
mod resolver;

pub use builder::BuildOutcome;

/// Default lifetime of a cached user authority: 180 minutes.
pub const DEFAULT_AUTHORITY_TTL: Duration = Duration::from_secs(180 * 60);

#[derive(Debug, Clone)]
pub struct ModelCacheConfig {
    /// How long a computed user authority stays cached.
    pub authority_ttl: Duration,
}

impl Default for ModelCacheConfig {
    fn default() -> Self {
        Self {
            authority_ttl: DEFAULT_AUTHORITY_TTL,
        }
    }
}

/// Handle to the tenancy cache. Cheap to clone; clones share backends.
#[derive(Clone)]
pub struct ModelCache {
    backend: Arc<dyn CacheBackend>,
    source: Arc<dyn RelationalSource>,
    config: ModelCacheConfig,
}

impl ModelCache {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        source: Arc<dyn RelationalSource>,
        config: ModelCacheConfig,
    ) -> Self {
        Self {
            backend,
            source,
            config,
        }
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    pub fn source(&self) -> &Arc<dyn RelationalSource> {
        &self.source
    }

    pub fn config(&self) -> &ModelCacheConfig {
        &self.config
    }
}

impl std::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("backend", &self.backend.backend_name())
            .field("source", &self.source.backend_name())
            .field("config", &self.config)
            .finish()
    }
}
