//! In-memory cache backend.
//!
//! # Purpose
//! Implements [`CacheBackend`] with `HashMap`s guarded by `tokio::sync::RwLock`.
//! It exists for:
//! - tests (no external dependencies)
//! - local development and single-process deployments without Redis
//!
//! # Consistency
//! - **Not shared**: every process has its own copy.
//! - Each trait call takes exactly one lock, which gives the same per-call
//!   atomicity the Redis backend gets from single commands and scripts.
//! - TTL expiry is lazy: expired values are dropped when read.
use super::CacheBackend;
use crate::entity::first_owner;
use crate::error::CacheResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct ValueEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

/// In-memory cache backend.
///
/// Clones share state, so one instance can be handed to several
/// [`ModelCache`](crate::ModelCache) values.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    /// Hash maps keyed by top-level key, then by field.
    maps: Arc<RwLock<HashMap<String, HashMap<String, Vec<u8>>>>>,
    /// Plain values with optional expiry.
    values: Arc<RwLock<HashMap<String, ValueEntry>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every field of `map`, for inspection in tests and diagnostics.
    pub async fn entries(&self, map: &str) -> HashMap<String, Vec<u8>> {
        self.maps
            .read()
            .await
            .get(map)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl CacheBackend for InMemoryBackend {
    async fn map_exists(&self, map: &str) -> CacheResult<bool> {
        Ok(self
            .maps
            .read()
            .await
            .get(map)
            .is_some_and(|fields| !fields.is_empty()))
    }

    async fn put_entries(&self, map: &str, entries: Vec<(String, Vec<u8>)>) -> CacheResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut maps = self.maps.write().await;
        maps.entry(map.to_string()).or_default().extend(entries);
        Ok(())
    }

    async fn get_entry(&self, map: &str, field: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(self
            .maps
            .read()
            .await
            .get(map)
            .and_then(|fields| fields.get(field))
            .cloned())
    }

    async fn remove_entries(&self, map: &str, fields: &[String]) -> CacheResult<()> {
        let mut maps = self.maps.write().await;
        if let Some(stored) = maps.get_mut(map) {
            for field in fields {
                stored.remove(field);
            }
            // Redis drops a hash once its last field is gone; mirror that.
            if stored.is_empty() {
                maps.remove(map);
            }
        }
        Ok(())
    }

    async fn walk_owners(
        &self,
        map: &str,
        start: &str,
        max_hops: usize,
    ) -> CacheResult<Vec<(String, Vec<u8>)>> {
        let maps = self.maps.read().await;
        let Some(fields) = maps.get(map) else {
            return Ok(Vec::new());
        };
        let mut chain = Vec::new();
        let mut current = start.to_string();
        while chain.len() < max_hops {
            let Some(raw) = fields.get(&current) else {
                break;
            };
            let Some(owner) = first_owner(raw) else {
                break;
            };
            current = owner.cache_key();
            let Some(parent) = fields.get(&current) else {
                break;
            };
            chain.push((current.clone(), parent.clone()));
        }
        Ok(chain)
    }

    async fn get_value(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        // Write lock so an expired value can be evicted on the spot.
        let mut values = self.values.write().await;
        let expired = match values.get(key) {
            Some(entry) => entry
                .expires_at
                .is_some_and(|expires_at| Instant::now() >= expires_at),
            None => return Ok(None),
        };
        if expired {
            values.remove(key);
            return Ok(None);
        }
        Ok(values.get(key).map(|entry| entry.value.clone()))
    }

    async fn put_value(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let expires_at = Some(Instant::now() + ttl);
        self.values
            .write()
            .await
            .insert(key.to_string(), ValueEntry { value, expires_at });
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
