//! Key-value cache backends.
//!
//! # Purpose
//! Abstracts the cache service the tenancy model is projected into. The model
//! map is a hash of `field -> bytes`; authority values are plain keys with a
//! TTL.
//!
//! # Atomicity contract
//! - `put_entries` and `remove_entries` apply all fields in one backend call.
//! - `walk_owners` runs the whole ancestry walk as one atomic step
//!   (server-side script for Redis, one lock acquisition in memory).
//! - Nothing here retries; every failure is reported once.
use crate::error::CacheResult;
use async_trait::async_trait;
use std::time::Duration;

pub mod memory;
pub mod redis;

#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Whether the map stored at `map` exists.
    async fn map_exists(&self, map: &str) -> CacheResult<bool>;

    /// Write (replace) every `(field, value)` pair in one call.
    async fn put_entries(&self, map: &str, entries: Vec<(String, Vec<u8>)>) -> CacheResult<()>;

    async fn get_entry(&self, map: &str, field: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Remove every listed field in one call. Missing fields are ignored.
    async fn remove_entries(&self, map: &str, fields: &[String]) -> CacheResult<()>;

    /// Follow first-owner links from `start`, returning `(field, raw value)`
    /// for each parent nearest first, at most `max_hops` of them.
    ///
    /// The walk stops at a missing entry or at one whose owner list cannot be
    /// read; the start entry itself is never returned.
    async fn walk_owners(
        &self,
        map: &str,
        start: &str,
        max_hops: usize,
    ) -> CacheResult<Vec<(String, Vec<u8>)>>;

    async fn get_value(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store a plain value that expires after `ttl`.
    async fn put_value(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    async fn health_check(&self) -> CacheResult<()>;

    fn backend_name(&self) -> &'static str;
}
