//! Canopy tenancy cache shared by the management and gateway services.
//!
//! # Purpose
//! Projects the tenant / project / environment / virtual-space tree held in
//! the relational store into a key-value cache so that ancestry lookups and
//! per-user authority checks avoid relational joins on the hot path.
//!
//! # How it fits
//! Services that write tenancy rows call the `upsert_*` / `del_*` operations
//! on [`ModelCache`] after each relational write. Readers resolve parents with
//! [`ModelCache::find_parents`] and fetch per-user roles with
//! [`ModelCache::get_user_authority`]. The `warmer` service bootstraps a cold
//! cache with [`ModelCache::build_cache_if_not_exist`].
//!
//! # Key invariants
//! - The whole tree lives in one map, [`keys::MODEL_CACHE_KEY`].
//! - An environment is stored under both `environment_{id}` and its
//!   cluster/namespace key with identical bytes.
//! - Ancestry walks are bounded by [`keys::MAX_TREE_DEPTH`] hops.
//!
//! # Examples
//! ```rust
//! use canopy_cache::{InMemoryBackend, InMemorySource, ModelCache, ModelCacheConfig, ResourceKind};
//! use std::sync::Arc;
//!
//! let rt = tokio::runtime::Runtime::new().expect("runtime");
//! rt.block_on(async {
//!     let cache = ModelCache::new(
//!         Arc::new(InMemoryBackend::new()),
//!         Arc::new(InMemorySource::new()),
//!         ModelCacheConfig::default(),
//!     );
//!     cache.upsert_tenant(1, "acme").await.expect("tenant");
//!     cache.upsert_project(1, 2, "web").await.expect("project");
//!     let parents = cache.find_parents(ResourceKind::Project, 2).await;
//!     assert_eq!(parents[0].name(), "acme");
//! });
//! ```
//!
//! # Common pitfalls
//! - Role changes are not pushed into cached authority; call
//!   [`ModelCache::flush_user_authority`] or wait for the TTL.
//! - Deletes do not cascade: removing a project leaves its environments.

pub mod authority;
pub mod backend;
mod cache;
pub mod entity;
pub mod error;
pub mod keys;
pub mod source;

pub use authority::{UserAuthority, UserRef, UserResource};
pub use backend::memory::InMemoryBackend;
pub use backend::redis::{RedisBackend, RedisConfig};
pub use backend::CacheBackend;
pub use cache::{BuildOutcome, DEFAULT_AUTHORITY_TTL, ModelCache, ModelCacheConfig};
pub use entity::{Entity, Node, OwnerRef, ResourceKind};
pub use error::{CacheError, CacheResult};
pub use source::memory::InMemorySource;
pub use source::postgres::{PostgresConfig, PostgresSource};
pub use source::RelationalSource;
