//! Shared fixtures and fault-injecting wrappers for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use canopy_cache::source::{EnvironmentRow, ProjectRow, RoleBinding, TenantRow, VirtualSpaceRow};
use canopy_cache::{
    CacheBackend, CacheError, CacheResult, InMemoryBackend, InMemorySource, ModelCache,
    ModelCacheConfig, RelationalSource, ResourceKind,
};
use std::sync::Arc;
use std::time::Duration;

/// Tenant 1 "acme" -> project 2 "web" -> environment 3 "web-prod" (c1/ns1),
/// plus virtual-space 4 "mesh".
pub async fn seeded_source() -> InMemorySource {
    let source = InMemorySource::new();
    source.insert_tenant(1, "acme").await;
    source.insert_project(1, 2, "web").await;
    source
        .insert_environment(2, 3, "web-prod", Some("c1"), "ns1")
        .await;
    source.insert_virtual_space(4, "mesh").await;
    source
}

pub fn cache_over(
    backend: Arc<dyn CacheBackend>,
    source: Arc<dyn RelationalSource>,
    authority_ttl: Duration,
) -> ModelCache {
    ModelCache::new(backend, source, ModelCacheConfig { authority_ttl })
}

pub fn memory_cache(backend: &InMemoryBackend, source: &InMemorySource) -> ModelCache {
    ModelCache::new(
        Arc::new(backend.clone()),
        Arc::new(source.clone()),
        ModelCacheConfig::default(),
    )
}

/// Source whose role-binding query fails for one kind, and whose
/// system-role lookup and project listing can be made to fail.
pub struct FailingSource {
    pub inner: InMemorySource,
    pub failing_kind: Option<ResourceKind>,
    pub fail_system_role: bool,
    pub fail_project_listing: bool,
}

impl FailingSource {
    pub fn healthy(inner: InMemorySource) -> Self {
        Self {
            inner,
            failing_kind: None,
            fail_system_role: false,
            fail_project_listing: false,
        }
    }
}

#[async_trait]
impl RelationalSource for FailingSource {
    async fn list_tenants(&self) -> CacheResult<Vec<TenantRow>> {
        self.inner.list_tenants().await
    }

    async fn list_projects(&self) -> CacheResult<Vec<ProjectRow>> {
        if self.fail_project_listing {
            return Err(CacheError::SourceUnavailable("projects offline".into()));
        }
        self.inner.list_projects().await
    }

    async fn list_environments(&self) -> CacheResult<Vec<EnvironmentRow>> {
        self.inner.list_environments().await
    }

    async fn list_virtual_spaces(&self) -> CacheResult<Vec<VirtualSpaceRow>> {
        self.inner.list_virtual_spaces().await
    }

    async fn system_role(&self, role_id: u64) -> CacheResult<Option<String>> {
        if self.fail_system_role {
            return Err(CacheError::SourceUnavailable("system roles offline".into()));
        }
        self.inner.system_role(role_id).await
    }

    async fn role_bindings(
        &self,
        user_id: u64,
        kind: ResourceKind,
    ) -> CacheResult<Vec<RoleBinding>> {
        if self.failing_kind == Some(kind) {
            return Err(CacheError::SourceUnavailable(format!(
                "{kind} bindings offline"
            )));
        }
        self.inner.role_bindings(user_id, kind).await
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

/// Backend that reads through to memory but rejects every write.
pub struct ReadOnlyBackend {
    pub inner: InMemoryBackend,
}

fn rejected() -> CacheError {
    CacheError::BackendUnavailable("writes rejected".into())
}

#[async_trait]
impl CacheBackend for ReadOnlyBackend {
    async fn map_exists(&self, map: &str) -> CacheResult<bool> {
        self.inner.map_exists(map).await
    }

    async fn put_entries(&self, _map: &str, _entries: Vec<(String, Vec<u8>)>) -> CacheResult<()> {
        Err(rejected())
    }

    async fn get_entry(&self, map: &str, field: &str) -> CacheResult<Option<Vec<u8>>> {
        self.inner.get_entry(map, field).await
    }

    async fn remove_entries(&self, _map: &str, _fields: &[String]) -> CacheResult<()> {
        Err(rejected())
    }

    async fn walk_owners(
        &self,
        map: &str,
        start: &str,
        max_hops: usize,
    ) -> CacheResult<Vec<(String, Vec<u8>)>> {
        self.inner.walk_owners(map, start, max_hops).await
    }

    async fn get_value(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.inner.get_value(key).await
    }

    async fn put_value(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> CacheResult<()> {
        Err(rejected())
    }

    async fn health_check(&self) -> CacheResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "read-only"
    }
}

/// Backend that fails every call, as an unreachable cache would.
pub struct DownBackend;

#[async_trait]
impl CacheBackend for DownBackend {
    async fn map_exists(&self, _map: &str) -> CacheResult<bool> {
        Err(CacheError::BackendUnavailable("down".into()))
    }

    async fn put_entries(&self, _map: &str, _entries: Vec<(String, Vec<u8>)>) -> CacheResult<()> {
        Err(CacheError::BackendUnavailable("down".into()))
    }

    async fn get_entry(&self, _map: &str, _field: &str) -> CacheResult<Option<Vec<u8>>> {
        Err(CacheError::BackendUnavailable("down".into()))
    }

    async fn remove_entries(&self, _map: &str, _fields: &[String]) -> CacheResult<()> {
        Err(CacheError::BackendUnavailable("down".into()))
    }

    async fn walk_owners(
        &self,
        _map: &str,
        _start: &str,
        _max_hops: usize,
    ) -> CacheResult<Vec<(String, Vec<u8>)>> {
        Err(CacheError::BackendUnavailable("down".into()))
    }

    async fn get_value(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
        Err(CacheError::BackendUnavailable("down".into()))
    }

    async fn put_value(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::BackendUnavailable("down".into()))
    }

    async fn health_check(&self) -> CacheResult<()> {
        Err(CacheError::BackendUnavailable("down".into()))
    }

    fn backend_name(&self) -> &'static str {
        "down"
    }
}
