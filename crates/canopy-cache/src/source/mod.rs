//! Relational sources of tenancy data.
//!
//! # Purpose
//! Read-only view of the relational store that owns tenants, projects,
//! environments, virtual-spaces and per-user role assignments. The cache only
//! reads from it: to rebuild the model map and to compute user authority.
//!
//! # Notes
//! The schema belongs to the owning service; nothing here creates or migrates
//! tables.
use crate::entity::ResourceKind;
use crate::error::CacheResult;
use async_trait::async_trait;

pub mod memory;
pub mod postgres;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantRow {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRow {
    pub id: u64,
    pub tenant_id: u64,
    pub name: String,
}

/// Environment row with its cluster name resolved.
///
/// `cluster` is `None` when the referenced cluster could not be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentRow {
    pub id: u64,
    pub project_id: u64,
    pub name: String,
    pub namespace: String,
    pub cluster: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualSpaceRow {
    pub id: u64,
    pub name: String,
}

/// One role a user holds on one resource, with the resource's display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleBinding {
    pub resource_id: u64,
    pub resource_name: String,
    pub role: String,
}

#[async_trait]
pub trait RelationalSource: Send + Sync {
    async fn list_tenants(&self) -> CacheResult<Vec<TenantRow>>;
    async fn list_projects(&self) -> CacheResult<Vec<ProjectRow>>;
    async fn list_environments(&self) -> CacheResult<Vec<EnvironmentRow>>;
    async fn list_virtual_spaces(&self) -> CacheResult<Vec<VirtualSpaceRow>>;

    /// Role code of a system role, `None` if the role does not exist.
    async fn system_role(&self, role_id: u64) -> CacheResult<Option<String>>;

    /// Roles `user_id` holds on resources of `kind`.
    async fn role_bindings(&self, user_id: u64, kind: ResourceKind)
    -> CacheResult<Vec<RoleBinding>>;

    fn backend_name(&self) -> &'static str;
}
