//! In-memory relational source.
//!
//! # Purpose
//! Holds tenancy rows and role assignments in memory so the cache can be
//! rebuilt and authority computed without a database. Used by tests and by
//! local development runs.
//!
//! # Notes
//! Role bindings are joined to resource names at read time, like the SQL
//! source does; a binding whose resource no longer exists is not returned.
use super::{
    EnvironmentRow, ProjectRow, RelationalSource, RoleBinding, TenantRow, VirtualSpaceRow,
};
use crate::entity::ResourceKind;
use crate::error::CacheResult;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Assignment {
    user_id: u64,
    kind: ResourceKind,
    resource_id: u64,
    role: String,
}

#[derive(Debug, Default)]
struct Tables {
    // BTreeMaps keep listing order stable, like `ORDER BY id`.
    tenants: BTreeMap<u64, TenantRow>,
    projects: BTreeMap<u64, ProjectRow>,
    environments: BTreeMap<u64, EnvironmentRow>,
    virtual_spaces: BTreeMap<u64, VirtualSpaceRow>,
    system_roles: HashMap<u64, String>,
    assignments: Vec<Assignment>,
}

impl Tables {
    fn resource_name(&self, kind: ResourceKind, id: u64) -> Option<&str> {
        match kind {
            ResourceKind::Tenant => self.tenants.get(&id).map(|row| row.name.as_str()),
            ResourceKind::Project => self.projects.get(&id).map(|row| row.name.as_str()),
            ResourceKind::Environment => self.environments.get(&id).map(|row| row.name.as_str()),
            ResourceKind::VirtualSpace => {
                self.virtual_spaces.get(&id).map(|row| row.name.as_str())
            }
        }
    }
}

/// In-memory relational source. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    tables: Arc<RwLock<Tables>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_tenant(&self, id: u64, name: &str) {
        self.tables.write().await.tenants.insert(
            id,
            TenantRow {
                id,
                name: name.to_string(),
            },
        );
    }

    pub async fn insert_project(&self, tenant_id: u64, id: u64, name: &str) {
        self.tables.write().await.projects.insert(
            id,
            ProjectRow {
                id,
                tenant_id,
                name: name.to_string(),
            },
        );
    }

    /// `cluster` is `None` to model an environment whose cluster is gone.
    pub async fn insert_environment(
        &self,
        project_id: u64,
        id: u64,
        name: &str,
        cluster: Option<&str>,
        namespace: &str,
    ) {
        self.tables.write().await.environments.insert(
            id,
            EnvironmentRow {
                id,
                project_id,
                name: name.to_string(),
                namespace: namespace.to_string(),
                cluster: cluster.map(str::to_string),
            },
        );
    }

    pub async fn insert_virtual_space(&self, id: u64, name: &str) {
        self.tables.write().await.virtual_spaces.insert(
            id,
            VirtualSpaceRow {
                id,
                name: name.to_string(),
            },
        );
    }

    pub async fn insert_system_role(&self, id: u64, role_code: &str) {
        self.tables
            .write()
            .await
            .system_roles
            .insert(id, role_code.to_string());
    }

    /// Grant `role` on `(kind, resource_id)` to `user_id`.
    pub async fn assign_role(&self, user_id: u64, kind: ResourceKind, resource_id: u64, role: &str) {
        self.tables.write().await.assignments.push(Assignment {
            user_id,
            kind,
            resource_id,
            role: role.to_string(),
        });
    }

    pub async fn revoke_roles(&self, user_id: u64, kind: ResourceKind) {
        self.tables
            .write()
            .await
            .assignments
            .retain(|item| !(item.user_id == user_id && item.kind == kind));
    }
}

#[async_trait]
impl RelationalSource for InMemorySource {
    async fn list_tenants(&self) -> CacheResult<Vec<TenantRow>> {
        Ok(self.tables.read().await.tenants.values().cloned().collect())
    }

    async fn list_projects(&self) -> CacheResult<Vec<ProjectRow>> {
        Ok(self.tables.read().await.projects.values().cloned().collect())
    }

    async fn list_environments(&self) -> CacheResult<Vec<EnvironmentRow>> {
        Ok(self
            .tables
            .read()
            .await
            .environments
            .values()
            .cloned()
            .collect())
    }

    async fn list_virtual_spaces(&self) -> CacheResult<Vec<VirtualSpaceRow>> {
        Ok(self
            .tables
            .read()
            .await
            .virtual_spaces
            .values()
            .cloned()
            .collect())
    }

    async fn system_role(&self, role_id: u64) -> CacheResult<Option<String>> {
        Ok(self.tables.read().await.system_roles.get(&role_id).cloned())
    }

    async fn role_bindings(
        &self,
        user_id: u64,
        kind: ResourceKind,
    ) -> CacheResult<Vec<RoleBinding>> {
        let tables = self.tables.read().await;
        let bindings = tables
            .assignments
            .iter()
            .filter(|item| item.user_id == user_id && item.kind == kind)
            .filter_map(|item| {
                tables
                    .resource_name(kind, item.resource_id)
                    .map(|name| RoleBinding {
                        resource_id: item.resource_id,
                        resource_name: name.to_string(),
                        role: item.role.clone(),
                    })
            })
            .collect();
        Ok(bindings)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
