//! Incremental writes to the model map.
//!
//! Each call replaces or removes exactly the keys of one entity in one
//! backend call. No read-before-write, no cascades: deleting a project leaves
//! its environments in place until they are deleted themselves.
use super::ModelCache;
use crate::entity::{Entity, ResourceKind};
use crate::error::CacheResult;
use crate::keys::{MODEL_CACHE_KEY, cache_key, env_cache_key};

fn record_mutation(kind: ResourceKind, op: &'static str, result: &CacheResult<()>) {
    metrics::counter!("canopy_cache_mutations_total", "kind" => kind.as_str(), "op" => op)
        .increment(1);
    if result.is_err() {
        metrics::counter!(
            "canopy_cache_mutation_failures_total",
            "kind" => kind.as_str(),
            "op" => op
        )
        .increment(1);
    }
}

impl ModelCache {
    async fn upsert_entity(&self, entity: &Entity) -> CacheResult<()> {
        let entries = entity.cache_entries()?;
        self.backend.put_entries(MODEL_CACHE_KEY, entries).await
    }

    pub async fn upsert_tenant(&self, tenant_id: u64, name: &str) -> CacheResult<()> {
        let result = self.upsert_entity(&Entity::tenant(tenant_id, name)).await;
        if let Err(err) = &result {
            tracing::error!(
                error = %err,
                tenant_id,
                tenant_name = name,
                "cache upsert tenant failed"
            );
        }
        record_mutation(ResourceKind::Tenant, "upsert", &result);
        result
    }

    pub async fn del_tenant(&self, tenant_id: u64) -> CacheResult<()> {
        let result = self
            .backend
            .remove_entries(
                MODEL_CACHE_KEY,
                &[cache_key(ResourceKind::Tenant, tenant_id)],
            )
            .await;
        if let Err(err) = &result {
            tracing::error!(error = %err, tenant_id, "cache delete tenant failed");
        }
        record_mutation(ResourceKind::Tenant, "delete", &result);
        result
    }

    pub async fn upsert_project(
        &self,
        tenant_id: u64,
        project_id: u64,
        name: &str,
    ) -> CacheResult<()> {
        let result = self
            .upsert_entity(&Entity::project(tenant_id, project_id, name))
            .await;
        if let Err(err) = &result {
            tracing::error!(
                error = %err,
                tenant_id,
                project_id,
                project_name = name,
                "cache upsert project failed"
            );
        }
        record_mutation(ResourceKind::Project, "upsert", &result);
        result
    }

    /// `tenant_id` is only used to identify the project in logs.
    pub async fn del_project(&self, tenant_id: u64, project_id: u64) -> CacheResult<()> {
        let result = self
            .backend
            .remove_entries(
                MODEL_CACHE_KEY,
                &[cache_key(ResourceKind::Project, project_id)],
            )
            .await;
        if let Err(err) = &result {
            tracing::error!(
                error = %err,
                tenant_id,
                project_id,
                "cache delete project failed"
            );
        }
        record_mutation(ResourceKind::Project, "delete", &result);
        result
    }

    /// Writes the environment under its id key and its cluster/namespace key
    /// in one call.
    pub async fn upsert_environment(
        &self,
        project_id: u64,
        environment_id: u64,
        name: &str,
        cluster: &str,
        namespace: &str,
    ) -> CacheResult<()> {
        let entity = Entity::environment(project_id, environment_id, name, cluster, namespace);
        let result = self.upsert_entity(&entity).await;
        if let Err(err) = &result {
            tracing::error!(
                error = %err,
                project_id,
                environment_id,
                cluster,
                namespace,
                "cache upsert environment failed"
            );
        }
        record_mutation(ResourceKind::Environment, "upsert", &result);
        result
    }

    /// Removes both environment keys in one call. The caller supplies the
    /// cluster and namespace the environment was last written with.
    pub async fn del_environment(
        &self,
        project_id: u64,
        environment_id: u64,
        cluster: &str,
        namespace: &str,
    ) -> CacheResult<()> {
        let fields = [
            cache_key(ResourceKind::Environment, environment_id),
            env_cache_key(cluster, namespace),
        ];
        let result = self.backend.remove_entries(MODEL_CACHE_KEY, &fields).await;
        if let Err(err) = &result {
            tracing::error!(
                error = %err,
                project_id,
                environment_id,
                cluster,
                namespace,
                "cache delete environment failed"
            );
        }
        record_mutation(ResourceKind::Environment, "delete", &result);
        result
    }

    pub async fn upsert_virtual_space(&self, virtual_space_id: u64, name: &str) -> CacheResult<()> {
        let result = self
            .upsert_entity(&Entity::virtual_space(virtual_space_id, name))
            .await;
        if let Err(err) = &result {
            tracing::error!(
                error = %err,
                virtual_space_id,
                virtual_space_name = name,
                "cache upsert virtual space failed"
            );
        }
        record_mutation(ResourceKind::VirtualSpace, "upsert", &result);
        result
    }

    pub async fn del_virtual_space(&self, virtual_space_id: u64) -> CacheResult<()> {
        let result = self
            .backend
            .remove_entries(
                MODEL_CACHE_KEY,
                &[cache_key(ResourceKind::VirtualSpace, virtual_space_id)],
            )
            .await;
        if let Err(err) = &result {
            tracing::error!(
                error = %err,
                virtual_space_id,
                "cache delete virtual space failed"
            );
        }
        record_mutation(ResourceKind::VirtualSpace, "delete", &result);
        result
    }
}
