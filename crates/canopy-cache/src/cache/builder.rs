//! Cold-start rebuild of the model map.
//!
//! Loads the full tenancy tree from the relational source and writes it to
//! the backend in a single bulk write. This is a full snapshot, never an
//! incremental repair; partial rebuilds are not supported.
use super::ModelCache;
use crate::entity::Entity;
use crate::error::CacheResult;
use crate::keys::MODEL_CACHE_KEY;

/// What a bootstrap call ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The model map was already present; nothing was read or written.
    AlreadyBuilt,
    /// The relational source holds no tenancy rows; nothing was written.
    Empty,
    /// The map was written with this many fields.
    Built { entries: usize },
}

impl BuildOutcome {
    fn label(&self) -> &'static str {
        match self {
            BuildOutcome::AlreadyBuilt => "already_built",
            BuildOutcome::Empty => "empty",
            BuildOutcome::Built { .. } => "built",
        }
    }
}

impl ModelCache {
    /// Populate the model map from the relational source unless it exists.
    ///
    /// Idempotent: a second call against a populated cache is a no-op.
    /// Environments whose cluster cannot be resolved are skipped with a
    /// warning. Any read or write failure aborts and is returned; keys that
    /// were already written are left in place for the next rebuild to
    /// overwrite.
    pub async fn build_cache_if_not_exist(&self) -> CacheResult<BuildOutcome> {
        let outcome = self.build_if_absent().await;
        match &outcome {
            Ok(done) => {
                metrics::counter!("canopy_cache_rebuilds_total", "outcome" => done.label())
                    .increment(1);
                if let BuildOutcome::Built { entries } = done {
                    metrics::gauge!("canopy_cache_entries").set(*entries as f64);
                }
            }
            Err(err) => {
                metrics::counter!("canopy_cache_rebuilds_total", "outcome" => "failed")
                    .increment(1);
                tracing::error!(error = %err, "failed to rebuild model cache");
            }
        }
        outcome
    }

    async fn build_if_absent(&self) -> CacheResult<BuildOutcome> {
        if self.backend.map_exists(MODEL_CACHE_KEY).await? {
            tracing::debug!("model cache already present, skipping rebuild");
            return Ok(BuildOutcome::AlreadyBuilt);
        }

        let mut entries = Vec::new();

        for tenant in self.source.list_tenants().await? {
            entries.extend(Entity::tenant(tenant.id, tenant.name).cache_entries()?);
        }

        for project in self.source.list_projects().await? {
            entries.extend(
                Entity::project(project.tenant_id, project.id, project.name).cache_entries()?,
            );
        }

        for env in self.source.list_environments().await? {
            let Some(cluster) = env.cluster else {
                tracing::warn!(
                    environment_id = env.id,
                    project_id = env.project_id,
                    namespace = %env.namespace,
                    "environment cluster not found, skipping"
                );
                continue;
            };
            entries.extend(
                Entity::environment(env.project_id, env.id, env.name, cluster, env.namespace)
                    .cache_entries()?,
            );
        }

        for space in self.source.list_virtual_spaces().await? {
            entries.extend(Entity::virtual_space(space.id, space.name).cache_entries()?);
        }

        if entries.is_empty() {
            tracing::info!("no tenancy data found, model cache left empty");
            return Ok(BuildOutcome::Empty);
        }

        let count = entries.len();
        self.backend.put_entries(MODEL_CACHE_KEY, entries).await?;
        tracing::info!(
            entries = count,
            backend = self.backend.backend_name(),
            "model cache rebuilt"
        );
        Ok(BuildOutcome::Built { entries: count })
    }
}
