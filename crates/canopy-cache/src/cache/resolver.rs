//! Read paths over the model map: ancestry walks and point lookups.
//!
//! Reads never fail outward. A backend error or an undecodable value is
//! logged and reported as "nothing found"; callers treat that as unknown.
use super::ModelCache;
use crate::entity::{Entity, ResourceKind};
use crate::keys::{MAX_TREE_DEPTH, MODEL_CACHE_KEY, cache_key, env_cache_key};

impl ModelCache {
    /// Ancestors of `(kind, id)`, nearest first.
    ///
    /// The walk is a single backend call bounded by [`MAX_TREE_DEPTH`] hops.
    /// Parents that fail to decode are skipped; the rest are kept in order.
    pub async fn find_parents(&self, kind: ResourceKind, id: u64) -> Vec<Entity> {
        let start = cache_key(kind, id);
        let raw_parents = match self
            .backend
            .walk_owners(MODEL_CACHE_KEY, &start, MAX_TREE_DEPTH)
            .await
        {
            Ok(raw_parents) => raw_parents,
            Err(err) => {
                metrics::counter!("canopy_ancestry_lookups_total", "outcome" => "error")
                    .increment(1);
                tracing::error!(error = %err, key = %start, "ancestry lookup failed");
                return Vec::new();
            }
        };

        let mut parents = Vec::with_capacity(raw_parents.len());
        for (depth, (field, raw)) in raw_parents.iter().enumerate() {
            match Entity::decode(field, raw) {
                Ok(parent) => parents.push(parent),
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        key = %field,
                        start = %start,
                        depth = depth + 1,
                        "skipping undecodable ancestor"
                    );
                }
            }
        }

        let outcome = if parents.is_empty() { "empty" } else { "found" };
        metrics::counter!("canopy_ancestry_lookups_total", "outcome" => outcome).increment(1);
        parents
    }

    /// The cached entity stored under `(kind, id)`.
    pub async fn find_resource(&self, kind: ResourceKind, id: u64) -> Option<Entity> {
        self.lookup(&cache_key(kind, id)).await
    }

    /// The environment deployed to `cluster`/`namespace`.
    pub async fn find_environment(&self, cluster: &str, namespace: &str) -> Option<Entity> {
        self.lookup(&env_cache_key(cluster, namespace)).await
    }

    async fn lookup(&self, key: &str) -> Option<Entity> {
        let raw = match self.backend.get_entry(MODEL_CACHE_KEY, key).await {
            Ok(raw) => raw?,
            Err(err) => {
                tracing::error!(error = %err, key, "model cache lookup failed");
                return None;
            }
        };
        match Entity::decode(key, &raw) {
            Ok(entity) => Some(entity),
            Err(err) => {
                tracing::warn!(error = %err, key, "undecodable model cache entry");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CacheBackend;
    use crate::backend::memory::InMemoryBackend;
    use crate::cache::ModelCacheConfig;
    use crate::entity::OwnerRef;
    use crate::source::memory::InMemorySource;
    use std::sync::Arc;

    async fn seeded() -> (ModelCache, InMemoryBackend) {
        let backend = InMemoryBackend::new();
        let cache = ModelCache::new(
            Arc::new(backend.clone()),
            Arc::new(InMemorySource::new()),
            ModelCacheConfig::default(),
        );
        cache.upsert_tenant(1, "acme").await.expect("tenant");
        cache.upsert_project(1, 2, "web").await.expect("project");
        cache
            .upsert_environment(2, 3, "web-prod", "c1", "ns1")
            .await
            .expect("environment");
        cache.upsert_virtual_space(4, "mesh").await.expect("space");
        (cache, backend)
    }

    #[tokio::test]
    async fn parents_are_nearest_first() {
        let (cache, _) = seeded().await;
        assert_eq!(
            cache.find_parents(ResourceKind::Environment, 3).await,
            vec![Entity::project(1, 2, "web"), Entity::tenant(1, "acme")]
        );
        assert_eq!(
            cache.find_parents(ResourceKind::Project, 2).await,
            vec![Entity::tenant(1, "acme")]
        );
        assert!(cache.find_parents(ResourceKind::Tenant, 1).await.is_empty());
        assert!(
            cache
                .find_parents(ResourceKind::VirtualSpace, 4)
                .await
                .is_empty()
        );
    }

    #[tokio::test]
    async fn unknown_start_has_no_parents() {
        let (cache, _) = seeded().await;
        assert!(
            cache
                .find_parents(ResourceKind::Environment, 99)
                .await
                .is_empty()
        );
    }

    #[tokio::test]
    async fn corrupt_intermediate_is_skipped() {
        let (cache, backend) = seeded().await;
        // Owner link intact, rest of the record unreadable as an entity.
        backend
            .put_entries(
                MODEL_CACHE_KEY,
                vec![(
                    "project_2".to_string(),
                    br#"{"kind":"bogus","owners":[{"kind":"tenant","id":1}]}"#.to_vec(),
                )],
            )
            .await
            .expect("corrupt");

        assert_eq!(
            cache.find_parents(ResourceKind::Environment, 3).await,
            vec![Entity::tenant(1, "acme")]
        );
    }

    #[tokio::test]
    async fn point_lookups() {
        let (cache, backend) = seeded().await;
        let project = cache
            .find_resource(ResourceKind::Project, 2)
            .await
            .expect("project");
        assert_eq!(project.owners(), vec![OwnerRef::new(ResourceKind::Tenant, 1)]);

        let env = cache.find_environment("c1", "ns1").await.expect("env");
        assert_eq!(env.id(), 3);
        assert!(cache.find_environment("c1", "ns2").await.is_none());

        backend
            .put_entries(
                MODEL_CACHE_KEY,
                vec![("tenant_1".to_string(), b"not json".to_vec())],
            )
            .await
            .expect("corrupt");
        assert!(cache.find_resource(ResourceKind::Tenant, 1).await.is_none());
    }
}
