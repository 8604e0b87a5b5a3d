//! Cache key scheme.
//!
//! All tenancy entities live as fields of one hash stored under
//! [`MODEL_CACHE_KEY`]. Field names are derived here:
//! - `{kind}_{id}` for every entity (`tenant_1`, `environment_7`)
//! - `env:{len(cluster)}:{cluster}:{namespace}` for the environment lookup by
//!   cluster and namespace
//!
//! No kind name starts with `env:`, so the two families never collide, and the
//! length prefix keeps `(cluster, namespace)` pairs apart even when a name
//! contains `:`.
use crate::entity::ResourceKind;

/// Top-level key of the model map.
pub const MODEL_CACHE_KEY: &str = "_model_cache";

/// Deepest ownership chain in the model (environment -> project -> tenant).
pub const MAX_TREE_DEPTH: usize = 2;

const USER_AUTHORITY_PREFIX: &str = "user_authority_data__";

pub fn cache_key(kind: ResourceKind, id: u64) -> String {
    format!("{}_{id}", kind.as_str())
}

pub fn env_cache_key(cluster: &str, namespace: &str) -> String {
    format!("env:{}:{cluster}:{namespace}", cluster.len())
}

/// Key of the per-user authority value (a plain key, not a map field).
pub fn user_authority_key(username: &str) -> String {
    format!("{USER_AUTHORITY_PREFIX}{username}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn entity_keys_are_kind_and_id() {
        assert_eq!(cache_key(ResourceKind::Tenant, 1), "tenant_1");
        assert_eq!(cache_key(ResourceKind::Project, 22), "project_22");
        assert_eq!(cache_key(ResourceKind::Environment, 3), "environment_3");
        assert_eq!(cache_key(ResourceKind::VirtualSpace, 4), "virtualspace_4");
    }

    #[test]
    fn entity_keys_do_not_collide_across_kinds() {
        let mut seen = HashSet::new();
        for kind in ResourceKind::ALL {
            for id in [0, 1, 11, 111] {
                assert!(seen.insert(cache_key(kind, id)));
            }
        }
    }

    #[test]
    fn env_keys_keep_ambiguous_pairs_apart() {
        assert_ne!(env_cache_key("a:b", "c"), env_cache_key("a", "b:c"));
        assert_eq!(env_cache_key("c1", "ns1"), env_cache_key("c1", "ns1"));
    }

    #[test]
    fn env_keys_are_disjoint_from_entity_keys() {
        let env = env_cache_key("tenant", "1");
        for kind in ResourceKind::ALL {
            assert!(!env.starts_with(kind.as_str()));
        }
        assert_ne!(env_cache_key("", ""), MODEL_CACHE_KEY);
    }

    #[test]
    fn authority_key_embeds_username() {
        assert_eq!(user_authority_key("alice"), "user_authority_data__alice");
    }
}
