//! Tenancy entity model.
//!
//! # Purpose
//! Defines the cached representation of one tenancy-tree node (tenant,
//! project, environment or virtual-space) and its JSON wire form.
//!
//! # Key invariants
//! - `(kind, id)` identifies an entity; it is the basis of its cache key.
//! - Parent references live on the [`Node`] variant, so a virtual-space or a
//!   tenant cannot carry an owner and a project cannot lack one.
//! - The wire form is a flat record (`kind`, `owners`, optional
//!   `cluster`/`namespace`); decoding rejects records whose owners do not
//!   match their kind.
use crate::error::{CacheError, CacheResult};
use crate::keys::{cache_key, env_cache_key};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a tenancy resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Tenant,
    Project,
    Environment,
    VirtualSpace,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Tenant,
        ResourceKind::Project,
        ResourceKind::Environment,
        ResourceKind::VirtualSpace,
    ];

    /// Canonical lowercase name, used in cache keys and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Tenant => "tenant",
            ResourceKind::Project => "project",
            ResourceKind::Environment => "environment",
            ResourceKind::VirtualSpace => "virtualspace",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| format!("unknown resource kind: {value}"))
    }
}

/// Weak reference to a parent entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: ResourceKind,
    pub id: u64,
}

impl OwnerRef {
    pub fn new(kind: ResourceKind, id: u64) -> Self {
        Self { kind, id }
    }

    pub fn cache_key(&self) -> String {
        cache_key(self.kind, self.id)
    }
}

/// Per-kind shape of a node, including its parent link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Tenant,
    Project {
        tenant_id: u64,
    },
    Environment {
        project_id: u64,
        cluster: String,
        namespace: String,
    },
    /// Virtual-spaces sit outside the tenant tree and have no owner.
    VirtualSpace,
}

/// One cached tenancy node.
///
/// # Example
/// ```rust
/// use canopy_cache::{Entity, OwnerRef, ResourceKind};
///
/// let project = Entity::project(1, 2, "web");
/// assert_eq!(project.kind(), ResourceKind::Project);
/// assert_eq!(project.owners(), vec![OwnerRef::new(ResourceKind::Tenant, 1)]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "EntityRecord", try_from = "EntityRecord")]
pub struct Entity {
    pub id: u64,
    pub name: String,
    pub node: Node,
}

impl Entity {
    pub fn tenant(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            node: Node::Tenant,
        }
    }

    pub fn project(tenant_id: u64, id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            node: Node::Project { tenant_id },
        }
    }

    pub fn environment(
        project_id: u64,
        id: u64,
        name: impl Into<String>,
        cluster: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            node: Node::Environment {
                project_id,
                cluster: cluster.into(),
                namespace: namespace.into(),
            },
        }
    }

    pub fn virtual_space(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            node: Node::VirtualSpace,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self.node {
            Node::Tenant => ResourceKind::Tenant,
            Node::Project { .. } => ResourceKind::Project,
            Node::Environment { .. } => ResourceKind::Environment,
            Node::VirtualSpace => ResourceKind::VirtualSpace,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owner references, nearest first. Empty for tenants and virtual-spaces.
    pub fn owners(&self) -> Vec<OwnerRef> {
        match self.node {
            Node::Tenant | Node::VirtualSpace => Vec::new(),
            Node::Project { tenant_id } => vec![OwnerRef::new(ResourceKind::Tenant, tenant_id)],
            Node::Environment { project_id, .. } => {
                vec![OwnerRef::new(ResourceKind::Project, project_id)]
            }
        }
    }

    pub fn cluster(&self) -> Option<&str> {
        match &self.node {
            Node::Environment { cluster, .. } => Some(cluster),
            _ => None,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match &self.node {
            Node::Environment { namespace, .. } => Some(namespace),
            _ => None,
        }
    }

    /// Primary key of this entity inside the model map.
    pub fn cache_key(&self) -> String {
        cache_key(self.kind(), self.id)
    }

    /// Secondary cluster/namespace key; only environments have one.
    pub fn env_cache_key(&self) -> Option<String> {
        match &self.node {
            Node::Environment {
                cluster, namespace, ..
            } => Some(env_cache_key(cluster, namespace)),
            _ => None,
        }
    }

    pub fn encode(&self) -> CacheResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|err| CacheError::Serialization(err.to_string()))
    }

    /// Decode an entity stored under `key`; `key` only feeds the error.
    pub fn decode(key: &str, raw: &[u8]) -> CacheResult<Self> {
        serde_json::from_slice(raw).map_err(|err| CacheError::Deserialization {
            key: key.to_string(),
            message: err.to_string(),
        })
    }

    /// Every `(key, bytes)` pair this entity occupies in the model map.
    ///
    /// Environments yield two pairs holding identical bytes so both lookups
    /// always agree.
    pub fn cache_entries(&self) -> CacheResult<Vec<(String, Vec<u8>)>> {
        let value = self.encode()?;
        let mut entries = Vec::with_capacity(2);
        if let Some(env_key) = self.env_cache_key() {
            entries.push((env_key, value.clone()));
        }
        entries.push((self.cache_key(), value));
        Ok(entries)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}({})", self.kind(), self.id, self.name)
    }
}

/// Flat wire form of an [`Entity`].
#[derive(Debug, Serialize, Deserialize)]
struct EntityRecord {
    id: u64,
    kind: ResourceKind,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cluster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    #[serde(default)]
    owners: Vec<OwnerRef>,
}

impl From<Entity> for EntityRecord {
    fn from(entity: Entity) -> Self {
        let kind = entity.kind();
        let owners = entity.owners();
        let (cluster, namespace) = match entity.node {
            Node::Environment {
                cluster, namespace, ..
            } => (Some(cluster), Some(namespace)),
            _ => (None, None),
        };
        EntityRecord {
            id: entity.id,
            kind,
            name: entity.name,
            cluster,
            namespace,
            owners,
        }
    }
}

impl TryFrom<EntityRecord> for Entity {
    type Error = String;

    fn try_from(record: EntityRecord) -> Result<Self, Self::Error> {
        let node = match (record.kind, record.owners.as_slice()) {
            (ResourceKind::Tenant, []) => Node::Tenant,
            (ResourceKind::VirtualSpace, []) => Node::VirtualSpace,
            (ResourceKind::Project, [owner]) if owner.kind == ResourceKind::Tenant => {
                Node::Project {
                    tenant_id: owner.id,
                }
            }
            (ResourceKind::Environment, [owner]) if owner.kind == ResourceKind::Project => {
                let (Some(cluster), Some(namespace)) = (record.cluster, record.namespace) else {
                    return Err(format!(
                        "environment {} is missing cluster or namespace",
                        record.id
                    ));
                };
                Node::Environment {
                    project_id: owner.id,
                    cluster,
                    namespace,
                }
            }
            (kind, owners) => {
                return Err(format!(
                    "{kind} {} has invalid owners: {owners:?}",
                    record.id
                ));
            }
        };
        Ok(Entity {
            id: record.id,
            name: record.name,
            node,
        })
    }
}

/// Owner list of a stored record, read without validating the rest of it.
#[derive(Debug, Deserialize)]
struct OwnerLinks {
    #[serde(default)]
    owners: Vec<OwnerRef>,
}

/// First owner of a stored record, if it can be read at all.
///
/// Traversal only needs the owner link, so a record that fails full decoding
/// can still be walked through.
pub(crate) fn first_owner(raw: &[u8]) -> Option<OwnerRef> {
    serde_json::from_slice::<OwnerLinks>(raw)
        .ok()
        .and_then(|links| links.owners.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<Entity> {
        vec![
            Entity::tenant(1, "acme"),
            Entity::project(1, 2, "web"),
            Entity::environment(2, 3, "web-prod", "c1", "ns1"),
            Entity::virtual_space(4, "mesh"),
        ]
    }

    #[test]
    fn encode_decode_preserves_every_kind() {
        for entity in samples() {
            let raw = entity.encode().expect("encode");
            let decoded = Entity::decode(&entity.cache_key(), &raw).expect("decode");
            assert_eq!(decoded, entity);
        }
    }

    #[test]
    fn wire_form_is_flat_record() {
        let raw = Entity::environment(2, 3, "web-prod", "c1", "ns1")
            .encode()
            .expect("encode");
        let value: serde_json::Value = serde_json::from_slice(&raw).expect("json");
        assert_eq!(value["kind"], "environment");
        assert_eq!(value["cluster"], "c1");
        assert_eq!(value["namespace"], "ns1");
        assert_eq!(value["owners"][0]["kind"], "project");
        assert_eq!(value["owners"][0]["id"], 2);

        let raw = Entity::virtual_space(4, "mesh").encode().expect("encode");
        let value: serde_json::Value = serde_json::from_slice(&raw).expect("json");
        assert_eq!(value["kind"], "virtualspace");
        assert_eq!(value["owners"], serde_json::json!([]));
        assert!(value.get("cluster").is_none());
    }

    #[test]
    fn owners_follow_kind() {
        assert!(Entity::tenant(1, "acme").owners().is_empty());
        assert!(Entity::virtual_space(4, "mesh").owners().is_empty());
        assert_eq!(
            Entity::environment(2, 3, "web-prod", "c1", "ns1").owners(),
            vec![OwnerRef::new(ResourceKind::Project, 2)]
        );
    }

    #[test]
    fn decode_rejects_mismatched_owners() {
        let orphan_project = br#"{"id":2,"kind":"project","name":"web","owners":[]}"#;
        let err = Entity::decode("project_2", orphan_project).expect_err("orphan project");
        assert!(matches!(err, CacheError::Deserialization { ref key, .. } if key == "project_2"));

        let owned_space =
            br#"{"id":4,"kind":"virtualspace","name":"mesh","owners":[{"kind":"tenant","id":1}]}"#;
        assert!(Entity::decode("virtualspace_4", owned_space).is_err());

        let env_without_cluster =
            br#"{"id":3,"kind":"environment","name":"e","owners":[{"kind":"project","id":2}]}"#;
        assert!(Entity::decode("environment_3", env_without_cluster).is_err());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(Entity::decode("tenant_1", b"not json").is_err());
        assert!(Entity::decode("tenant_1", br#"{"id":1,"kind":"cluster","name":"x"}"#).is_err());
    }

    #[test]
    fn environment_occupies_two_identical_entries() {
        let entries = Entity::environment(2, 3, "web-prod", "c1", "ns1")
            .cache_entries()
            .expect("entries");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, env_cache_key("c1", "ns1"));
        assert_eq!(entries[1].0, "environment_3");
        assert_eq!(entries[0].1, entries[1].1);

        let entries = Entity::tenant(1, "acme").cache_entries().expect("entries");
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn first_owner_tolerates_otherwise_broken_records() {
        let raw = br#"{"id":"nope","kind":"project","owners":[{"kind":"tenant","id":9}]}"#;
        assert!(Entity::decode("project_2", raw).is_err());
        assert_eq!(
            first_owner(raw),
            Some(OwnerRef::new(ResourceKind::Tenant, 9))
        );
        assert_eq!(first_owner(br#"{"owners":[]}"#), None);
        assert_eq!(first_owner(b"garbage"), None);
    }

    #[test]
    fn kind_parses_from_canonical_name() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.as_str().parse::<ResourceKind>(), Ok(kind));
        }
        assert!("cluster".parse::<ResourceKind>().is_err());
    }
}
