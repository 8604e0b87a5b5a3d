//! Per-user authority model.
//!
//! # Purpose
//! The flattened set of roles a user holds across every resource kind, as
//! handed to the policy layer. Computed by
//! [`ModelCache::flush_user_authority`](crate::ModelCache::flush_user_authority)
//! and cached per user with a TTL.
//!
//! # Notes
//! The lookup helpers only read data; deciding what a role permits is the
//! policy layer's job.
use crate::entity::ResourceKind;
use serde::{Deserialize, Serialize};

pub const SYSTEM_ROLE_ADMIN: &str = "sysadmin";
pub const TENANT_ROLE_ADMIN: &str = "admin";
pub const TENANT_ROLE_ORDINARY: &str = "ordinary";
pub const PROJECT_ROLE_ADMIN: &str = "admin";
pub const PROJECT_ROLE_DEV: &str = "dev";
pub const PROJECT_ROLE_TEST: &str = "test";
pub const PROJECT_ROLE_OPS: &str = "ops";
pub const ENVIRONMENT_ROLE_OPERATOR: &str = "operator";
pub const ENVIRONMENT_ROLE_READER: &str = "reader";
pub const VIRTUAL_SPACE_ROLE_ADMIN: &str = "admin";
pub const VIRTUAL_SPACE_ROLE_NORMAL: &str = "normal";

/// The administrative role name for resources of `kind`.
pub fn admin_role(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Tenant => TENANT_ROLE_ADMIN,
        ResourceKind::Project => PROJECT_ROLE_ADMIN,
        ResourceKind::Environment => ENVIRONMENT_ROLE_OPERATOR,
        ResourceKind::VirtualSpace => VIRTUAL_SPACE_ROLE_ADMIN,
    }
}

/// Identity of the user an authority is computed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: u64,
    pub username: String,
    pub system_role_id: u64,
}

impl UserRef {
    pub fn new(id: u64, username: impl Into<String>, system_role_id: u64) -> Self {
        Self {
            id,
            username: username.into(),
            system_role_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResource {
    pub id: u64,
    pub name: String,
    pub role: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAuthority {
    pub system_role: String,
    pub tenants: Vec<UserResource>,
    pub projects: Vec<UserResource>,
    pub environments: Vec<UserResource>,
    pub virtual_spaces: Vec<UserResource>,
}

impl UserAuthority {
    pub fn is_system_admin(&self) -> bool {
        self.system_role == SYSTEM_ROLE_ADMIN
    }

    pub fn resources(&self, kind: ResourceKind) -> &[UserResource] {
        match kind {
            ResourceKind::Tenant => &self.tenants,
            ResourceKind::Project => &self.projects,
            ResourceKind::Environment => &self.environments,
            ResourceKind::VirtualSpace => &self.virtual_spaces,
        }
    }

    pub(crate) fn resources_mut(&mut self, kind: ResourceKind) -> &mut Vec<UserResource> {
        match kind {
            ResourceKind::Tenant => &mut self.tenants,
            ResourceKind::Project => &mut self.projects,
            ResourceKind::Environment => &mut self.environments,
            ResourceKind::VirtualSpace => &mut self.virtual_spaces,
        }
    }

    /// Role held on `(kind, id)`, if any.
    pub fn role_of(&self, kind: ResourceKind, id: u64) -> Option<&str> {
        self.resources(kind)
            .iter()
            .find(|resource| resource.id == id)
            .map(|resource| resource.role.as_str())
    }

    pub fn is_admin_of(&self, kind: ResourceKind, id: u64) -> bool {
        self.resources(kind)
            .iter()
            .any(|resource| resource.id == id && resource.is_admin)
    }
}
