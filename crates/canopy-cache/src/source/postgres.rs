//! Postgres-backed relational source.
//!
//! # What this module is
//! Read-only queries (via `sqlx`) against the tenancy schema owned by the
//! management service. It never writes and never runs migrations.
//!
//! # Expected schema
//! - `tenants(id, tenant_name)`, `projects(id, project_name, tenant_id)`
//! - `clusters(id, cluster_name)`,
//!   `environments(id, environment_name, namespace, project_id, cluster_id)`
//! - `virtual_spaces(id, virtual_space_name)`, `system_roles(id, role_code)`
//! - `tenant_user_rels`, `project_user_rels`, `environment_user_rels`,
//!   `virtual_space_user_rels`, each `(<resource>_id, user_id, role)`
//!
//! # Security notes
//! - Database URLs may contain credentials; avoid logging them.
//! - SQL text is a fixed allowlist chosen by [`ResourceKind`]; nothing is
//!   built from caller input.
use super::{
    EnvironmentRow, ProjectRow, RelationalSource, RoleBinding, TenantRow, VirtualSpaceRow,
};
use crate::entity::ResourceKind;
use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use std::time::Duration;

/// Connection settings for [`PostgresSource`].
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_ms: u64,
    pub acquire_timeout_ms: u64,
}

#[derive(Debug, Clone, FromRow)]
struct DbTenant {
    id: i64,
    name: String,
}

#[derive(Debug, Clone, FromRow)]
struct DbProject {
    id: i64,
    tenant_id: i64,
    name: String,
}

/// `cluster` comes from a LEFT JOIN and is NULL for a dangling `cluster_id`.
#[derive(Debug, Clone, FromRow)]
struct DbEnvironment {
    id: i64,
    project_id: i64,
    name: String,
    namespace: String,
    cluster: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
struct DbVirtualSpace {
    id: i64,
    name: String,
}

#[derive(Debug, Clone, FromRow)]
struct DbRoleBinding {
    resource_id: i64,
    resource_name: String,
    role: String,
}

const TENANT_BINDINGS_SQL: &str = r#"
SELECT r.tenant_id AS resource_id, t.tenant_name AS resource_name, r.role
FROM tenant_user_rels r JOIN tenants t ON t.id = r.tenant_id
WHERE r.user_id = $1 ORDER BY r.tenant_id"#;

const PROJECT_BINDINGS_SQL: &str = r#"
SELECT r.project_id AS resource_id, p.project_name AS resource_name, r.role
FROM project_user_rels r JOIN projects p ON p.id = r.project_id
WHERE r.user_id = $1 ORDER BY r.project_id"#;

const ENVIRONMENT_BINDINGS_SQL: &str = r#"
SELECT r.environment_id AS resource_id, e.environment_name AS resource_name, r.role
FROM environment_user_rels r JOIN environments e ON e.id = r.environment_id
WHERE r.user_id = $1 ORDER BY r.environment_id"#;

const VIRTUAL_SPACE_BINDINGS_SQL: &str = r#"
SELECT r.virtual_space_id AS resource_id, v.virtual_space_name AS resource_name, r.role
FROM virtual_space_user_rels r JOIN virtual_spaces v ON v.id = r.virtual_space_id
WHERE r.user_id = $1 ORDER BY r.virtual_space_id"#;

fn bindings_sql(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Tenant => TENANT_BINDINGS_SQL,
        ResourceKind::Project => PROJECT_BINDINGS_SQL,
        ResourceKind::Environment => ENVIRONMENT_BINDINGS_SQL,
        ResourceKind::VirtualSpace => VIRTUAL_SPACE_BINDINGS_SQL,
    }
}

fn row_id(value: i64) -> CacheResult<u64> {
    u64::try_from(value)
        .map_err(|_| CacheError::SourceUnavailable(format!("negative id in row: {value}")))
}

fn db_id(value: u64) -> CacheResult<i64> {
    i64::try_from(value)
        .map_err(|_| CacheError::SourceUnavailable(format!("id out of range: {value}")))
}

/// Relational source backed by a Postgres pool.
///
/// # Example
/// ```rust,no_run
/// use canopy_cache::source::postgres::{PostgresConfig, PostgresSource};
///
/// async fn open(pg: PostgresConfig) {
///     let _ = PostgresSource::connect(&pg).await;
/// }
/// ```
pub struct PostgresSource {
    pool: PgPool,
}

impl PostgresSource {
    pub async fn connect(pg: &PostgresConfig) -> CacheResult<Self> {
        // Bound both connection setup and pool waits so startup and hot-path
        // reads fail fast instead of hanging on an unreachable database.
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let connect = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options);
        let pool = tokio::time::timeout(Duration::from_millis(pg.connect_timeout_ms), connect)
            .await
            .map_err(|_| CacheError::SourceUnavailable("postgres connect timed out".into()))??;
        Ok(Self { pool })
    }

    /// Wrap an existing pool (tests and callers that share one pool).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RelationalSource for PostgresSource {
    async fn list_tenants(&self) -> CacheResult<Vec<TenantRow>> {
        let rows = sqlx::query_as::<_, DbTenant>(
            r#"SELECT id, tenant_name AS name FROM tenants ORDER BY id"#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                Ok(TenantRow {
                    id: row_id(row.id)?,
                    name: row.name,
                })
            })
            .collect()
    }

    async fn list_projects(&self) -> CacheResult<Vec<ProjectRow>> {
        let rows = sqlx::query_as::<_, DbProject>(
            r#"SELECT id, tenant_id, project_name AS name FROM projects ORDER BY id"#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                Ok(ProjectRow {
                    id: row_id(row.id)?,
                    tenant_id: row_id(row.tenant_id)?,
                    name: row.name,
                })
            })
            .collect()
    }

    async fn list_environments(&self) -> CacheResult<Vec<EnvironmentRow>> {
        let rows = sqlx::query_as::<_, DbEnvironment>(
            r#"
            SELECT e.id, e.project_id, e.environment_name AS name, e.namespace,
                   c.cluster_name AS cluster
            FROM environments e LEFT JOIN clusters c ON c.id = e.cluster_id
            ORDER BY e.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                Ok(EnvironmentRow {
                    id: row_id(row.id)?,
                    project_id: row_id(row.project_id)?,
                    name: row.name,
                    namespace: row.namespace,
                    cluster: row.cluster,
                })
            })
            .collect()
    }

    async fn list_virtual_spaces(&self) -> CacheResult<Vec<VirtualSpaceRow>> {
        let rows = sqlx::query_as::<_, DbVirtualSpace>(
            r#"SELECT id, virtual_space_name AS name FROM virtual_spaces ORDER BY id"#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                Ok(VirtualSpaceRow {
                    id: row_id(row.id)?,
                    name: row.name,
                })
            })
            .collect()
    }

    async fn system_role(&self, role_id: u64) -> CacheResult<Option<String>> {
        let role = sqlx::query_scalar::<_, String>(
            r#"SELECT role_code FROM system_roles WHERE id = $1"#,
        )
        .bind(db_id(role_id)?)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn role_bindings(
        &self,
        user_id: u64,
        kind: ResourceKind,
    ) -> CacheResult<Vec<RoleBinding>> {
        let rows = sqlx::query_as::<_, DbRoleBinding>(bindings_sql(kind))
            .bind(db_id(user_id)?)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(RoleBinding {
                    resource_id: row_id(row.resource_id)?,
                    resource_name: row.resource_name,
                    role: row.role,
                })
            })
            .collect()
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
