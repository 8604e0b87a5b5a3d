//! Per-user authority: cached read with recompute on miss.
use super::ModelCache;
use crate::authority::{UserAuthority, UserRef, UserResource, admin_role};
use crate::entity::ResourceKind;
use crate::keys::user_authority_key;

impl ModelCache {
    /// Cached authority of `user`, recomputed when absent or unreadable.
    ///
    /// Never fails: every error degrades to a recompute via
    /// [`ModelCache::flush_user_authority`].
    pub async fn get_user_authority(&self, user: &UserRef) -> UserAuthority {
        let key = user_authority_key(&user.username);
        match self.backend.get_value(&key).await {
            Ok(Some(raw)) => match serde_json::from_slice::<UserAuthority>(&raw) {
                Ok(authority) => {
                    metrics::counter!("canopy_authority_lookups_total", "outcome" => "hit")
                        .increment(1);
                    return authority;
                }
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        user = %user.username,
                        "cached user authority is malformed, recomputing"
                    );
                }
            },
            Ok(None) => {
                tracing::debug!(user = %user.username, "user authority not cached");
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    user = %user.username,
                    "failed to read cached user authority"
                );
            }
        }
        metrics::counter!("canopy_authority_lookups_total", "outcome" => "miss").increment(1);
        self.flush_user_authority(user).await
    }

    /// Recompute the authority of `user` from the relational source and
    /// cache it for the configured TTL.
    ///
    /// Each failing query contributes nothing and is logged; a failed cache
    /// write is logged and the computed value is still returned.
    pub async fn flush_user_authority(&self, user: &UserRef) -> UserAuthority {
        let mut authority = UserAuthority::default();

        match self.source.system_role(user.system_role_id).await {
            Ok(Some(role)) => authority.system_role = role,
            Ok(None) => {
                tracing::warn!(
                    user = %user.username,
                    system_role_id = user.system_role_id,
                    "system role not found"
                );
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    user = %user.username,
                    system_role_id = user.system_role_id,
                    "failed to load system role"
                );
            }
        }

        for kind in ResourceKind::ALL {
            let bindings = match self.source.role_bindings(user.id, kind).await {
                Ok(bindings) => bindings,
                Err(err) => {
                    tracing::error!(
                        error = %err,
                        user = %user.username,
                        kind = %kind,
                        "failed to load role bindings"
                    );
                    continue;
                }
            };
            let admin = admin_role(kind);
            authority
                .resources_mut(kind)
                .extend(bindings.into_iter().map(|binding| UserResource {
                    is_admin: binding.role == admin,
                    id: binding.resource_id,
                    name: binding.resource_name,
                    role: binding.role,
                }));
        }

        let key = user_authority_key(&user.username);
        match serde_json::to_vec(&authority) {
            Ok(raw) => {
                if let Err(err) = self
                    .backend
                    .put_value(&key, raw, self.config.authority_ttl)
                    .await
                {
                    tracing::error!(
                        error = %err,
                        user = %user.username,
                        "failed to cache user authority"
                    );
                }
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    user = %user.username,
                    "failed to encode user authority"
                );
            }
        }
        authority
    }
}
