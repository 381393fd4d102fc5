use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use uuid::Uuid;

use super::session::Principal;
use crate::database::models::{from_row, Role, Tenant, User, UserRole};
use crate::database::{DataStore, Query, StoreError};
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::RoleName;

/// Tenant context for the current request. Tenant identity always comes
/// from the caller's user row, never from the client.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantContext {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub user: User,
    pub tenant: Tenant,
    pub roles: Vec<RoleName>,
}

impl TenantContext {
    pub fn has_role(&self, role: RoleName) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(RoleName::Admin)
    }

    /// Forbidden unless the caller holds at least one of `allowed`
    pub fn require_role(&self, allowed: &[RoleName]) -> Result<(), ApiError> {
        if allowed.iter().any(|role| self.has_role(*role)) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %self.user_id,
                tenant_id = %self.tenant_id,
                "Role check failed"
            );
            Err(ApiError::forbidden("You do not have permission to perform this action"))
        }
    }
}

/// Tenant middleware: must run after `require_session`
pub async fn require_tenant(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = request
        .extensions()
        .get::<Principal>()
        .cloned()
        .ok_or_else(ApiError::not_authenticated)?;

    let context = load_tenant_context(state.store(), &principal, &state.config.tenancy.setup_path).await?;

    tracing::debug!(
        tenant_id = %context.tenant_id,
        user_id = %context.user_id,
        "Tenant context loaded"
    );
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

fn store_failure(err: StoreError) -> ApiError {
    tracing::error!("Failed to load tenant context: {}", err);
    ApiError::not_authenticated()
}

/// Load user, tenant and roles for a principal. Any store failure or missing
/// row fails closed as 401; a user without an active tenant is sent to setup.
pub async fn load_tenant_context(
    store: &dyn DataStore,
    principal: &Principal,
    setup_path: &str,
) -> Result<TenantContext, ApiError> {
    let user_row = store
        .select_one(&Query::from("users").eq("id", principal.user_id.to_string()))
        .await
        .map_err(store_failure)?
        .ok_or_else(|| {
            tracing::debug!(user_id = %principal.user_id, "No user row for principal");
            ApiError::not_authenticated()
        })?;

    let user: User = from_row(user_row).map_err(|e| {
        tracing::error!("Malformed user row: {}", e);
        ApiError::not_authenticated()
    })?;

    let tenant_id = match user.tenant_id {
        Some(tenant_id) if user.is_active => tenant_id,
        _ => {
            tracing::debug!(user_id = %user.id, "User has no active tenant");
            return Err(ApiError::no_tenant(setup_path));
        }
    };

    let tenant_row = store
        .select_one(&Query::from("tenants").eq("id", tenant_id.to_string()))
        .await
        .map_err(store_failure)?
        .ok_or_else(|| {
            tracing::warn!(user_id = %user.id, tenant_id = %tenant_id, "User linked to missing tenant");
            ApiError::not_authenticated()
        })?;
    let tenant: Tenant = from_row(tenant_row).map_err(|e| {
        tracing::error!("Malformed tenant row: {}", e);
        ApiError::not_authenticated()
    })?;

    let roles = load_roles(store, user.id, tenant_id).await.map_err(store_failure)?;

    Ok(TenantContext {
        tenant_id,
        user_id: user.id,
        user,
        tenant,
        roles,
    })
}

/// Role names granted to a user within one tenant
pub async fn load_roles(store: &dyn DataStore, user_id: Uuid, tenant_id: Uuid) -> Result<Vec<RoleName>, StoreError> {
    let links = store
        .select(
            &Query::from("user_roles")
                .eq("user_id", user_id.to_string())
                .eq("tenant_id", tenant_id.to_string()),
        )
        .await?;

    let role_ids: Vec<String> = links
        .into_iter()
        .filter_map(|row| from_row::<UserRole>(row).ok())
        .map(|link| link.role_id.to_string())
        .collect();
    if role_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut roles: Vec<RoleName> = store
        .select(&Query::from("roles").in_list("id", role_ids))
        .await?
        .into_iter()
        .filter_map(|row| from_row::<Role>(row).ok())
        .map(|role| role.name)
        .collect();
    roles.sort_by_key(|r| r.as_str());
    roles.dedup();
    Ok(roles)
}
