//! Onboarding endpoints. These run behind `require_session` only: the caller
//! is authenticated but may not belong to any tenant yet.

use axum::{extract::State, Extension};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use super::invitations;
use crate::database::models::access_request::{NewAccessRequest, ACCESS_REQUEST_RULES};
use crate::database::models::invitation::{AcceptInvitation, ACCEPT_RULES};
use crate::database::models::tenant::{NewTenant, TENANT_RULES};
use crate::database::models::user::{ProfileInput, PROFILE_RULES};
use crate::database::models::{from_row, AccessRequest, Invitation, Tenant, User};
use crate::database::{Query, Row, SortDirection, StoreError};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Principal};
use crate::services::onboarding;
use crate::state::AppState;
use crate::types::RequestStatus;
use crate::validation::{self, is_slug, slugify, Payload};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupStatus {
    pub user: Option<User>,
    pub tenant: Option<Tenant>,
    pub pending_requests: Vec<AccessRequest>,
    pub needs_setup: bool,
}

#[derive(Debug, Serialize)]
pub struct Onboarded {
    pub tenant: Tenant,
    pub user: User,
}

async fn find_tenant(state: &AppState, user: &User) -> Result<Option<Tenant>, ApiError> {
    let Some(tenant_id) = user.tenant_id else {
        return Ok(None);
    };
    let row = state
        .store()
        .select_one(&Query::from("tenants").eq("id", tenant_id.to_string()))
        .await?;
    Ok(row.map(from_row).transpose()?)
}

/// GET /api/setup/status
pub async fn status(State(state): State<AppState>, Extension(principal): Extension<Principal>) -> ApiResult<SetupStatus> {
    let store = state.store();
    let user = onboarding::find_user(store, principal.user_id).await?;

    let tenant = match &user {
        Some(user) => find_tenant(&state, user).await?,
        None => None,
    };

    let query = Query::from("tenant_access_requests")
        .eq("user_id", principal.user_id.to_string())
        .eq("status", RequestStatus::Pending.as_str())
        .order("created_at", SortDirection::Desc);
    let pending_requests = store
        .select(&query)
        .await?
        .into_iter()
        .map(from_row::<AccessRequest>)
        .collect::<Result<Vec<_>, _>>()?;

    let needs_setup = !matches!((&user, &tenant), (Some(u), Some(t)) if u.is_active && t.is_active());
    Ok(ApiResponse::success(SetupStatus {
        user,
        tenant,
        pending_requests,
        needs_setup,
    }))
}

/// POST /api/setup/profile - create or refresh the caller's user row
pub async fn profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Payload(body): Payload,
) -> ApiResult<User> {
    let input: ProfileInput = validation::parse(&body, PROFILE_RULES)?;
    let user = onboarding::ensure_user(state.store(), principal.user_id, &principal.email, input.full_name).await?;
    Ok(ApiResponse::success(user))
}

/// POST /api/setup/tenant - the caller becomes the new tenant's admin
pub async fn tenant(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Payload(body): Payload,
) -> ApiResult<Onboarded> {
    let input: NewTenant = validation::parse(&body, TENANT_RULES)?;
    let slug = input.slug.unwrap_or_else(|| slugify(&input.name));
    if !is_slug(&slug) {
        return Err(ApiError::field("slug", "Slug must contain lowercase letters, digits and dashes"));
    }

    let store = state.store();
    let user = onboarding::ensure_user(store, principal.user_id, &principal.email, None).await?;
    let (tenant, user) = onboarding::create_tenant(store, &state.config.tenancy, &user, &input.name, &slug).await?;

    Ok(ApiResponse::created(Onboarded { tenant, user }).message("Tenant created"))
}

/// POST /api/setup/access-requests - ask to join a tenant by slug
pub async fn request_access(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Payload(body): Payload,
) -> ApiResult<AccessRequest> {
    let input: NewAccessRequest = validation::parse(&body, ACCESS_REQUEST_RULES)?;
    let store = state.store();

    let user = onboarding::ensure_user(store, principal.user_id, &principal.email, None).await?;
    if user.tenant_id.is_some() {
        return Err(ApiError::conflict("You already belong to a tenant"));
    }

    let tenant = onboarding::find_tenant_by_slug(store, &input.tenant_slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant not found"))?;
    if !tenant.is_active() {
        return Err(ApiError::forbidden("Tenant is not accepting members"));
    }

    let mut row = Row::new();
    row.insert("tenant_id".into(), json!(tenant.id));
    row.insert("user_id".into(), json!(user.id));
    row.insert("message".into(), json!(input.message));
    row.insert("status".into(), json!(RequestStatus::Pending));
    row.insert("reviewed_by".into(), json!(null));
    row.insert("reviewed_at".into(), json!(null));

    let request: AccessRequest = match store.insert("tenant_access_requests", row).await {
        Ok(row) => from_row(row)?,
        Err(StoreError::UniqueViolation(_)) => {
            return Err(ApiError::conflict("A request to join this tenant is already pending"));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(tenant_id = %tenant.id, user_id = %user.id, "Access requested");
    Ok(ApiResponse::created(request))
}

/// POST /api/setup/invitations/accept
pub async fn accept_invitation(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Payload(body): Payload,
) -> ApiResult<Onboarded> {
    let input: AcceptInvitation = validation::parse(&body, ACCEPT_RULES)?;
    let store = state.store();

    let query = Query::from("invitations").eq("token_hash", onboarding::hash_token(input.token.trim()));
    let invitation: Invitation = store
        .select_one(&query)
        .await?
        .map(from_row)
        .transpose()?
        .ok_or_else(|| ApiError::not_found("Invitation not found"))?;

    if invitation.status != RequestStatus::Pending {
        return Err(ApiError::conflict(format!("Invitation has already been {}", invitation.status)));
    }
    if invitation.is_expired(Utc::now()) {
        invitations::close(store, &invitation, RequestStatus::Expired).await?;
        return Err(ApiError::bad_request("Invitation has expired"));
    }
    if !invitation.email.eq_ignore_ascii_case(&principal.email) {
        tracing::warn!(invitation_id = %invitation.id, user_id = %principal.user_id, "Invitation email mismatch");
        return Err(ApiError::forbidden("This invitation was issued to a different email"));
    }

    let user = onboarding::ensure_user(store, principal.user_id, &principal.email, None).await?;
    if user.tenant_id.is_some() {
        return Err(ApiError::conflict("You already belong to a tenant"));
    }

    let tenant: Tenant = store
        .select_one(&Query::from("tenants").eq("id", invitation.tenant_id.to_string()))
        .await?
        .map(from_row)
        .transpose()?
        .ok_or_else(|| ApiError::not_found("Tenant not found"))?;
    if !tenant.is_active() {
        return Err(ApiError::forbidden("Tenant is not accepting members"));
    }
    onboarding::ensure_user_capacity(store, &tenant).await?;

    let user = onboarding::link_user(store, user.id, tenant.id, invitation.role).await?;
    invitations::close(store, &invitation, RequestStatus::Accepted).await?;

    tracing::info!(tenant_id = %tenant.id, user_id = %user.id, "Invitation accepted");
    Ok(ApiResponse::success(Onboarded { tenant, user }).message("Invitation accepted"))
}
