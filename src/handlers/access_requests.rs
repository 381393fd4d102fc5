use axum::{
    extract::{Path, State},
    Extension,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use super::invitations::MANAGERS;
use crate::database::models::access_request::{ApproveRequest, APPROVE_RULES};
use crate::database::models::AccessRequest;
use crate::database::{Row, Scoped};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::{onboarding, relations};
use crate::state::AppState;
use crate::types::{RequestStatus, RoleName};
use crate::validation::{self, parse_id, OptionalPayload};

/// Load a request that is still awaiting review
async fn pending(state: &AppState, ctx: &TenantContext, id: Uuid) -> Result<AccessRequest, ApiError> {
    let request = Scoped::<AccessRequest>::new(state.store(), ctx.tenant_id).get(id).await?;
    if request.status != RequestStatus::Pending {
        return Err(ApiError::conflict(format!("Request has already been {}", request.status)));
    }
    Ok(request)
}

async fn review(
    state: &AppState,
    ctx: &TenantContext,
    id: Uuid,
    status: RequestStatus,
) -> Result<AccessRequest, ApiError> {
    let mut patch = Row::new();
    patch.insert("status".into(), json!(status));
    patch.insert("reviewed_by".into(), json!(ctx.user_id));
    patch.insert("reviewed_at".into(), json!(Utc::now()));
    let mut request = Scoped::<AccessRequest>::new(state.store(), ctx.tenant_id)
        .update(id, patch)
        .await?;
    relations::attach_requesters(state.store(), std::slice::from_mut(&mut request)).await?;
    Ok(request)
}

/// GET /api/access-requests - pending requests for the tenant
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
) -> ApiResult<Vec<AccessRequest>> {
    ctx.require_role(MANAGERS)?;
    let requests = Scoped::<AccessRequest>::new(state.store(), ctx.tenant_id);
    let mut open = requests
        .list(&[("status", json!(RequestStatus::Pending))])
        .await?;
    relations::attach_requesters(state.store(), &mut open).await?;
    Ok(ApiResponse::success(open))
}

/// POST /api/access-requests/:id/approve
pub async fn approve(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
    OptionalPayload(body): OptionalPayload,
) -> ApiResult<AccessRequest> {
    ctx.require_role(MANAGERS)?;
    let id = parse_id(&id)?;
    let input: ApproveRequest = match body {
        Some(body) => validation::parse(&body, APPROVE_RULES)?,
        None => ApproveRequest { role: None },
    };

    let store = state.store();
    let request = pending(&state, &ctx, id).await?;
    onboarding::ensure_user_capacity(store, &ctx.tenant).await?;

    let user = onboarding::find_user(store, request.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User profile not found"))?;
    if user.tenant_id.is_some() {
        return Err(ApiError::conflict("User already belongs to a tenant"));
    }

    let role = input.role.unwrap_or(RoleName::Member);
    onboarding::link_user(store, user.id, ctx.tenant_id, role).await?;
    let request = review(&state, &ctx, id, RequestStatus::Accepted).await?;

    tracing::info!(tenant_id = %ctx.tenant_id, request_id = %id, user_id = %user.id, role = %role, "Access request approved");
    Ok(ApiResponse::success(request).message("Access request approved"))
}

/// POST /api/access-requests/:id/reject
pub async fn reject(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult<AccessRequest> {
    ctx.require_role(MANAGERS)?;
    let id = parse_id(&id)?;
    pending(&state, &ctx, id).await?;

    let request = review(&state, &ctx, id, RequestStatus::Rejected).await?;
    tracing::info!(tenant_id = %ctx.tenant_id, request_id = %id, "Access request rejected");
    Ok(ApiResponse::success(request).message("Access request rejected"))
}
