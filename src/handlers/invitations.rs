use axum::{
    extract::{Path, State},
    Extension,
};
use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::json;

use crate::database::models::invitation::{NewInvitation, INVITATION_RULES};
use crate::database::models::{from_row, Invitation, User};
use crate::database::{DataStore, Query, Row, Scoped, StoreError};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::onboarding;
use crate::state::AppState;
use crate::types::{RequestStatus, RoleName};
use crate::validation::{self, parse_id, Payload};

/// Roles allowed to manage who joins the tenant
pub const MANAGERS: &[RoleName] = &[RoleName::Admin, RoleName::Gestor];

/// A freshly issued invitation. The raw token is only ever returned here.
#[derive(Debug, Serialize)]
pub struct IssuedInvitation {
    #[serde(flatten)]
    pub invitation: Invitation,
    pub token: String,
}

/// GET /api/invitations
pub async fn list(State(state): State<AppState>, Extension(ctx): Extension<TenantContext>) -> ApiResult<Vec<Invitation>> {
    ctx.require_role(MANAGERS)?;
    let invitations = Scoped::<Invitation>::new(state.store(), ctx.tenant_id).list(&[]).await?;
    Ok(ApiResponse::success(invitations))
}

/// POST /api/invitations
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Payload(body): Payload,
) -> ApiResult<IssuedInvitation> {
    ctx.require_role(MANAGERS)?;
    let input: NewInvitation = validation::parse(&body, INVITATION_RULES)?;
    let email = input.email.to_lowercase();
    let store = state.store();

    onboarding::ensure_user_capacity(store, &ctx.tenant).await?;

    let existing = store
        .select(&Query::from("users").eq("email", email.as_str()))
        .await?
        .into_iter()
        .map(from_row::<User>)
        .collect::<Result<Vec<_>, _>>()?;
    if existing.iter().any(|user| user.tenant_id == Some(ctx.tenant_id)) {
        return Err(ApiError::conflict("This user already belongs to the tenant"));
    }

    let token = onboarding::generate_token();
    let ttl = Duration::hours(state.config.security.invitation_ttl_hours as i64);

    let mut row = Row::new();
    row.insert("email".into(), json!(email));
    row.insert("role".into(), json!(input.role.unwrap_or(RoleName::Member)));
    row.insert("token_hash".into(), json!(onboarding::hash_token(&token)));
    row.insert("status".into(), json!(RequestStatus::Pending));
    row.insert("invited_by".into(), json!(ctx.user_id));
    row.insert("expires_at".into(), json!(Utc::now() + ttl));
    row.insert("accepted_at".into(), json!(null));

    let invitation = Scoped::<Invitation>::new(store, ctx.tenant_id)
        .create(row)
        .await
        .map_err(|e| match e {
            ApiError::Conflict(_) => ApiError::conflict("A pending invitation already exists for this email"),
            other => other,
        })?;

    tracing::info!(tenant_id = %ctx.tenant_id, invitation_id = %invitation.id, role = %invitation.role, "Invitation issued");
    Ok(ApiResponse::created(IssuedInvitation { invitation, token }))
}

/// DELETE /api/invitations/:id - revoke
pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    ctx.require_role(MANAGERS)?;
    let id = parse_id(&id)?;
    let invitations = Scoped::<Invitation>::new(state.store(), ctx.tenant_id);
    invitations.get(id).await?;
    invitations.delete(id).await?;

    tracing::info!(tenant_id = %ctx.tenant_id, invitation_id = %id, "Invitation revoked");
    Ok(ApiResponse::deleted("Invitation revoked"))
}

/// Mark an invitation with a terminal status
pub(crate) async fn close(
    store: &dyn DataStore,
    invitation: &Invitation,
    status: RequestStatus,
) -> Result<(), StoreError> {
    let mut patch = Row::new();
    patch.insert("status".into(), json!(status));
    if status == RequestStatus::Accepted {
        patch.insert("accepted_at".into(), json!(Utc::now()));
    }
    store
        .update(&Query::from("invitations").eq("id", invitation.id.to_string()), patch)
        .await?;
    Ok(())
}
