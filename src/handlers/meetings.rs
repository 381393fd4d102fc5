use axum::{
    extract::{Path, Query as QueryParams, State},
    Extension,
};
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

use super::{ensure_reference, patch_id};
use crate::database::models::meeting::{NewMeeting, MEETING_FILTERS, MEETING_RULES};
use crate::database::models::{to_row, Meeting};
use crate::database::Scoped;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::{codes, relations};
use crate::state::AppState;
use crate::validation::{self, parse_id, Payload};

async fn load(state: &AppState, ctx: &TenantContext, id: Uuid) -> Result<Meeting, ApiError> {
    let mut meeting = Scoped::<Meeting>::new(state.store(), ctx.tenant_id).get(id).await?;
    relations::attach_meetings(state.store(), ctx.tenant_id, std::slice::from_mut(&mut meeting)).await?;
    Ok(meeting)
}

/// GET /api/meetings
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> ApiResult<Vec<Meeting>> {
    let filters = validation::filters(&params, MEETING_FILTERS)?;
    let mut meetings = Scoped::<Meeting>::new(state.store(), ctx.tenant_id).list(&filters).await?;
    relations::attach_meetings(state.store(), ctx.tenant_id, &mut meetings).await?;
    Ok(ApiResponse::success(meetings))
}

/// GET /api/meetings/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult<Meeting> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(load(&state, &ctx, id).await?))
}

/// POST /api/meetings
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Payload(body): Payload,
) -> ApiResult<Meeting> {
    let input: NewMeeting = validation::parse(&body, MEETING_RULES)?;
    let store = state.store();
    ensure_reference(store, "projects", ctx.tenant_id, "project_id", input.project_id).await?;

    let mut row = to_row(&input)?;
    row.insert("code".into(), json!(codes::next_code(store, codes::MEETINGS, ctx.tenant_id).await?));
    row.insert("created_by".into(), json!(ctx.user_id));

    let meeting = Scoped::<Meeting>::new(store, ctx.tenant_id).create(row).await?;
    tracing::info!(tenant_id = %ctx.tenant_id, meeting_id = %meeting.id, code = %meeting.code, "Meeting logged");

    Ok(ApiResponse::created(load(&state, &ctx, meeting.id).await?))
}

/// PUT|PATCH /api/meetings/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
    Payload(body): Payload,
) -> ApiResult<Meeting> {
    let id = parse_id(&id)?;
    let store = state.store();
    let meetings = Scoped::<Meeting>::new(store, ctx.tenant_id);
    meetings.get(id).await?;

    let patch = validation::patch(&body, MEETING_RULES)?;
    ensure_reference(store, "projects", ctx.tenant_id, "project_id", patch_id(&patch, "project_id")).await?;

    meetings.update(id, patch).await?;
    Ok(ApiResponse::success(load(&state, &ctx, id).await?))
}

/// DELETE /api/meetings/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id)?;
    let meetings = Scoped::<Meeting>::new(state.store(), ctx.tenant_id);
    meetings.get(id).await?;
    meetings.delete(id).await?;
    Ok(ApiResponse::deleted("Meeting deleted"))
}
