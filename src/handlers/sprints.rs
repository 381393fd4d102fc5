use axum::{
    extract::{Path, Query as QueryParams, State},
    Extension,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

use super::{check_date_range, ensure_reference, merged_date, patch_id, status_change};
use crate::database::models::sprint::{NewSprint, SPRINT_FILTERS, SPRINT_RULES};
use crate::database::models::{to_row, Sprint, Task};
use crate::database::{Row, Scoped};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::burndown::{self, Burndown};
use crate::services::{codes, relations};
use crate::state::AppState;
use crate::validation::{self, parse_id, Payload};

async fn load(state: &AppState, ctx: &TenantContext, id: Uuid) -> Result<Sprint, ApiError> {
    let mut sprint = Scoped::<Sprint>::new(state.store(), ctx.tenant_id).get(id).await?;
    relations::attach_sprints(state.store(), ctx.tenant_id, std::slice::from_mut(&mut sprint)).await?;
    Ok(sprint)
}

/// Sprints are bounded so the burndown stays a handful of points
fn check_span(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), ApiError> {
    check_date_range(start, end)?;
    let max = burndown::MAX_SPRINT_DAYS as i64;
    match (start, end) {
        (Some(start), Some(end)) if (end - start).num_days() >= max => Err(ApiError::field(
            "end_date",
            format!("Sprint cannot be longer than {} days", max),
        )),
        _ => Ok(()),
    }
}

/// GET /api/sprints
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> ApiResult<Vec<Sprint>> {
    let filters = validation::filters(&params, SPRINT_FILTERS)?;
    let mut sprints = Scoped::<Sprint>::new(state.store(), ctx.tenant_id).list(&filters).await?;
    relations::attach_sprints(state.store(), ctx.tenant_id, &mut sprints).await?;
    Ok(ApiResponse::success(sprints))
}

/// GET /api/sprints/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult<Sprint> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(load(&state, &ctx, id).await?))
}

/// POST /api/sprints
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Payload(body): Payload,
) -> ApiResult<Sprint> {
    let input: NewSprint = validation::parse(&body, SPRINT_RULES)?;
    check_span(Some(input.start_date), Some(input.end_date))?;

    let store = state.store();
    ensure_reference(store, "projects", ctx.tenant_id, "project_id", input.project_id).await?;

    let mut row = to_row(&input)?;
    row.insert("code".into(), json!(codes::next_code(store, codes::SPRINTS, ctx.tenant_id).await?));

    let sprint = Scoped::<Sprint>::new(store, ctx.tenant_id).create(row).await?;
    tracing::info!(tenant_id = %ctx.tenant_id, sprint_id = %sprint.id, code = %sprint.code, "Sprint created");

    Ok(ApiResponse::created(load(&state, &ctx, sprint.id).await?))
}

/// PUT|PATCH /api/sprints/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
    Payload(body): Payload,
) -> ApiResult<Sprint> {
    let id = parse_id(&id)?;
    let store = state.store();
    let sprints = Scoped::<Sprint>::new(store, ctx.tenant_id);
    let current = sprints.get(id).await?;

    let patch = validation::patch(&body, SPRINT_RULES)?;
    status_change(current.status, &patch)?;
    check_span(
        merged_date(&patch, "start_date", Some(current.start_date)),
        merged_date(&patch, "end_date", Some(current.end_date)),
    )?;
    ensure_reference(store, "projects", ctx.tenant_id, "project_id", patch_id(&patch, "project_id")).await?;

    sprints.update(id, patch).await?;
    Ok(ApiResponse::success(load(&state, &ctx, id).await?))
}

/// DELETE /api/sprints/:id - tasks in the sprint return to the backlog pool
pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id)?;
    let store = state.store();
    let sprints = Scoped::<Sprint>::new(store, ctx.tenant_id);
    sprints.get(id).await?;

    let tasks = Scoped::<Task>::new(store, ctx.tenant_id);
    let mut unlink = Row::new();
    unlink.insert("sprint_id".into(), Value::Null);
    store
        .update(&tasks.query().eq("sprint_id", id.to_string()), unlink)
        .await?;
    sprints.delete(id).await?;

    tracing::info!(tenant_id = %ctx.tenant_id, sprint_id = %id, "Sprint deleted");
    Ok(ApiResponse::deleted("Sprint deleted"))
}

/// GET /api/sprints/:id/burndown
pub async fn burndown(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult<Burndown> {
    let id = parse_id(&id)?;
    let sprint = Scoped::<Sprint>::new(state.store(), ctx.tenant_id).get(id).await?;

    let tasks = Scoped::<Task>::new(state.store(), ctx.tenant_id);
    let in_sprint = tasks.select(tasks.query().eq("sprint_id", id.to_string())).await?;

    Ok(ApiResponse::success(burndown::burndown(&sprint, &in_sprint, burndown::today())))
}
