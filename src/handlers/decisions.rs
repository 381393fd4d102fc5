use axum::{
    extract::{Path, Query as QueryParams, State},
    Extension,
};
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

use super::{ensure_reference, patch_id, status_change};
use crate::database::models::decision::{NewDecision, DECISION_FILTERS, DECISION_RULES};
use crate::database::models::{to_row, Decision};
use crate::database::Scoped;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::{codes, relations};
use crate::state::AppState;
use crate::types::DecisionStatus;
use crate::validation::{self, parse_id, Payload};

async fn load(state: &AppState, ctx: &TenantContext, id: Uuid) -> Result<Decision, ApiError> {
    let mut decision = Scoped::<Decision>::new(state.store(), ctx.tenant_id).get(id).await?;
    relations::attach_decisions(state.store(), ctx.tenant_id, std::slice::from_mut(&mut decision)).await?;
    Ok(decision)
}

/// GET /api/decisions - `project_id` and `priority` are accepted as aliases
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    QueryParams(mut params): QueryParams<HashMap<String, String>>,
) -> ApiResult<Vec<Decision>> {
    for (alias, column) in [("project_id", "related_project_id"), ("priority", "impact")] {
        if let Some(value) = params.remove(alias) {
            params.entry(column.to_string()).or_insert(value);
        }
    }
    let filters = validation::filters(&params, DECISION_FILTERS)?;
    let mut decisions = Scoped::<Decision>::new(state.store(), ctx.tenant_id).list(&filters).await?;
    relations::attach_decisions(state.store(), ctx.tenant_id, &mut decisions).await?;
    Ok(ApiResponse::success(decisions))
}

/// GET /api/decisions/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult<Decision> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(load(&state, &ctx, id).await?))
}

/// POST /api/decisions
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Payload(body): Payload,
) -> ApiResult<Decision> {
    let mut input: NewDecision = validation::parse(&body, DECISION_RULES)?;
    let store = state.store();
    ensure_reference(store, "projects", ctx.tenant_id, "related_project_id", input.related_project_id).await?;

    if input.status == DecisionStatus::Accepted && input.decided_at.is_none() {
        input.decided_at = Some(Utc::now());
    }

    let mut row = to_row(&input)?;
    row.insert("code".into(), json!(codes::next_code(store, codes::DECISIONS, ctx.tenant_id).await?));
    row.insert("created_by".into(), json!(ctx.user_id));

    let decision = Scoped::<Decision>::new(store, ctx.tenant_id).create(row).await?;
    tracing::info!(tenant_id = %ctx.tenant_id, decision_id = %decision.id, code = %decision.code, "Decision recorded");

    Ok(ApiResponse::created(load(&state, &ctx, decision.id).await?))
}

/// PUT|PATCH /api/decisions/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
    Payload(body): Payload,
) -> ApiResult<Decision> {
    let id = parse_id(&id)?;
    let store = state.store();
    let decisions = Scoped::<Decision>::new(store, ctx.tenant_id);
    let current = decisions.get(id).await?;

    let mut patch = validation::patch(&body, DECISION_RULES)?;
    if status_change(current.status, &patch)? == Some(DecisionStatus::Accepted)
        && current.decided_at.is_none()
        && !patch.contains_key("decided_at")
    {
        patch.insert("decided_at".into(), json!(Utc::now()));
    }
    ensure_reference(
        store,
        "projects",
        ctx.tenant_id,
        "related_project_id",
        patch_id(&patch, "related_project_id"),
    )
    .await?;

    decisions.update(id, patch).await?;
    Ok(ApiResponse::success(load(&state, &ctx, id).await?))
}

/// DELETE /api/decisions/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id)?;
    let decisions = Scoped::<Decision>::new(state.store(), ctx.tenant_id);
    decisions.get(id).await?;
    decisions.delete(id).await?;
    Ok(ApiResponse::deleted("Decision deleted"))
}
