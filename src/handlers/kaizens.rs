use axum::{
    extract::{Path, Query as QueryParams, State},
    Extension,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

use super::{ensure_reference, patch_id, status_change};
use crate::database::models::kaizen::{NewKaizen, KAIZEN_FILTERS, KAIZEN_RULES};
use crate::database::models::{to_row, Kaizen};
use crate::database::{DataStore, Scoped};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::{codes, relations};
use crate::state::AppState;
use crate::types::KaizenStatus;
use crate::validation::{self, parse_id, Payload};

async fn load(state: &AppState, ctx: &TenantContext, id: Uuid) -> Result<Kaizen, ApiError> {
    let mut kaizen = Scoped::<Kaizen>::new(state.store(), ctx.tenant_id).get(id).await?;
    relations::attach_kaizens(state.store(), ctx.tenant_id, std::slice::from_mut(&mut kaizen)).await?;
    Ok(kaizen)
}

async fn ensure_links(
    store: &dyn DataStore,
    tenant_id: Uuid,
    project_id: Option<Uuid>,
    responsible_id: Option<Uuid>,
) -> Result<(), ApiError> {
    ensure_reference(store, "projects", tenant_id, "project_id", project_id).await?;
    ensure_reference(store, "users", tenant_id, "responsible_id", responsible_id).await
}

/// GET /api/kaizens
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> ApiResult<Vec<Kaizen>> {
    let filters = validation::filters(&params, KAIZEN_FILTERS)?;
    let mut kaizens = Scoped::<Kaizen>::new(state.store(), ctx.tenant_id).list(&filters).await?;
    relations::attach_kaizens(state.store(), ctx.tenant_id, &mut kaizens).await?;
    Ok(ApiResponse::success(kaizens))
}

/// GET /api/kaizens/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult<Kaizen> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(load(&state, &ctx, id).await?))
}

/// POST /api/kaizens
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Payload(body): Payload,
) -> ApiResult<Kaizen> {
    let input: NewKaizen = validation::parse(&body, KAIZEN_RULES)?;
    let store = state.store();
    ensure_links(store, ctx.tenant_id, input.project_id, input.responsible_id).await?;

    let mut row = to_row(&input)?;
    row.insert("code".into(), json!(codes::next_code(store, codes::KAIZENS, ctx.tenant_id).await?));
    row.insert("created_by".into(), json!(ctx.user_id));
    let implemented_at = (input.status == KaizenStatus::Implemented).then(Utc::now);
    row.insert("implemented_at".into(), json!(implemented_at));

    let kaizen = Scoped::<Kaizen>::new(store, ctx.tenant_id).create(row).await?;
    tracing::info!(tenant_id = %ctx.tenant_id, kaizen_id = %kaizen.id, code = %kaizen.code, "Kaizen proposed");

    Ok(ApiResponse::created(load(&state, &ctx, kaizen.id).await?))
}

/// PUT|PATCH /api/kaizens/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
    Payload(body): Payload,
) -> ApiResult<Kaizen> {
    let id = parse_id(&id)?;
    let store = state.store();
    let kaizens = Scoped::<Kaizen>::new(store, ctx.tenant_id);
    let current = kaizens.get(id).await?;

    let mut patch = validation::patch(&body, KAIZEN_RULES)?;
    match status_change(current.status, &patch)? {
        Some(KaizenStatus::Implemented) => {
            patch.insert("implemented_at".into(), json!(Utc::now()));
        }
        Some(_) if current.status == KaizenStatus::Implemented => {
            patch.insert("implemented_at".into(), Value::Null);
        }
        _ => {}
    }
    ensure_links(
        store,
        ctx.tenant_id,
        patch_id(&patch, "project_id"),
        patch_id(&patch, "responsible_id"),
    )
    .await?;

    kaizens.update(id, patch).await?;
    Ok(ApiResponse::success(load(&state, &ctx, id).await?))
}

/// DELETE /api/kaizens/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id)?;
    let kaizens = Scoped::<Kaizen>::new(state.store(), ctx.tenant_id);
    kaizens.get(id).await?;
    kaizens.delete(id).await?;
    Ok(ApiResponse::deleted("Kaizen deleted"))
}
