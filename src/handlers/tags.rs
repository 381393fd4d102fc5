use axum::{
    extract::{Path, State},
    Extension,
};

use crate::database::models::tag::{NewTag, TAG_RULES};
use crate::database::models::{to_row, Tag};
use crate::database::{Query, Scoped};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::state::AppState;
use crate::validation::{self, parse_id, Payload};

fn duplicate(e: ApiError) -> ApiError {
    match e {
        ApiError::Conflict(_) => ApiError::conflict("A tag with this name already exists"),
        other => other,
    }
}

/// GET /api/tags
pub async fn list(State(state): State<AppState>, Extension(ctx): Extension<TenantContext>) -> ApiResult<Vec<Tag>> {
    let tags = Scoped::<Tag>::new(state.store(), ctx.tenant_id);
    let mut all = tags.list(&[]).await?;
    all.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(ApiResponse::success(all))
}

/// POST /api/tags
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Payload(body): Payload,
) -> ApiResult<Tag> {
    let input: NewTag = validation::parse(&body, TAG_RULES)?;
    let tag = Scoped::<Tag>::new(state.store(), ctx.tenant_id)
        .create(to_row(&input)?)
        .await
        .map_err(duplicate)?;
    Ok(ApiResponse::created(tag))
}

/// PUT|PATCH /api/tags/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
    Payload(body): Payload,
) -> ApiResult<Tag> {
    let id = parse_id(&id)?;
    let tags = Scoped::<Tag>::new(state.store(), ctx.tenant_id);
    tags.get(id).await?;

    let patch = validation::patch(&body, TAG_RULES)?;
    let tag = tags.update(id, patch).await.map_err(duplicate)?;

    Ok(ApiResponse::success(tag))
}

/// DELETE /api/tags/:id - also drops the tag from every task
pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id)?;
    let tags = Scoped::<Tag>::new(state.store(), ctx.tenant_id);
    tags.get(id).await?;

    state
        .store()
        .delete(&Query::from("task_tags").eq("tag_id", id.to_string()))
        .await?;
    tags.delete(id).await?;
    Ok(ApiResponse::deleted("Tag deleted"))
}
