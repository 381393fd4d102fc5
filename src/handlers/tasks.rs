use axum::{
    extract::{Path, Query as QueryParams, State},
    Extension,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

use super::{ensure_reference, patch_id, status_change};
use crate::database::models::tag::TASK_TAG_RULES;
use crate::database::models::task::{NewTask, TASK_FILTERS, TASK_RULES};
use crate::database::models::{to_row, Tag, Task};
use crate::database::{DataStore, Query, Scoped};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::{codes, hours, relations};
use crate::state::AppState;
use crate::types::TaskStatus;
use crate::validation::{self, parse_id, Payload};

#[derive(Debug, Serialize)]
pub struct BoardColumn {
    pub status: TaskStatus,
    pub tasks: Vec<Task>,
}

async fn load(state: &AppState, ctx: &TenantContext, id: Uuid) -> Result<Task, ApiError> {
    let mut task = Scoped::<Task>::new(state.store(), ctx.tenant_id).get(id).await?;
    relations::attach_tasks(state.store(), ctx.tenant_id, std::slice::from_mut(&mut task)).await?;
    Ok(task)
}

async fn list_tasks(
    state: &AppState,
    ctx: &TenantContext,
    params: &HashMap<String, String>,
) -> Result<Vec<Task>, ApiError> {
    let filters = validation::filters(params, TASK_FILTERS)?;
    let mut tasks = Scoped::<Task>::new(state.store(), ctx.tenant_id).list(&filters).await?;
    relations::attach_tasks(state.store(), ctx.tenant_id, &mut tasks).await?;
    Ok(tasks)
}

/// Checks project, sprint and assignee all belong to the tenant
async fn ensure_links(
    store: &dyn DataStore,
    tenant_id: Uuid,
    project_id: Option<Uuid>,
    sprint_id: Option<Uuid>,
    assignee_id: Option<Uuid>,
) -> Result<(), ApiError> {
    ensure_reference(store, "projects", tenant_id, "project_id", project_id).await?;
    ensure_reference(store, "sprints", tenant_id, "sprint_id", sprint_id).await?;
    ensure_reference(store, "users", tenant_id, "assignee_id", assignee_id).await
}

/// Replace a task's tag set; every tag must belong to the tenant
async fn replace_tags(store: &dyn DataStore, tenant_id: Uuid, task_id: Uuid, tag_ids: &[Uuid]) -> Result<(), ApiError> {
    if !tag_ids.is_empty() {
        let tags = Scoped::<Tag>::new(store, tenant_id);
        let found = tags
            .select(tags.query().in_list("id", tag_ids.iter().map(|id| id.to_string())))
            .await?;
        if found.len() != tag_ids.len() {
            return Err(ApiError::field("tag_ids", "One or more tags were not found"));
        }
    }

    store
        .delete(&Query::from("task_tags").eq("task_id", task_id.to_string()))
        .await?;
    for tag_id in tag_ids {
        let mut row = crate::database::Row::new();
        row.insert("task_id".into(), json!(task_id));
        row.insert("tag_id".into(), json!(tag_id));
        store.insert("task_tags", row).await?;
    }
    Ok(())
}

fn tag_ids_of(value: Option<Value>) -> Option<Vec<Uuid>> {
    match value? {
        Value::Null => Some(Vec::new()),
        v => serde_json::from_value(v).ok(),
    }
}

/// GET /api/tasks
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> ApiResult<Vec<Task>> {
    Ok(ApiResponse::success(list_tasks(&state, &ctx, &params).await?))
}

/// GET /api/tasks/board - tasks grouped into kanban columns
pub async fn board(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> ApiResult<Vec<BoardColumn>> {
    let mut tasks = list_tasks(&state, &ctx, &params).await?;
    let columns = TaskStatus::BOARD_ORDER
        .iter()
        .map(|status| {
            let (column, rest): (Vec<Task>, Vec<Task>) = tasks.drain(..).partition(|t| t.status == *status);
            tasks = rest;
            BoardColumn {
                status: *status,
                tasks: column,
            }
        })
        .collect();
    Ok(ApiResponse::success(columns))
}

/// GET /api/tasks/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult<Task> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(load(&state, &ctx, id).await?))
}

/// POST /api/tasks
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Payload(body): Payload,
) -> ApiResult<Task> {
    let input: NewTask = validation::parse(&body, TASK_RULES)?;
    let store = state.store();
    ensure_links(store, ctx.tenant_id, input.project_id, input.sprint_id, input.assignee_id).await?;

    let mut row = to_row(&input)?;
    row.insert("code".into(), json!(codes::next_code(store, codes::TASKS, ctx.tenant_id).await?));
    row.insert("created_by".into(), json!(ctx.user_id));
    row.insert("completed_hours".into(), json!(0.0));
    let completed_at = (input.status == TaskStatus::Done).then(Utc::now);
    row.insert("completed_at".into(), json!(completed_at));

    let task = Scoped::<Task>::new(store, ctx.tenant_id).create(row).await?;
    if !input.tag_ids.is_empty() {
        replace_tags(store, ctx.tenant_id, task.id, &input.tag_ids).await?;
    }

    tracing::info!(tenant_id = %ctx.tenant_id, task_id = %task.id, code = %task.code, "Task created");
    Ok(ApiResponse::created(load(&state, &ctx, task.id).await?))
}

/// PUT|PATCH /api/tasks/:id - partial merge
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
    Payload(body): Payload,
) -> ApiResult<Task> {
    let id = parse_id(&id)?;
    let store = state.store();
    let tasks = Scoped::<Task>::new(store, ctx.tenant_id);
    let current = tasks.get(id).await?;

    let mut patch = validation::patch(&body, TASK_RULES)?;
    let tag_ids = tag_ids_of(patch.remove("tag_ids"));

    match status_change(current.status, &patch)? {
        Some(TaskStatus::Done) => {
            patch.insert("completed_at".into(), json!(Utc::now()));
        }
        Some(_) if current.status == TaskStatus::Done => {
            patch.insert("completed_at".into(), Value::Null);
        }
        _ => {}
    }

    ensure_links(
        store,
        ctx.tenant_id,
        patch_id(&patch, "project_id"),
        patch_id(&patch, "sprint_id"),
        patch_id(&patch, "assignee_id"),
    )
    .await?;

    if !patch.is_empty() {
        tasks.update(id, patch).await?;
    }
    if let Some(tag_ids) = tag_ids {
        replace_tags(store, ctx.tenant_id, id, &tag_ids).await?;
    }

    tracing::debug!(tenant_id = %ctx.tenant_id, task_id = %id, "Task updated");
    Ok(ApiResponse::success(load(&state, &ctx, id).await?))
}

/// DELETE /api/tasks/:id - removes the task with its tag links and time logs
pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id)?;
    let store = state.store();
    let tasks = Scoped::<Task>::new(store, ctx.tenant_id);
    tasks.get(id).await?;

    store
        .delete(&Query::from("task_tags").eq("task_id", id.to_string()))
        .await?;
    store
        .delete(&Query::from("time_logs").eq("task_id", id.to_string()))
        .await?;
    tasks.delete(id).await?;

    tracing::info!(tenant_id = %ctx.tenant_id, task_id = %id, "Task deleted");
    Ok(ApiResponse::deleted("Task deleted"))
}

/// PUT /api/tasks/:id/tags - replace the tag set
pub async fn set_tags(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
    Payload(body): Payload,
) -> ApiResult<Task> {
    let id = parse_id(&id)?;
    Scoped::<Task>::new(state.store(), ctx.tenant_id).get(id).await?;

    let clean = validation::validate(&body, TASK_TAG_RULES)?;
    let tag_ids = tag_ids_of(clean.get("tag_ids").cloned()).unwrap_or_default();
    replace_tags(state.store(), ctx.tenant_id, id, &tag_ids).await?;

    Ok(ApiResponse::success(load(&state, &ctx, id).await?))
}

/// POST /api/tasks/:id/recalculate-hours - reconcile `completed_hours`
pub async fn recalculate_hours(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult<Task> {
    let id = parse_id(&id)?;
    Scoped::<Task>::new(state.store(), ctx.tenant_id).get(id).await?;

    let total = hours::recalculate(state.store(), id).await?;
    tracing::info!(tenant_id = %ctx.tenant_id, task_id = %id, total, "Task hours reconciled");

    Ok(ApiResponse::success(load(&state, &ctx, id).await?).message("Hours recalculated"))
}
