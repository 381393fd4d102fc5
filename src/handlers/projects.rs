use axum::{
    extract::{Path, Query as QueryParams, State},
    Extension,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

use super::{check_date_range, ensure_reference, merged_date, patch_id, status_change};
use crate::database::models::project::{
    NewProject, NewProjectMember, MEMBER_RULES, PROJECT_FILTERS, PROJECT_RULES,
};
use crate::database::models::{from_row, to_row, Project, ProjectMember};
use crate::database::{Query, Row, Scoped, SortDirection, StoreError};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::{codes, relations};
use crate::state::AppState;
use crate::validation::{self, parse_id, Payload};

const MEMBERS: &str = "project_members";

/// Rows that point at a project and survive its deletion
const LINKED: &[(&str, &str)] = &[
    ("sprints", "project_id"),
    ("tasks", "project_id"),
    ("decisions", "related_project_id"),
    ("kaizens", "project_id"),
    ("meetings", "project_id"),
];

async fn members_of(state: &AppState, ctx: &TenantContext, project_id: Uuid) -> Result<Vec<ProjectMember>, ApiError> {
    let query = Query::from(MEMBERS)
        .eq("project_id", project_id.to_string())
        .order("created_at", SortDirection::Asc);
    let mut members = state
        .store()
        .select(&query)
        .await?
        .into_iter()
        .map(from_row::<ProjectMember>)
        .collect::<Result<Vec<_>, _>>()?;
    relations::attach_members(state.store(), ctx.tenant_id, &mut members).await?;
    Ok(members)
}

async fn load(state: &AppState, ctx: &TenantContext, id: Uuid) -> Result<Project, ApiError> {
    let mut project = Scoped::<Project>::new(state.store(), ctx.tenant_id).get(id).await?;
    relations::attach_projects(state.store(), ctx.tenant_id, std::slice::from_mut(&mut project)).await?;
    project.members = Some(members_of(state, ctx, id).await?);
    Ok(project)
}

/// GET /api/projects
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> ApiResult<Vec<Project>> {
    let filters = validation::filters(&params, PROJECT_FILTERS)?;
    let mut projects = Scoped::<Project>::new(state.store(), ctx.tenant_id).list(&filters).await?;
    relations::attach_projects(state.store(), ctx.tenant_id, &mut projects).await?;
    Ok(ApiResponse::success(projects))
}

/// GET /api/projects/:id - includes members
pub async fn show(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult<Project> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(load(&state, &ctx, id).await?))
}

/// POST /api/projects - bounded by the tenant's `max_projects`
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Payload(body): Payload,
) -> ApiResult<Project> {
    let input: NewProject = validation::parse(&body, PROJECT_RULES)?;
    check_date_range(input.start_date, input.end_date)?;

    let store = state.store();
    let projects = Scoped::<Project>::new(store, ctx.tenant_id);
    if let Some(max) = ctx.tenant.project_limit() {
        if projects.count().await? >= max {
            tracing::info!(tenant_id = %ctx.tenant_id, max, "Project limit reached");
            return Err(ApiError::forbidden("Project limit reached for this plan"));
        }
    }
    ensure_reference(store, "users", ctx.tenant_id, "owner_id", input.owner_id).await?;

    let mut row = to_row(&input)?;
    row.insert("code".into(), json!(codes::next_code(store, codes::PROJECTS, ctx.tenant_id).await?));
    if input.owner_id.is_none() {
        row.insert("owner_id".into(), json!(ctx.user_id));
    }

    let project = projects.create(row).await?;
    tracing::info!(tenant_id = %ctx.tenant_id, project_id = %project.id, code = %project.code, "Project created");

    Ok(ApiResponse::created(load(&state, &ctx, project.id).await?))
}

/// PUT|PATCH /api/projects/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
    Payload(body): Payload,
) -> ApiResult<Project> {
    let id = parse_id(&id)?;
    let store = state.store();
    let projects = Scoped::<Project>::new(store, ctx.tenant_id);
    let current = projects.get(id).await?;

    let patch = validation::patch(&body, PROJECT_RULES)?;
    status_change(current.status, &patch)?;
    check_date_range(
        merged_date(&patch, "start_date", current.start_date),
        merged_date(&patch, "end_date", current.end_date),
    )?;
    ensure_reference(store, "users", ctx.tenant_id, "owner_id", patch_id(&patch, "owner_id")).await?;

    projects.update(id, patch).await?;
    Ok(ApiResponse::success(load(&state, &ctx, id).await?))
}

/// DELETE /api/projects/:id - members are removed, linked rows are detached
pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id)?;
    let store = state.store();
    let projects = Scoped::<Project>::new(store, ctx.tenant_id);
    projects.get(id).await?;

    store
        .delete(&Query::from(MEMBERS).eq("project_id", id.to_string()))
        .await?;
    for &(table, column) in LINKED {
        let mut detach = Row::new();
        detach.insert(column.into(), Value::Null);
        let query = Query::from(table)
            .eq("tenant_id", ctx.tenant_id.to_string())
            .eq(column, id.to_string());
        store.update(&query, detach).await?;
    }
    projects.delete(id).await?;

    tracing::info!(tenant_id = %ctx.tenant_id, project_id = %id, "Project deleted");
    Ok(ApiResponse::deleted("Project deleted"))
}

/// GET /api/projects/:id/members
pub async fn list_members(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult<Vec<ProjectMember>> {
    let id = parse_id(&id)?;
    Scoped::<Project>::new(state.store(), ctx.tenant_id).get(id).await?;
    Ok(ApiResponse::success(members_of(&state, &ctx, id).await?))
}

/// POST /api/projects/:id/members
pub async fn add_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
    Payload(body): Payload,
) -> ApiResult<ProjectMember> {
    let id = parse_id(&id)?;
    let store = state.store();
    Scoped::<Project>::new(store, ctx.tenant_id).get(id).await?;

    let input: NewProjectMember = validation::parse(&body, MEMBER_RULES)?;
    ensure_reference(store, "users", ctx.tenant_id, "user_id", Some(input.user_id)).await?;

    let mut row = to_row(&input)?;
    row.insert("project_id".into(), json!(id));
    let inserted = match store.insert(MEMBERS, row).await {
        Ok(row) => row,
        Err(StoreError::UniqueViolation(_)) => {
            return Err(ApiError::conflict("User is already a member of this project"));
        }
        Err(e) => return Err(e.into()),
    };

    let mut member: ProjectMember = from_row(inserted)?;
    relations::attach_members(store, ctx.tenant_id, std::slice::from_mut(&mut member)).await?;
    Ok(ApiResponse::created(member))
}

/// DELETE /api/projects/:id/members/:user_id
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path((id, user_id)): Path<(String, String)>,
) -> ApiResult<()> {
    let id = parse_id(&id)?;
    let user_id = parse_id(&user_id)?;
    Scoped::<Project>::new(state.store(), ctx.tenant_id).get(id).await?;

    let query = Query::from(MEMBERS)
        .eq("project_id", id.to_string())
        .eq("user_id", user_id.to_string());
    if state.store().delete(&query).await? == 0 {
        return Err(ApiError::not_found("Record not found"));
    }
    Ok(ApiResponse::deleted("Member removed"))
}
