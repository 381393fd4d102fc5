use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::database::models::time_log::{NewTimeLog, TABLE, TIME_LOG_RULES};
use crate::database::models::{from_row, Task, TimeLog};
use crate::database::{Query, Row, Scoped, SortDirection};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::{burndown, hours, relations};
use crate::state::AppState;
use crate::validation::{self, parse_id, Payload};

/// Created log plus the outcome of the hours side effect
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedTime {
    #[serde(flatten)]
    pub log: TimeLog,
    pub hours_synced: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoursSync {
    pub hours_synced: bool,
}

/// Time logs are owned through their task
async fn owned_task(state: &AppState, ctx: &TenantContext, task_id: &str) -> Result<Uuid, ApiError> {
    let task_id = parse_id(task_id)?;
    Scoped::<Task>::new(state.store(), ctx.tenant_id).get(task_id).await?;
    Ok(task_id)
}

/// GET /api/tasks/:id/time-logs
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(task_id): Path<String>,
) -> ApiResult<Vec<TimeLog>> {
    let task_id = owned_task(&state, &ctx, &task_id).await?;

    let query = Query::from(TABLE)
        .eq("task_id", task_id.to_string())
        .order("logged_date", SortDirection::Desc);
    let mut logs = state
        .store()
        .select(&query)
        .await?
        .into_iter()
        .map(from_row::<TimeLog>)
        .collect::<Result<Vec<_>, _>>()?;
    relations::attach_time_logs(state.store(), ctx.tenant_id, &mut logs).await?;

    Ok(ApiResponse::success(logs))
}

/// POST /api/tasks/:id/time-logs
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(task_id): Path<String>,
    Payload(body): Payload,
) -> ApiResult<LoggedTime> {
    let task_id = owned_task(&state, &ctx, &task_id).await?;
    let input: NewTimeLog = validation::parse(&body, TIME_LOG_RULES)?;

    let mut row = Row::new();
    row.insert("task_id".into(), json!(task_id));
    row.insert("user_id".into(), json!(ctx.user_id));
    row.insert("hours".into(), json!(input.hours));
    row.insert("logged_date".into(), json!(input.logged_date.unwrap_or_else(burndown::today)));
    row.insert("description".into(), json!(input.description));

    let mut log: TimeLog = from_row(state.store().insert(TABLE, row).await?)?;
    log.user = Some((&ctx.user).into());
    let hours_synced = hours::sync_task_hours(state.store(), task_id).await;

    tracing::info!(tenant_id = %ctx.tenant_id, task_id = %task_id, hours = log.hours, "Time logged");
    Ok(ApiResponse::created(LoggedTime { log, hours_synced }))
}

/// DELETE /api/tasks/:id/time-logs/:log_id - author or tenant admin only
pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path((task_id, log_id)): Path<(String, String)>,
) -> ApiResult<HoursSync> {
    let task_id = owned_task(&state, &ctx, &task_id).await?;
    let log_id = parse_id(&log_id)?;

    let query = Query::from(TABLE)
        .eq("id", log_id.to_string())
        .eq("task_id", task_id.to_string());
    let log: TimeLog = state
        .store()
        .select_one(&query)
        .await?
        .map(from_row)
        .transpose()?
        .ok_or_else(|| ApiError::not_found("Record not found"))?;

    if log.user_id != ctx.user_id && !ctx.is_admin() {
        return Err(ApiError::forbidden("Only the author or an admin can delete this time log"));
    }

    state.store().delete(&query).await?;
    let hours_synced = hours::sync_task_hours(state.store(), task_id).await;

    Ok(ApiResponse::success(HoursSync { hours_synced }).message("Time log deleted"))
}
