//! Route handlers, one module per resource.
//!
//! Tenant-scoped handlers receive the `TenantContext` injected by
//! `require_tenant`; setup handlers only see the session `Principal`.

pub mod access_requests;
pub mod decisions;
pub mod invitations;
pub mod kaizens;
pub mod me;
pub mod meetings;
pub mod projects;
pub mod setup;
pub mod sprints;
pub mod system;
pub mod tags;
pub mod tasks;
pub mod time_logs;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::database::{DataStore, Query, Row};
use crate::error::ApiError;
use crate::workflow::Workflow;

/// Transition check for a patch that may carry `status`. Returns the new
/// status when it changes.
pub(crate) fn status_change<S>(current: S, patch: &Row) -> Result<Option<S>, ApiError>
where
    S: Workflow + DeserializeOwned,
{
    let Some(raw) = patch.get("status") else {
        return Ok(None);
    };
    let next: S = serde_json::from_value(raw.clone()).map_err(|_| ApiError::field("status", "Status is invalid"))?;
    if let Some(message) = current.check_transition(next) {
        return Err(ApiError::field("status", message));
    }
    Ok((next != current).then_some(next))
}

/// `end` may not precede `start`
pub(crate) fn check_date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), ApiError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(ApiError::field(
            "end_date",
            "End date must be on or after the start date",
        )),
        _ => Ok(()),
    }
}

/// Date column after applying a patch on top of the stored value
pub(crate) fn merged_date(patch: &Row, column: &str, current: Option<NaiveDate>) -> Option<NaiveDate> {
    match patch.get(column) {
        Some(Value::Null) => None,
        Some(value) => serde_json::from_value(value.clone()).ok(),
        None => current,
    }
}

/// A referenced row must exist inside the caller's tenant
pub(crate) async fn ensure_reference(
    store: &dyn DataStore,
    table: &str,
    tenant_id: Uuid,
    field: &str,
    id: Option<Uuid>,
) -> Result<(), ApiError> {
    let Some(id) = id else {
        return Ok(());
    };
    let query = Query::from(table)
        .eq("id", id.to_string())
        .eq("tenant_id", tenant_id.to_string());
    if store.select_one(&query).await?.is_none() {
        let label = match table {
            "projects" => "Project",
            "sprints" => "Sprint",
            "users" => "User",
            _ => "Referenced record",
        };
        return Err(ApiError::field(field, format!("{} not found", label)));
    }
    Ok(())
}

/// UUID from a sanitized patch value, if present and non-null
pub(crate) fn patch_id(patch: &Row, column: &str) -> Option<Uuid> {
    patch
        .get(column)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
}
