//! Completed-hours aggregate on tasks, maintained by a store procedure.

use serde_json::json;
use uuid::Uuid;

use crate::database::{DataStore, StoreError};

pub const RECALCULATE_FN: &str = "recalculate_task_hours";

/// Recompute a task's `completed_hours` from its time logs
pub async fn recalculate(store: &dyn DataStore, task_id: Uuid) -> Result<f64, StoreError> {
    let total = store.rpc(RECALCULATE_FN, json!({ "task_id": task_id })).await?;
    Ok(total.as_f64().unwrap_or(0.0))
}

/// Post-write side effect. The time-log write has already succeeded, so a
/// failure here is logged and reported back as `false`; the task can be
/// reconciled later through `POST /api/tasks/:id/recalculate-hours`.
pub async fn sync_task_hours(store: &dyn DataStore, task_id: Uuid) -> bool {
    match recalculate(store, task_id).await {
        Ok(total) => {
            tracing::debug!(task_id = %task_id, total, "Task hours recalculated");
            true
        }
        Err(e) => {
            tracing::error!(task_id = %task_id, error = %e, "Failed to recalculate task hours");
            false
        }
    }
}
