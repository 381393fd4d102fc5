use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ProjectRef, SprintRef, TagRef, UserRef};
use crate::types::{Priority, TaskStatus};
use crate::validation::FieldRule;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Task {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub assignee_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub sprint_id: Option<Uuid>,
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub completed_hours: f64,
    pub due_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectRef>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub sprint: Option<SprintRef>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<UserRef>,
    #[serde(skip_deserializing)]
    pub tags: Vec<TagRef>,
}

super::tenant_record!(Task, "tasks");

#[derive(Debug, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    pub assignee_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub sprint_id: Option<Uuid>,
    pub estimated_hours: Option<f64>,
    pub due_date: Option<NaiveDate>,
    /// Linked through `task_tags`, never stored on the task row
    #[serde(default, skip_serializing)]
    pub tag_ids: Vec<Uuid>,
}

pub const TASK_RULES: &[FieldRule] = &[
    FieldRule::text("title", 200).required(),
    FieldRule::text("description", 5000),
    FieldRule::one_of("status", TaskStatus::VALUES),
    FieldRule::one_of("priority", Priority::VALUES),
    FieldRule::uuid("assignee_id"),
    FieldRule::uuid("project_id"),
    FieldRule::uuid("sprint_id"),
    FieldRule::amount("estimated_hours", Some(1000.0)),
    FieldRule::date("due_date"),
    FieldRule::uuid_list("tag_ids"),
];

pub const TASK_FILTERS: &[FieldRule] = &[
    FieldRule::uuid("project_id"),
    FieldRule::uuid("sprint_id"),
    FieldRule::one_of("status", TaskStatus::VALUES),
    FieldRule::uuid("assignee_id"),
    FieldRule::one_of("priority", Priority::VALUES),
];
