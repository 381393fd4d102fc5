use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserRef;
use crate::validation::FieldRule;

pub const TABLE: &str = "time_logs";

/// Hours logged against a task. Owned through its task, so it carries no
/// `tenant_id` of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct TimeLog {
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub hours: f64,
    pub logged_date: NaiveDate,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,

    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewTimeLog {
    pub hours: f64,
    pub logged_date: Option<NaiveDate>,
    pub description: Option<String>,
}

pub const TIME_LOG_RULES: &[FieldRule] = &[
    FieldRule::positive("hours", 24.0).required(),
    FieldRule::date("logged_date"),
    FieldRule::text("description", 1000),
];
