use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ProjectRef;
use crate::types::SprintStatus;
use crate::validation::FieldRule;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Sprint {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub project_id: Option<Uuid>,
    pub code: String,
    pub name: String,
    pub goal: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: SprintStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectRef>,
}

super::tenant_record!(Sprint, "sprints");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintRef {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

impl From<&Sprint> for SprintRef {
    fn from(s: &Sprint) -> Self {
        Self {
            id: s.id,
            code: s.code.clone(),
            name: s.name.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewSprint {
    pub name: String,
    pub goal: Option<String>,
    pub project_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub status: SprintStatus,
}

pub const SPRINT_RULES: &[FieldRule] = &[
    FieldRule::text("name", 200).required(),
    FieldRule::text("goal", 2000),
    FieldRule::uuid("project_id"),
    FieldRule::date("start_date").required(),
    FieldRule::date("end_date").required(),
    FieldRule::one_of("status", SprintStatus::VALUES),
];

pub const SPRINT_FILTERS: &[FieldRule] = &[
    FieldRule::uuid("project_id"),
    FieldRule::one_of("status", SprintStatus::VALUES),
];
