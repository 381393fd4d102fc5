use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::ProjectRef;
use crate::types::{DecisionStatus, Priority};
use crate::validation::FieldRule;

/// Architecture decision record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Decision {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub code: String,
    pub title: String,
    pub context: Option<String>,
    pub decision: Option<String>,
    pub status: DecisionStatus,
    pub impact: Priority,
    #[serde(default = "empty_list")]
    pub alternatives: Value,
    #[serde(default = "empty_list")]
    pub consequences: Value,
    #[serde(default = "empty_list")]
    pub stakeholders: Value,
    pub related_project_id: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub related_project: Option<ProjectRef>,
}

super::tenant_record!(Decision, "decisions");

pub(crate) fn empty_list() -> Value {
    Value::Array(Vec::new())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewDecision {
    pub title: String,
    pub context: Option<String>,
    pub decision: Option<String>,
    #[serde(default)]
    pub status: DecisionStatus,
    #[serde(default)]
    pub impact: Priority,
    #[serde(default = "empty_list")]
    pub alternatives: Value,
    #[serde(default = "empty_list")]
    pub consequences: Value,
    #[serde(default = "empty_list")]
    pub stakeholders: Value,
    pub related_project_id: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
}

pub const DECISION_RULES: &[FieldRule] = &[
    FieldRule::text("title", 200).required(),
    FieldRule::text("context", 10_000),
    FieldRule::text("decision", 10_000),
    FieldRule::one_of("status", DecisionStatus::VALUES),
    FieldRule::one_of("impact", Priority::VALUES),
    FieldRule::json("alternatives"),
    FieldRule::json("consequences"),
    FieldRule::json("stakeholders"),
    FieldRule::uuid("related_project_id"),
    FieldRule::datetime("decided_at"),
];

pub const DECISION_FILTERS: &[FieldRule] = &[
    FieldRule::one_of("status", DecisionStatus::VALUES),
    FieldRule::one_of("impact", Priority::VALUES),
    FieldRule::uuid("related_project_id"),
];
