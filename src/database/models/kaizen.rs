use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::decision::empty_list;
use super::{ProjectRef, UserRef};
use crate::types::{KaizenCategory, KaizenStatus, Priority};
use crate::validation::FieldRule;

/// Continuous-improvement proposal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Kaizen {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub category: KaizenCategory,
    pub status: KaizenStatus,
    pub priority: Priority,
    pub expected_benefit: Option<String>,
    #[serde(default = "empty_list")]
    pub learning: Value,
    pub project_id: Option<Uuid>,
    pub responsible_id: Option<Uuid>,
    pub implemented_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectRef>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub responsible: Option<UserRef>,
}

super::tenant_record!(Kaizen, "kaizens");

#[derive(Debug, Serialize, Deserialize)]
pub struct NewKaizen {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub category: KaizenCategory,
    #[serde(default)]
    pub status: KaizenStatus,
    #[serde(default)]
    pub priority: Priority,
    pub expected_benefit: Option<String>,
    #[serde(default = "empty_list")]
    pub learning: Value,
    pub project_id: Option<Uuid>,
    pub responsible_id: Option<Uuid>,
}

pub const KAIZEN_RULES: &[FieldRule] = &[
    FieldRule::text("title", 200).required(),
    FieldRule::text("description", 5000),
    FieldRule::one_of("category", KaizenCategory::VALUES),
    FieldRule::one_of("status", KaizenStatus::VALUES),
    FieldRule::one_of("priority", Priority::VALUES),
    FieldRule::text("expected_benefit", 2000),
    FieldRule::json("learning"),
    FieldRule::uuid("project_id"),
    FieldRule::uuid("responsible_id"),
];

pub const KAIZEN_FILTERS: &[FieldRule] = &[
    FieldRule::one_of("status", KaizenStatus::VALUES),
    FieldRule::one_of("category", KaizenCategory::VALUES),
    FieldRule::one_of("priority", Priority::VALUES),
    FieldRule::uuid("project_id"),
];
