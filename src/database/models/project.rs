use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserRef;
use crate::types::{MemberRole, Priority, ProjectStatus};
use crate::validation::FieldRule;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Project {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub priority: Priority,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub budget: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub spent: Decimal,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub owner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub owner: Option<UserRef>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<ProjectMember>>,
}

super::tenant_record!(Project, "projects");

/// `{id, code, name}` reference embedded in related rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

impl From<&Project> for ProjectRef {
    fn from(p: &Project) -> Self {
        Self {
            id: p.id,
            code: p.code.clone(),
            name: p.name.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub budget: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub spent: Decimal,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub owner_id: Option<Uuid>,
}

pub const PROJECT_RULES: &[FieldRule] = &[
    FieldRule::text("name", 200).required(),
    FieldRule::text("description", 5000),
    FieldRule::one_of("status", ProjectStatus::VALUES),
    FieldRule::one_of("priority", Priority::VALUES),
    FieldRule::amount("budget", None),
    FieldRule::amount("spent", None),
    FieldRule::date("start_date"),
    FieldRule::date("end_date"),
    FieldRule::uuid("owner_id"),
];

pub const PROJECT_FILTERS: &[FieldRule] = &[
    FieldRule::one_of("status", ProjectStatus::VALUES),
    FieldRule::one_of("priority", Priority::VALUES),
    FieldRule::uuid("owner_id"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct ProjectMember {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRole,
    pub created_at: DateTime<Utc>,

    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewProjectMember {
    pub user_id: Uuid,
    #[serde(default)]
    pub role: MemberRole,
}

pub const MEMBER_RULES: &[FieldRule] = &[
    FieldRule::uuid("user_id").required(),
    FieldRule::one_of("role", MemberRole::VALUES),
];
