use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Plan, TenantStatus};
use crate::validation::FieldRule;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub plan: Plan,
    pub status: TenantStatus,
    pub max_users: Option<i32>,
    pub max_projects: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }

    /// Active-user cap; `None` when the plan has no limit
    pub fn user_limit(&self) -> Option<usize> {
        self.max_users.map(|n| n.max(0) as usize)
    }

    /// Project cap; `None` when the plan has no limit
    pub fn project_limit(&self) -> Option<usize> {
        self.max_projects.map(|n| n.max(0) as usize)
    }
}

/// Self-service tenant creation
#[derive(Debug, Deserialize)]
pub struct NewTenant {
    pub name: String,
    pub slug: Option<String>,
}

pub const TENANT_RULES: &[FieldRule] = &[
    FieldRule::text("name", 120).required(),
    FieldRule::slug("slug"),
];
