use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::FieldRule;

/// Application user. `id` is the auth principal id; `tenant_id` stays null
/// until the user is onboarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub email: String,
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact user reference for assignees, owners and members
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct UserRef {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProfileInput {
    pub full_name: Option<String>,
}

pub const PROFILE_RULES: &[FieldRule] = &[FieldRule::text("full_name", 120)];
