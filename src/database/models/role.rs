use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::RoleName;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Role {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: RoleName,
    pub created_at: DateTime<Utc>,
}

super::tenant_record!(Role, "roles");

/// Junction between users and tenant roles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct UserRole {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub tenant_id: Uuid,
    pub created_at: DateTime<Utc>,
}
