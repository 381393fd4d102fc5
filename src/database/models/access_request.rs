use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserRef;
use crate::types::{RequestStatus, RoleName};
use crate::validation::FieldRule;

/// A user's request to join an existing tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct AccessRequest {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub message: Option<String>,
    pub status: RequestStatus,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,

    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
}

super::tenant_record!(AccessRequest, "tenant_access_requests");

#[derive(Debug, Deserialize)]
pub struct NewAccessRequest {
    pub tenant_slug: String,
    pub message: Option<String>,
}

pub const ACCESS_REQUEST_RULES: &[FieldRule] = &[
    FieldRule::slug("tenant_slug").required(),
    FieldRule::text("message", 1000),
];

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub role: Option<RoleName>,
}

pub const APPROVE_RULES: &[FieldRule] = &[FieldRule::one_of("role", RoleName::VALUES)];
