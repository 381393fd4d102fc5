use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{RequestStatus, RoleName};
use crate::validation::FieldRule;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Invitation {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub role: RoleName,
    /// sha256 of the invitation token; the token itself is never stored
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub status: RequestStatus,
    pub invited_by: Uuid,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

super::tenant_record!(Invitation, "invitations");

impl Invitation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Deserialize)]
pub struct NewInvitation {
    pub email: String,
    pub role: Option<RoleName>,
}

pub const INVITATION_RULES: &[FieldRule] = &[
    FieldRule::email("email").required(),
    FieldRule::one_of("role", RoleName::VALUES),
];

#[derive(Debug, Deserialize)]
pub struct AcceptInvitation {
    pub token: String,
}

pub const ACCEPT_RULES: &[FieldRule] = &[FieldRule::text("token", 200).required()];
