use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::FieldRule;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Tag {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

super::tenant_record!(Tag, "tags");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRef {
    pub id: Uuid,
    pub name: String,
    pub color: Option<String>,
}

impl From<&Tag> for TagRef {
    fn from(t: &Tag) -> Self {
        Self {
            id: t.id,
            name: t.name.clone(),
            color: t.color.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub color: Option<String>,
}

pub const TAG_RULES: &[FieldRule] = &[
    FieldRule::text("name", 50).required(),
    FieldRule::color("color"),
];

/// Replacement tag set for a task
pub const TASK_TAG_RULES: &[FieldRule] = &[FieldRule::uuid_list("tag_ids").required()];
