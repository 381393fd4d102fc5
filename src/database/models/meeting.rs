use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::decision::empty_list;
use super::{ProjectRef, TenantRecord};
use crate::types::{EffectivenessLevel, MeetingType};
use crate::validation::FieldRule;

/// Meeting effectiveness record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Meeting {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub code: String,
    pub title: String,
    pub meeting_type: MeetingType,
    pub meeting_date: NaiveDate,
    pub duration_minutes: i32,
    pub participants_count: i32,
    pub effectiveness_score: i32,
    #[serde(default)]
    pub objectives_met: bool,
    #[serde(default = "empty_list")]
    pub action_items: Value,
    pub notes: Option<String>,
    pub project_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Derived from `effectiveness_score`
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub effectiveness_level: Option<EffectivenessLevel>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectRef>,
}

impl TenantRecord for Meeting {
    const TABLE: &'static str = "meetings";

    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    fn hydrate(&mut self) {
        self.effectiveness_level = Some(EffectivenessLevel::from_score(self.effectiveness_score));
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewMeeting {
    pub title: String,
    #[serde(default)]
    pub meeting_type: MeetingType,
    pub meeting_date: NaiveDate,
    pub duration_minutes: i32,
    pub participants_count: i32,
    pub effectiveness_score: i32,
    #[serde(default)]
    pub objectives_met: bool,
    #[serde(default = "empty_list")]
    pub action_items: Value,
    pub notes: Option<String>,
    pub project_id: Option<Uuid>,
}

pub const MEETING_RULES: &[FieldRule] = &[
    FieldRule::text("title", 200).required(),
    FieldRule::one_of("meeting_type", MeetingType::VALUES),
    FieldRule::date("meeting_date").required(),
    FieldRule::integer("duration_minutes", 1, 1440).required(),
    FieldRule::integer("participants_count", 1, 500).required(),
    FieldRule::integer("effectiveness_score", 1, 5).required(),
    FieldRule::boolean("objectives_met"),
    FieldRule::json("action_items"),
    FieldRule::text("notes", 5000),
    FieldRule::uuid("project_id"),
];

pub const MEETING_FILTERS: &[FieldRule] = &[
    FieldRule::one_of("meeting_type", MeetingType::VALUES),
    FieldRule::uuid("project_id"),
];
