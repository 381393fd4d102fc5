//! Shared enums used across rows, payloads and filters.
//!
//! Every enum here is stored as its lowercase wire string, so the same value
//! round-trips through the data store, request bodies and query parameters.
use serde::{Deserialize, Serialize};

/// Declares a string-backed enum with its wire values, `as_str`, `Display`
/// and `FromStr`. `VALUES` feeds the enum-membership validation rules.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $value)] $variant),+
        }

        impl $name {
            pub const VALUES: &'static [&'static str] = &[$($value),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $value),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok(Self::$variant),)+
                    other => Err(format!("unknown {} '{}'", stringify!($name), other)),
                }
            }
        }
    };
}

string_enum!(
    /// Subscription plan of a tenant
    Plan {
        Free => "free",
        Pro => "pro",
        Enterprise => "enterprise",
    }
);

string_enum!(
    TenantStatus {
        Active => "active",
        Inactive => "inactive",
    }
);

string_enum!(
    /// Tenant-wide roles granted through `user_roles`
    RoleName {
        Admin => "admin",
        Gestor => "gestor",
        Member => "member",
        Viewer => "viewer",
    }
);

string_enum!(
    Priority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
);

string_enum!(
    ProjectStatus {
        Planning => "planning",
        Active => "active",
        OnHold => "on-hold",
        Completed => "completed",
        Cancelled => "cancelled",
    }
);

string_enum!(
    /// Role of a user inside a single project (distinct from tenant roles)
    MemberRole {
        Owner => "owner",
        Manager => "manager",
        Member => "member",
        Viewer => "viewer",
    }
);

string_enum!(
    SprintStatus {
        Planned => "planned",
        Active => "active",
        Completed => "completed",
    }
);

string_enum!(
    /// Kanban column of a task. `Blocked` is a side state.
    TaskStatus {
        Backlog => "backlog",
        Todo => "todo",
        InProgress => "in-progress",
        Review => "review",
        Done => "done",
        Blocked => "blocked",
    }
);

string_enum!(
    DecisionStatus {
        Proposed => "proposed",
        Accepted => "accepted",
        Rejected => "rejected",
        Deprecated => "deprecated",
        Superseded => "superseded",
    }
);

string_enum!(
    KaizenStatus {
        Proposed => "proposed",
        Approved => "approved",
        InProgress => "in-progress",
        Implemented => "implemented",
        Rejected => "rejected",
    }
);

string_enum!(
    KaizenCategory {
        Process => "process",
        Quality => "quality",
        Cost => "cost",
        Safety => "safety",
        Productivity => "productivity",
        Other => "other",
    }
);

string_enum!(
    MeetingType {
        Daily => "daily",
        Planning => "planning",
        Review => "review",
        Retrospective => "retrospective",
        OneOnOne => "one-on-one",
        Other => "other",
    }
);

string_enum!(
    /// Derived from a meeting's effectiveness score, never stored
    EffectivenessLevel {
        Low => "low",
        Moderate => "moderate",
        High => "high",
    }
);

string_enum!(
    /// Lifecycle of invitations and tenant access requests
    RequestStatus {
        Pending => "pending",
        Accepted => "accepted",
        Rejected => "rejected",
        Expired => "expired",
    }
);

impl Default for Plan {
    fn default() -> Self {
        Plan::Free
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl Default for ProjectStatus {
    fn default() -> Self {
        ProjectStatus::Planning
    }
}

impl Default for MemberRole {
    fn default() -> Self {
        MemberRole::Member
    }
}

impl Default for SprintStatus {
    fn default() -> Self {
        SprintStatus::Planned
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Backlog
    }
}

impl Default for DecisionStatus {
    fn default() -> Self {
        DecisionStatus::Proposed
    }
}

impl Default for KaizenStatus {
    fn default() -> Self {
        KaizenStatus::Proposed
    }
}

impl Default for KaizenCategory {
    fn default() -> Self {
        KaizenCategory::Process
    }
}

impl Default for MeetingType {
    fn default() -> Self {
        MeetingType::Other
    }
}

impl TaskStatus {
    /// Board column order
    pub const BOARD_ORDER: [TaskStatus; 6] = [
        TaskStatus::Backlog,
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Done,
        TaskStatus::Blocked,
    ];
}

impl EffectivenessLevel {
    pub fn from_score(score: i32) -> Self {
        match score {
            i32::MIN..=2 => EffectivenessLevel::Low,
            3 => EffectivenessLevel::Moderate,
            _ => EffectivenessLevel::High,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_status_uses_kebab_wire_values() {
        assert_eq!(TaskStatus::InProgress.as_str(), "in-progress");
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!(serde_json::to_value(TaskStatus::Done).unwrap(), "done");
        assert!("In Progress".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn values_list_every_variant() {
        assert_eq!(TaskStatus::VALUES.len(), TaskStatus::BOARD_ORDER.len());
        assert_eq!(SprintStatus::VALUES, &["planned", "active", "completed"]);
    }

    #[test]
    fn effectiveness_level_buckets() {
        assert_eq!(EffectivenessLevel::from_score(1), EffectivenessLevel::Low);
        assert_eq!(EffectivenessLevel::from_score(3), EffectivenessLevel::Moderate);
        assert_eq!(EffectivenessLevel::from_score(5), EffectivenessLevel::High);
    }
}
