//! Server-side status transition rules.
//!
//! Writes that do not change the status are always accepted; handlers only
//! consult these tables when a PATCH/PUT moves a row to a different status.
use crate::types::{DecisionStatus, KaizenStatus, ProjectStatus, SprintStatus, TaskStatus};

pub trait Workflow: Copy + PartialEq + std::fmt::Display {
    fn can_transition_to(self, next: Self) -> bool;

    /// Field error message for a rejected move, or None when allowed
    fn check_transition(self, next: Self) -> Option<String> {
        if self == next || self.can_transition_to(next) {
            None
        } else {
            Some(format!("Cannot change status from '{}' to '{}'", self, next))
        }
    }
}

impl Workflow for TaskStatus {
    // Kanban columns are freely reorderable; blocked is only reachable from open work.
    fn can_transition_to(self, next: Self) -> bool {
        !(self == TaskStatus::Done && next == TaskStatus::Blocked)
    }
}

impl Workflow for SprintStatus {
    fn can_transition_to(self, next: Self) -> bool {
        use SprintStatus::*;
        matches!(
            (self, next),
            (Planned, Active) | (Planned, Completed) | (Active, Planned) | (Active, Completed)
        )
    }
}

impl Workflow for ProjectStatus {
    fn can_transition_to(self, next: Self) -> bool {
        use ProjectStatus::*;
        match self {
            Planning | Active | OnHold => true,
            Completed => next == Active,
            Cancelled => next == Planning,
        }
    }
}

impl Workflow for DecisionStatus {
    fn can_transition_to(self, next: Self) -> bool {
        use DecisionStatus::*;
        matches!(
            (self, next),
            (Proposed, Accepted)
                | (Proposed, Rejected)
                | (Accepted, Deprecated)
                | (Accepted, Superseded)
                | (Rejected, Proposed)
        )
    }
}

impl Workflow for KaizenStatus {
    fn can_transition_to(self, next: Self) -> bool {
        use KaizenStatus::*;
        matches!(
            (self, next),
            (Proposed, Approved)
                | (Proposed, Rejected)
                | (Approved, InProgress)
                | (Approved, Rejected)
                | (InProgress, Implemented)
                | (InProgress, Approved)
                | (Rejected, Proposed)
        )
    }
}
