use chrono::{NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::database::models::{Sprint, Task};
use crate::types::TaskStatus;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BurndownPoint {
    pub date: NaiveDate,
    pub ideal: f64,
    /// None for days that have not happened yet
    pub remaining: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Burndown {
    pub sprint_id: Uuid,
    pub total_hours: f64,
    pub task_count: usize,
    pub completed_count: usize,
    pub points: Vec<BurndownPoint>,
}

/// Longest sprint accepted, in calendar days
pub const MAX_SPRINT_DAYS: usize = 366;

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Day a task left the board, if it is done
fn completion_day(task: &Task) -> Option<NaiveDate> {
    if task.status != TaskStatus::Done {
        return None;
    }
    Some(task.completed_at.unwrap_or(task.updated_at).date_naive())
}

/// Ideal vs. remaining estimated hours for each day of the sprint
pub fn burndown(sprint: &Sprint, tasks: &[Task], today: NaiveDate) -> Burndown {
    let total: f64 = tasks.iter().filter_map(|t| t.estimated_hours).sum();
    let days: Vec<NaiveDate> = sprint
        .start_date
        .iter_days()
        .take_while(|d| *d <= sprint.end_date)
        .take(MAX_SPRINT_DAYS)
        .collect();
    let span = days.len().saturating_sub(1).max(1) as f64;

    let points = days
        .iter()
        .enumerate()
        .map(|(i, day)| {
            let ideal = if days.len() <= 1 { 0.0 } else { total * (1.0 - i as f64 / span) };
            let remaining = (*day <= today).then(|| {
                let burned: f64 = tasks
                    .iter()
                    .filter(|t| completion_day(t).is_some_and(|done| done <= *day))
                    .filter_map(|t| t.estimated_hours)
                    .sum();
                round2(total - burned)
            });
            BurndownPoint {
                date: *day,
                ideal: round2(ideal),
                remaining,
            }
        })
        .collect();

    Burndown {
        sprint_id: sprint.id,
        total_hours: round2(total),
        task_count: tasks.len(),
        completed_count: tasks.iter().filter(|t| t.status == TaskStatus::Done).count(),
        points,
    }
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::from_row;
    use serde_json::json;

    fn sprint() -> Sprint {
        let row = json!({
            "id": Uuid::new_v4(), "tenant_id": Uuid::new_v4(), "code": "SPR-001", "name": "S1",
            "start_date": "2025-01-06", "end_date": "2025-01-10", "status": "active",
            "created_at": "2025-01-01T00:00:00Z", "updated_at": "2025-01-01T00:00:00Z"
        });
        from_row(row.as_object().unwrap().clone()).unwrap()
    }

    fn task(status: &str, hours: f64, completed_at: Option<&str>) -> Task {
        let row = json!({
            "id": Uuid::new_v4(), "tenant_id": Uuid::new_v4(), "code": "TASK-001", "title": "t",
            "status": status, "priority": "medium", "estimated_hours": hours, "completed_hours": 0,
            "completed_at": completed_at,
            "created_at": "2025-01-01T00:00:00Z", "updated_at": "2025-01-01T00:00:00Z"
        });
        from_row(row.as_object().unwrap().clone()).unwrap()
    }

    #[test]
    fn ideal_line_runs_from_total_to_zero() {
        let tasks = vec![task("todo", 8.0, None), task("todo", 4.0, None)];
        let chart = burndown(&sprint(), &tasks, NaiveDate::from_ymd_opt(2025, 1, 20).unwrap());

        assert_eq!(chart.points.len(), 5);
        assert_eq!(chart.points[0].ideal, 12.0);
        assert_eq!(chart.points[2].ideal, 6.0);
        assert_eq!(chart.points[4].ideal, 0.0);
        assert!(chart.points.iter().all(|p| p.remaining == Some(12.0)));
    }

    #[test]
    fn remaining_drops_when_tasks_complete() {
        let tasks = vec![
            task("done", 8.0, Some("2025-01-07T15:00:00Z")),
            task("in-progress", 4.0, None),
        ];
        let chart = burndown(&sprint(), &tasks, NaiveDate::from_ymd_opt(2025, 1, 8).unwrap());

        assert_eq!(chart.points[0].remaining, Some(12.0));
        assert_eq!(chart.points[1].remaining, Some(4.0));
        assert_eq!(chart.points[2].remaining, Some(4.0));
        assert_eq!(chart.points[3].remaining, None);
        assert_eq!(chart.completed_count, 1);
    }

    #[test]
    fn stored_overlong_sprint_is_clamped() {
        let mut long = sprint();
        long.start_date = NaiveDate::from_ymd_opt(1, 1, 1).unwrap();
        long.end_date = NaiveDate::from_ymd_opt(9999, 12, 31).unwrap();

        let chart = burndown(&long, &[task("todo", 3.0, None)], NaiveDate::from_ymd_opt(2025, 1, 8).unwrap());

        assert_eq!(chart.points.len(), MAX_SPRINT_DAYS);
        assert_eq!(chart.points[0].ideal, 3.0);
    }
}
