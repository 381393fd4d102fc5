use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{check_identifier, Condition, DataStore, Query, Row, SortDirection, StoreError};

/// Unique index over `columns`, optionally partial (only rows where
/// `when.0 == when.1` participate, e.g. pending requests).
#[derive(Debug, Clone)]
pub struct UniqueConstraint {
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub when: Option<(&'static str, &'static str)>,
}

/// Constraints mirroring the relational schema's unique indexes
pub const DEFAULT_CONSTRAINTS: &[UniqueConstraint] = &[
    UniqueConstraint { table: "tenants", columns: &["slug"], when: None },
    UniqueConstraint { table: "users", columns: &["email"], when: None },
    UniqueConstraint { table: "roles", columns: &["tenant_id", "name"], when: None },
    UniqueConstraint { table: "user_roles", columns: &["user_id", "role_id", "tenant_id"], when: None },
    UniqueConstraint { table: "projects", columns: &["tenant_id", "code"], when: None },
    UniqueConstraint { table: "project_members", columns: &["project_id", "user_id"], when: None },
    UniqueConstraint { table: "sprints", columns: &["tenant_id", "code"], when: None },
    UniqueConstraint { table: "tasks", columns: &["tenant_id", "code"], when: None },
    UniqueConstraint { table: "tags", columns: &["tenant_id", "name"], when: None },
    UniqueConstraint { table: "task_tags", columns: &["task_id", "tag_id"], when: None },
    UniqueConstraint { table: "decisions", columns: &["tenant_id", "code"], when: None },
    UniqueConstraint { table: "kaizens", columns: &["tenant_id", "code"], when: None },
    UniqueConstraint { table: "meetings", columns: &["tenant_id", "code"], when: None },
    UniqueConstraint {
        table: "invitations",
        columns: &["tenant_id", "email"],
        when: Some(("status", "pending")),
    },
    UniqueConstraint {
        table: "tenant_access_requests",
        columns: &["user_id", "tenant_id"],
        when: Some(("status", "pending")),
    },
];

/// Tables whose rows carry `created_at`/`updated_at` defaults
const TIMESTAMPED: &[&str] = &[
    "tenants", "users", "projects", "sprints", "tasks", "decisions", "kaizens", "meetings",
];

/// In-process store used by the test suite and `DATA_BACKEND=memory`.
/// Row order is insertion order; sorting is stable.
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    constraints: Vec<UniqueConstraint>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_constraints(DEFAULT_CONSTRAINTS.to_vec())
    }

    pub fn with_constraints(constraints: Vec<UniqueConstraint>) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            constraints,
        }
    }

    /// Number of rows currently held in `table`
    pub async fn count(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, Vec::len)
    }

    fn apply_defaults(table: &str, row: &mut Row) {
        if !row.contains_key("id") {
            row.insert("id".into(), json!(Uuid::new_v4()));
        }
        let now = json!(now_text());
        if !row.contains_key("created_at") {
            row.insert("created_at".into(), now.clone());
        }
        if TIMESTAMPED.contains(&table) && !row.contains_key("updated_at") {
            row.insert("updated_at".into(), now);
        }
    }

    fn check_unique(&self, table: &str, rows: &[Row], candidate: &Row, skip: Option<usize>) -> Result<(), StoreError> {
        for constraint in self.constraints.iter().filter(|c| c.table == table) {
            if !participates(constraint, candidate) {
                continue;
            }
            let clash = rows.iter().enumerate().any(|(idx, existing)| {
                Some(idx) != skip
                    && participates(constraint, existing)
                    && constraint
                        .columns
                        .iter()
                        .all(|col| candidate.get(*col).unwrap_or(&Value::Null) == existing.get(*col).unwrap_or(&Value::Null))
            });
            if clash {
                return Err(StoreError::UniqueViolation(format!(
                    "{}({})",
                    table,
                    constraint.columns.join(", ")
                )));
            }
        }
        Ok(())
    }

    fn recalculate_task_hours(tables: &mut HashMap<String, Vec<Row>>, args: &Value) -> Result<Value, StoreError> {
        let task_id = args
            .get("task_id")
            .cloned()
            .ok_or_else(|| StoreError::QueryError("recalculate_task_hours requires task_id".to_string()))?;

        let total: f64 = tables
            .get("time_logs")
            .map(|logs| {
                logs.iter()
                    .filter(|log| log.get("task_id") == Some(&task_id))
                    .filter_map(|log| log.get("hours").and_then(Value::as_f64))
                    .sum()
            })
            .unwrap_or(0.0);

        let now = json!(now_text());
        if let Some(tasks) = tables.get_mut("tasks") {
            for task in tasks.iter_mut().filter(|t| t.get("id") == Some(&task_id)) {
                task.insert("completed_hours".into(), json!(total));
                task.insert("updated_at".into(), now.clone());
            }
        }
        Ok(json!(total))
    }
}

/// Fixed-width UTC timestamps so text order matches time order
fn now_text() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn participates(constraint: &UniqueConstraint, row: &Row) -> bool {
    match constraint.when {
        Some((col, value)) => row.get(col).and_then(Value::as_str) == Some(value),
        None => true,
    }
}

fn matches(query: &Query, row: &Row) -> bool {
    query.conditions.iter().all(|condition| match condition {
        Condition::Eq(col, value) => values_equal(row.get(col).unwrap_or(&Value::Null), value),
        Condition::In(col, values) => {
            let current = row.get(col).unwrap_or(&Value::Null);
            values.iter().any(|v| values_equal(current, v))
        }
        Condition::IsNull(col) => row.get(col).map_or(true, Value::is_null),
    })
}

// Mirrors the text comparison the postgres backend performs on filters.
fn values_equal(stored: &Value, wanted: &Value) -> bool {
    match (stored, wanted) {
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(a), Value::String(b)) => a == b,
        (a, b) => a == b || value_text(a) == value_text(b),
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        // NULLS LAST, as in postgres ascending order
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        (Some(x), Some(y)) => value_text(x).cmp(&value_text(y)),
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        check_identifier(&query.table)?;
        let tables = self.tables.read().await;
        let mut rows: Vec<Row> = tables
            .get(&query.table)
            .map(|rows| rows.iter().filter(|row| matches(query, row)).cloned().collect())
            .unwrap_or_default();

        if let Some((column, direction)) = &query.order {
            // ties keep insertion order, newest first when descending
            if *direction == SortDirection::Desc {
                rows.reverse();
            }
            rows.sort_by(|a, b| {
                let ord = compare(a.get(column), b.get(column));
                match direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit.max(0) as usize);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, mut row: Row) -> Result<Row, StoreError> {
        check_identifier(table)?;
        for column in row.keys() {
            check_identifier(column)?;
        }
        Self::apply_defaults(table, &mut row);

        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();
        self.check_unique(table, rows, &row, None)?;
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, query: &Query, patch: Row) -> Result<Vec<Row>, StoreError> {
        check_identifier(&query.table)?;
        for column in patch.keys() {
            check_identifier(column)?;
        }
        let timestamped = TIMESTAMPED.contains(&query.table.as_str());

        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(&query.table) else {
            return Ok(Vec::new());
        };

        let targets: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| matches(query, row))
            .map(|(idx, _)| idx)
            .collect();

        // Validate every candidate before touching any row
        let mut updated = Vec::with_capacity(targets.len());
        for &idx in &targets {
            let mut candidate = rows[idx].clone();
            for (k, v) in &patch {
                candidate.insert(k.clone(), v.clone());
            }
            if timestamped && !patch.contains_key("updated_at") {
                candidate.insert("updated_at".into(), json!(now_text()));
            }
            self.check_unique(&query.table, rows, &candidate, Some(idx))?;
            updated.push((idx, candidate));
        }

        let mut result = Vec::with_capacity(updated.len());
        for (idx, candidate) in updated {
            rows[idx] = candidate.clone();
            result.push(candidate);
        }
        Ok(result)
    }

    async fn delete(&self, query: &Query) -> Result<u64, StoreError> {
        check_identifier(&query.table)?;
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(&query.table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !matches(query, row));
        Ok((before - rows.len()) as u64)
    }

    async fn rpc(&self, name: &str, args: Value) -> Result<Value, StoreError> {
        match name {
            "recalculate_task_hours" => {
                let mut tables = self.tables.write().await;
                Self::recalculate_task_hours(&mut tables, &args)
            }
            other => Err(StoreError::UnknownFunction(other.to_string())),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
