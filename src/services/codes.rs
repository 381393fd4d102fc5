//! Per-tenant sequential codes such as `TASK-007`.

use uuid::Uuid;

use crate::database::{DataStore, Query, StoreError};

/// Table and prefix of one code series
#[derive(Debug, Clone, Copy)]
pub struct CodeSeries {
    pub table: &'static str,
    pub prefix: &'static str,
}

pub const PROJECTS: CodeSeries = CodeSeries { table: "projects", prefix: "PROJ" };
pub const SPRINTS: CodeSeries = CodeSeries { table: "sprints", prefix: "SPR" };
pub const TASKS: CodeSeries = CodeSeries { table: "tasks", prefix: "TASK" };
pub const DECISIONS: CodeSeries = CodeSeries { table: "decisions", prefix: "ADR" };
pub const KAIZENS: CodeSeries = CodeSeries { table: "kaizens", prefix: "KZN" };
pub const MEETINGS: CodeSeries = CodeSeries { table: "meetings", prefix: "MTG" };

/// Next free code for the tenant, one past the highest existing number.
/// Two concurrent creates can compute the same code; the store's unique
/// (tenant_id, code) index rejects the second.
pub async fn next_code(store: &dyn DataStore, series: CodeSeries, tenant_id: Uuid) -> Result<String, StoreError> {
    let rows = store
        .select(&Query::from(series.table).eq("tenant_id", tenant_id.to_string()))
        .await?;

    let highest = rows
        .iter()
        .filter_map(|row| row.get("code").and_then(|c| c.as_str()))
        .filter_map(|code| parse_code(code, series.prefix))
        .max()
        .unwrap_or(0);

    Ok(format_code(series.prefix, highest + 1))
}

pub fn parse_code(code: &str, prefix: &str) -> Option<u32> {
    code.strip_prefix(prefix)?.strip_prefix('-')?.parse().ok()
}

pub fn format_code(prefix: &str, number: u32) -> String {
    format!("{}-{:03}", prefix, number)
}
