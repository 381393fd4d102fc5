use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// A stored row as a JSON object with snake_case column keys
pub type Row = Map<String, Value>;

/// Errors surfaced by any `DataStore` backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Unexpected row format: {0}")]
    RowFormat(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String, Value),
    In(String, Vec<Value>),
    IsNull(String),
}

impl Condition {
    pub fn column(&self) -> &str {
        match self {
            Condition::Eq(c, _) | Condition::In(c, _) | Condition::IsNull(c) => c,
        }
    }
}

/// Table query in the shape of `.from(table).eq(..).order(..).limit(..)`
#[derive(Debug, Clone)]
pub struct Query {
    pub table: String,
    pub conditions: Vec<Condition>,
    pub order: Option<(String, SortDirection)>,
    pub limit: Option<i64>,
}

impl Query {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            conditions: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(column.into(), value.into()));
        self
    }

    pub fn in_list<V: Into<Value>>(mut self, column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.conditions.push(Condition::In(column.into(), values));
        self
    }

    pub fn is_null(mut self, column: impl Into<String>) -> Self {
        self.conditions.push(Condition::IsNull(column.into()));
        self
    }

    pub fn order(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.order = Some((column.into(), direction));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True when an `In` condition has no values; such a query can match nothing
    pub fn is_empty_match(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| matches!(c, Condition::In(_, values) if values.is_empty()))
    }
}

/// Relational store collaborator. Every row-level guarantee (uniqueness,
/// isolation policies, durability) lives behind this trait.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Short backend tag for logs and health output
    fn backend(&self) -> &'static str;

    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError>;

    async fn select_one(&self, query: &Query) -> Result<Option<Row>, StoreError> {
        let query = query.clone().limit(1);
        Ok(self.select(&query).await?.into_iter().next())
    }

    /// Insert one row and return it as stored (defaults applied)
    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError>;

    /// Apply `patch` to every row matched by `query`, returning the updated rows
    async fn update(&self, query: &Query, patch: Row) -> Result<Vec<Row>, StoreError>;

    /// Delete matched rows, returning how many were removed
    async fn delete(&self, query: &Query) -> Result<u64, StoreError>;

    /// Invoke a stored procedure with JSON arguments
    async fn rpc(&self, name: &str, args: Value) -> Result<Value, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Table and column names must be plain lowercase identifiers
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

pub fn check_identifier(name: &str) -> Result<(), StoreError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validates_identifiers() {
        assert!(is_valid_identifier("tasks"));
        assert!(is_valid_identifier("tenant_access_requests"));
        assert!(is_valid_identifier("_internal1"));
        assert!(!is_valid_identifier("Tasks"));
        assert!(!is_valid_identifier("tasks; DROP TABLE users"));
        assert!(!is_valid_identifier("1tasks"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn builds_query_like_a_table_client() {
        let q = Query::from("tasks")
            .eq("tenant_id", "t-1")
            .in_list("status", ["todo", "done"])
            .order("created_at", SortDirection::Desc)
            .limit(10);

        assert_eq!(q.table, "tasks");
        assert_eq!(q.conditions[0], Condition::Eq("tenant_id".into(), json!("t-1")));
        assert_eq!(q.conditions[1].column(), "status");
        assert_eq!(q.order, Some(("created_at".to_string(), SortDirection::Desc)));
        assert_eq!(q.limit, Some(10));
        assert!(!q.is_empty_match());
        assert!(Query::from("tags").in_list::<Value>("id", vec![]).is_empty_match());
    }
}
