use serde_json::{json, Value};
use std::marker::PhantomData;
use uuid::Uuid;

use crate::database::models::{from_row, TenantRecord};
use crate::database::{DataStore, Query, Row, SortDirection};
use crate::error::ApiError;

/// Tenant-scoped access to one table. Every query this issues is filtered
/// by the caller's `tenant_id`, and every insert is stamped with it.
pub struct Scoped<'a, T> {
    store: &'a dyn DataStore,
    tenant_id: Uuid,
    _phantom: PhantomData<T>,
}

impl<'a, T: TenantRecord> Scoped<'a, T> {
    pub fn new(store: &'a dyn DataStore, tenant_id: Uuid) -> Self {
        Self {
            store,
            tenant_id,
            _phantom: PhantomData,
        }
    }

    /// Base query for this tenant's rows
    pub fn query(&self) -> Query {
        Query::from(T::TABLE).eq("tenant_id", self.tenant_id.to_string())
    }

    fn decode(row: Row) -> Result<T, ApiError> {
        let mut record: T = from_row(row)?;
        record.hydrate();
        Ok(record)
    }

    /// List with equality filters, newest first
    pub async fn list(&self, filters: &[(&str, Value)]) -> Result<Vec<T>, ApiError> {
        let mut query = self.query();
        for (column, value) in filters {
            query = query.eq(*column, value.clone());
        }
        self.select(query.order("created_at", SortDirection::Desc)).await
    }

    /// Run a query that was built from [`Scoped::query`]
    pub async fn select(&self, query: Query) -> Result<Vec<T>, ApiError> {
        self.store
            .select(&query)
            .await?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    pub async fn count(&self) -> Result<usize, ApiError> {
        Ok(self.store.select(&self.query()).await?.len())
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<T>, ApiError> {
        let query = self.query().eq("id", id.to_string());
        self.store.select_one(&query).await?.map(Self::decode).transpose()
    }

    /// Absent and cross-tenant rows are indistinguishable: both are 404
    pub async fn get(&self, id: Uuid) -> Result<T, ApiError> {
        let record = self
            .find(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Record not found"))?;
        self.ensure_owned(&record)?;
        Ok(record)
    }

    /// Second ownership check on a loaded row before any write
    pub fn ensure_owned(&self, record: &T) -> Result<(), ApiError> {
        if record.tenant_id() != self.tenant_id {
            tracing::warn!(
                table = T::TABLE,
                id = %record.id(),
                row_tenant = %record.tenant_id(),
                tenant_id = %self.tenant_id,
                "Tenant mismatch on loaded row"
            );
            return Err(ApiError::forbidden("Access denied"));
        }
        Ok(())
    }

    pub async fn create(&self, mut row: Row) -> Result<T, ApiError> {
        row.remove("id");
        row.insert("tenant_id".to_string(), json!(self.tenant_id));
        let inserted = self.store.insert(T::TABLE, row).await?;
        Self::decode(inserted)
    }

    pub async fn update(&self, id: Uuid, mut patch: Row) -> Result<T, ApiError> {
        patch.remove("id");
        patch.remove("tenant_id");
        let query = self.query().eq("id", id.to_string());
        self.store
            .update(&query, patch)
            .await?
            .into_iter()
            .next()
            .map(Self::decode)
            .transpose()?
            .ok_or_else(|| ApiError::not_found("Record not found"))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let query = self.query().eq("id", id.to_string());
        match self.store.delete(&query).await? {
            0 => Err(ApiError::not_found("Record not found")),
            _ => Ok(()),
        }
    }
}
