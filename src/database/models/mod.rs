//! Typed mirrors of store rows.
//!
//! Every entity deserializes from the store's snake_case row and serializes
//! as the camelCase API shape from the same declaration. Relation refs are
//! filled in by `services::relations` and omitted from the output when absent.

pub mod access_request;
pub mod decision;
pub mod invitation;
pub mod kaizen;
pub mod meeting;
pub mod project;
pub mod role;
pub mod sprint;
pub mod tag;
pub mod task;
pub mod tenant;
pub mod time_log;
pub mod user;

pub use access_request::AccessRequest;
pub use decision::Decision;
pub use invitation::Invitation;
pub use kaizen::Kaizen;
pub use meeting::Meeting;
pub use project::{Project, ProjectMember, ProjectRef};
pub use role::{Role, UserRole};
pub use sprint::{Sprint, SprintRef};
pub use tag::{Tag, TagRef};
pub use task::Task;
pub use tenant::Tenant;
pub use time_log::TimeLog;
pub use user::{User, UserRef};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::Row;

/// A row owned by exactly one tenant
pub trait TenantRecord: DeserializeOwned + Serialize + Send + Sync {
    const TABLE: &'static str;

    fn id(&self) -> Uuid;
    fn tenant_id(&self) -> Uuid;

    /// Fill derived fields after loading
    fn hydrate(&mut self) {}
}

/// Decode a store row into its typed form
pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(row))
}

/// Encode a payload struct as a store row (snake_case keys)
pub fn to_row<T: Serialize>(value: &T) -> Result<Row, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(row) => Ok(row),
        other => Err(serde::ser::Error::custom(format!("expected an object, got {}", other))),
    }
}

macro_rules! tenant_record {
    ($ty:ty, $table:literal) => {
        impl $crate::database::models::TenantRecord for $ty {
            const TABLE: &'static str = $table;

            fn id(&self) -> uuid::Uuid {
                self.id
            }

            fn tenant_id(&self) -> uuid::Uuid {
                self.tenant_id
            }
        }
    };
}

pub(crate) use tenant_record;
