pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repository::Scoped;
pub use store::{Condition, DataStore, Query, Row, SortDirection, StoreError};
