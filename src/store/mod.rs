//! Persistence layer — libSQL-backed storage for ingested records.

pub mod libsql_backend;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use traits::RecordStore;
