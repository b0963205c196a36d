//! Query executors for different backends

#[cfg(feature = "in-memory")]
pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod sql;

#[cfg(feature = "in-memory")]
pub use in_memory::{InMemoryStore, Row};
#[cfg(feature = "postgres")]
pub use postgres::PostgresExecutor;
pub use sql::SqlQuery;
