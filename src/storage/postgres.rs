//! PostgreSQL query executor using sqlx.
//!
//! Runs the SQL produced by [`storage::sql`](crate::storage::sql) against a
//! `sqlx::PgPool`. Tables are expected to follow the built-in schemas
//! (`users`, `startups`, `startup_members`, ...); the executor never
//! creates or migrates them.
//!
//! # Feature flag
//!
//! This module is gated behind the `postgres` feature flag:
//! ```toml
//! [dependencies]
//! sieve-rs = { version = "0.1", features = ["postgres"] }
//! ```

use crate::core::error::StorageError;
use crate::core::executor::QueryExecutor;
use crate::core::field::FieldValue;
use crate::core::query::{Page, PageRequest, PaginationMeta};
use crate::core::registry::EntitySchema;
use crate::core::specification::CompositePredicate;
use crate::storage::sql::{self, SqlQuery};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::Arguments;
use sqlx::PgPool;
use sqlx::postgres::PgArguments;
use uuid::Uuid;

/// Query executor backed by PostgreSQL.
///
/// # Example
///
/// ```rust,ignore
/// use sqlx::PgPool;
/// use sieve::prelude::*;
///
/// let pool = PgPool::connect("postgres://localhost/unicorn").await?;
/// let search = AdminSearch::standard(PostgresExecutor::new(pool))?;
/// ```
#[derive(Clone, Debug)]
pub struct PostgresExecutor {
    pool: PgPool,
}

impl PostgresExecutor {
    /// Create a new `PostgresExecutor` with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn query_error(e: impl std::fmt::Display) -> anyhow::Error {
    StorageError::QueryError {
        backend: "postgres".to_string(),
        message: e.to_string(),
    }
    .into()
}

/// Pool and transport failures are connection errors; the rest are query errors
fn storage_error(e: sqlx::Error) -> anyhow::Error {
    match e {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::ConnectionError {
            backend: "postgres".to_string(),
            message: e.to_string(),
        }
        .into(),
        e => query_error(e),
    }
}

/// Bind rendered parameters in placeholder order
fn arguments(query: &SqlQuery) -> Result<PgArguments> {
    let mut args = PgArguments::default();
    for param in &query.params {
        let added = match param {
            FieldValue::String(s) => args.add(s.clone()),
            FieldValue::Integer(i) => args.add(*i),
            FieldValue::Float(f) => args.add(*f),
            FieldValue::Boolean(b) => args.add(*b),
            FieldValue::Uuid(u) => args.add(*u),
            FieldValue::DateTime(dt) => args.add(*dt),
            FieldValue::Null => args.add(None::<String>),
        };
        added.map_err(query_error)?;
    }
    Ok(args)
}

#[async_trait]
impl QueryExecutor for PostgresExecutor {
    async fn execute(
        &self,
        schema: &EntitySchema,
        predicate: &CompositePredicate,
        page: &PageRequest,
    ) -> Result<Page<Uuid>> {
        let select = sql::select_ids(schema, predicate, page)?;
        let total = self.count(schema, predicate).await?;

        tracing::debug!(sql = %select.sql, params = select.params.len(), "Running postgres search");

        let data: Vec<Uuid> = sqlx::query_scalar_with(&select.sql, arguments(&select)?)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(Page {
            data,
            pagination: PaginationMeta::new(page.page(), page.limit(), total),
        })
    }

    async fn count(&self, schema: &EntitySchema, predicate: &CompositePredicate) -> Result<usize> {
        let count = sql::count(schema, predicate);
        let total: i64 = sqlx::query_scalar_with(&count.sql, arguments(&count)?)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(usize::try_from(total).unwrap_or_default())
    }
}
