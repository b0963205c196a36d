//! Query executor trait
//!
//! The composer only produces a [`CompositePredicate`]. Running it against
//! a datastore is the job of a [`QueryExecutor`]; the crate ships an
//! in-memory executor and a PostgreSQL one (feature `postgres`).

use crate::core::query::{Page, PageRequest};
use crate::core::registry::EntitySchema;
use crate::core::specification::CompositePredicate;
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Runs composite predicates against a backing store
///
/// Implementations must evaluate the predicate with two-valued logic: a
/// comparison against a missing value is false, and `NOT p` selects exactly
/// the rows `p` does not. An empty result is a successful page, never an
/// error.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Ids of the matching root rows for one page
    async fn execute(
        &self,
        schema: &EntitySchema,
        predicate: &CompositePredicate,
        page: &PageRequest,
    ) -> Result<Page<Uuid>>;

    /// Number of matching root rows
    async fn count(&self, schema: &EntitySchema, predicate: &CompositePredicate) -> Result<usize>;
}

#[async_trait]
impl<E: QueryExecutor + ?Sized> QueryExecutor for std::sync::Arc<E> {
    async fn execute(
        &self,
        schema: &EntitySchema,
        predicate: &CompositePredicate,
        page: &PageRequest,
    ) -> Result<Page<Uuid>> {
        (**self).execute(schema, predicate, page).await
    }

    async fn count(&self, schema: &EntitySchema, predicate: &CompositePredicate) -> Result<usize> {
        (**self).count(schema, predicate).await
    }
}
