//! Admin search service
//!
//! Glue between the field registry, the composer and a query executor.

use crate::config::SearchConfig;
use crate::core::error::SieveError;
use crate::core::executor::QueryExecutor;
use crate::core::query::{Page, PageRequest};
use crate::core::registry::{EntityKind, EntitySchema, FieldRegistry};
use crate::core::request::FilterRequest;
use crate::core::specification::{CompositePredicate, Specification};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Admin search over the registered entities
///
/// Cheap to clone; the registry and executor are shared.
#[derive(Clone)]
pub struct AdminSearch<E> {
    registry: Arc<FieldRegistry>,
    config: SearchConfig,
    executor: E,
}

impl<E: QueryExecutor> AdminSearch<E> {
    pub fn new(registry: Arc<FieldRegistry>, executor: E) -> Self {
        Self {
            registry,
            config: SearchConfig::default(),
            executor,
        }
    }

    /// Search with the built-in user and startup schemas
    pub fn standard(executor: E) -> Result<Self, SieveError> {
        Ok(Self::new(Arc::new(FieldRegistry::standard()?), executor))
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    fn schema(&self, kind: EntityKind) -> Result<&EntitySchema, SieveError> {
        self.registry
            .schema(kind)
            .ok_or_else(|| SieveError::Internal(format!("No schema registered for {}", kind)))
    }

    /// Compose a request at the current instant
    pub fn compose(&self, request: &FilterRequest) -> Result<CompositePredicate, SieveError> {
        self.compose_at(request, Utc::now())
    }

    /// Compose a request with time-relative aggregates evaluated at `now`
    pub fn compose_at(
        &self,
        request: &FilterRequest,
        now: DateTime<Utc>,
    ) -> Result<CompositePredicate, SieveError> {
        let schema = self.schema(request.kind)?;
        let predicate = Specification::new(schema)
            .at(now)
            .unknown_fields(self.config.unknown_fields)
            .build(request)?;
        Ok(predicate)
    }

    /// Run a filter request and return one page of matching ids
    pub async fn search(
        &self,
        request: &FilterRequest,
        page: PageRequest,
    ) -> Result<Page<Uuid>, SieveError> {
        self.search_at(request, page, Utc::now()).await
    }

    pub async fn search_at(
        &self,
        request: &FilterRequest,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<Page<Uuid>, SieveError> {
        let schema = self.schema(request.kind)?;
        let predicate = self.compose_at(request, now)?;
        let page = page.clamped(&self.config);
        // Reject a bad sort before touching the store
        page.sort_order(schema)?;

        tracing::debug!(
            entity = %request.kind,
            filter = %predicate.predicate(),
            page = page.page(),
            limit = page.limit(),
            "Running admin search"
        );

        let result = self.executor.execute(schema, &predicate, &page).await?;
        Ok(result)
    }

    /// Decode a flat JSON body and run it
    pub async fn search_json(
        &self,
        kind: EntityKind,
        body: &Value,
        page: PageRequest,
    ) -> Result<Page<Uuid>, SieveError> {
        let schema = self.schema(kind)?;
        let request = FilterRequest::from_json(schema, body, self.config.unknown_fields)?;
        self.search(&request, page).await
    }

    /// Number of rows matching a request
    pub async fn count(&self, request: &FilterRequest) -> Result<usize, SieveError> {
        let schema = self.schema(request.kind)?;
        let predicate = self.compose(request)?;
        Ok(self.executor.count(schema, &predicate).await?)
    }
}
