//! # Sieve
//!
//! Dynamic, negatable filter composition for admin search over users and
//! startups.
//!
//! ## Features
//!
//! - **Field Registry**: every filterable field declared once, with its kind and join path
//! - **Negatable Clauses**: text, exact, range, boolean and aggregate clauses, each with a negate flag
//! - **Correlated Aggregates**: "at least N warnings", "has an unexpired session"
//! - **Predicate AST**: one composite predicate any store adapter can run
//! - **Executors**: in-memory evaluator and a PostgreSQL renderer (`postgres` feature)
//! - **Configuration-Based**: unknown-field policy and page sizes from YAML
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sieve::prelude::*;
//!
//! let store = InMemoryStore::new();
//! let search = AdminSearch::standard(store)?;
//!
//! // Users on x.com with no active session
//! let request = FilterRequest::new(EntityKind::User)
//!     .text("email", "x.com")
//!     .flag("hasActiveSession", true)
//!     .negate("hasActiveSession");
//!
//! let page = search.search(&request, PageRequest::new(1, 20)).await?;
//! println!("{} matching users", page.pagination.total);
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Registry ===
    pub use crate::core::{
        aggregate::{AggregateCondition, AggregateDefinition},
        field::{FieldKind, FieldValue, FilterField, JoinPath, JoinStep},
        registry::{EntityKind, EntitySchema, FieldRegistry},
    };

    // === Composition ===
    pub use crate::core::{
        predicate::{Comparator, Predicate},
        request::FilterRequest,
        specification::{CompositePredicate, Specification},
    };

    // === Execution ===
    pub use crate::core::{
        executor::QueryExecutor,
        query::{Page, PageRequest, PaginationMeta},
        service::AdminSearch,
    };

    // === Errors ===
    pub use crate::core::error::{ConfigError, FilterError, SieveError, StorageError};

    // === Storage ===
    #[cfg(feature = "in-memory")]
    pub use crate::storage::InMemoryStore;
    #[cfg(feature = "postgres")]
    pub use crate::storage::PostgresExecutor;

    // === Config ===
    pub use crate::config::{SearchConfig, UnknownFieldPolicy, init_tracing};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use uuid::Uuid;
}
