//! Core module: field registry, clause builders and the predicate composer

pub mod aggregate;
pub mod clause;
pub mod error;
pub mod executor;
pub mod field;
pub mod predicate;
pub mod query;
pub mod registry;
pub mod request;
pub mod service;
pub mod specification;

pub use aggregate::{AggregateCondition, AggregateDefinition, AggregateEvaluator, AggregateValue};
pub use error::{ConfigError, FilterError, SieveError, StorageError};
pub use executor::QueryExecutor;
pub use field::{AggregateMode, FieldKind, FieldValue, FilterField, JoinPath, JoinStep};
pub use predicate::{Comparator, CountQuery, Predicate};
pub use query::{Page, PageRequest, PaginationMeta, SortOrder};
pub use registry::{EntityKind, EntitySchema, FieldRegistry, SearchColumn};
pub use request::{ClauseValue, FilterClause, FilterRequest};
pub use service::AdminSearch;
pub use specification::{CompositePredicate, Specification, compose};
