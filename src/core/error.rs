//! Typed error handling for the sieve search engine
//!
//! Errors are split by where they originate so callers can react to the
//! specific case instead of inspecting a generic `anyhow::Error`.
//!
//! # Error Categories
//!
//! - [`FilterError`]: the filter request is malformed for the registry
//! - [`ConfigError`]: search configuration could not be loaded
//! - [`StorageError`]: a query executor failed
//!
//! # Example
//!
//! ```rust,ignore
//! match search.search(&request, page).await {
//!     Ok(page) => println!("{} matches", page.pagination.total),
//!     Err(SieveError::Filter(FilterError::UnknownField { field, .. })) => {
//!         println!("unsupported filter: {}", field);
//!     }
//!     Err(e) => eprintln!("search failed: {}", e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The main error type for the search engine
#[derive(Debug)]
pub enum SieveError {
    /// The filter request does not fit the field registry
    Filter(FilterError),

    /// Configuration errors
    Config(ConfigError),

    /// Query executor errors
    Storage(StorageError),

    /// Internal errors (should not happen in normal operation)
    Internal(String),
}

impl fmt::Display for SieveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SieveError::Filter(e) => write!(f, "{}", e),
            SieveError::Config(e) => write!(f, "{}", e),
            SieveError::Storage(e) => write!(f, "{}", e),
            SieveError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for SieveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SieveError::Filter(e) => Some(e),
            SieveError::Config(e) => Some(e),
            SieveError::Storage(e) => Some(e),
            SieveError::Internal(_) => None,
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl SieveError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            SieveError::Filter(e) => e.status_code(),
            SieveError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SieveError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SieveError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            SieveError::Filter(e) => e.error_code(),
            SieveError::Config(_) => "CONFIG_ERROR",
            SieveError::Storage(_) => "STORAGE_ERROR",
            SieveError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            SieveError::Filter(e) => {
                let fields: Vec<FieldErrorDetail> = e.flatten().map(FieldErrorDetail::from).collect();
                Some(serde_json::json!({ "fields": fields }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for SieveError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Filter Errors
// =============================================================================

/// Errors raised while turning a filter request into a predicate
///
/// Every variant except [`FilterError::Fields`] names the offending field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// The request names a field the registry does not know
    #[error("Unknown filter field '{field}' for {entity}")]
    UnknownField { entity: String, field: String },

    /// An aggregate field has no registered correlated condition
    #[error("Filter field '{field}' for {entity} has no registered aggregate condition")]
    UnsupportedAggregateField { entity: String, field: String },

    /// A range whose lower bound is above its upper bound
    #[error("Invalid range for '{field}': lower bound {lower} is greater than upper bound {upper}")]
    InvalidRange {
        field: String,
        lower: String,
        upper: String,
    },

    /// A value that cannot be used for the field (bad date, wrong type...)
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Several field errors found in one request
    #[error("{} invalid filter fields: {}", .0.len(), summarize(.0))]
    Fields(Vec<FilterError>),
}

fn summarize(errors: &[FilterError]) -> String {
    errors
        .iter()
        .map(|e| e.field().unwrap_or("?").to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl FilterError {
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        FilterError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Fold collected errors: none is `None`, one stays itself
    pub fn collect(mut errors: Vec<FilterError>) -> Option<FilterError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(FilterError::Fields(errors)),
        }
    }

    /// Name of the offending field, if the error is about a single field
    pub fn field(&self) -> Option<&str> {
        match self {
            FilterError::UnknownField { field, .. }
            | FilterError::UnsupportedAggregateField { field, .. }
            | FilterError::InvalidRange { field, .. }
            | FilterError::InvalidValue { field, .. } => Some(field),
            FilterError::Fields(_) => None,
        }
    }

    /// Iterate over the single-field errors contained in this error
    pub fn flatten(&self) -> Box<dyn Iterator<Item = &FilterError> + '_> {
        match self {
            FilterError::Fields(errors) => Box::new(errors.iter().flat_map(|e| e.flatten())),
            other => Box::new(std::iter::once(other)),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            FilterError::UnknownField { .. } => StatusCode::BAD_REQUEST,
            FilterError::UnsupportedAggregateField { .. } => StatusCode::BAD_REQUEST,
            FilterError::InvalidRange { .. } => StatusCode::BAD_REQUEST,
            FilterError::InvalidValue { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            FilterError::Fields(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            FilterError::UnknownField { .. } => "UNKNOWN_FILTER_FIELD",
            FilterError::UnsupportedAggregateField { .. } => "UNSUPPORTED_AGGREGATE_FIELD",
            FilterError::InvalidRange { .. } => "INVALID_RANGE",
            FilterError::InvalidValue { .. } => "INVALID_FILTER_VALUE",
            FilterError::Fields(_) => "INVALID_FILTER",
        }
    }
}

impl From<FilterError> for SieveError {
    fn from(err: FilterError) -> Self {
        SieveError::Filter(err)
    }
}

/// Field-level entry in an error response
#[derive(Debug, Clone, Serialize)]
pub struct FieldErrorDetail {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl From<&FilterError> for FieldErrorDetail {
    fn from(err: &FilterError) -> Self {
        Self {
            field: err.field().unwrap_or_default().to_string(),
            code: err.error_code().to_string(),
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to parse configuration
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// Configuration file not found
    FileNotFound { path: String },

    /// IO error while reading configuration
    IoError { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError { file, message } => {
                if let Some(file) = file {
                    write!(f, "Failed to parse config file '{}': {}", file, message)
                } else {
                    write!(f, "Failed to parse config: {}", message)
                }
            }
            ConfigError::InvalidValue {
                field,
                value,
                message,
            } => {
                write!(
                    f,
                    "Invalid value '{}' for field '{}': {}",
                    value, field, message
                )
            }
            ConfigError::FileNotFound { path } => {
                write!(f, "Configuration file not found: {}", path)
            }
            ConfigError::IoError { message } => {
                write!(f, "IO error: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for SieveError {
    fn from(err: ConfigError) -> Self {
        SieveError::Config(err)
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors related to query executors
#[derive(Debug)]
pub enum StorageError {
    /// Connection error
    ConnectionError { backend: String, message: String },

    /// Query execution error
    QueryError { backend: String, message: String },

    /// A row came back without a usable primary key
    InvalidRow { table: String, message: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ConnectionError { backend, message } => {
                write!(f, "{} connection error: {}", backend, message)
            }
            StorageError::QueryError { backend, message } => {
                write!(f, "{} query error: {}", backend, message)
            }
            StorageError::InvalidRow { table, message } => {
                write!(f, "Invalid row in '{}': {}", table, message)
            }
        }
    }
}

impl std::error::Error for StorageError {}

impl From<StorageError> for SieveError {
    fn from(err: StorageError) -> Self {
        SieveError::Storage(err)
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_yaml::Error> for SieveError {
    fn from(err: serde_yaml::Error) -> Self {
        SieveError::Config(ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        })
    }
}

impl From<std::io::Error> for SieveError {
    fn from(err: std::io::Error) -> Self {
        SieveError::Config(ConfigError::IoError {
            message: err.to_string(),
        })
    }
}

impl From<anyhow::Error> for SieveError {
    fn from(err: anyhow::Error) -> Self {
        // Typed errors travel through executors as anyhow; recover them
        match err.downcast::<FilterError>() {
            Ok(filter) => SieveError::Filter(filter),
            Err(err) => match err.downcast::<StorageError>() {
                Ok(storage) => SieveError::Storage(storage),
                Err(err) => SieveError::Internal(err.to_string()),
            },
        }
    }
}
