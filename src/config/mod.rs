//! Search configuration loading

use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What to do with request fields the registry does not know
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFieldPolicy {
    /// Fail the whole request with `UnknownField`
    #[default]
    Reject,
    /// Drop the field and log a warning
    Ignore,
}

/// Configuration for the admin search engine
///
/// # Example
/// ```yaml
/// unknown_fields: reject
/// default_page_size: 20
/// max_page_size: 100
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Policy for unknown request fields
    pub unknown_fields: UnknownFieldPolicy,

    /// Page size used when a request does not give one
    pub default_page_size: usize,

    /// Upper bound for any requested page size
    pub max_page_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            unknown_fields: UnknownFieldPolicy::Reject,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl SearchConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => ConfigError::IoError {
                message: e.to_string(),
            },
        })?;
        Self::parse(&content, Some(path.display().to_string()))
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Self::parse(yaml, None)
    }

    fn parse(yaml: &str, file: Option<String>) -> Result<Self, ConfigError> {
        // An empty document means "all defaults"
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            file,
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check page size bounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_page_size".to_string(),
                value: self.max_page_size.to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(ConfigError::InvalidValue {
                field: "default_page_size".to_string(),
                value: self.default_page_size.to_string(),
                message: format!("must be between 1 and max_page_size ({})", self.max_page_size),
            });
        }
        Ok(())
    }
}

/// Install a `tracing` subscriber honouring `RUST_LOG`
///
/// Falls back to `default_directive` (e.g. `"sieve=debug"`) when `RUST_LOG`
/// is unset. Safe to call more than once; later calls are no-ops.
pub fn init_tracing(default_directive: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
