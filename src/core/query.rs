//! Pagination and sorting parameters

use crate::config::SearchConfig;
use crate::core::error::FilterError;
use crate::core::registry::EntitySchema;
use serde::{Deserialize, Serialize};

/// Page and sort parameters for a search
///
/// Passed through the engine untouched apart from clamping the page size.
///
/// # Example
/// ```rust,ignore
/// GET /admin/users/search?page=2&limit=10&sort=created_at:desc
/// ```
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PageRequest {
    /// Page number (starts at 1)
    #[serde(default = "default_page")]
    pub page: usize,

    /// Number of items per page; the configured default when absent
    pub limit: Option<usize>,

    /// Sort expression: `column:asc`, `column:desc` or `column`
    pub sort: Option<String>,
}

fn default_page() -> usize {
    1
}

impl PageRequest {
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page,
            limit: Some(limit),
            sort: None,
        }
    }

    pub fn sorted_by(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Get page number, ensuring minimum of 1
    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    /// Get limit, at least 1; 20 when unset
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(20).max(1)
    }

    /// Rows to skip before this page
    pub fn offset(&self) -> usize {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// Fill in the default page size, cap the limit and bound the page
    ///
    /// The page is capped so its offset still fits a signed 64-bit
    /// `OFFSET`; past the last row that is just another empty page.
    pub fn clamped(mut self, config: &SearchConfig) -> Self {
        let limit = self.limit.unwrap_or(config.default_page_size);
        let limit = limit.clamp(1, config.max_page_size.max(1));
        let max_page = usize::try_from(i64::MAX).unwrap_or(usize::MAX) / limit;
        self.limit = Some(limit);
        self.page = self.page.clamp(1, max_page.max(1));
        self
    }

    /// Parse the sort expression against the schema's sortable columns
    pub fn sort_order(&self, schema: &EntitySchema) -> Result<Option<SortOrder>, FilterError> {
        let Some(raw) = self.sort.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let (column, direction) = raw.split_once(':').unwrap_or((raw, "asc"));
        let descending = match direction.trim().to_ascii_lowercase().as_str() {
            "asc" => false,
            "desc" => true,
            other => {
                return Err(FilterError::invalid_value(
                    "sort",
                    format!("unknown sort direction '{}'", other),
                ));
            }
        };
        let column = column.trim();
        if !schema.is_sortable(column) {
            return Err(FilterError::invalid_value(
                "sort",
                format!("cannot sort {} by '{}'", schema.kind, column),
            ));
        }
        Ok(Some(SortOrder {
            column: column.to_string(),
            descending,
        }))
    }
}

/// A validated sort column and direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    pub column: String,
    pub descending: bool,
}

/// Paginated response structure
#[derive(Debug, Serialize)]
pub struct Page<T> {
    /// The paginated data
    pub data: Vec<T>,

    /// Pagination metadata
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Serialize, PartialEq)]
pub struct PaginationMeta {
    /// Current page number (starts at 1)
    pub page: usize,

    /// Number of items per page
    pub limit: usize,

    /// Total number of matching rows
    pub total: usize,

    /// Total number of pages
    pub total_pages: usize,

    /// Whether there is a next page
    pub has_next: bool,

    /// Whether there is a previous page
    pub has_prev: bool,
}

impl PaginationMeta {
    /// Create pagination metadata from calculation
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let page = page.max(1);
        // Ensure limit is at least 1 to avoid division by zero
        let limit = limit.max(1);
        let total_pages = if total == 0 { 0 } else { total.div_ceil(limit) };

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page.saturating_mul(limit) < total,
            has_prev: page > 1,
        }
    }
}
