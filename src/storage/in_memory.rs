//! In-memory query executor for testing and development

use crate::core::error::StorageError;
use crate::core::executor::QueryExecutor;
use crate::core::field::{FieldValue, JoinStep};
use crate::core::predicate::Predicate;
use crate::core::query::{Page, PageRequest, PaginationMeta, SortOrder};
use crate::core::registry::EntitySchema;
use crate::core::specification::CompositePredicate;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// One stored row: column name to value
///
/// A missing column reads as NULL.
pub type Row = IndexMap<String, FieldValue>;

/// Build a [`Row`] from `column => value` pairs
///
/// # Example
/// ```rust,ignore
/// let user = row! { "id" => id, "email" => "a@x.com", "last_login_at" => None::<DateTime<Utc>> };
/// ```
#[macro_export]
macro_rules! row {
    ($($column:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut row = $crate::storage::in_memory::Row::new();
        $(
            row.insert(
                ::std::string::ToString::to_string(&$column),
                $crate::core::field::FieldValue::from($value),
            );
        )*
        row
    }};
}

/// In-memory tables evaluated directly against the predicate AST
///
/// Useful for testing and development. Uses RwLock for thread-safe access.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<HashMap<String, Vec<Row>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row to a table, creating the table on first use
    pub fn insert(&self, table: &str, row: Row) -> Result<()> {
        self.insert_many(table, [row])
    }

    pub fn insert_many(&self, table: &str, rows: impl IntoIterator<Item = Row>) -> Result<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        tables.entry(table.to_string()).or_default().extend(rows);

        Ok(())
    }

    /// Number of rows stored in a table
    pub fn len(&self, table: &str) -> Result<usize> {
        let tables = self
            .tables
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(tables.get(table).map_or(0, Vec::len))
    }

    pub fn clear(&self) -> Result<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        tables.clear();

        Ok(())
    }

    /// Matching root rows of `schema`, ordered and unpaginated
    fn matching<'t>(
        tables: &'t HashMap<String, Vec<Row>>,
        schema: &EntitySchema,
        predicate: &Predicate,
        sort: Option<&SortOrder>,
    ) -> Vec<&'t Row> {
        let eval = Evaluator { tables };
        let mut rows: Vec<&Row> = eval
            .rows(&schema.table)
            .filter(|row| eval.matches(row, predicate))
            .collect();

        let pk = schema.primary_key.as_str();
        rows.sort_by(|a, b| {
            let primary = match sort {
                Some(order) => sort_key(a.get(&order.column), b.get(&order.column), order.descending),
                None => Ordering::Equal,
            };
            primary.then_with(|| sort_key(a.get(pk), b.get(pk), false))
        });
        rows
    }
}

/// Order two column values, NULLs last in either direction
fn sort_key(a: Option<&FieldValue>, b: Option<&FieldValue>, descending: bool) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ord = a.compare(b).unwrap_or(Ordering::Equal);
            if descending { ord.reverse() } else { ord }
        }
    }
}

/// Two-valued interpreter for [`Predicate`]
///
/// A comparison with a missing or NULL value is false, and `Not` is the
/// exact complement of its operand.
struct Evaluator<'t> {
    tables: &'t HashMap<String, Vec<Row>>,
}

impl<'t> Evaluator<'t> {
    fn rows(&self, table: &str) -> impl Iterator<Item = &'t Row> + use<'t> {
        self.tables.get(table).into_iter().flatten()
    }

    fn matches(&self, row: &Row, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::True => true,
            Predicate::And(ps) => ps.iter().all(|p| self.matches(row, p)),
            Predicate::Or(ps) => ps.iter().any(|p| self.matches(row, p)),
            Predicate::Not(inner) => !self.matches(row, inner),
            Predicate::Like { column, needle } => row
                .get(column)
                .and_then(FieldValue::text)
                .is_some_and(|text| text.to_lowercase().contains(needle.as_str())),
            Predicate::Equals { column, value } => {
                row.get(column).is_some_and(|v| v.matches(value))
            }
            Predicate::Compare { column, op, value } => row
                .get(column)
                .and_then(|v| v.compare(value))
                .is_some_and(|ord| op.holds(ord)),
            Predicate::Exists { path, filter } => self
                .follow(row, path.steps())
                .into_iter()
                .any(|related| self.matches(related, filter)),
            Predicate::Count(count) => {
                let n = match row.get(&count.outer_key).filter(|k| !k.is_null()) {
                    Some(key) => self
                        .rows(&count.table)
                        .filter(|r| r.get(&count.foreign_key).is_some_and(|fk| fk.matches(key)))
                        .filter(|r| self.matches(r, &count.filter))
                        .count(),
                    None => 0,
                };
                count.op.holds((n as i64).cmp(&count.threshold))
            }
        }
    }

    /// Every row reachable from `row` through `steps`
    fn follow<'r>(&self, row: &'r Row, steps: &[JoinStep]) -> Vec<&'r Row>
    where
        't: 'r,
    {
        let Some((step, rest)) = steps.split_first() else {
            return vec![row];
        };
        let Some(key) = row.get(&step.local_column).filter(|k| !k.is_null()) else {
            return Vec::new();
        };
        self.rows(&step.table)
            .filter(|r| r.get(&step.remote_column).is_some_and(|v| v.matches(key)))
            .flat_map(|r| self.follow(r, rest))
            .collect()
    }
}

fn row_id(schema: &EntitySchema, row: &Row) -> Result<Uuid> {
    row.get(&schema.primary_key)
        .and_then(FieldValue::as_uuid)
        .ok_or_else(|| {
            StorageError::InvalidRow {
                table: schema.table.clone(),
                message: format!("'{}' is missing or not a UUID", schema.primary_key),
            }
            .into()
        })
}

#[async_trait]
impl QueryExecutor for InMemoryStore {
    async fn execute(
        &self,
        schema: &EntitySchema,
        predicate: &CompositePredicate,
        page: &PageRequest,
    ) -> Result<Page<Uuid>> {
        let sort = page.sort_order(schema)?;
        let tables = self
            .tables
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let rows = Self::matching(&tables, schema, predicate.predicate(), sort.as_ref());
        let total = rows.len();
        let data = rows
            .into_iter()
            .skip(page.offset())
            .take(page.limit())
            .map(|row| row_id(schema, row))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(table = %schema.table, total, returned = data.len(), "In-memory search");

        Ok(Page {
            data,
            pagination: PaginationMeta::new(page.page(), page.limit(), total),
        })
    }

    async fn count(&self, schema: &EntitySchema, predicate: &CompositePredicate) -> Result<usize> {
        let tables = self
            .tables
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(Self::matching(&tables, schema, predicate.predicate(), None).len())
    }
}
