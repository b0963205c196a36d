//! PostgreSQL rendering of the predicate AST
//!
//! Produces SQL text with `$1`, `$2`... placeholders and the matching bind
//! values. Table and column names come from the field registry, which only
//! admits plain snake_case identifiers; every value is bound, never
//! interpolated.
//!
//! # Two-valued logic
//!
//! SQL comparisons against NULL yield NULL, and `NOT NULL` is still NULL, so
//! a naive rendering of `NOT (country = 'FR')` would drop rows whose country
//! is NULL. Every leaf comparison is wrapped in `COALESCE(..., FALSE)`;
//! `EXISTS` and `COUNT(*)` comparisons are never NULL. Negation is then the
//! exact complement, as in the in-memory evaluator.

use crate::core::error::FilterError;
use crate::core::field::{FieldValue, JoinStep};
use crate::core::predicate::Predicate;
use crate::core::query::PageRequest;
use crate::core::registry::EntitySchema;
use crate::core::specification::CompositePredicate;

/// Alias of the root table in rendered queries
const ROOT_ALIAS: &str = "r";

/// Rendered SQL with its bind values in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<FieldValue>,
}

/// `SELECT <pk> ... ORDER BY ... LIMIT ... OFFSET ...` for one page
pub fn select_ids(
    schema: &EntitySchema,
    predicate: &CompositePredicate,
    page: &PageRequest,
) -> Result<SqlQuery, FilterError> {
    let sort = page.sort_order(schema)?;
    let mut renderer = Renderer::default();
    let condition = renderer.condition(predicate.predicate(), ROOT_ALIAS);

    let pk = column(ROOT_ALIAS, &schema.primary_key);
    let mut order_by = Vec::with_capacity(2);
    if let Some(sort) = sort {
        let direction = if sort.descending { "DESC" } else { "ASC" };
        order_by.push(format!(
            "{} {} NULLS LAST",
            column(ROOT_ALIAS, &sort.column),
            direction
        ));
    }
    order_by.push(format!("{} ASC", pk));

    let limit = renderer.bind(FieldValue::Integer(bind_size(page.limit())));
    let offset = renderer.bind(FieldValue::Integer(bind_size(page.offset())));

    let sql = format!(
        "SELECT {pk} FROM {table} AS {alias} WHERE {condition} ORDER BY {order} LIMIT {limit} OFFSET {offset}",
        table = ident(&schema.table),
        alias = ident(ROOT_ALIAS),
        order = order_by.join(", "),
    );
    Ok(renderer.finish(sql))
}

/// LIMIT/OFFSET value; anything past `i64::MAX` is just an empty page
fn bind_size(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// `SELECT COUNT(*) ...` over every matching root row
pub fn count(schema: &EntitySchema, predicate: &CompositePredicate) -> SqlQuery {
    let mut renderer = Renderer::default();
    let condition = renderer.condition(predicate.predicate(), ROOT_ALIAS);
    let sql = format!(
        "SELECT COUNT(*) FROM {} AS {} WHERE {}",
        ident(&schema.table),
        ident(ROOT_ALIAS),
        condition
    );
    renderer.finish(sql)
}

/// Render a bare condition over rows aliased `alias`
pub fn condition(predicate: &Predicate, alias: &str) -> SqlQuery {
    let mut renderer = Renderer::default();
    let sql = renderer.condition(predicate, alias);
    renderer.finish(sql)
}

fn ident(name: &str) -> String {
    format!("\"{}\"", name)
}

fn column(alias: &str, name: &str) -> String {
    format!("{}.{}", ident(alias), ident(name))
}

/// Escape LIKE metacharacters; used with `ESCAPE '\'`
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Default)]
struct Renderer {
    params: Vec<FieldValue>,
    aliases: usize,
}

impl Renderer {
    fn bind(&mut self, value: FieldValue) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    fn alias(&mut self) -> String {
        self.aliases += 1;
        format!("j{}", self.aliases)
    }

    fn finish(self, sql: String) -> SqlQuery {
        SqlQuery {
            sql,
            params: self.params,
        }
    }

    fn join(&mut self, ps: &[Predicate], scope: &str, separator: &str, empty: &str) -> String {
        if ps.is_empty() {
            return empty.to_string();
        }
        let parts: Vec<String> = ps.iter().map(|p| self.condition(p, scope)).collect();
        format!("({})", parts.join(separator))
    }

    fn condition(&mut self, predicate: &Predicate, scope: &str) -> String {
        match predicate {
            Predicate::True => "TRUE".to_string(),
            Predicate::And(ps) => self.join(ps, scope, " AND ", "TRUE"),
            Predicate::Or(ps) => self.join(ps, scope, " OR ", "FALSE"),
            Predicate::Not(inner) => format!("NOT ({})", self.condition(inner, scope)),
            Predicate::Like { column: col, needle } => {
                let pattern = self.bind(FieldValue::String(format!("%{}%", escape_like(needle))));
                format!(
                    "COALESCE(LOWER(CAST({} AS TEXT)) LIKE {} ESCAPE '\\', FALSE)",
                    column(scope, col),
                    pattern
                )
            }
            Predicate::Equals { value, .. } if value.is_null() => "FALSE".to_string(),
            Predicate::Equals { column: col, value } => {
                // Text compares against the column's textual form, as enum and id values arrive as text
                let left = match value {
                    FieldValue::String(_) => format!("CAST({} AS TEXT)", column(scope, col)),
                    _ => column(scope, col),
                };
                let right = self.bind(value.clone());
                format!("COALESCE({} = {}, FALSE)", left, right)
            }
            Predicate::Compare { value, .. } if value.is_null() => "FALSE".to_string(),
            Predicate::Compare {
                column: col,
                op,
                value,
            } => {
                let right = self.bind(value.clone());
                format!("COALESCE({} {} {}, FALSE)", column(scope, col), op.symbol(), right)
            }
            Predicate::Exists { path, filter } => self.exists(path.steps(), filter, scope),
            Predicate::Count(count) => {
                let alias = self.alias();
                let filter = self.condition(&count.filter, &alias);
                let threshold = self.bind(FieldValue::Integer(count.threshold));
                format!(
                    "(SELECT COUNT(*) FROM {} AS {} WHERE {} = {} AND {}) {} {}",
                    ident(&count.table),
                    ident(&alias),
                    column(&alias, &count.foreign_key),
                    column(scope, &count.outer_key),
                    filter,
                    count.op.symbol(),
                    threshold
                )
            }
        }
    }

    /// `EXISTS (SELECT 1 FROM a JOIN b ... WHERE a.fk = scope.key AND filter)`
    fn exists(&mut self, steps: &[JoinStep], filter: &Predicate, scope: &str) -> String {
        let Some((first, rest)) = steps.split_first() else {
            return self.condition(filter, scope);
        };

        let first_alias = self.alias();
        let mut from = format!("{} AS {}", ident(&first.table), ident(&first_alias));
        let mut previous = first_alias.clone();
        for step in rest {
            let alias = self.alias();
            from.push_str(&format!(
                " JOIN {} AS {} ON {} = {}",
                ident(&step.table),
                ident(&alias),
                column(&alias, &step.remote_column),
                column(&previous, &step.local_column)
            ));
            previous = alias;
        }

        let filter = self.condition(filter, &previous);
        format!(
            "EXISTS (SELECT 1 FROM {} WHERE {} = {} AND {})",
            from,
            column(&first_alias, &first.remote_column),
            column(scope, &first.local_column),
            filter
        )
    }
}
