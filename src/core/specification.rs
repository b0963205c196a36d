//! Specification composer
//!
//! Turns a [`FilterRequest`] into one [`CompositePredicate`]: every active
//! clause becomes a fragment through its builder and the fragments are
//! AND-combined. Composition is pure; the only input besides the request
//! is the instant used for time-relative aggregates.

use crate::config::UnknownFieldPolicy;
use crate::core::aggregate::AggregateEvaluator;
use crate::core::clause::{exact_clause, flag_clause, range_clause, text_clause};
use crate::core::error::FilterError;
use crate::core::field::{AggregateMode, FieldKind, FilterField};
use crate::core::predicate::Predicate;
use crate::core::registry::{EntityKind, EntitySchema};
use crate::core::request::{ClauseValue, FilterClause, FilterRequest};
use chrono::{DateTime, Utc};

/// The AND of all active fragments of one request
#[derive(Debug, Clone, PartialEq)]
pub struct CompositePredicate {
    pub kind: EntityKind,
    predicate: Predicate,
    active: usize,
}

impl CompositePredicate {
    /// The identity predicate: no constraint
    pub fn match_all(kind: EntityKind) -> Self {
        Self {
            kind,
            predicate: Predicate::True,
            active: 0,
        }
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn into_predicate(self) -> Predicate {
        self.predicate
    }

    /// Number of fragments that were AND-combined
    pub fn active_clauses(&self) -> usize {
        self.active
    }

    pub fn is_match_all(&self) -> bool {
        self.predicate == Predicate::True
    }
}

/// AND-combine fragments
///
/// Cheap scalar fragments go before correlated subqueries. The result does
/// not depend on the order; an empty list matches every row.
pub fn compose(mut fragments: Vec<Predicate>) -> Predicate {
    fragments.sort_by_key(Predicate::cost);
    Predicate::all(fragments)
}

/// Builds composite predicates for one entity schema
pub struct Specification<'s> {
    schema: &'s EntitySchema,
    now: DateTime<Utc>,
    unknown_fields: UnknownFieldPolicy,
}

impl<'s> Specification<'s> {
    pub fn new(schema: &'s EntitySchema) -> Self {
        Self {
            schema,
            now: Utc::now(),
            unknown_fields: UnknownFieldPolicy::Reject,
        }
    }

    /// Evaluate time-relative aggregates at `now`
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn unknown_fields(mut self, policy: UnknownFieldPolicy) -> Self {
        self.unknown_fields = policy;
        self
    }

    /// Compose the request into a single predicate
    ///
    /// Every clause is checked; all field errors are returned together.
    pub fn build(&self, request: &FilterRequest) -> Result<CompositePredicate, FilterError> {
        if request.kind != self.schema.kind {
            return Err(FilterError::invalid_value(
                "$",
                format!(
                    "a {} request cannot be composed against the {} schema",
                    request.kind, self.schema.kind
                ),
            ));
        }

        let aggregates = AggregateEvaluator::new(self.schema, self.now);
        let mut fragments = Vec::new();
        let mut errors = Vec::new();

        if let Some(search) = request.global_query.as_deref().and_then(|q| self.global_search(q)) {
            fragments.push(search);
        }

        for (name, clause) in request.clauses() {
            let field = match self.schema.resolve(name) {
                Ok(field) => field,
                Err(err) => {
                    match self.unknown_fields {
                        UnknownFieldPolicy::Reject => errors.push(err),
                        UnknownFieldPolicy::Ignore => {
                            tracing::warn!(entity = %self.schema.kind, field = %name, "Ignoring unknown filter field");
                        }
                    }
                    continue;
                }
            };
            match self.fragment(&aggregates, field, clause) {
                Ok(Some(fragment)) => fragments.push(fragment),
                Ok(None) => {}
                Err(err) => errors.push(err),
            }
        }

        if let Some(err) = FilterError::collect(errors) {
            return Err(err);
        }

        let active = fragments.len();
        let predicate = compose(fragments);
        tracing::debug!(entity = %self.schema.kind, active, "Composed filter predicate");

        Ok(CompositePredicate {
            kind: self.schema.kind,
            predicate,
            active,
        })
    }

    /// Substring match of the whole query across the search columns
    fn global_search(&self, query: &str) -> Option<Predicate> {
        let query = query.trim();
        if query.is_empty() || self.schema.search_columns().is_empty() {
            return None;
        }
        let alternatives = self
            .schema
            .search_columns()
            .iter()
            .map(|c| Predicate::like(c.column.clone(), query).through(&c.path))
            .collect();
        Some(Predicate::any(alternatives))
    }

    fn fragment(
        &self,
        aggregates: &AggregateEvaluator<'_>,
        field: &FilterField,
        clause: &FilterClause,
    ) -> Result<Option<Predicate>, FilterError> {
        // A clause without a value is inert whatever its negate flag says
        let Some(value) = &clause.value else {
            return Ok(None);
        };
        let negate = clause.negate;

        match (&field.kind, value) {
            (FieldKind::Text, ClauseValue::Text(raw)) => Ok(text_clause(field, raw, negate)),
            (FieldKind::Exact, ClauseValue::Text(raw)) => Ok(exact_clause(field, raw, negate)),
            (FieldKind::DateRange | FieldKind::NumericRange, ClauseValue::Range { lower, upper }) => {
                range_clause(field, lower.as_ref(), upper.as_ref(), negate)
            }
            (FieldKind::Boolean { .. }, ClauseValue::Flag(intent)) => {
                flag_clause(field, *intent, negate).map(Some)
            }
            (
                FieldKind::AggregateCount {
                    mode: AggregateMode::Threshold(_),
                    ..
                },
                ClauseValue::Count(threshold),
            ) => aggregates.threshold_clause(field, *threshold, negate).map(Some),
            (
                FieldKind::AggregateCount {
                    mode: AggregateMode::Presence,
                    ..
                },
                ClauseValue::Flag(intent),
            ) => aggregates.presence_clause(field, *intent, negate).map(Some),
            (kind, _) => Err(FilterError::invalid_value(
                &field.name,
                format!("value does not fit a {} field", kind.label()),
            )),
        }
    }
}
