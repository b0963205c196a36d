//! Correlated aggregate conditions
//!
//! An aggregate counts the rows of a related table that point back at the
//! outer row and satisfy a fixed condition, e.g. active warnings in the
//! moderation log or unexpired refresh tokens. Filter fields reference an
//! aggregate by name; the evaluator turns the reference into a
//! [`Predicate::Count`].

use crate::core::clause::apply_intent;
use crate::core::error::FilterError;
use crate::core::field::{AggregateMode, FieldKind, FieldValue, FilterField};
use crate::core::predicate::{Comparator, CountQuery, Predicate};
use crate::core::registry::EntitySchema;
use chrono::{DateTime, Utc};

/// Right-hand side of an aggregate condition
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateValue {
    Literal(FieldValue),
    /// The instant the request is composed at
    Now,
}

/// One condition a related row must satisfy to be counted
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateCondition {
    pub column: String,
    pub op: Comparator,
    pub value: AggregateValue,
}

impl AggregateCondition {
    pub fn new(column: impl Into<String>, op: Comparator, value: AggregateValue) -> Self {
        Self {
            column: column.into(),
            op,
            value,
        }
    }

    /// `column = value`
    pub fn equals(column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(column, Comparator::Eq, AggregateValue::Literal(value.into()))
    }

    /// `column > now`
    pub fn after_now(column: impl Into<String>) -> Self {
        Self::new(column, Comparator::Gt, AggregateValue::Now)
    }

    fn resolve(&self, now: DateTime<Utc>) -> Predicate {
        let value = match &self.value {
            AggregateValue::Literal(v) => v.clone(),
            AggregateValue::Now => FieldValue::DateTime(now),
        };
        match self.op {
            Comparator::Eq => Predicate::equals(self.column.clone(), value),
            op => Predicate::compare(self.column.clone(), op, value),
        }
    }
}

/// A named count over a related table
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateDefinition {
    pub name: String,
    /// Related table whose rows are counted
    pub table: String,
    /// Column on the related table referencing the outer row's primary key
    pub foreign_key: String,
    /// All conditions must hold for a related row to count
    pub conditions: Vec<AggregateCondition>,
}

impl AggregateDefinition {
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            foreign_key: foreign_key.into(),
            conditions: Vec::new(),
        }
    }

    pub fn when(mut self, condition: AggregateCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// The correlated count compared with `threshold`
    pub fn count(
        &self,
        outer_key: &str,
        op: Comparator,
        threshold: i64,
        now: DateTime<Utc>,
    ) -> Predicate {
        let filter = Predicate::all(self.conditions.iter().map(|c| c.resolve(now)).collect());
        Predicate::Count(CountQuery {
            table: self.table.clone(),
            foreign_key: self.foreign_key.clone(),
            outer_key: outer_key.to_string(),
            filter: Box::new(filter),
            op,
            threshold,
        })
    }
}

/// Builds count-based fragments for one entity schema
///
/// `now` is fixed when the evaluator is created so that every aggregate in
/// one request sees the same instant.
pub struct AggregateEvaluator<'a> {
    schema: &'a EntitySchema,
    now: DateTime<Utc>,
}

impl<'a> AggregateEvaluator<'a> {
    pub fn new(schema: &'a EntitySchema, now: DateTime<Utc>) -> Self {
        Self { schema, now }
    }

    fn definition<'f>(
        &self,
        field: &'f FilterField,
    ) -> Result<(&'a AggregateDefinition, &'f AggregateMode), FilterError> {
        let unsupported = || FilterError::UnsupportedAggregateField {
            entity: self.schema.kind.to_string(),
            field: field.name.clone(),
        };
        match &field.kind {
            FieldKind::AggregateCount { aggregate, mode } => self
                .schema
                .aggregate_definition(aggregate)
                .map(|def| (def, mode))
                .ok_or_else(unsupported),
            _ => Err(unsupported()),
        }
    }

    /// `count <comparator> threshold`, negated as a whole when asked
    pub fn threshold_clause(
        &self,
        field: &FilterField,
        threshold: i64,
        negate: bool,
    ) -> Result<Predicate, FilterError> {
        let (definition, mode) = self.definition(field)?;
        let AggregateMode::Threshold(op) = mode else {
            return Err(FilterError::invalid_value(
                &field.name,
                "expected true or false, not a count",
            ));
        };
        if threshold < 0 {
            return Err(FilterError::invalid_value(
                &field.name,
                format!("count threshold must not be negative (got {})", threshold),
            ));
        }
        let count = definition.count(&self.schema.primary_key, *op, threshold, self.now);
        Ok(count.negate_if(negate))
    }

    /// `count > 0` with the intent/negate table applied once
    pub fn presence_clause(
        &self,
        field: &FilterField,
        intent: bool,
        negate: bool,
    ) -> Result<Predicate, FilterError> {
        let (definition, mode) = self.definition(field)?;
        if *mode != AggregateMode::Presence {
            return Err(FilterError::invalid_value(
                &field.name,
                "expected a count, not true or false",
            ));
        }
        let present = definition.count(&self.schema.primary_key, Comparator::Gt, 0, self.now);
        Ok(apply_intent(present, intent, negate))
    }
}
