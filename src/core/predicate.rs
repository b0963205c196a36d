//! Predicate AST handed to query executors
//!
//! The engine never talks to a datastore. It emits a [`Predicate`], a small
//! tagged tree over the capabilities every backing store offers: equality,
//! case-insensitive substring, ordered comparison, relation existence,
//! correlated counts and the boolean connectives. Store adapters interpret
//! the tree (see `storage::in_memory` and `storage::sql`).
//!
//! Column references are always relative to the row in scope. `Exists`
//! and `Count` open a new scope on the related rows.

use crate::core::field::{FieldValue, JoinPath, is_valid_identifier};
use std::cmp::Ordering;
use std::fmt;

/// Comparison operator for scalar comparisons and count thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparator {
    /// The operator whose truth value is always the opposite
    pub fn inverse(self) -> Self {
        match self {
            Comparator::Eq => Comparator::Ne,
            Comparator::Ne => Comparator::Eq,
            Comparator::Gt => Comparator::Lte,
            Comparator::Gte => Comparator::Lt,
            Comparator::Lt => Comparator::Gte,
            Comparator::Lte => Comparator::Gt,
        }
    }

    /// Whether `left <op> right` holds given `left.cmp(right)`
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Comparator::Eq => ordering == Ordering::Equal,
            Comparator::Ne => ordering != Ordering::Equal,
            Comparator::Gt => ordering == Ordering::Greater,
            Comparator::Gte => ordering != Ordering::Less,
            Comparator::Lt => ordering == Ordering::Less,
            Comparator::Lte => ordering != Ordering::Greater,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Ne => "<>",
            Comparator::Gt => ">",
            Comparator::Gte => ">=",
            Comparator::Lt => "<",
            Comparator::Lte => "<=",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A correlated count over a related table
#[derive(Debug, Clone, PartialEq)]
pub struct CountQuery {
    /// Related table whose rows are counted
    pub table: String,
    /// Column on the related table referencing the outer row
    pub foreign_key: String,
    /// Column on the outer row the foreign key points at
    pub outer_key: String,
    /// Condition on the related rows; evaluated in their scope
    pub filter: Box<Predicate>,
    pub op: Comparator,
    pub threshold: i64,
}

/// A boolean condition over the row in scope
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every row
    True,
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    /// `lower(column)` contains `needle`; `needle` is stored lower-cased
    Like { column: String, needle: String },
    Equals { column: String, value: FieldValue },
    Compare {
        column: String,
        op: Comparator,
        value: FieldValue,
    },
    /// Some row reachable through `path` satisfies `filter`
    Exists { path: JoinPath, filter: Box<Predicate> },
    Count(CountQuery),
}

impl Predicate {
    pub fn like(column: impl Into<String>, needle: &str) -> Self {
        Predicate::Like {
            column: column.into(),
            needle: needle.to_lowercase(),
        }
    }

    pub fn equals(column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Predicate::Equals {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn compare(column: impl Into<String>, op: Comparator, value: impl Into<FieldValue>) -> Self {
        Predicate::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// Some related row exists through `path`
    pub fn exists(path: impl Into<JoinPath>) -> Self {
        Self::exists_where(path, Predicate::True)
    }

    /// Some related row through `path` satisfies `filter`
    pub fn exists_where(path: impl Into<JoinPath>, filter: Predicate) -> Self {
        Predicate::Exists {
            path: path.into(),
            filter: Box::new(filter),
        }
    }

    /// Evaluate `self` on the rows reached through `path`
    ///
    /// The root path leaves the predicate unchanged.
    pub fn through(self, path: &JoinPath) -> Self {
        if path.is_root() {
            self
        } else {
            Self::exists_where(path.clone(), self)
        }
    }

    /// Conjunction; an empty list is the identity
    pub fn all(mut predicates: Vec<Predicate>) -> Self {
        predicates.retain(|p| *p != Predicate::True);
        match predicates.len() {
            0 => Predicate::True,
            1 => predicates.remove(0),
            _ => Predicate::And(predicates),
        }
    }

    /// Disjunction of at least one predicate
    pub fn any(mut predicates: Vec<Predicate>) -> Self {
        if predicates.len() == 1 {
            predicates.remove(0)
        } else {
            Predicate::Or(predicates)
        }
    }

    /// Logical NOT of the whole predicate
    ///
    /// Double negation collapses and a count comparison flips its
    /// operator, so `NOT (count >= n)` becomes `count < n`.
    pub fn negate(self) -> Self {
        match self {
            Predicate::Not(inner) => *inner,
            Predicate::Count(mut count) => {
                count.op = count.op.inverse();
                Predicate::Count(count)
            }
            other => Predicate::Not(Box::new(other)),
        }
    }

    /// Negate when `negate` is set
    pub fn negate_if(self, negate: bool) -> Self {
        if negate { self.negate() } else { self }
    }

    /// Whether evaluating this predicate needs a correlated subquery
    pub fn is_correlated(&self) -> bool {
        match self {
            Predicate::Exists { .. } | Predicate::Count(_) => true,
            Predicate::And(ps) | Predicate::Or(ps) => ps.iter().any(Predicate::is_correlated),
            Predicate::Not(inner) => inner.is_correlated(),
            _ => false,
        }
    }

    /// First table or column name in the tree that is not a plain identifier
    pub fn invalid_identifier(&self) -> Option<&str> {
        match self {
            Predicate::True => None,
            Predicate::And(ps) | Predicate::Or(ps) => ps.iter().find_map(Predicate::invalid_identifier),
            Predicate::Not(inner) => inner.invalid_identifier(),
            Predicate::Like { column, .. }
            | Predicate::Equals { column, .. }
            | Predicate::Compare { column, .. } => {
                (!is_valid_identifier(column)).then_some(column.as_str())
            }
            Predicate::Exists { path, filter } => path
                .invalid_identifier()
                .or_else(|| filter.invalid_identifier()),
            Predicate::Count(count) => [&count.table, &count.foreign_key, &count.outer_key]
                .into_iter()
                .find(|name| !is_valid_identifier(name))
                .map(String::as_str)
                .or_else(|| count.filter.invalid_identifier()),
        }
    }

    /// Rough evaluation cost used to order conjunctions
    pub fn cost(&self) -> u32 {
        match self {
            Predicate::True => 0,
            Predicate::Like { .. } | Predicate::Equals { .. } | Predicate::Compare { .. } => 1,
            Predicate::Exists { filter, .. } => 10 + filter.cost(),
            Predicate::Count(count) => 20 + count.filter.cost(),
            Predicate::Not(inner) => inner.cost(),
            Predicate::And(ps) | Predicate::Or(ps) => ps.iter().map(Predicate::cost).sum(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, ps: &[Predicate], sep: &str) -> fmt::Result {
            write!(f, "(")?;
            for (i, p) in ps.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", sep)?;
                }
                write!(f, "{}", p)?;
            }
            write!(f, ")")
        }

        match self {
            Predicate::True => write!(f, "TRUE"),
            Predicate::And(ps) => join(f, ps, "AND"),
            Predicate::Or(ps) => join(f, ps, "OR"),
            Predicate::Not(inner) => write!(f, "NOT {}", inner),
            Predicate::Like { column, needle } => write!(f, "{} ~ '%{}%'", column, needle),
            Predicate::Equals { column, value } => write!(f, "{} = '{}'", column, value),
            Predicate::Compare { column, op, value } => {
                write!(f, "{} {} '{}'", column, op, value)
            }
            Predicate::Exists { path, filter } => {
                write!(f, "EXISTS {} [{}]", path.describe(), filter)
            }
            Predicate::Count(count) => write!(
                f,
                "COUNT {} [{}] {} {}",
                count.table, count.filter, count.op, count.threshold
            ),
        }
    }
}
