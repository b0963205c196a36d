//! Field values, filter field metadata and join paths

use crate::core::predicate::{Comparator, Predicate};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::sync::OnceLock;
use uuid::Uuid;

/// A polymorphic field value that can hold different types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
    Null,
}

impl FieldValue {
    /// Get the value as a string if possible
    pub fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer if possible
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the value as a float, widening integers
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get the value as a UUID if possible
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            FieldValue::Uuid(u) => Some(*u),
            FieldValue::String(s) => Uuid::parse_str(s).ok(),
            _ => None,
        }
    }

    /// Get the value as a timestamp if possible
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Check if the value is a number
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldValue::Integer(_) | FieldValue::Float(_))
    }

    /// Textual form used for substring and enum matching
    ///
    /// Null has no textual form.
    pub fn text(&self) -> Option<Cow<'_, str>> {
        match self {
            FieldValue::String(s) => Some(Cow::Borrowed(s)),
            FieldValue::Integer(i) => Some(Cow::Owned(i.to_string())),
            FieldValue::Float(f) => Some(Cow::Owned(f.to_string())),
            FieldValue::Boolean(b) => Some(Cow::Owned(b.to_string())),
            FieldValue::Uuid(u) => Some(Cow::Owned(u.to_string())),
            FieldValue::DateTime(dt) => Some(Cow::Owned(dt.to_rfc3339())),
            FieldValue::Null => None,
        }
    }

    /// Order two values of compatible types
    ///
    /// Integers and floats compare numerically. Null and mismatched types
    /// are incomparable.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Null, _) | (_, FieldValue::Null) => None,
            (FieldValue::String(a), FieldValue::String(b)) => Some(a.cmp(b)),
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => Some(a.cmp(b)),
            (FieldValue::Uuid(a), FieldValue::Uuid(b)) => Some(a.cmp(b)),
            (FieldValue::DateTime(a), FieldValue::DateTime(b)) => Some(a.cmp(b)),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => Some(a.cmp(b)),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                a.as_f64()?.partial_cmp(&b.as_f64()?)
            }
            _ => None,
        }
    }

    /// Equality as a datastore sees it
    ///
    /// Null equals nothing. A string compares against the textual form of
    /// the other side, so enum names and ids given as text match stored
    /// values.
    pub fn matches(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Null, _) | (_, FieldValue::Null) => false,
            (FieldValue::String(a), b) | (b, FieldValue::String(a)) => {
                b.text().is_some_and(|t| t == a.as_str())
            }
            (a, b) => a.compare(b) == Some(Ordering::Equal),
        }
    }

    /// Short type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::String(_) => "string",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Uuid(_) => "uuid",
            FieldValue::DateTime(_) => "datetime",
            FieldValue::Null => "null",
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.text() {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "null"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Check that a table or column name is a plain SQL identifier
///
/// Registry identifiers are interpolated into rendered SQL, so only
/// lower-case snake_case names are accepted.
pub fn is_valid_identifier(name: &str) -> bool {
    static IDENT_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = IDENT_REGEX.get_or_init(|| {
        Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").expect("identifier regex is valid")
    });
    regex.is_match(name)
}

/// One relation hop from a row to the rows of another table
///
/// A hop joins `table.remote_column = current.local_column`. To-one and
/// to-many relations are expressed the same way.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinStep {
    /// Relation name as the domain knows it (e.g. "owner", "members")
    pub relation: String,
    /// Table reached by this hop
    pub table: String,
    /// Column on the current row
    pub local_column: String,
    /// Column on the joined table
    pub remote_column: String,
}

impl JoinStep {
    pub fn new(
        relation: impl Into<String>,
        table: impl Into<String>,
        local_column: impl Into<String>,
        remote_column: impl Into<String>,
    ) -> Self {
        Self {
            relation: relation.into(),
            table: table.into(),
            local_column: local_column.into(),
            remote_column: remote_column.into(),
        }
    }

    fn identifiers(&self) -> [&str; 3] {
        [&self.table, &self.local_column, &self.remote_column]
    }
}

/// Ordered relation hops from the root entity to the filtered column
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JoinPath(Vec<JoinStep>);

impl JoinPath {
    /// The empty path: the column lives on the root row
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(steps: Vec<JoinStep>) -> Self {
        Self(steps)
    }

    /// Append a hop
    pub fn then(mut self, step: JoinStep) -> Self {
        self.0.push(step);
        self
    }

    pub fn steps(&self) -> &[JoinStep] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Dotted relation names, for logs and error messages
    pub fn describe(&self) -> String {
        self.0
            .iter()
            .map(|s| s.relation.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// First identifier on this path that is not a plain SQL identifier
    pub fn invalid_identifier(&self) -> Option<&str> {
        self.0
            .iter()
            .flat_map(|s| s.identifiers())
            .find(|name| !is_valid_identifier(name))
    }
}

impl From<JoinStep> for JoinPath {
    fn from(step: JoinStep) -> Self {
        Self(vec![step])
    }
}

/// How an aggregate field turns a related-row count into a condition
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateMode {
    /// The request carries a number; `count <comparator> number`
    Threshold(Comparator),
    /// The request carries an intent; the condition is `count > 0`
    Presence,
}

/// The value type of a filterable field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Case-insensitive substring match, comma list of alternatives
    Text,
    /// Case-sensitive equality, comma list of alternatives
    Exact,
    /// Inclusive timestamp range
    DateRange,
    /// Inclusive numeric range
    NumericRange,
    /// A fixed condition toggled by an intent flag
    Boolean { condition: Predicate },
    /// A correlated count over a registered aggregate
    AggregateCount {
        aggregate: String,
        mode: AggregateMode,
    },
}

impl FieldKind {
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Exact => "exact",
            FieldKind::DateRange => "date range",
            FieldKind::NumericRange => "numeric range",
            FieldKind::Boolean { .. } => "boolean",
            FieldKind::AggregateCount { .. } => "aggregate count",
        }
    }
}

/// Registration-time metadata for one filterable field
#[derive(Debug, Clone, PartialEq)]
pub struct FilterField {
    /// Name used in filter requests (e.g. "ownerEmail")
    pub name: String,
    pub kind: FieldKind,
    /// Relation hops from the root row; empty for root columns
    pub path: JoinPath,
    /// Column compared at the end of `path`; empty for boolean and aggregate fields
    pub column: String,
}

impl FilterField {
    fn scalar(name: impl Into<String>, kind: FieldKind, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            path: JoinPath::root(),
            column: column.into(),
        }
    }

    pub fn text(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::scalar(name, FieldKind::Text, column)
    }

    pub fn exact(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::scalar(name, FieldKind::Exact, column)
    }

    pub fn date_range(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::scalar(name, FieldKind::DateRange, column)
    }

    pub fn numeric_range(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::scalar(name, FieldKind::NumericRange, column)
    }

    pub fn boolean(name: impl Into<String>, condition: Predicate) -> Self {
        Self::scalar(name, FieldKind::Boolean { condition }, "")
    }

    pub fn aggregate_threshold(
        name: impl Into<String>,
        aggregate: impl Into<String>,
        comparator: Comparator,
    ) -> Self {
        Self::scalar(
            name,
            FieldKind::AggregateCount {
                aggregate: aggregate.into(),
                mode: AggregateMode::Threshold(comparator),
            },
            "",
        )
    }

    pub fn aggregate_presence(name: impl Into<String>, aggregate: impl Into<String>) -> Self {
        Self::scalar(
            name,
            FieldKind::AggregateCount {
                aggregate: aggregate.into(),
                mode: AggregateMode::Presence,
            },
            "",
        )
    }

    /// Reach the column through a join path instead of the root row
    pub fn via(mut self, path: impl Into<JoinPath>) -> Self {
        self.path = path.into();
        self
    }

    /// Whether this field's fragments use correlated subqueries
    pub fn is_correlated(&self) -> bool {
        matches!(self.kind, FieldKind::AggregateCount { .. }) || !self.path.is_root()
    }
}
