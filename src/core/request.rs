//! Filter requests
//!
//! A [`FilterRequest`] is built per search call, consumed once by the
//! composer and dropped. It can be assembled with the typed builder methods
//! or decoded from the flat camelCase body the admin API accepts:
//!
//! ```json
//! {
//!   "globalQuery": "acme",
//!   "email": "x.com,y.com", "emailNegate": true,
//!   "createdAtFrom": "2024-01-01", "createdAtTo": "2024-06-30",
//!   "hasActiveSession": false, "hasActiveSessionNegate": true,
//!   "minWarningCount": 2
//! }
//! ```

use crate::config::UnknownFieldPolicy;
use crate::core::error::FilterError;
use crate::core::field::{AggregateMode, FieldKind, FieldValue, FilterField};
use crate::core::registry::{EntityKind, EntitySchema};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;

/// The raw value a clause carries
#[derive(Debug, Clone, PartialEq)]
pub enum ClauseValue {
    /// Text or exact match, possibly a comma-separated list
    Text(String),
    /// Optional inclusive bounds
    Range {
        lower: Option<FieldValue>,
        upper: Option<FieldValue>,
    },
    /// Intent of a boolean or presence field
    Flag(bool),
    /// Threshold of an aggregate count field
    Count(i64),
}

/// One filter condition on one field
///
/// A clause without a value is inert, even when `negate` is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterClause {
    pub value: Option<ClauseValue>,
    pub negate: bool,
}

/// Filter request for one entity kind
#[derive(Debug, Clone, PartialEq)]
pub struct FilterRequest {
    pub kind: EntityKind,
    /// Free-text query over the schema's search columns; never negated
    pub global_query: Option<String>,
    clauses: IndexMap<String, FilterClause>,
}

impl FilterRequest {
    /// An empty request: no constraint at all
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            global_query: None,
            clauses: IndexMap::new(),
        }
    }

    pub fn global_query(mut self, query: impl Into<String>) -> Self {
        self.global_query = Some(query.into());
        self
    }

    fn set(mut self, field: &str, value: ClauseValue) -> Self {
        self.clauses.entry(field.to_string()).or_default().value = Some(value);
        self
    }

    /// Text or exact value (comma list of alternatives)
    pub fn text(self, field: &str, value: impl Into<String>) -> Self {
        self.set(field, ClauseValue::Text(value.into()))
    }

    /// Range bounds; `None` leaves that side open
    pub fn range(self, field: &str, lower: Option<FieldValue>, upper: Option<FieldValue>) -> Self {
        self.set(field, ClauseValue::Range { lower, upper })
    }

    /// Closed range `[lower, upper]`
    pub fn between(
        self,
        field: &str,
        lower: impl Into<FieldValue>,
        upper: impl Into<FieldValue>,
    ) -> Self {
        self.range(field, Some(lower.into()), Some(upper.into()))
    }

    /// Intent of a boolean or presence field
    pub fn flag(self, field: &str, intent: bool) -> Self {
        self.set(field, ClauseValue::Flag(intent))
    }

    /// Threshold of an aggregate count field
    pub fn count(self, field: &str, threshold: i64) -> Self {
        self.set(field, ClauseValue::Count(threshold))
    }

    /// Set the negate flag of a field
    pub fn negate(mut self, field: &str) -> Self {
        self.clauses.entry(field.to_string()).or_default().negate = true;
        self
    }

    pub fn clauses(&self) -> impl Iterator<Item = (&str, &FilterClause)> {
        self.clauses.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn clause(&self, field: &str) -> Option<&FilterClause> {
        self.clauses.get(field)
    }

    /// Whether any clause carries a value or the global query is set
    pub fn has_any_filter(&self) -> bool {
        self.global_query.is_some() || self.clauses.values().any(|c| c.value.is_some())
    }

    /// Decode the flat camelCase request body
    ///
    /// `null` values are treated as absent. Unknown keys are handled per
    /// `policy`; every other problem is reported against the offending key
    /// and all problems are returned together.
    pub fn from_json(
        schema: &EntitySchema,
        body: &Value,
        policy: UnknownFieldPolicy,
    ) -> Result<Self, FilterError> {
        let Some(object) = body.as_object() else {
            return Err(FilterError::invalid_value(
                "$",
                "filter request must be a JSON object",
            ));
        };

        let mut request = FilterRequest::new(schema.kind);
        let mut errors = Vec::new();

        for (key, value) in object {
            if value.is_null() {
                continue;
            }
            if key == "globalQuery" {
                match value.as_str() {
                    Some(q) => request.global_query = Some(q.to_string()),
                    None => errors.push(FilterError::invalid_value(key, "expected a string")),
                }
                continue;
            }

            let Some((field, part)) = split_key(schema, key) else {
                match policy {
                    UnknownFieldPolicy::Reject => errors.push(FilterError::UnknownField {
                        entity: schema.kind.to_string(),
                        field: key.clone(),
                    }),
                    UnknownFieldPolicy::Ignore => {
                        tracing::warn!(entity = %schema.kind, field = %key, "Ignoring unknown filter field");
                    }
                }
                continue;
            };

            if let Err(e) = request.apply(field, part, key, value) {
                errors.push(e);
            }
        }

        match FilterError::collect(errors) {
            Some(err) => Err(err),
            None => Ok(request),
        }
    }

    fn apply(
        &mut self,
        field: &FilterField,
        part: KeyPart,
        key: &str,
        value: &Value,
    ) -> Result<(), FilterError> {
        let clause = self.clauses.entry(field.name.clone()).or_default();
        match part {
            KeyPart::Negate => {
                clause.negate = value
                    .as_bool()
                    .ok_or_else(|| FilterError::invalid_value(key, "expected true or false"))?;
            }
            KeyPart::Value => {
                clause.value = Some(match &field.kind {
                    FieldKind::Text | FieldKind::Exact => ClauseValue::Text(json_text(key, value)?),
                    FieldKind::Boolean { .. }
                    | FieldKind::AggregateCount {
                        mode: AggregateMode::Presence,
                        ..
                    } => ClauseValue::Flag(
                        value
                            .as_bool()
                            .ok_or_else(|| FilterError::invalid_value(key, "expected true or false"))?,
                    ),
                    FieldKind::AggregateCount { .. } => ClauseValue::Count(value.as_i64().ok_or_else(
                        || FilterError::invalid_value(key, "expected a whole number"),
                    )?),
                    // split_key never yields a bare range key
                    FieldKind::DateRange | FieldKind::NumericRange => {
                        return Err(FilterError::invalid_value(key, "expected range bounds"));
                    }
                });
            }
            KeyPart::Lower | KeyPart::Upper => {
                let bound = match field.kind {
                    FieldKind::DateRange => {
                        FieldValue::DateTime(json_datetime(key, value, part == KeyPart::Upper)?)
                    }
                    _ => json_number(key, value)?,
                };
                let (lower, upper) = match clause.value.take() {
                    Some(ClauseValue::Range { lower, upper }) => (lower, upper),
                    _ => (None, None),
                };
                clause.value = Some(if part == KeyPart::Lower {
                    ClauseValue::Range {
                        lower: Some(bound),
                        upper,
                    }
                } else {
                    ClauseValue::Range {
                        lower,
                        upper: Some(bound),
                    }
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyPart {
    Value,
    Negate,
    Lower,
    Upper,
}

/// Map a body key to its field and the part of the clause it sets
fn split_key<'s>(schema: &'s EntitySchema, key: &str) -> Option<(&'s FilterField, KeyPart)> {
    if let Some(field) = schema.get(key) {
        let is_range = matches!(field.kind, FieldKind::DateRange | FieldKind::NumericRange);
        return (!is_range).then_some((field, KeyPart::Value));
    }

    const SUFFIXES: [(&str, KeyPart); 5] = [
        ("Negate", KeyPart::Negate),
        ("From", KeyPart::Lower),
        ("To", KeyPart::Upper),
        ("Min", KeyPart::Lower),
        ("Max", KeyPart::Upper),
    ];

    SUFFIXES.iter().find_map(|(suffix, part)| {
        let field = schema.get(key.strip_suffix(suffix)?)?;
        let fits = match (&field.kind, part) {
            (_, KeyPart::Negate) => true,
            (FieldKind::DateRange, _) => suffix.starts_with('F') || suffix.starts_with('T'),
            (FieldKind::NumericRange, _) => suffix.starts_with('M'),
            _ => false,
        };
        fits.then_some((field, *part))
    })
}

fn json_text(key: &str, value: &Value) -> Result<String, FilterError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(FilterError::invalid_value(key, "expected a string")),
    }
}

fn json_number(key: &str, value: &Value) -> Result<FieldValue, FilterError> {
    let invalid = || FilterError::invalid_value(key, format!("'{}' is not a number", value));
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(FieldValue::Integer(i)),
            None => n.as_f64().map(FieldValue::Float).ok_or_else(invalid),
        },
        // Decimal amounts are often sent as strings to keep precision
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Ok(FieldValue::Integer(i))
            } else {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(FieldValue::Float)
                    .ok_or_else(invalid)
            }
        }
        _ => Err(invalid()),
    }
}

fn json_datetime(key: &str, value: &Value, upper: bool) -> Result<DateTime<Utc>, FilterError> {
    let raw = value
        .as_str()
        .ok_or_else(|| FilterError::invalid_value(key, "expected a date string"))?;
    let parsed = if upper { parse_upper_bound(raw) } else { parse_datetime(raw) };
    parsed.ok_or_else(|| {
        FilterError::invalid_value(
            key,
            format!(
                "'{}' is not a date (expected RFC 3339, YYYY-MM-DDTHH:MM:SS or YYYY-MM-DD)",
                raw
            ),
        )
    })
}

/// Parse a request timestamp
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.fff]` taken as UTC, or a
/// bare date taken as midnight UTC.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse an inclusive upper bound
///
/// Same formats as [`parse_datetime`], but a bare date covers that whole
/// day: `2024-06-30` ends at `2024-06-30T23:59:59.999999999Z`.
pub fn parse_upper_bound(raw: &str) -> Option<DateTime<Utc>> {
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => date
            .and_hms_nano_opt(23, 59, 59, 999_999_999)
            .map(|naive| naive.and_utc()),
        Err(_) => parse_datetime(raw),
    }
}
