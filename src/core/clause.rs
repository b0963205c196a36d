//! Clause builders
//!
//! One builder per value kind. Each turns a raw request value and its
//! negate flag into a predicate fragment, or into nothing when the value
//! does not activate the clause. Negation always wraps the fully formed
//! fragment: a comma list is OR-combined first and the group is negated as
//! a whole, a range is AND-combined first and negated as a whole.

use crate::core::error::FilterError;
use crate::core::field::{FieldKind, FieldValue, FilterField};
use crate::core::predicate::{Comparator, Predicate};

/// Non-blank, trimmed alternatives of a comma-separated value
pub fn tokens(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Apply the negate flag to a fully formed fragment
pub fn apply_negation(predicate: Predicate, negate: bool) -> Predicate {
    predicate.negate_if(negate)
}

/// Combine a condition with an intent flag and a negate flag
///
/// The condition holds in the result exactly when `intent XOR negate`:
///
/// | intent | negate | result        |
/// |--------|--------|---------------|
/// | true   | false  | condition     |
/// | true   | true   | NOT condition |
/// | false  | false  | NOT condition |
/// | false  | true   | condition     |
pub fn apply_intent(condition: Predicate, intent: bool, negate: bool) -> Predicate {
    condition.negate_if(intent == negate)
}

fn alternatives<F>(field: &FilterField, raw: &str, negate: bool, leaf: F) -> Option<Predicate>
where
    F: Fn(&str) -> Predicate,
{
    let tokens = tokens(raw);
    if tokens.is_empty() {
        return None;
    }
    let group = Predicate::any(tokens.into_iter().map(leaf).collect());
    Some(apply_negation(group.through(&field.path), negate))
}

/// Case-insensitive substring match, one alternative per comma token
///
/// Blank input never activates the clause, whatever the negate flag says.
pub fn text_clause(field: &FilterField, raw: &str, negate: bool) -> Option<Predicate> {
    alternatives(field, raw, negate, |token| {
        Predicate::like(field.column.clone(), token)
    })
}

/// Case-sensitive equality, one alternative per comma token
pub fn exact_clause(field: &FilterField, raw: &str, negate: bool) -> Option<Predicate> {
    alternatives(field, raw, negate, |token| {
        Predicate::equals(field.column.clone(), token)
    })
}

fn check_bound(field: &FilterField, bound: &FieldValue) -> Result<(), FilterError> {
    let ok = match field.kind {
        FieldKind::DateRange => matches!(bound, FieldValue::DateTime(_)),
        FieldKind::NumericRange => bound.is_numeric(),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(FilterError::invalid_value(
            &field.name,
            format!("a {} bound cannot be a {}", field.kind.label(), bound.type_name()),
        ))
    }
}

/// Inclusive range; active when at least one bound is present
///
/// A null bound counts as absent. `lower > upper` is rejected rather than
/// producing a clause that can never match.
pub fn range_clause(
    field: &FilterField,
    lower: Option<&FieldValue>,
    upper: Option<&FieldValue>,
    negate: bool,
) -> Result<Option<Predicate>, FilterError> {
    let lower = lower.filter(|v| !v.is_null());
    let upper = upper.filter(|v| !v.is_null());

    for bound in lower.iter().chain(upper.iter()) {
        check_bound(field, bound)?;
    }

    if let (Some(lo), Some(hi)) = (lower, upper) {
        if lo.compare(hi) == Some(std::cmp::Ordering::Greater) {
            return Err(FilterError::InvalidRange {
                field: field.name.clone(),
                lower: lo.to_string(),
                upper: hi.to_string(),
            });
        }
    }

    let mut bounds = Vec::with_capacity(2);
    if let Some(lo) = lower {
        bounds.push(Predicate::compare(field.column.clone(), Comparator::Gte, lo.clone()));
    }
    if let Some(hi) = upper {
        bounds.push(Predicate::compare(field.column.clone(), Comparator::Lte, hi.clone()));
    }
    if bounds.is_empty() {
        return Ok(None);
    }

    let range = Predicate::all(bounds).through(&field.path);
    Ok(Some(apply_negation(range, negate)))
}

/// Boolean/existence clause: the registered condition under the intent table
pub fn flag_clause(field: &FilterField, intent: bool, negate: bool) -> Result<Predicate, FilterError> {
    match &field.kind {
        FieldKind::Boolean { condition } => {
            Ok(apply_intent(condition.clone().through(&field.path), intent, negate))
        }
        other => Err(FilterError::invalid_value(
            &field.name,
            format!("a {} field does not take true or false", other.label()),
        )),
    }
}
