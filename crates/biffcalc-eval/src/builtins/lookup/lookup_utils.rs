//! Shared helpers for the lookup family (MATCH, VLOOKUP, HLOOKUP, LOOKUP).

use std::cmp::Ordering;

use crate::builtins::utils::{has_wildcards, wildcard_match};
use crate::coercion::resolve_here;
use crate::operators::{compare, compare_numbers, compare_text};
use crate::traits::FunctionContext;
use biffcalc_common::{AreaRef, ErrorCode, ValueResult};

/// The value being looked up. A blank needle never matches anything.
pub fn lookup_needle(ctx: &dyn FunctionContext, v: &ValueResult) -> Result<ValueResult, ErrorCode> {
    match resolve_here(ctx, v)? {
        ValueResult::Blank | ValueResult::MissingArgument => Err(ErrorCode::NotAvailable),
        other => Ok(other),
    }
}

/// Lookup range argument as a single-sheet area.
pub fn lookup_area(v: &ValueResult) -> Result<AreaRef, ErrorCode> {
    match v {
        ValueResult::SingleRef(r) if r.sheets.is_single() => Ok(r.as_area()),
        ValueResult::Area(a) if a.sheets.is_single() => Ok(*a),
        ValueResult::Error(e) => Err(*e),
        _ => Err(ErrorCode::NotAvailable),
    }
}

/// Row-major values of `area`, stopping at the sheet's used extent. The
/// whole area is recorded as an input. Cells past the end are blank and can
/// never match, so they are simply absent.
pub fn line_values(ctx: &dyn FunctionContext, area: &AreaRef) -> Vec<ValueResult> {
    ctx.track_area(area);
    let sheet = area.sheets.first;
    let clipped = match ctx.used_extent(sheet) {
        Some((last_row, last_col)) => area.clip(last_row, last_col),
        None => Some(*area),
    };
    let Some(a) = clipped else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(a.cell_count() as usize);
    for row in a.first_row..=a.last_row {
        for col in a.first_col..=a.last_col {
            out.push(ctx.cell_value(sheet, row, col));
        }
    }
    out
}

fn same_kind(a: &ValueResult, b: &ValueResult) -> bool {
    matches!(
        (a, b),
        (ValueResult::Number(_), ValueResult::Number(_))
            | (ValueResult::Text(_), ValueResult::Text(_))
            | (ValueResult::Boolean(_), ValueResult::Boolean(_))
    )
}

/// Exact-match equality. Text compares case-insensitively and honors
/// wildcards in the needle; values of different kinds never match.
pub fn lookup_eq(needle: &ValueResult, candidate: &ValueResult) -> bool {
    match (needle, candidate) {
        (ValueResult::Number(a), ValueResult::Number(b)) => compare_numbers(*a, *b) == Ordering::Equal,
        (ValueResult::Text(p), ValueResult::Text(c)) => {
            if has_wildcards(p) {
                wildcard_match(p, c)
            } else {
                compare_text(p, c) == Ordering::Equal
            }
        }
        (ValueResult::Boolean(a), ValueResult::Boolean(b)) => a == b,
        _ => false,
    }
}

pub fn exact_position(values: &[ValueResult], needle: &ValueResult) -> Option<usize> {
    values.iter().position(|v| lookup_eq(needle, v))
}

/// Binary search over the values of the needle's kind, which are assumed
/// sorted. Ascending finds the last value `<=` the needle, descending the
/// last value `>=` it.
pub fn approximate_position(values: &[ValueResult], needle: &ValueResult, descending: bool) -> Option<usize> {
    let candidates: Vec<usize> = (0..values.len())
        .filter(|&i| same_kind(&values[i], needle))
        .collect();
    let past = candidates.partition_point(|&i| {
        let ord = compare(&values[i], needle);
        if descending {
            ord != Ordering::Less
        } else {
            ord != Ordering::Greater
        }
    });
    past.checked_sub(1).map(|k| candidates[k])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nums(xs: &[f64]) -> Vec<ValueResult> {
        xs.iter().map(|x| ValueResult::Number(*x)).collect()
    }

    #[test]
    fn approximate_skips_other_kinds() {
        let mut v = nums(&[1.0, 3.0, 5.0]);
        v.insert(1, "x".into());
        assert_eq!(approximate_position(&v, &4.0.into(), false), Some(2));
        assert_eq!(approximate_position(&v, &0.5.into(), false), None);
        assert_eq!(approximate_position(&v, &9.0.into(), false), Some(3));
    }

    #[test]
    fn descending_search() {
        let v = nums(&[9.0, 5.0, 1.0]);
        assert_eq!(approximate_position(&v, &6.0.into(), true), Some(0));
        assert_eq!(approximate_position(&v, &5.0.into(), true), Some(1));
        assert_eq!(approximate_position(&v, &10.0.into(), true), None);
    }

    #[test]
    fn exact_is_case_insensitive_with_wildcards() {
        let v: Vec<ValueResult> = vec!["Apple".into(), "banana".into(), 3.0.into()];
        assert_eq!(exact_position(&v, &"BANANA".into()), Some(1));
        assert_eq!(exact_position(&v, &"b*a".into()), Some(1));
        assert_eq!(exact_position(&v, &"3".into()), None);
        assert_eq!(exact_position(&v, &3.0.into()), Some(2));
    }
}
