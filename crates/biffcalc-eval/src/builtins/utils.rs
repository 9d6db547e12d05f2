use crate::coercion::{coerce_to_boolean, coerce_to_int, coerce_to_number, coerce_to_text, resolve_here};
use crate::reference::{as_area, visit_area};
use crate::traits::FunctionContext;
use biffcalc_common::{ErrorCode, ValueResult};

/// Resolved scalar argument as a number.
pub fn arg_number(ctx: &dyn FunctionContext, v: &ValueResult) -> Result<f64, ErrorCode> {
    coerce_to_number(&resolve_here(ctx, v)?)
}

/// Resolved scalar argument as an integer (floor).
pub fn arg_int(ctx: &dyn FunctionContext, v: &ValueResult) -> Result<i64, ErrorCode> {
    coerce_to_int(&resolve_here(ctx, v)?)
}

pub fn arg_text(ctx: &dyn FunctionContext, v: &ValueResult) -> Result<String, ErrorCode> {
    coerce_to_text(&resolve_here(ctx, v)?)
}

/// Resolved boolean argument; blank counts as FALSE.
pub fn arg_bool(ctx: &dyn FunctionContext, v: &ValueResult) -> Result<bool, ErrorCode> {
    Ok(coerce_to_boolean(&resolve_here(ctx, v)?, false)?.unwrap_or(false))
}

/// Optional trailing numeric argument. Absent or an empty slot gives
/// `default`.
pub fn opt_number(
    ctx: &dyn FunctionContext,
    args: &[ValueResult],
    i: usize,
    default: f64,
) -> Result<f64, ErrorCode> {
    match args.get(i) {
        None | Some(ValueResult::MissingArgument) => Ok(default),
        Some(v) => arg_number(ctx, v),
    }
}

pub fn opt_bool(
    ctx: &dyn FunctionContext,
    args: &[ValueResult],
    i: usize,
    default: bool,
) -> Result<bool, ErrorCode> {
    match args.get(i) {
        None | Some(ValueResult::MissingArgument) => Ok(default),
        Some(v) => arg_bool(ctx, v),
    }
}

/// Finite result or `#NUM!`.
pub fn checked(n: f64) -> Result<ValueResult, ErrorCode> {
    if n.is_finite() {
        Ok(ValueResult::Number(if n == 0.0 { 0.0 } else { n }))
    } else {
        Err(ErrorCode::NumOverflow)
    }
}

/* ───────────────────────── Operand walking ───────────────────────── */

/// How values reached through a reference are treated by a numeric
/// reduction. Values typed directly as arguments are always coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefPolicy {
    /// Only numbers count; text and booleans are skipped (`SUM`, `MIN`).
    NumbersOnly,
    /// Booleans count as 1/0 and text as 0 (`MINA`, `MAXA`).
    Everything,
}

/// Collects the numbers of a multi-operand numeric function, in argument
/// order.
///
/// - Direct scalars: numbers, booleans and numeric text count; other text
///   is `#VALUE!`; an empty argument slot is 0.
/// - Referenced cells: filtered by `policy`; blanks never count.
/// - Any error met is returned immediately.
pub fn collect_numbers(
    ctx: &dyn FunctionContext,
    args: &[ValueResult],
    policy: RefPolicy,
) -> Result<Vec<f64>, ErrorCode> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            ValueResult::SingleRef(_) | ValueResult::Area(_) => {
                let Some(area) = as_area(arg) else { continue };
                let mut err = None;
                visit_area(ctx, &area, |v| match referenced_number(&v, policy) {
                    Ok(Some(n)) => {
                        out.push(n);
                        true
                    }
                    Ok(None) => true,
                    Err(e) => {
                        err = Some(e);
                        false
                    }
                });
                if let Some(e) = err {
                    return Err(e);
                }
            }
            ValueResult::MissingArgument => out.push(0.0),
            other => out.push(coerce_to_number(other)?),
        }
    }
    Ok(out)
}

fn referenced_number(v: &ValueResult, policy: RefPolicy) -> Result<Option<f64>, ErrorCode> {
    match (v, policy) {
        (ValueResult::Number(n), _) => Ok(Some(*n)),
        (ValueResult::Error(e), _) => Err(*e),
        (ValueResult::Boolean(b), RefPolicy::Everything) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        (ValueResult::Text(_), RefPolicy::Everything) => Ok(Some(0.0)),
        _ => Ok(None),
    }
}

/// Every value of every argument, references expanded, without coercion.
/// Direct scalars are passed through as-is.
pub fn flatten_values(ctx: &dyn FunctionContext, args: &[ValueResult]) -> Vec<ValueResult> {
    let mut out = Vec::new();
    for arg in args {
        match as_area(arg) {
            Some(area) => visit_area(ctx, &area, |v| {
                out.push(v);
                true
            }),
            None => out.push(arg.clone()),
        }
    }
    out
}

/* ──────────────────────────── Wildcards ──────────────────────────── */

#[derive(Debug, Clone, PartialEq)]
enum Pat {
    AnySeq,
    AnyChar,
    Lit(char),
}

/// True when `pattern` contains an unescaped `*` or `?`.
pub fn has_wildcards(pattern: &str) -> bool {
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '~' => {
                chars.next();
            }
            '*' | '?' => return true,
            _ => {}
        }
    }
    false
}

/// Case-insensitive match of the whole `text` against a pattern where `*`
/// is any run, `?` any one character and `~` escapes the next character.
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let mut pats = Vec::new();
    let mut chars = pattern.chars().flat_map(char::to_lowercase);
    while let Some(c) = chars.next() {
        match c {
            '~' => match chars.next() {
                Some(next) => pats.push(Pat::Lit(next)),
                None => pats.push(Pat::Lit('~')),
            },
            '*' => {
                if pats.last() != Some(&Pat::AnySeq) {
                    pats.push(Pat::AnySeq);
                }
            }
            '?' => pats.push(Pat::AnyChar),
            c => pats.push(Pat::Lit(c)),
        }
    }
    let text: Vec<char> = text.chars().flat_map(char::to_lowercase).collect();

    // Greedy backtracking over the last `*` seen.
    let (mut p, mut t) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        match pats.get(p) {
            Some(Pat::AnyChar) => {
                p += 1;
                t += 1;
            }
            Some(Pat::Lit(c)) if *c == text[t] => {
                p += 1;
                t += 1;
            }
            Some(Pat::AnySeq) => {
                star = Some((p, t));
                p += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    p = sp + 1;
                    t = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }
    pats[p..].iter().all(|x| *x == Pat::AnySeq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::StubContext;
    use biffcalc_common::{AreaRef, SheetSpan};

    #[test]
    fn wildcards() {
        assert!(wildcard_match("a*", "Apple"));
        assert!(wildcard_match("*le", "apple"));
        assert!(wildcard_match("a?p*e", "apple"));
        assert!(wildcard_match("*", ""));
        assert!(!wildcard_match("a?", "a"));
        assert!(wildcard_match("~*", "*"));
        assert!(!wildcard_match("~*", "x"));
        assert!(wildcard_match("a*b*c", "aXXbYYc"));
        assert!(!wildcard_match("a*b*c", "aXXbYY"));
        assert!(has_wildcards("ab?"));
        assert!(!has_wildcards("ab~?"));
    }

    #[test]
    fn numbers_via_reference_skip_text_and_bools() {
        let ctx = StubContext::default()
            .with_cell(0, 0, 1.0)
            .with_cell(1, 0, "x")
            .with_cell(2, 0, true)
            .with_cell(3, 0, 4.0);
        let area = ValueResult::Area(AreaRef::new(SheetSpan::single(0), 0, 0, 3, 0));
        let nums = collect_numbers(&ctx, &[area.clone()], RefPolicy::NumbersOnly).unwrap();
        assert_eq!(nums, vec![1.0, 4.0]);
        let nums = collect_numbers(&ctx, &[area], RefPolicy::Everything).unwrap();
        assert_eq!(nums, vec![1.0, 0.0, 1.0, 4.0]);
    }

    #[test]
    fn direct_scalars_are_coerced() {
        let ctx = StubContext::default();
        let args = [ValueResult::from("2"), ValueResult::Boolean(true), ValueResult::MissingArgument];
        assert_eq!(collect_numbers(&ctx, &args, RefPolicy::NumbersOnly).unwrap(), vec![2.0, 1.0, 0.0]);
        let bad = [ValueResult::from("two")];
        assert_eq!(
            collect_numbers(&ctx, &bad, RefPolicy::NumbersOnly),
            Err(ErrorCode::InvalidValue)
        );
    }
}
