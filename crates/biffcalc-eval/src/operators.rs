//! Operator semantics: arithmetic, concatenation, comparison and the
//! unary prefix/postfix operators.
//!
//! Operands arrive unresolved; each operator resolves them left to right
//! from the position of the calling formula, so the left operand's error
//! wins when both sides fail.

use std::cmp::Ordering;

use crate::coercion::{coerce_to_number, coerce_to_text, resolve_here};
use crate::reference;
use crate::traits::FunctionContext;
use biffcalc_common::{BinaryOp, ErrorCode, UnaryOp, ValueResult};

/// Applies any binary operator.
pub fn apply_binary(
    ctx: &dyn FunctionContext,
    op: BinaryOp,
    left: &ValueResult,
    right: &ValueResult,
) -> ValueResult {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Pow => {
            arithmetic(ctx, op, left, right)
        }
        BinaryOp::Concat => concatenate(ctx, left, right),
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            relational(ctx, op, left, right)
        }
        BinaryOp::Range => reference::range_union(left, right),
        BinaryOp::Intersect => reference::intersect(left, right),
    }
}

/* ─────────────────────────── Arithmetic ──────────────────────────── */

/// `+ - * / ^` on two operands.
///
/// A zero result is returned as `+0.0` for every operator except `-`,
/// which keeps the IEEE sign of its result.
pub fn arithmetic(
    ctx: &dyn FunctionContext,
    op: BinaryOp,
    left: &ValueResult,
    right: &ValueResult,
) -> ValueResult {
    match eval_arithmetic(ctx, op, left, right) {
        Ok(n) => ValueResult::Number(n),
        Err(e) => ValueResult::Error(e),
    }
}

fn eval_arithmetic(
    ctx: &dyn FunctionContext,
    op: BinaryOp,
    left: &ValueResult,
    right: &ValueResult,
) -> Result<f64, ErrorCode> {
    let a = coerce_to_number(&resolve_here(ctx, left)?)?;
    let b = coerce_to_number(&resolve_here(ctx, right)?)?;
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(ErrorCode::DivByZero);
            }
            a / b
        }
        BinaryOp::Pow => a.powf(b),
        _ => return Err(ErrorCode::InvalidValue),
    };
    // matches both +0.0 and -0.0
    if result == 0.0 && op != BinaryOp::Sub {
        return Ok(0.0);
    }
    if !result.is_finite() {
        return Err(ErrorCode::NumOverflow);
    }
    Ok(result)
}

/* ────────────────────────── Concatenation ────────────────────────── */

pub fn concatenate(ctx: &dyn FunctionContext, left: &ValueResult, right: &ValueResult) -> ValueResult {
    let joined = (|| {
        let a = coerce_to_text(&resolve_here(ctx, left)?)?;
        let b = coerce_to_text(&resolve_here(ctx, right)?)?;
        Ok::<_, ErrorCode>(a + &b)
    })();
    match joined {
        Ok(s) => ValueResult::Text(s),
        Err(e) => ValueResult::Error(e),
    }
}

/* ─────────────────────────── Comparison ──────────────────────────── */

pub fn relational(
    ctx: &dyn FunctionContext,
    op: BinaryOp,
    left: &ValueResult,
    right: &ValueResult,
) -> ValueResult {
    let a = match resolve_here(ctx, left) {
        Ok(v) => v,
        Err(e) => return ValueResult::Error(e),
    };
    let b = match resolve_here(ctx, right) {
        Ok(v) => v,
        Err(e) => return ValueResult::Error(e),
    };
    let ord = compare(&a, &b);
    let result = match op {
        BinaryOp::Eq => ord == Ordering::Equal,
        BinaryOp::Ne => ord != Ordering::Equal,
        BinaryOp::Lt => ord == Ordering::Less,
        BinaryOp::Le => ord != Ordering::Greater,
        BinaryOp::Gt => ord == Ordering::Greater,
        BinaryOp::Ge => ord != Ordering::Less,
        _ => return ValueResult::Error(ErrorCode::InvalidValue),
    };
    ValueResult::Boolean(result)
}

/// Total order over resolved scalars.
///
/// Blank (and a missing argument) is equal to 0, FALSE and `""`. Otherwise
/// any boolean is greater than any text, and any text greater than any
/// number. Within a kind: FALSE < TRUE, text case-insensitively, numbers
/// by [`compare_numbers`].
pub fn compare(a: &ValueResult, b: &ValueResult) -> Ordering {
    use ValueResult::*;
    if is_blank_like(a) {
        return compare_blank(b);
    }
    if is_blank_like(b) {
        return compare_blank(a).reverse();
    }
    match (a, b) {
        (Boolean(x), Boolean(y)) => x.cmp(y),
        (Boolean(_), _) => Ordering::Greater,
        (_, Boolean(_)) => Ordering::Less,
        (Text(x), Text(y)) => compare_text(x, y),
        (Text(_), _) => Ordering::Greater,
        (_, Text(_)) => Ordering::Less,
        (Number(x), Number(y)) => compare_numbers(*x, *y),
        _ => Ordering::Equal,
    }
}

fn is_blank_like(v: &ValueResult) -> bool {
    matches!(v, ValueResult::Blank | ValueResult::MissingArgument)
}

/// Blank on the left, `v` on the right.
fn compare_blank(v: &ValueResult) -> Ordering {
    match v {
        ValueResult::Boolean(true) => Ordering::Less,
        ValueResult::Number(n) => compare_numbers(0.0, *n),
        ValueResult::Text(s) if !s.is_empty() => Ordering::Less,
        _ => Ordering::Equal,
    }
}

/// Case-insensitive text order.
pub fn compare_text(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Numbers that agree to 15 significant digits are equal, the precision
/// the spreadsheet keeps. `0.1 + 0.2` equals `0.3` here.
pub fn compare_numbers(a: f64, b: f64) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    round_to_15_digits(a)
        .partial_cmp(&round_to_15_digits(b))
        .unwrap_or(Ordering::Equal)
}

pub(crate) fn round_to_15_digits(n: f64) -> f64 {
    if n == 0.0 || !n.is_finite() {
        return n;
    }
    format!("{n:.14e}").parse().unwrap_or(n)
}

/* ───────────────────────────── Unary ─────────────────────────────── */

/// `+x`, `-x` and `x%`.
///
/// Unary plus hands text back untouched, so `+"abc"` is `"abc"` while
/// `-"abc"` is `#VALUE!`.
pub fn unary(ctx: &dyn FunctionContext, op: UnaryOp, operand: &ValueResult) -> ValueResult {
    let v = match resolve_here(ctx, operand) {
        Ok(v) => v,
        Err(e) => return ValueResult::Error(e),
    };
    if op == UnaryOp::Plus {
        if let ValueResult::Text(_) = v {
            return v;
        }
    }
    let d = match coerce_to_number(&v) {
        Ok(d) => d,
        Err(e) => return ValueResult::Error(e),
    };
    let result = match op {
        UnaryOp::Plus => d,
        UnaryOp::Minus => -d,
        UnaryOp::Percent => d / 100.0,
    };
    if result == 0.0 {
        return ValueResult::ZERO;
    }
    ValueResult::Number(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn n(x: f64) -> ValueResult {
        ValueResult::Number(x)
    }

    #[test]
    fn mixed_kind_order() {
        let t = ValueResult::Boolean(true);
        let abc = ValueResult::from("abc");
        let five = n(5.0);
        let empty = ValueResult::from("");
        assert_eq!(compare(&t, &abc), Ordering::Greater);
        assert_eq!(compare(&abc, &five), Ordering::Greater);
        assert_eq!(compare(&five, &empty), Ordering::Less);
        assert_eq!(compare(&empty, &ValueResult::Blank), Ordering::Equal);
        assert_eq!(compare(&ValueResult::Blank, &n(0.0)), Ordering::Equal);
        assert_eq!(compare(&ValueResult::Blank, &ValueResult::Boolean(false)), Ordering::Equal);
        assert_eq!(compare(&ValueResult::Blank, &t), Ordering::Less);
        assert_eq!(compare(&n(-1.0), &ValueResult::Blank), Ordering::Less);
    }

    #[test]
    fn text_is_case_insensitive() {
        assert_eq!(compare_text("Apple", "aPPLE"), Ordering::Equal);
        assert_eq!(compare_text("apple", "Banana"), Ordering::Less);
    }

    #[test]
    fn numbers_compare_at_15_digits() {
        assert_eq!(compare_numbers(0.1 + 0.2, 0.3), Ordering::Equal);
        assert_eq!(compare_numbers(1.0, 1.0000000001), Ordering::Less);
        assert_eq!(compare_numbers(-0.0, 0.0), Ordering::Equal);
    }

    proptest! {
        #[test]
        fn order_is_antisymmetric(a in -1e6f64..1e6, b in -1e6f64..1e6, ta in "[a-zA-Z]{0,4}") {
            let values = [n(a), n(b), ValueResult::from(ta.as_str()), ValueResult::Blank, ValueResult::Boolean(a > b)];
            for x in &values {
                for y in &values {
                    prop_assert_eq!(compare(x, y), compare(y, x).reverse());
                }
            }
        }
    }
}
