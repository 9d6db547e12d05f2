//! Operand resolution and coercion between value kinds.
//!
//! Every operator and most functions funnel their arguments through here.
//! The rules are those of the legacy spreadsheet engine, which differ from
//! ordinary language conversions in several places:
//! - blank is 0 and `""` but has no boolean opinion;
//! - text parses as a number only when the whole string is numeric;
//! - doubles become integers by `floor`, not truncation.

use crate::reference::choose_single_element;
use crate::traits::FunctionContext;
use biffcalc_common::{ErrorCode, ValueResult};

/// Reduces `value` to a scalar as seen from the formula cell at
/// (`src_row`, `src_col`).
///
/// A cell reference is dereferenced; an area goes through smart selection
/// first. An error value becomes `Err` so that callers can bail out with `?`.
/// Blank and missing arguments come back unchanged.
pub fn resolve_single(
    ctx: &dyn FunctionContext,
    value: &ValueResult,
    src_row: u32,
    src_col: u32,
) -> Result<ValueResult, ErrorCode> {
    match value {
        ValueResult::SingleRef(r) => {
            if !r.sheets.is_single() {
                return Err(ErrorCode::InvalidValue);
            }
            let inner = ctx.cell_value(r.sheets.first, r.row, r.col);
            resolve_single(ctx, &inner, src_row, src_col)
        }
        ValueResult::Area(a) => {
            let cell = choose_single_element(a, src_row, src_col)?;
            let inner = ctx.cell_value(cell.sheets.first, cell.row, cell.col);
            resolve_single(ctx, &inner, src_row, src_col)
        }
        ValueResult::Error(e) => Err(*e),
        scalar => Ok(scalar.clone()),
    }
}

/// `resolve_single` at the position of the formula being evaluated.
pub fn resolve_here(ctx: &dyn FunctionContext, value: &ValueResult) -> Result<ValueResult, ErrorCode> {
    resolve_single(ctx, value, ctx.row_index(), ctx.column_index())
}

/* ───────────────────────────── Numbers ───────────────────────────── */

/// Scalar to number.
///
/// Blank and missing arguments are 0, booleans 1/0, text must parse
/// completely (see [`parse_double`]).
pub fn coerce_to_number(value: &ValueResult) -> Result<f64, ErrorCode> {
    match value {
        ValueResult::Number(n) => Ok(*n),
        ValueResult::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        ValueResult::Blank | ValueResult::MissingArgument => Ok(0.0),
        ValueResult::Text(s) => parse_double(s).ok_or(ErrorCode::InvalidValue),
        ValueResult::Error(e) => Err(*e),
        ValueResult::SingleRef(_) | ValueResult::Area(_) => Err(ErrorCode::InvalidValue),
    }
}

/// Parses numeric text: optional surrounding whitespace, optional sign,
/// digits with at most one decimal point, optional exponent. Words such as
/// `inf` or `NaN` are not numbers here.
pub fn parse_double(text: &str) -> Option<f64> {
    let s = text.trim();
    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(i) => (&unsigned[..i], Some(&unsigned[i + 1..])),
        None => (unsigned, None),
    };
    let has_digit = mantissa.bytes().any(|b| b.is_ascii_digit());
    let well_formed = mantissa.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        && mantissa.bytes().filter(|b| *b == b'.').count() <= 1;
    if !has_digit || !well_formed {
        return None;
    }
    if let Some(exp) = exponent {
        let digits = exp.strip_prefix(['+', '-']).unwrap_or(exp);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Double to integer argument by rounding toward negative infinity.
/// `-1.5` becomes `-2`, never `-1`.
pub fn floor_to_int(n: f64) -> i64 {
    n.floor() as i64
}

/// Scalar to integer via [`coerce_to_number`] and [`floor_to_int`].
pub fn coerce_to_int(value: &ValueResult) -> Result<i64, ErrorCode> {
    coerce_to_number(value).map(floor_to_int)
}

/* ────────────────────────────── Text ─────────────────────────────── */

/// Scalar to text. Blank is `""`, booleans are `TRUE`/`FALSE`.
pub fn coerce_to_text(value: &ValueResult) -> Result<String, ErrorCode> {
    match value {
        ValueResult::Text(s) => Ok(s.clone()),
        ValueResult::Number(n) => Ok(number_to_text(*n)),
        ValueResult::Boolean(b) => Ok(if *b { "TRUE" } else { "FALSE" }.to_string()),
        ValueResult::Blank | ValueResult::MissingArgument => Ok(String::new()),
        ValueResult::Error(e) => Err(*e),
        ValueResult::SingleRef(_) | ValueResult::Area(_) => Err(ErrorCode::InvalidValue),
    }
}

/// Shortest text that parses back to the same double. Magnitudes outside
/// `[1e-5, 1e21)` use scientific notation with a signed two-digit exponent
/// (`1E+21`, `1.5E-07`).
pub fn number_to_text(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if (1e-5..1e21).contains(&abs) {
        return format!("{n}");
    }
    let sci = format!("{n:E}");
    match sci.split_once('E') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}E{sign}{:02}", exp.abs())
        }
        None => sci,
    }
}

/* ──────────────────────────── Booleans ───────────────────────────── */

/// Scalar to boolean, where `None` means "no opinion".
///
/// Blank gives `None` rather than `false`. With `strings_are_blank` set,
/// any text is treated like blank; otherwise only `TRUE`/`FALSE`
/// (any case) are accepted.
pub fn coerce_to_boolean(
    value: &ValueResult,
    strings_are_blank: bool,
) -> Result<Option<bool>, ErrorCode> {
    match value {
        ValueResult::Blank | ValueResult::MissingArgument => Ok(None),
        ValueResult::Boolean(b) => Ok(Some(*b)),
        ValueResult::Number(n) if n.is_nan() => Err(ErrorCode::InvalidValue),
        ValueResult::Number(n) => Ok(Some(*n != 0.0)),
        ValueResult::Text(_) if strings_are_blank => Ok(None),
        ValueResult::Text(s) => parse_boolean(s).map(Some).ok_or(ErrorCode::InvalidValue),
        ValueResult::Error(e) => Err(*e),
        ValueResult::SingleRef(_) | ValueResult::Area(_) => Err(ErrorCode::InvalidValue),
    }
}

/// `TRUE`/`FALSE` in any case.
pub fn parse_boolean(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("TRUE") {
        Some(true)
    } else if s.eq_ignore_ascii_case("FALSE") {
        Some(false)
    } else {
        None
    }
}
