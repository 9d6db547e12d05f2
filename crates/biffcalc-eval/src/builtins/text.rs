//! Text functions. Positions and lengths count characters, 1-based.

use super::utils::{arg_int, arg_number, arg_text, has_wildcards, wildcard_match};
use crate::coercion::{number_to_text, parse_double, resolve_here};
use crate::function::Function;
use crate::traits::FunctionContext;
use biffcalc_common::{ErrorCode, ValueResult};

/// Longest string a cell can hold.
const MAX_TEXT_LEN: usize = 32767;

fn text(s: String) -> Result<ValueResult, ErrorCode> {
    if s.chars().count() > MAX_TEXT_LEN {
        return Err(ErrorCode::InvalidValue);
    }
    Ok(ValueResult::Text(s))
}

/// Optional count argument (`LEFT`/`RIGHT`); absent means 1, negative is
/// `#VALUE!`.
fn opt_count(ctx: &dyn FunctionContext, args: &[ValueResult], i: usize) -> Result<usize, ErrorCode> {
    match args.get(i) {
        None => Ok(1),
        Some(v) => non_negative(arg_int(ctx, v)?),
    }
}

fn non_negative(n: i64) -> Result<usize, ErrorCode> {
    usize::try_from(n).map_err(|_| ErrorCode::InvalidValue)
}

/// A 1-based start position; 0 and below are `#VALUE!`.
fn start_pos(n: i64) -> Result<usize, ErrorCode> {
    if n < 1 {
        return Err(ErrorCode::InvalidValue);
    }
    Ok(n as usize - 1)
}

macro_rules! text_fn {
    ($ty:ident, $name:literal, |$s:ident| $body:expr) => {
        #[derive(Debug)]
        pub struct $ty;

        impl Function for $ty {
            crate::func_caps!(PURE);

            fn name(&self) -> &'static str {
                $name
            }

            fn eval(
                &self,
                args: &[ValueResult],
                ctx: &dyn FunctionContext,
            ) -> Result<ValueResult, ErrorCode> {
                let $s = arg_text(ctx, &args[0])?;
                $body
            }
        }
    };
}

/* ───────────────────────── Single-argument ──────────────────────── */

text_fn!(LenFn, "LEN", |s| Ok(ValueResult::Number(s.chars().count() as f64)));
text_fn!(LowerFn, "LOWER", |s| text(s.to_lowercase()));
text_fn!(UpperFn, "UPPER", |s| text(s.to_uppercase()));
text_fn!(ProperFn, "PROPER", |s| text(proper(&s)));
text_fn!(TrimFn, "TRIM", |s| text(s.split(' ').filter(|w| !w.is_empty()).collect::<Vec<_>>().join(" ")));
text_fn!(CleanFn, "CLEAN", |s| text(s.chars().filter(|c| *c as u32 >= 32).collect()));
text_fn!(CodeFn, "CODE", |s| match s.chars().next() {
    Some(c) => Ok(ValueResult::Number(c as u32 as f64)),
    None => Err(ErrorCode::InvalidValue),
});

/// Upper-cases every letter that follows a non-letter, lower-cases the rest.
fn proper(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut after_letter = false;
    for c in s.chars() {
        if after_letter {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        after_letter = c.is_alphabetic();
    }
    out
}

/// `CHAR(n)` for n in 1..=255, read as Latin-1.
#[derive(Debug)]
pub struct CharFn;

impl Function for CharFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "CHAR"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let n = arg_int(ctx, &args[0])?;
        let byte = u8::try_from(n).ok().filter(|b| *b >= 1).ok_or(ErrorCode::InvalidValue)?;
        Ok(ValueResult::Text(char::from(byte).to_string()))
    }
}

/* ───────────────────────── LEFT / RIGHT / MID ───────────────────── */

#[derive(Debug)]
pub struct LeftFn;

impl Function for LeftFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "LEFT"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let s = arg_text(ctx, &args[0])?;
        let n = opt_count(ctx, args, 1)?;
        text(s.chars().take(n).collect())
    }
}

#[derive(Debug)]
pub struct RightFn;

impl Function for RightFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "RIGHT"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let s = arg_text(ctx, &args[0])?;
        let n = opt_count(ctx, args, 1)?;
        let len = s.chars().count();
        text(s.chars().skip(len.saturating_sub(n)).collect())
    }
}

#[derive(Debug)]
pub struct MidFn;

impl Function for MidFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "MID"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let s = arg_text(ctx, &args[0])?;
        let start = start_pos(arg_int(ctx, &args[1])?)?;
        let n = non_negative(arg_int(ctx, &args[2])?)?;
        text(s.chars().skip(start).take(n).collect())
    }
}

/* ─────────────────────────── Comparisons ───────────────────────── */

#[derive(Debug)]
pub struct ExactFn;

impl Function for ExactFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "EXACT"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let a = arg_text(ctx, &args[0])?;
        let b = arg_text(ctx, &args[1])?;
        Ok(ValueResult::Boolean(a == b))
    }
}

/* ──────────────────────── Building new text ─────────────────────── */

#[derive(Debug)]
pub struct ReptFn;

impl Function for ReptFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "REPT"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let s = arg_text(ctx, &args[0])?;
        let n = non_negative(arg_int(ctx, &args[1])?)?;
        if s.chars().count().saturating_mul(n) > MAX_TEXT_LEN {
            return Err(ErrorCode::InvalidValue);
        }
        text(s.repeat(n))
    }
}

#[derive(Debug)]
pub struct ConcatenateFn;

impl Function for ConcatenateFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "CONCATENATE"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let mut out = String::new();
        for a in args {
            out.push_str(&arg_text(ctx, a)?);
        }
        text(out)
    }
}

/// `REPLACE(old, start, count, new)`.
#[derive(Debug)]
pub struct ReplaceFn;

impl Function for ReplaceFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "REPLACE"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let old = arg_text(ctx, &args[0])?;
        let start = start_pos(arg_int(ctx, &args[1])?)?;
        let n = non_negative(arg_int(ctx, &args[2])?)?;
        let new = arg_text(ctx, &args[3])?;
        let mut out: String = old.chars().take(start).collect();
        out.push_str(&new);
        out.extend(old.chars().skip(start.saturating_add(n)));
        text(out)
    }
}

/// `SUBSTITUTE(text, old, new, [instance])`. Without an instance every
/// occurrence is replaced.
#[derive(Debug)]
pub struct SubstituteFn;

impl Function for SubstituteFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "SUBSTITUTE"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let s = arg_text(ctx, &args[0])?;
        let old = arg_text(ctx, &args[1])?;
        let new = arg_text(ctx, &args[2])?;
        if old.is_empty() {
            return text(s);
        }
        let Some(inst) = args.get(3).filter(|v| !matches!(v, ValueResult::MissingArgument)) else {
            return text(s.replace(&old, &new));
        };
        let inst = arg_int(ctx, inst)?;
        if inst < 1 {
            return Err(ErrorCode::InvalidValue);
        }
        match s.match_indices(&old).nth(inst as usize - 1) {
            Some((at, _)) => {
                let mut out = String::with_capacity(s.len());
                out.push_str(&s[..at]);
                out.push_str(&new);
                out.push_str(&s[at + old.len()..]);
                text(out)
            }
            None => text(s),
        }
    }
}

/* ─────────────────────────── FIND / SEARCH ─────────────────────── */

/// Start argument of FIND/SEARCH as a char index; must lie within the text
/// (or just past its end).
fn search_start(ctx: &dyn FunctionContext, args: &[ValueResult], len: usize) -> Result<usize, ErrorCode> {
    let start = match args.get(2) {
        None => 0,
        Some(v) => start_pos(arg_int(ctx, v)?)?,
    };
    if start > len {
        return Err(ErrorCode::InvalidValue);
    }
    Ok(start)
}

/// Case-sensitive, no wildcards.
#[derive(Debug)]
pub struct FindFn;

impl Function for FindFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "FIND"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let needle: Vec<char> = arg_text(ctx, &args[0])?.chars().collect();
        let hay: Vec<char> = arg_text(ctx, &args[1])?.chars().collect();
        let start = search_start(ctx, args, hay.len())?;
        (start..=hay.len())
            .find(|&i| hay[i..].starts_with(&needle))
            .map(|i| ValueResult::Number((i + 1) as f64))
            .ok_or(ErrorCode::InvalidValue)
    }
}

/// Case-insensitive, with `*`, `?` and `~` wildcards.
#[derive(Debug)]
pub struct SearchFn;

impl Function for SearchFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "SEARCH"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let pattern = arg_text(ctx, &args[0])?;
        let hay: Vec<char> = arg_text(ctx, &args[1])?.chars().collect();
        let start = search_start(ctx, args, hay.len())?;
        let found = if has_wildcards(&pattern) {
            (start..=hay.len()).find(|&i| {
                (i..=hay.len()).any(|j| wildcard_match(&pattern, &hay[i..j].iter().collect::<String>()))
            })
        } else {
            let lower = |c: &char| c.to_lowercase().next().unwrap_or(*c);
            let needle: Vec<char> = pattern.chars().map(|c| lower(&c)).collect();
            let hay: Vec<char> = hay.iter().map(lower).collect();
            (start..=hay.len()).find(|&i| hay[i..].starts_with(&needle))
        };
        found
            .map(|i| ValueResult::Number((i + 1) as f64))
            .ok_or(ErrorCode::InvalidValue)
    }
}

/* ─────────────────────────── VALUE / TEXT ──────────────────────── */

/// Numeric text to a number. Accepts a trailing `%`.
#[derive(Debug)]
pub struct ValueFn;

impl Function for ValueFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "VALUE"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        match resolve_here(ctx, &args[0])? {
            ValueResult::Number(n) => Ok(ValueResult::Number(n)),
            ValueResult::Blank | ValueResult::MissingArgument => Ok(ValueResult::ZERO),
            ValueResult::Text(s) => {
                let t = s.trim();
                let n = match t.strip_suffix('%') {
                    Some(body) => parse_double(body).map(|n| n / 100.0),
                    None => parse_double(t),
                };
                n.map(ValueResult::Number).ok_or(ErrorCode::InvalidValue)
            }
            _ => Err(ErrorCode::InvalidValue),
        }
    }
}

/// `TEXT(value, format)`.
///
/// Understands `General`/`@` plus plain numeric patterns built from `0`,
/// `#`, one `.`, a thousands `,` and a trailing `%` (`0.00`, `#,##0`,
/// `0%`). Any other format renders the general form.
#[derive(Debug)]
pub struct TextFn;

impl Function for TextFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "TEXT"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let value = resolve_here(ctx, &args[0])?;
        let fmt = arg_text(ctx, &args[1])?;
        let n = match value {
            ValueResult::Text(s) => return text(s),
            ValueResult::Boolean(b) => return text(if b { "TRUE" } else { "FALSE" }.into()),
            _ => arg_number(ctx, &value)?,
        };
        text(format_number(n, &fmt))
    }
}

fn format_number(n: f64, fmt: &str) -> String {
    let f = fmt.trim();
    if f.is_empty() || f.eq_ignore_ascii_case("general") || f == "@" {
        return number_to_text(n);
    }
    let (body, percent) = match f.strip_suffix('%') {
        Some(b) => (b, true),
        None => (f, false),
    };
    if body.is_empty() || !body.chars().all(|c| matches!(c, '0' | '#' | '.' | ',')) {
        return number_to_text(n);
    }
    let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
    if frac_part.contains(['.', ',']) {
        return number_to_text(n);
    }
    let decimals = frac_part.len();
    let grouping = int_part.contains(',');
    let min_int_digits = int_part.chars().filter(|c| *c == '0').count();

    let x = if percent { n * 100.0 } else { n };
    let rounded = format!("{:.*}", decimals, x.abs());
    let (digits, frac) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let digits = digits.trim_start_matches('0');
    let mut int_digits = if digits.len() < min_int_digits {
        format!("{}{}", "0".repeat(min_int_digits - digits.len()), digits)
    } else {
        digits.to_string()
    };
    if grouping {
        int_digits = group_thousands(&int_digits);
    }
    let mut out = String::new();
    let is_zero = int_digits.chars().chain(frac.chars()).all(|c| c == '0' || c == ',');
    if x < 0.0 && !is_zero {
        out.push('-');
    }
    out.push_str(&int_digits);
    if decimals > 0 {
        out.push('.');
        out.push_str(frac);
    }
    if percent {
        out.push('%');
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn register_builtins(reg: &mut crate::function_registry::FunctionRegistry) {
    crate::register_functions!(reg,
        30 => ReptFn,
        31 => MidFn,
        32 => LenFn,
        33 => ValueFn,
        48 => TextFn,
        82 => SearchFn,
        111 => CharFn,
        112 => LowerFn,
        113 => UpperFn,
        114 => ProperFn,
        115 => LeftFn,
        116 => RightFn,
        117 => ExactFn,
        118 => TrimFn,
        119 => ReplaceFn,
        120 => SubstituteFn,
        121 => CodeFn,
        124 => FindFn,
        162 => CleanFn,
        336 => ConcatenateFn,
    );
}
