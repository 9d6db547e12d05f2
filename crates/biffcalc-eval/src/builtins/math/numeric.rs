use super::super::utils::{arg_int, arg_number, checked, opt_number};
use crate::function::Function;
use crate::operators::round_to_15_digits;
use crate::traits::FunctionContext;
use biffcalc_common::{ErrorCode, ValueResult};

/// One-argument numeric function: resolve, coerce, apply, check.
macro_rules! unary_math {
    ($ty:ident, $name:literal, |$x:ident| $body:expr) => {
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
                let $x = arg_number(ctx, &args[0])?;
                let r: Result<f64, ErrorCode> = $body;
                checked(r?)
            }
        }
    };
}

/* ───────────────────────── Basic numeric ────────────────────────── */

unary_math!(AbsFn, "ABS", |x| Ok(x.abs()));
unary_math!(IntFn, "INT", |x| Ok(x.floor()));
unary_math!(SignFn, "SIGN", |x| Ok(if x > 0.0 {
    1.0
} else if x < 0.0 {
    -1.0
} else {
    0.0
}));
unary_math!(SqrtFn, "SQRT", |x| if x < 0.0 {
    Err(ErrorCode::NumOverflow)
} else {
    Ok(x.sqrt())
});
unary_math!(ExpFn, "EXP", |x| Ok(x.exp()));
unary_math!(LnFn, "LN", |x| positive(x).map(f64::ln));
unary_math!(Log10Fn, "LOG10", |x| positive(x).map(f64::log10));
unary_math!(DegreesFn, "DEGREES", |x| Ok(x.to_degrees()));
unary_math!(RadiansFn, "RADIANS", |x| Ok(x.to_radians()));
unary_math!(EvenFn, "EVEN", |x| Ok(away_to_parity(x, 0.0)));
unary_math!(OddFn, "ODD", |x| Ok(away_to_parity(x, 1.0)));

fn positive(x: f64) -> Result<f64, ErrorCode> {
    if x <= 0.0 { Err(ErrorCode::NumOverflow) } else { Ok(x) }
}

/// Rounds away from zero to the next integer whose remainder mod 2 is
/// `parity`. `ODD(0)` is 1.
fn away_to_parity(x: f64, parity: f64) -> f64 {
    let mut a = x.abs().ceil();
    if a % 2.0 != parity {
        a += 1.0;
    }
    if x < 0.0 { -a } else { a }
}

/* ─────────────────────────── Trigonometry ──────────────────────── */

unary_math!(SinFn, "SIN", |x| Ok(x.sin()));
unary_math!(CosFn, "COS", |x| Ok(x.cos()));
unary_math!(TanFn, "TAN", |x| Ok(x.tan()));
unary_math!(AsinFn, "ASIN", |x| unit(x).map(f64::asin));
unary_math!(AcosFn, "ACOS", |x| unit(x).map(f64::acos));
unary_math!(AtanFn, "ATAN", |x| Ok(x.atan()));
unary_math!(SinhFn, "SINH", |x| Ok(x.sinh()));
unary_math!(CoshFn, "COSH", |x| Ok(x.cosh()));
unary_math!(TanhFn, "TANH", |x| Ok(x.tanh()));
unary_math!(AsinhFn, "ASINH", |x| Ok(x.asinh()));
unary_math!(AcoshFn, "ACOSH", |x| if x < 1.0 {
    Err(ErrorCode::NumOverflow)
} else {
    Ok(x.acosh())
});
unary_math!(AtanhFn, "ATANH", |x| if x.abs() >= 1.0 {
    Err(ErrorCode::NumOverflow)
} else {
    Ok(x.atanh())
});

fn unit(x: f64) -> Result<f64, ErrorCode> {
    if x.abs() > 1.0 { Err(ErrorCode::NumOverflow) } else { Ok(x) }
}

#[derive(Debug)]
pub struct PiFn;

impl Function for PiFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "PI"
    }

    fn eval(&self, _args: &[ValueResult], _ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        Ok(ValueResult::Number(std::f64::consts::PI))
    }
}

/// `ATAN2(x, y)`: angle of the point (x, y). Note the argument order.
#[derive(Debug)]
pub struct Atan2Fn;

impl Function for Atan2Fn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "ATAN2"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let x = arg_number(ctx, &args[0])?;
        let y = arg_number(ctx, &args[1])?;
        if x == 0.0 && y == 0.0 {
            return Err(ErrorCode::DivByZero);
        }
        checked(y.atan2(x))
    }
}

/* ──────────────────────── LOG / MOD / POWER ─────────────────────── */

#[derive(Debug)]
pub struct LogFn;

impl Function for LogFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "LOG"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let n = positive(arg_number(ctx, &args[0])?)?;
        let base = positive(opt_number(ctx, args, 1, 10.0)?)?;
        if base == 1.0 {
            return Err(ErrorCode::DivByZero);
        }
        checked(n.ln() / base.ln())
    }
}

/// `MOD(n, d)`: the remainder takes the divisor's sign.
#[derive(Debug)]
pub struct ModFn;

impl Function for ModFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "MOD"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let n = arg_number(ctx, &args[0])?;
        let d = arg_number(ctx, &args[1])?;
        if d == 0.0 {
            return Err(ErrorCode::DivByZero);
        }
        checked(n - d * (n / d).floor())
    }
}

#[derive(Debug)]
pub struct PowerFn;

impl Function for PowerFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "POWER"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let base = arg_number(ctx, &args[0])?;
        let exp = arg_number(ctx, &args[1])?;
        checked(base.powf(exp))
    }
}

/* ───────────────────────────── Rounding ─────────────────────────── */

#[derive(Debug, Clone, Copy)]
enum RoundMode {
    HalfAway,
    Up,
    Down,
}

/// Decimal rounding to `digits` places (negative: left of the point).
/// The scaled value is first cut to 15 significant digits so that
/// `ROUND(2.675, 2)` sees 267.5 and not 267.49999999999997.
fn round_decimal(n: f64, digits: i64, mode: RoundMode) -> f64 {
    if n == 0.0 || !n.is_finite() {
        return n;
    }
    let d = digits.clamp(-308, 308) as i32;
    let apply = |x: f64| {
        let x = round_to_15_digits(x);
        match mode {
            RoundMode::HalfAway => x.round(),
            RoundMode::Up => x.abs().ceil().copysign(x),
            RoundMode::Down => x.trunc(),
        }
    };
    if d >= 0 {
        let f = 10f64.powi(d);
        if !(n * f).is_finite() {
            return n;
        }
        apply(n * f) / f
    } else {
        let f = 10f64.powi(-d);
        apply(n / f) * f
    }
}

macro_rules! rounding_fn {
    ($ty:ident, $name:literal, $mode:expr, $default_digits:expr) => {
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
                let n = arg_number(ctx, &args[0])?;
                let digits = match args.get(1) {
                    None | Some(ValueResult::MissingArgument) => $default_digits,
                    Some(v) => arg_number(ctx, v)?.trunc() as i64,
                };
                checked(round_decimal(n, digits, $mode))
            }
        }
    };
}

rounding_fn!(RoundFn, "ROUND", RoundMode::HalfAway, 0);
rounding_fn!(RoundUpFn, "ROUNDUP", RoundMode::Up, 0);
rounding_fn!(RoundDownFn, "ROUNDDOWN", RoundMode::Down, 0);
rounding_fn!(TruncFn, "TRUNC", RoundMode::Down, 0);

/// `FLOOR(n, significance)` / `CEILING(n, significance)`.
///
/// A zero significance gives 0 for a zero number and `#DIV/0!` otherwise;
/// a positive number with a negative significance is `#NUM!`.
fn to_significance(n: f64, sig: f64, up: bool) -> Result<f64, ErrorCode> {
    if n == 0.0 {
        return Ok(0.0);
    }
    if sig == 0.0 {
        return Err(ErrorCode::DivByZero);
    }
    if n > 0.0 && sig < 0.0 {
        return Err(ErrorCode::NumOverflow);
    }
    let q = round_to_15_digits(n / sig);
    Ok(if up { q.ceil() * sig } else { q.floor() * sig })
}

#[derive(Debug)]
pub struct FloorFn;

impl Function for FloorFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "FLOOR"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let n = arg_number(ctx, &args[0])?;
        let sig = arg_number(ctx, &args[1])?;
        checked(to_significance(n, sig, false)?)
    }
}

#[derive(Debug)]
pub struct CeilingFn;

impl Function for CeilingFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "CEILING"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let n = arg_number(ctx, &args[0])?;
        let sig = arg_number(ctx, &args[1])?;
        checked(to_significance(n, sig, true)?)
    }
}

/* ─────────────────────────── Combinatorics ──────────────────────── */

#[derive(Debug)]
pub struct FactFn;

impl Function for FactFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "FACT"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let n = arg_int(ctx, &args[0])?;
        if !(0..=170).contains(&n) {
            return Err(ErrorCode::NumOverflow);
        }
        checked((1..=n).fold(1.0, |acc, k| acc * k as f64))
    }
}

#[derive(Debug)]
pub struct CombinFn;

impl Function for CombinFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "COMBIN"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let n = arg_int(ctx, &args[0])?;
        let k = arg_int(ctx, &args[1])?;
        if n < 0 || k < 0 || k > n {
            return Err(ErrorCode::NumOverflow);
        }
        let k = k.min(n - k);
        let mut acc = 1.0f64;
        for i in 0..k {
            acc = acc * (n - i) as f64 / (i + 1) as f64;
            if !acc.is_finite() {
                break;
            }
        }
        checked(acc.round())
    }
}

pub fn register_builtins(reg: &mut crate::function_registry::FunctionRegistry) {
    crate::register_functions!(reg,
        15 => SinFn,
        16 => CosFn,
        17 => TanFn,
        18 => AtanFn,
        19 => PiFn,
        20 => SqrtFn,
        21 => ExpFn,
        22 => LnFn,
        23 => Log10Fn,
        24 => AbsFn,
        25 => IntFn,
        26 => SignFn,
        27 => RoundFn,
        39 => ModFn,
        97 => Atan2Fn,
        98 => AsinFn,
        99 => AcosFn,
        109 => LogFn,
        184 => FactFn,
        197 => TruncFn,
        212 => RoundUpFn,
        213 => RoundDownFn,
        229 => SinhFn,
        230 => CoshFn,
        231 => TanhFn,
        232 => AsinhFn,
        233 => AcoshFn,
        234 => AtanhFn,
        276 => CombinFn,
        279 => EvenFn,
        285 => FloorFn,
        288 => CeilingFn,
        298 => OddFn,
        337 => PowerFn,
        342 => RadiansFn,
        343 => DegreesFn,
    );
}
