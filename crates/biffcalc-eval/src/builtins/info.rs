use crate::coercion::resolve_here;
use crate::function::Function;
use crate::traits::FunctionContext;
use biffcalc_common::{ErrorCode, ValueResult};

/* Info and type-introspection builtins. */

/// The argument as a scalar, with resolution errors turned back into
/// error values so that the IS* family can inspect them.
fn inspect(ctx: &dyn FunctionContext, v: &ValueResult) -> ValueResult {
    match resolve_here(ctx, v) {
        Ok(v) => v,
        Err(e) => ValueResult::Error(e),
    }
}

macro_rules! is_fn {
    ($ty:ident, $name:literal, |$v:ident| $test:expr) => {
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
                let $v = inspect(ctx, &args[0]);
                Ok(ValueResult::Boolean($test))
            }
        }
    };
}

is_fn!(IsNaFn, "ISNA", |v| matches!(v, ValueResult::Error(ErrorCode::NotAvailable)));
is_fn!(IsErrorFn, "ISERROR", |v| v.is_error());
is_fn!(IsErrFn, "ISERR", |v| matches!(v, ValueResult::Error(e) if e != ErrorCode::NotAvailable));
is_fn!(IsTextFn, "ISTEXT", |v| matches!(v, ValueResult::Text(_)));
is_fn!(IsNonTextFn, "ISNONTEXT", |v| !matches!(v, ValueResult::Text(_)));
is_fn!(IsNumberFn, "ISNUMBER", |v| matches!(v, ValueResult::Number(_)));
is_fn!(IsLogicalFn, "ISLOGICAL", |v| matches!(v, ValueResult::Boolean(_)));
is_fn!(IsBlankFn, "ISBLANK", |v| v.is_blank());

/// TRUE for any reference argument, without reading it.
#[derive(Debug)]
pub struct IsRefFn;

impl Function for IsRefFn {
    crate::func_caps!(PURE, REFERENCE_ARGS);

    fn name(&self) -> &'static str {
        "ISREF"
    }

    fn eval(&self, args: &[ValueResult], _ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        Ok(ValueResult::Boolean(args[0].is_reference()))
    }
}

#[derive(Debug)]
pub struct NaFn;

impl Function for NaFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "NA"
    }

    fn eval(&self, _args: &[ValueResult], _ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        Err(ErrorCode::NotAvailable)
    }
}

/* ─────────────────────────── N() / T() ─────────────────────────── */

#[derive(Debug)]
pub struct NFn;

impl Function for NFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "N"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        Ok(match resolve_here(ctx, &args[0])? {
            ValueResult::Number(n) => ValueResult::Number(n),
            ValueResult::Boolean(b) => ValueResult::Number(if b { 1.0 } else { 0.0 }),
            _ => ValueResult::ZERO,
        })
    }
}

#[derive(Debug)]
pub struct TFn;

impl Function for TFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "T"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        Ok(match resolve_here(ctx, &args[0])? {
            ValueResult::Text(s) => ValueResult::Text(s),
            _ => ValueResult::Text(String::new()),
        })
    }
}

/* ───────────────────────────── TYPE() ───────────────────────────── */

/// 1 number (and blank), 2 text, 4 boolean, 16 error, 64 multi-cell
/// reference.
#[derive(Debug)]
pub struct TypeFn;

impl Function for TypeFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "TYPE"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        if let ValueResult::Area(a) = &args[0] {
            if !a.is_single_cell() {
                return Ok(ValueResult::Number(64.0));
            }
        }
        let code = match inspect(ctx, &args[0]) {
            ValueResult::Text(_) => 2.0,
            ValueResult::Boolean(_) => 4.0,
            ValueResult::Error(_) => 16.0,
            _ => 1.0,
        };
        Ok(ValueResult::Number(code))
    }
}

/// `ERROR.TYPE`: 1 for `#NULL!` through 7 for `#N/A`; anything else is
/// `#N/A`.
#[derive(Debug)]
pub struct ErrorTypeFn;

impl Function for ErrorTypeFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "ERROR.TYPE"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let ValueResult::Error(e) = inspect(ctx, &args[0]) else {
            return Err(ErrorCode::NotAvailable);
        };
        if e.is_engine_synthesized() {
            return Err(ErrorCode::NotAvailable);
        }
        let pos = ErrorCode::ALL
            .iter()
            .position(|x| *x == e)
            .ok_or(ErrorCode::NotAvailable)?;
        Ok(ValueResult::Number((pos + 1) as f64))
    }
}

pub fn register_builtins(reg: &mut crate::function_registry::FunctionRegistry) {
    crate::register_functions!(reg,
        2 => IsNaFn,
        3 => IsErrorFn,
        10 => NaFn,
        86 => TypeFn,
        105 => IsRefFn,
        126 => IsErrFn,
        127 => IsTextFn,
        128 => IsNumberFn,
        129 => IsBlankFn,
        130 => TFn,
        131 => NFn,
        190 => IsNonTextFn,
        198 => IsLogicalFn,
        261 => ErrorTypeFn,
    );
}
