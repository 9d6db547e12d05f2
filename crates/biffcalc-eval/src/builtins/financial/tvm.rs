//! Time-value-of-money functions.
//!
//! Sign convention: money paid out is negative, money received positive.
//! `type` 0 puts payments at period end, any other value at period start.

use crate::builtins::utils::{RefPolicy, arg_number, checked, collect_numbers, opt_number};
use crate::function::Function;
use crate::traits::FunctionContext;
use biffcalc_common::{ErrorCode, ValueResult};

/// Below this a rate is treated as zero and the closed forms degrade to
/// straight sums.
const ZERO_RATE: f64 = 1e-10;

fn payment_timing(ctx: &dyn FunctionContext, args: &[ValueResult], i: usize) -> Result<f64, ErrorCode> {
    Ok(if opt_number(ctx, args, i, 0.0)? != 0.0 { 1.0 } else { 0.0 })
}

/// PV(rate, nper, pmt, [fv], [type])
#[derive(Debug)]
pub struct PvFn;

impl Function for PvFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "PV"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let rate = arg_number(ctx, &args[0])?;
        let nper = arg_number(ctx, &args[1])?;
        let pmt = arg_number(ctx, &args[2])?;
        let fv = opt_number(ctx, args, 3, 0.0)?;
        let timing = payment_timing(ctx, args, 4)?;

        let pv = if rate.abs() < ZERO_RATE {
            -(fv + pmt * nper)
        } else {
            let factor = (1.0 + rate).powf(nper);
            -(fv + pmt * (1.0 + rate * timing) * (factor - 1.0) / rate) / factor
        };
        checked(pv)
    }
}

/// FV(rate, nper, pmt, [pv], [type])
#[derive(Debug)]
pub struct FvFn;

impl Function for FvFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "FV"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let rate = arg_number(ctx, &args[0])?;
        let nper = arg_number(ctx, &args[1])?;
        let pmt = arg_number(ctx, &args[2])?;
        let pv = opt_number(ctx, args, 3, 0.0)?;
        let timing = payment_timing(ctx, args, 4)?;

        let fv = if rate.abs() < ZERO_RATE {
            -(pv + pmt * nper)
        } else {
            let factor = (1.0 + rate).powf(nper);
            -(pv * factor + pmt * (1.0 + rate * timing) * (factor - 1.0) / rate)
        };
        checked(fv)
    }
}

/// PMT(rate, nper, pv, [fv], [type])
#[derive(Debug)]
pub struct PmtFn;

impl Function for PmtFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "PMT"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let rate = arg_number(ctx, &args[0])?;
        let nper = arg_number(ctx, &args[1])?;
        let pv = arg_number(ctx, &args[2])?;
        let fv = opt_number(ctx, args, 3, 0.0)?;
        let timing = payment_timing(ctx, args, 4)?;

        if nper == 0.0 {
            return Err(ErrorCode::DivByZero);
        }
        let pmt = if rate.abs() < ZERO_RATE {
            -(pv + fv) / nper
        } else {
            let factor = (1.0 + rate).powf(nper);
            -(fv + pv * factor) * rate / ((1.0 + rate * timing) * (factor - 1.0))
        };
        checked(pmt)
    }
}

/// NPER(rate, pmt, pv, [fv], [type])
#[derive(Debug)]
pub struct NperFn;

impl Function for NperFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "NPER"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let rate = arg_number(ctx, &args[0])?;
        let pmt = arg_number(ctx, &args[1])?;
        let pv = arg_number(ctx, &args[2])?;
        let fv = opt_number(ctx, args, 3, 0.0)?;
        let timing = payment_timing(ctx, args, 4)?;

        let nper = if rate.abs() < ZERO_RATE {
            if pmt.abs() < ZERO_RATE {
                return Err(ErrorCode::NumOverflow);
            }
            -(pv + fv) / pmt
        } else {
            let due = pmt * (1.0 + rate * timing);
            let ratio = (due - fv * rate) / (due + pv * rate);
            if ratio <= 0.0 {
                return Err(ErrorCode::NumOverflow);
            }
            ratio.ln() / (1.0 + rate).ln()
        };
        checked(nper)
    }
}

/// NPV(rate, value1, ...). The first value is discounted one full period.
/// Text and booleans inside references are skipped.
#[derive(Debug)]
pub struct NpvFn;

impl Function for NpvFn {
    crate::func_caps!(PURE, REDUCTION);

    fn name(&self) -> &'static str {
        "NPV"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let rate = arg_number(ctx, &args[0])?;
        if rate == -1.0 {
            return Err(ErrorCode::DivByZero);
        }
        let values = collect_numbers(ctx, &args[1..], RefPolicy::NumbersOnly)?;
        let npv = values
            .iter()
            .enumerate()
            .map(|(i, v)| v / (1.0 + rate).powi(i as i32 + 1))
            .sum();
        checked(npv)
    }
}

pub fn register_builtins(reg: &mut crate::function_registry::FunctionRegistry) {
    crate::register_functions!(reg,
        11 => NpvFn,
        56 => PvFn,
        57 => FvFn,
        58 => NperFn,
        59 => PmtFn,
    );
}
