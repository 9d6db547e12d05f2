//! DATE and TIME

use super::serial::normalized_date_serial;
use crate::builtins::utils::arg_int;
use crate::function::Function;
use crate::traits::FunctionContext;
use biffcalc_common::{ErrorCode, ValueResult};

/// DATE(year, month, day). Years 0-1899 are offset by 1900; month and day
/// overflow into neighbouring months and years.
#[derive(Debug)]
pub struct DateFn;

impl Function for DateFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "DATE"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let year = arg_int(ctx, &args[0])?;
        let month = arg_int(ctx, &args[1])?;
        let day = arg_int(ctx, &args[2])?;
        let year = match year {
            0..=1899 => year + 1900,
            1900..=9999 => year,
            _ => return Err(ErrorCode::NumOverflow),
        };
        normalized_date_serial(year, month, day).map(ValueResult::Number)
    }
}

/// TIME(hour, minute, second) as a fraction of a day. Totals wrap at 24h.
#[derive(Debug)]
pub struct TimeFn;

impl Function for TimeFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "TIME"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let h = arg_int(ctx, &args[0])?;
        let m = arg_int(ctx, &args[1])?;
        let s = arg_int(ctx, &args[2])?;
        if h > 32767 || m > 32767 || s > 32767 {
            return Err(ErrorCode::NumOverflow);
        }
        let total = h
            .checked_mul(3600)
            .zip(m.checked_mul(60))
            .and_then(|(h, m)| h.checked_add(m))
            .and_then(|hm| hm.checked_add(s))
            .filter(|t| *t >= 0)
            .ok_or(ErrorCode::NumOverflow)?;
        Ok(ValueResult::Number((total % 86_400) as f64 / 86_400.0))
    }
}

pub fn register_builtins(reg: &mut crate::function_registry::FunctionRegistry) {
    crate::register_functions!(reg,
        65 => DateFn,
        66 => TimeFn,
    );
}
