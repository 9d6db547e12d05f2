//! Volatile random numbers.
use crate::function::Function;
use crate::traits::FunctionContext;
use biffcalc_common::{ErrorCode, ValueResult};

/// Uniform in `[0, 1)`, drawn from the evaluator's seeded generator.
#[derive(Debug)]
pub struct RandFn;

impl Function for RandFn {
    crate::func_caps!(VOLATILE);

    fn name(&self) -> &'static str {
        "RAND"
    }

    fn eval(&self, _args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        Ok(ValueResult::Number(ctx.next_random()))
    }
}

pub fn register_builtins(reg: &mut crate::function_registry::FunctionRegistry) {
    crate::register_functions!(reg, 63 => RandFn);
}
