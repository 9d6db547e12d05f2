//! TODAY and NOW, read from the evaluator's clock

use super::serial::{date_to_serial, datetime_to_serial};
use crate::function::Function;
use crate::traits::FunctionContext;
use biffcalc_common::{ErrorCode, ValueResult};

/// Current date serial, no time fraction.
#[derive(Debug)]
pub struct TodayFn;

impl Function for TodayFn {
    crate::func_caps!(VOLATILE);

    fn name(&self) -> &'static str {
        "TODAY"
    }

    fn eval(&self, _args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        Ok(ValueResult::Number(date_to_serial(&ctx.now().date())))
    }
}

#[derive(Debug)]
pub struct NowFn;

impl Function for NowFn {
    crate::func_caps!(VOLATILE);

    fn name(&self) -> &'static str {
        "NOW"
    }

    fn eval(&self, _args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        Ok(ValueResult::Number(datetime_to_serial(&ctx.now())))
    }
}

pub fn register_builtins(reg: &mut crate::function_registry::FunctionRegistry) {
    crate::register_functions!(reg,
        74 => NowFn,
        221 => TodayFn,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FnCaps;
    use crate::test_utils::StubContext;
    use chrono::NaiveDate;

    #[test]
    fn reads_the_context_clock() {
        let at = NaiveDate::from_ymd_opt(2008, 1, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        let ctx = StubContext::default().with_now(at);
        assert_eq!(TodayFn.eval(&[], &ctx).unwrap().as_number(), Some(39448.0));
        assert_eq!(NowFn.eval(&[], &ctx).unwrap().as_number(), Some(39448.25));
        assert!(NowFn.caps().contains(FnCaps::VOLATILE));
    }
}
