//! The `Function` trait and its capability flags.

use crate::traits::FunctionContext;
use biffcalc_common::{ErrorCode, ValueResult};

bitflags::bitflags! {
    /// Describes the properties of a function that the evaluator cares about.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct FnCaps: u16 {
        /// Same output for the same input, no side effects. The default.
        const PURE            = 0b0000_0001;
        /// Output can change with identical inputs (`RAND()`, `NOW()`).
        const VOLATILE        = 0b0000_0010;
        /// Folds any number of values or ranges into one (`SUM`).
        const REDUCTION       = 0b0000_0100;
        /// Needs the shape of reference arguments rather than their values
        /// (`ROWS`, `INDEX`).
        const REFERENCE_ARGS  = 0b0000_1000;
        /// May return a reference instead of a value (`OFFSET`, `INDEX`).
        const RETURNS_REF     = 0b0001_0000;
        /// Only evaluates some of its arguments (`IF`, `CHOOSE`). The
        /// evaluator handles these itself before dispatch.
        const SHORT_CIRCUIT   = 0b0010_0000;
        /// Searches a range (`MATCH`, `VLOOKUP`).
        const LOOKUP          = 0b0100_0000;
    }
}

/// A callable function.
///
/// Arguments arrive unresolved: a reference argument is still a
/// `SingleRef`/`Area`, so functions decide for themselves whether they need
/// its value (resolve through `coercion`) or its shape. Returning
/// `Err(code)` is the same as returning `Ok(ValueResult::Error(code))`.
pub trait Function: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn caps(&self) -> FnCaps {
        FnCaps::PURE
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode>;
}
