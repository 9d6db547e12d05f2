//! ROW, COLUMN, ROWS, COLUMNS and AREAS: the shape of a reference, never
//! its contents.

use crate::function::Function;
use crate::reference::as_area;
use crate::traits::FunctionContext;
use biffcalc_common::{AreaRef, ErrorCode, ValueResult};

/// Reference argument as an area. Errors pass through; anything else is
/// `#VALUE!`.
fn shape_of(v: &ValueResult) -> Result<AreaRef, ErrorCode> {
    match v {
        ValueResult::Error(e) => Err(*e),
        other => as_area(other).ok_or(ErrorCode::InvalidValue),
    }
}

/// Without an argument, the row of the calling formula. With an area, its
/// first row.
#[derive(Debug)]
pub struct RowFn;

impl Function for RowFn {
    crate::func_caps!(PURE, REFERENCE_ARGS);

    fn name(&self) -> &'static str {
        "ROW"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let row = match args.first() {
            None | Some(ValueResult::MissingArgument) => ctx.row_index(),
            Some(v) => shape_of(v)?.first_row,
        };
        Ok(ValueResult::Number(row as f64 + 1.0))
    }
}

#[derive(Debug)]
pub struct ColumnFn;

impl Function for ColumnFn {
    crate::func_caps!(PURE, REFERENCE_ARGS);

    fn name(&self) -> &'static str {
        "COLUMN"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let col = match args.first() {
            None | Some(ValueResult::MissingArgument) => ctx.column_index(),
            Some(v) => shape_of(v)?.first_col,
        };
        Ok(ValueResult::Number(col as f64 + 1.0))
    }
}

/// A scalar counts as one row (and one column).
fn extent(v: &ValueResult, pick: fn(&AreaRef) -> u32) -> Result<ValueResult, ErrorCode> {
    match v {
        ValueResult::Error(e) => Err(*e),
        other => Ok(ValueResult::Number(as_area(other).map_or(1, |a| pick(&a)) as f64)),
    }
}

#[derive(Debug)]
pub struct RowsFn;

impl Function for RowsFn {
    crate::func_caps!(PURE, REFERENCE_ARGS);

    fn name(&self) -> &'static str {
        "ROWS"
    }

    fn eval(&self, args: &[ValueResult], _ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        extent(&args[0], AreaRef::height)
    }
}

#[derive(Debug)]
pub struct ColumnsFn;

impl Function for ColumnsFn {
    crate::func_caps!(PURE, REFERENCE_ARGS);

    fn name(&self) -> &'static str {
        "COLUMNS"
    }

    fn eval(&self, args: &[ValueResult], _ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        extent(&args[0], AreaRef::width)
    }
}

/// Unions are not evaluated, so a reference is always one area.
#[derive(Debug)]
pub struct AreasFn;

impl Function for AreasFn {
    crate::func_caps!(PURE, REFERENCE_ARGS);

    fn name(&self) -> &'static str {
        "AREAS"
    }

    fn eval(&self, args: &[ValueResult], _ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        shape_of(&args[0]).map(|_| ValueResult::Number(1.0))
    }
}

pub fn register_builtins(reg: &mut crate::function_registry::FunctionRegistry) {
    crate::register_functions!(reg,
        8 => RowFn,
        9 => ColumnFn,
        75 => AreasFn,
        76 => RowsFn,
        77 => ColumnsFn,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::StubContext;
    use biffcalc_common::{CellRef, SheetSpan};

    #[test]
    fn position_of_caller_and_argument() {
        let ctx = StubContext::at(0, 4, 2);
        assert_eq!(RowFn.eval(&[], &ctx).unwrap().as_number(), Some(5.0));
        assert_eq!(ColumnFn.eval(&[], &ctx).unwrap().as_number(), Some(3.0));
        let b7 = ValueResult::SingleRef(CellRef::new(0, 6, 1));
        assert_eq!(RowFn.eval(&[b7.clone()], &ctx).unwrap().as_number(), Some(7.0));
        assert_eq!(ColumnFn.eval(&[b7], &ctx).unwrap().as_number(), Some(2.0));
        assert_eq!(RowFn.eval(&[1.0.into()], &ctx).err(), Some(ErrorCode::InvalidValue));
    }

    #[test]
    fn rows_and_columns() {
        let ctx = StubContext::default();
        let a = ValueResult::Area(AreaRef::new(SheetSpan::single(0), 1, 1, 4, 2));
        assert_eq!(RowsFn.eval(&[a.clone()], &ctx).unwrap().as_number(), Some(4.0));
        assert_eq!(ColumnsFn.eval(&[a.clone()], &ctx).unwrap().as_number(), Some(2.0));
        assert_eq!(RowsFn.eval(&[7.0.into()], &ctx).unwrap().as_number(), Some(1.0));
        assert_eq!(AreasFn.eval(&[a], &ctx).unwrap().as_number(), Some(1.0));
        assert_eq!(AreasFn.eval(&["A1".into()], &ctx).err(), Some(ErrorCode::InvalidValue));
    }
}
