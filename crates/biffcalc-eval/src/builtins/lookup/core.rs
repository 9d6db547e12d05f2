use super::lookup_utils::{approximate_position, exact_position, line_values, lookup_area, lookup_needle};
use crate::builtins::utils::{arg_bool, arg_int, arg_number};
use crate::function::Function;
use crate::traits::FunctionContext;
use biffcalc_common::{AreaRef, ErrorCode, ValueResult};

/* ───────────────────────────── MATCH() ───────────────────────────── */

/// `MATCH(value, vector, [type])`, 1-based position.
///
/// Type 1 (default) finds the largest value `<=` in ascending data, 0 an
/// exact match with wildcards, -1 the smallest value `>=` in descending
/// data.
#[derive(Debug)]
pub struct MatchFn;

impl Function for MatchFn {
    crate::func_caps!(PURE, LOOKUP, REFERENCE_ARGS);

    fn name(&self) -> &'static str {
        "MATCH"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let needle = lookup_needle(ctx, &args[0])?;
        let area = lookup_area(&args[1])?;
        if !area.is_row() && !area.is_column() {
            return Err(ErrorCode::NotAvailable);
        }
        let match_type = match args.get(2) {
            None | Some(ValueResult::MissingArgument) => 1.0,
            Some(v) => arg_number(ctx, v)?,
        };
        let values = line_values(ctx, &area);
        let pos = if match_type == 0.0 {
            exact_position(&values, &needle)
        } else {
            approximate_position(&values, &needle, match_type < 0.0)
        };
        pos.map(|i| ValueResult::Number((i + 1) as f64))
            .ok_or(ErrorCode::NotAvailable)
    }
}

/* ───────────────────────── VLOOKUP / HLOOKUP ─────────────────────── */

#[derive(Debug, Clone, Copy)]
enum Orientation {
    /// Search the first column, return from a column to the right.
    Vertical,
    /// Search the first row, return from a row below.
    Horizontal,
}

fn table_lookup(
    args: &[ValueResult],
    ctx: &dyn FunctionContext,
    orientation: Orientation,
) -> Result<ValueResult, ErrorCode> {
    let needle = lookup_needle(ctx, &args[0])?;
    let table = lookup_area(&args[1])?;
    let offset = arg_int(ctx, &args[2])?;
    // Absent means approximate; an empty slot or blank cell means exact.
    let approximate = match args.get(3) {
        None => true,
        Some(ValueResult::MissingArgument) => false,
        Some(v) => arg_bool(ctx, v)?,
    };
    let span = match orientation {
        Orientation::Vertical => table.width(),
        Orientation::Horizontal => table.height(),
    };
    if offset < 1 {
        return Err(ErrorCode::InvalidValue);
    }
    if offset > span as i64 {
        return Err(ErrorCode::InvalidReference);
    }
    let key_line = match orientation {
        Orientation::Vertical => AreaRef { last_col: table.first_col, ..table },
        Orientation::Horizontal => AreaRef { last_row: table.first_row, ..table },
    };
    let keys = line_values(ctx, &key_line);
    let hit = if approximate {
        approximate_position(&keys, &needle, false)
    } else {
        exact_position(&keys, &needle)
    }
    .ok_or(ErrorCode::NotAvailable)?;
    let (row, col) = match orientation {
        Orientation::Vertical => (table.first_row + hit as u32, table.first_col + offset as u32 - 1),
        Orientation::Horizontal => (table.first_row + offset as u32 - 1, table.first_col + hit as u32),
    };
    Ok(ctx.cell_value(table.sheets.first, row, col))
}

#[derive(Debug)]
pub struct VLookupFn;

impl Function for VLookupFn {
    crate::func_caps!(PURE, LOOKUP, REFERENCE_ARGS);

    fn name(&self) -> &'static str {
        "VLOOKUP"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        table_lookup(args, ctx, Orientation::Vertical)
    }
}

#[derive(Debug)]
pub struct HLookupFn;

impl Function for HLookupFn {
    crate::func_caps!(PURE, LOOKUP, REFERENCE_ARGS);

    fn name(&self) -> &'static str {
        "HLOOKUP"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        table_lookup(args, ctx, Orientation::Horizontal)
    }
}

/* ──────────────────────────── LOOKUP() ───────────────────────────── */

/// `LOOKUP(value, lookup_vector, [result_vector])`, approximate only.
///
/// With two arguments and a rectangular range, the longer side is searched
/// along its first line and the answer comes from the last line.
#[derive(Debug)]
pub struct LookupFn;

impl Function for LookupFn {
    crate::func_caps!(PURE, LOOKUP, REFERENCE_ARGS);

    fn name(&self) -> &'static str {
        "LOOKUP"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let needle = lookup_needle(ctx, &args[0])?;
        let source = lookup_area(&args[1])?;
        let (keys, results) = match args.get(2) {
            Some(r) => {
                if !source.is_row() && !source.is_column() {
                    return Err(ErrorCode::NotAvailable);
                }
                (source, lookup_area(r)?)
            }
            None if source.width() > source.height() => (
                AreaRef { last_row: source.first_row, ..source },
                AreaRef { first_row: source.last_row, ..source },
            ),
            None => (
                AreaRef { last_col: source.first_col, ..source },
                AreaRef { first_col: source.last_col, ..source },
            ),
        };
        let values = line_values(ctx, &keys);
        let hit = approximate_position(&values, &needle, false).ok_or(ErrorCode::NotAvailable)? as u32;
        let (row, col) = if results.is_column() && !results.is_row() {
            (results.first_row + hit, results.first_col)
        } else if results.is_row() {
            (results.first_row, results.first_col + hit)
        } else {
            return Err(ErrorCode::NotAvailable);
        };
        if !results.contains_row(row) || !results.contains_column(col) {
            return Err(ErrorCode::InvalidReference);
        }
        Ok(ctx.cell_value(results.sheets.first, row, col))
    }
}

pub fn register_builtins(reg: &mut crate::function_registry::FunctionRegistry) {
    crate::register_functions!(reg,
        28 => LookupFn,
        64 => MatchFn,
        101 => HLookupFn,
        102 => VLookupFn,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::StubContext;
    use biffcalc_common::SheetSpan;

    fn area(r1: u32, c1: u32, r2: u32, c2: u32) -> ValueResult {
        ValueResult::Area(AreaRef::new(SheetSpan::single(0), r1, c1, r2, c2))
    }

    /// A1:B4 holds (10,"ten") (20,"twenty") (30,"thirty") ("x","ex").
    fn table() -> StubContext {
        StubContext::default()
            .with_cell(0, 0, 10.0)
            .with_cell(0, 1, "ten")
            .with_cell(1, 0, 20.0)
            .with_cell(1, 1, "twenty")
            .with_cell(2, 0, 30.0)
            .with_cell(2, 1, "thirty")
            .with_cell(3, 0, "x")
            .with_cell(3, 1, "ex")
    }

    #[test]
    fn match_types() {
        let ctx = table();
        let col = area(0, 0, 3, 0);
        let m = |args: &[ValueResult]| MatchFn.eval(args, &ctx);
        assert_eq!(m(&[25.0.into(), col.clone()]).unwrap().as_number(), Some(2.0));
        assert_eq!(m(&[20.0.into(), col.clone(), 0.0.into()]).unwrap().as_number(), Some(2.0));
        assert_eq!(m(&["X".into(), col.clone(), 0.0.into()]).unwrap().as_number(), Some(4.0));
        assert_eq!(m(&[5.0.into(), col.clone()]).err(), Some(ErrorCode::NotAvailable));
        assert_eq!(m(&[1.0.into(), area(0, 0, 1, 1)]).err(), Some(ErrorCode::NotAvailable));
    }

    #[test]
    fn vlookup_exact_and_approximate() {
        let ctx = table();
        let t = area(0, 0, 3, 1);
        let v = |args: &[ValueResult]| VLookupFn.eval(args, &ctx);
        assert_eq!(v(&[25.0.into(), t.clone(), 2.0.into()]).unwrap().as_text(), Some("twenty"));
        assert_eq!(
            v(&[25.0.into(), t.clone(), 2.0.into(), false.into()]).err(),
            Some(ErrorCode::NotAvailable)
        );
        assert_eq!(
            v(&[30.0.into(), t.clone(), 2.0.into(), ValueResult::MissingArgument]).unwrap().as_text(),
            Some("thirty")
        );
        assert_eq!(v(&[10.0.into(), t.clone(), 0.0.into()]).err(), Some(ErrorCode::InvalidValue));
        assert_eq!(v(&[10.0.into(), t, 3.0.into()]).err(), Some(ErrorCode::InvalidReference));
    }

    #[test]
    fn hlookup_reads_down() {
        let ctx = StubContext::default()
            .with_cell(0, 0, "a")
            .with_cell(0, 1, "b")
            .with_cell(1, 0, 1.0)
            .with_cell(1, 1, 2.0);
        let r = HLookupFn
            .eval(&["B".into(), area(0, 0, 1, 1), 2.0.into(), false.into()], &ctx)
            .unwrap();
        assert_eq!(r.as_number(), Some(2.0));
    }

    #[test]
    fn lookup_vector_and_array_forms() {
        let ctx = table();
        let r = LookupFn
            .eval(&[21.0.into(), area(0, 0, 2, 0), area(0, 1, 2, 1)], &ctx)
            .unwrap();
        assert_eq!(r.as_text(), Some("twenty"));
        let r = LookupFn.eval(&[30.0.into(), area(0, 0, 2, 1)], &ctx).unwrap();
        assert_eq!(r.as_text(), Some("thirty"));
    }
}
