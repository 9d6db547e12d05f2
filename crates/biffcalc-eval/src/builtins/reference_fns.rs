//! Functions that build references: INDEX, OFFSET and INDIRECT.
//!
//! Each returns a `SingleRef` or `Area`; the caller decides whether to
//! dereference it. A reference returned to the top of a formula is read by
//! smart selection at the formula's own cell.

use super::utils::arg_int;
use crate::coercion::resolve_here;
use crate::function::Function;
use crate::reference::as_area;
use crate::traits::FunctionContext;
use biffcalc_common::{parse_a1_reference, AreaRef, CellRef, ErrorCode, SheetSpan, ValueResult};

/// A collapsed area is handed out as a cell reference.
fn reference_value(area: AreaRef) -> ValueResult {
    if area.is_single_cell() {
        ValueResult::SingleRef(area.top_left())
    } else {
        ValueResult::Area(area)
    }
}

/// Optional integer argument; absent or empty slot gives `default`.
fn opt_int(ctx: &dyn FunctionContext, args: &[ValueResult], i: usize, default: i64) -> Result<i64, ErrorCode> {
    match args.get(i) {
        None | Some(ValueResult::MissingArgument) => Ok(default),
        Some(v) => arg_int(ctx, v),
    }
}

/* ───────────────────────────── INDEX() ───────────────────────────── */

/// `INDEX(reference, row, [column], [area])`, reference form.
///
/// A 0 row or column selects the whole column or row. On a one-row area a
/// lone index counts columns. Indices past the area are `#REF!`.
#[derive(Debug)]
pub struct IndexFn;

impl Function for IndexFn {
    crate::func_caps!(PURE, REFERENCE_ARGS, RETURNS_REF);

    fn name(&self) -> &'static str {
        "INDEX"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let row = opt_int(ctx, args, 1, 0)?;
        let col = opt_int(ctx, args, 2, 0)?;
        if opt_int(ctx, args, 3, 1)? != 1 {
            return Err(ErrorCode::InvalidReference);
        }
        if row < 0 || col < 0 {
            return Err(ErrorCode::InvalidValue);
        }
        let Some(area) = as_area(&args[0]) else {
            // INDEX over a plain value
            let v = resolve_here(ctx, &args[0])?;
            return if row <= 1 && col <= 1 {
                Ok(v)
            } else {
                Err(ErrorCode::InvalidReference)
            };
        };
        let (row, col) = if args.len() == 2 && area.is_row() && !area.is_column() {
            (0, row)
        } else {
            (row, col)
        };
        if row > area.height() as i64 || col > area.width() as i64 {
            return Err(ErrorCode::InvalidReference);
        }
        let (first_row, last_row) = match row {
            0 => (area.first_row, area.last_row),
            r => (area.first_row + r as u32 - 1, area.first_row + r as u32 - 1),
        };
        let (first_col, last_col) = match col {
            0 => (area.first_col, area.last_col),
            c => (area.first_col + c as u32 - 1, area.first_col + c as u32 - 1),
        };
        Ok(reference_value(AreaRef::new(area.sheets, first_row, first_col, last_row, last_col)))
    }
}

/* ───────────────────────────── OFFSET() ──────────────────────────── */

/// Edge deltas for one axis. `size` defaults to the base extent; a
/// negative size grows toward row/column 0 from the shifted start.
fn axis_deltas(base_len: u32, shift: i64, size: i64) -> Result<(i64, i64), ErrorCode> {
    if size == 0 {
        return Err(ErrorCode::InvalidReference);
    }
    let far = if size > 0 {
        shift.checked_add(size - 1)
    } else {
        shift.checked_add(size + 1)
    };
    let far = far.ok_or(ErrorCode::InvalidReference)?;
    let (start, end) = if size > 0 { (shift, far) } else { (far, shift) };
    // deltas relative to the base's first and last edge
    let last = end
        .checked_sub(base_len as i64 - 1)
        .ok_or(ErrorCode::InvalidReference)?;
    Ok((start, last))
}

/// `OFFSET(reference, rows, cols, [height], [width])`.
#[derive(Debug)]
pub struct OffsetFn;

impl Function for OffsetFn {
    crate::func_caps!(PURE, REFERENCE_ARGS, RETURNS_REF);

    fn name(&self) -> &'static str {
        "OFFSET"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let base = match &args[0] {
            ValueResult::Error(e) => return Err(*e),
            v => as_area(v).ok_or(ErrorCode::InvalidValue)?,
        };
        let rows = opt_int(ctx, args, 1, 0)?;
        let cols = opt_int(ctx, args, 2, 0)?;
        let height = opt_int(ctx, args, 3, base.height() as i64)?;
        let width = opt_int(ctx, args, 4, base.width() as i64)?;
        let (dr_first, dr_last) = axis_deltas(base.height(), rows, height)?;
        let (dc_first, dc_last) = axis_deltas(base.width(), cols, width)?;
        let moved = base.offset(dr_first, dr_last, dc_first, dc_last, ctx.limits())?;
        Ok(ValueResult::Area(moved))
    }
}

/* ──────────────────────────── INDIRECT() ─────────────────────────── */

/// `INDIRECT(text, [a1])`. Only A1 notation is understood; `a1 = FALSE`
/// is `#REF!`. Text that is not an address is tried as a defined name.
#[derive(Debug)]
pub struct IndirectFn;

impl Function for IndirectFn {
    crate::func_caps!(VOLATILE, RETURNS_REF);

    fn name(&self) -> &'static str {
        "INDIRECT"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let text = match resolve_here(ctx, &args[0])? {
            ValueResult::Text(s) => s,
            _ => return Err(ErrorCode::InvalidReference),
        };
        if let Some(flag) = args.get(1) {
            let a1 = match resolve_here(ctx, flag)? {
                ValueResult::MissingArgument | ValueResult::Blank => false,
                v => crate::coercion::coerce_to_boolean(&v, false)?.unwrap_or(false),
            };
            if !a1 {
                return Err(ErrorCode::InvalidReference);
            }
        }
        let parsed = parse_a1_reference(&text)
            .ok()
            .and_then(|p| p.bounds().map(|b| (p, b)));
        let Some((parsed, bounds)) = parsed else {
            return match ctx.evaluate_name(text.trim()) {
                v @ (ValueResult::SingleRef(_) | ValueResult::Area(_)) => Ok(v),
                _ => Err(ErrorCode::InvalidReference),
            };
        };
        let sheet = match &parsed.sheet {
            Some(name) => ctx
                .sheet_index_by_name(name)
                .ok_or(ErrorCode::InvalidReference)?,
            None => ctx.sheet_index(),
        };
        let limits = ctx.limits();
        let in_grid = |r: Option<u32>, c: Option<u32>| {
            r.is_none_or(|r| r <= limits.max_row) && c.is_none_or(|c| c <= limits.max_col)
        };
        if !in_grid(bounds.first_row, bounds.first_col) || !in_grid(bounds.last_row, bounds.last_col) {
            return Err(ErrorCode::InvalidReference);
        }
        let area = AreaRef::from_bounds(SheetSpan::single(sheet), &bounds, limits);
        if parsed.is_single_cell() {
            Ok(ValueResult::SingleRef(CellRef::new(sheet, area.first_row, area.first_col)))
        } else {
            Ok(ValueResult::Area(area))
        }
    }
}

pub fn register_builtins(reg: &mut crate::function_registry::FunctionRegistry) {
    crate::register_functions!(reg,
        29 => IndexFn,
        78 => OffsetFn,
        148 => IndirectFn,
    );
}
