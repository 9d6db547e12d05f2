//! Reading through resolved references.
//!
//! `CellRef`/`AreaRef` (from `biffcalc-common`) only describe *where*; the
//! functions here fetch *what*, always through a [`FunctionContext`] so the
//! reads are recorded as dependencies of the formula doing the reading.
//!
//! ```text
//!   A1:C1 consumed at column B ──▶ B1        (single row: pick by column)
//!   A1:A3 consumed at row 2    ──▶ A2        (single column: pick by row)
//!   A1:C3 consumed at B2       ──▶ B2        (rectangle: must contain both)
//!   A1:C1 consumed at column D ──▶ #VALUE!
//! ```

use crate::traits::FunctionContext;
use biffcalc_common::{AreaRef, CellRef, ErrorCode, GridLimits, ValueResult};

/* ───────────────────────── Smart selection ───────────────────────── */

/// Picks the one cell of `area` that a scalar consumer at
/// (`src_row`, `src_col`) sees.
///
/// - 1×1: that cell, wherever the consumer is.
/// - single column: the cell on the consumer's row.
/// - single row: the cell in the consumer's column.
/// - anything larger: the cell at the consumer's row and column, which
///   must both fall inside the area.
///
/// Every other case, and any multi-sheet area, is `#VALUE!`.
pub fn choose_single_element(
    area: &AreaRef,
    src_row: u32,
    src_col: u32,
) -> Result<CellRef, ErrorCode> {
    if !area.sheets.is_single() {
        return Err(ErrorCode::InvalidValue);
    }
    let sheet = area.sheets.first;
    if area.is_column() {
        if area.is_row() {
            return Ok(CellRef::new(sheet, area.first_row, area.first_col));
        }
        if !area.contains_row(src_row) {
            return Err(ErrorCode::InvalidValue);
        }
        return Ok(CellRef::new(sheet, src_row, area.first_col));
    }
    if !area.is_row() {
        if area.contains_row(src_row) && area.contains_column(src_col) {
            return Ok(CellRef::new(sheet, src_row, src_col));
        }
        return Err(ErrorCode::InvalidValue);
    }
    if !area.contains_column(src_col) {
        return Err(ErrorCode::InvalidValue);
    }
    Ok(CellRef::new(sheet, area.first_row, src_col))
}

/* ─────────────────────────── Indexing ────────────────────────────── */

/// Value at an absolute sheet position inside `area` (first sheet of the
/// span). Empty cells are `Blank`; positions outside the area are
/// `#VALUE!`.
pub fn get_absolute(ctx: &dyn FunctionContext, area: &AreaRef, row: u32, col: u32) -> ValueResult {
    if !area.contains_row(row) || !area.contains_column(col) {
        return ValueResult::Error(ErrorCode::InvalidValue);
    }
    ctx.cell_value(area.sheets.first, row, col)
}

/// Value at a 0-based offset from the area's top-left corner.
pub fn get_relative(ctx: &dyn FunctionContext, area: &AreaRef, r: u32, c: u32) -> ValueResult {
    if r >= area.height() || c >= area.width() {
        return ValueResult::Error(ErrorCode::InvalidValue);
    }
    ctx.cell_value(area.sheets.first, area.first_row + r, area.first_col + c)
}

/// Reference argument viewed as an area. A single cell is a 1×1 area;
/// anything else is `None`.
pub fn as_area(value: &ValueResult) -> Option<AreaRef> {
    match value {
        ValueResult::SingleRef(r) => Some(r.as_area()),
        ValueResult::Area(a) => Some(*a),
        _ => None,
    }
}

/// Visits the populated part of an area, sheet by sheet, row-major.
///
/// The whole area is recorded as a dependency first; cells past the sheet's
/// used extent are blank and not visited. The callback returns `false` to
/// stop early.
pub fn visit_area<F>(ctx: &dyn FunctionContext, area: &AreaRef, mut f: F)
where
    F: FnMut(ValueResult) -> bool,
{
    ctx.track_area(area);
    for sheet in area.sheets.sheets() {
        let clipped = match ctx.used_extent(sheet) {
            Some((last_row, last_col)) => match area.clip(last_row, last_col) {
                Some(a) => a,
                None => continue,
            },
            None => *area,
        };
        for row in clipped.first_row..=clipped.last_row {
            for col in clipped.first_col..=clipped.last_col {
                if !f(ctx.cell_value(sheet, row, col)) {
                    return;
                }
            }
        }
    }
}

/// All values visited by [`visit_area`].
pub fn area_values(ctx: &dyn FunctionContext, area: &AreaRef) -> Vec<ValueResult> {
    let mut out = Vec::new();
    visit_area(ctx, area, |v| {
        out.push(v);
        true
    });
    out
}

/// Total cells of the area across its sheets.
pub fn total_cells(area: &AreaRef) -> u64 {
    area.cell_count() * area.sheets.count() as u64
}

/* ────────────────────────── Reference ops ────────────────────────── */

/// The space operator. Both operands must be references on the same
/// sheets; no common cell is `#NULL!`.
pub fn intersect(left: &ValueResult, right: &ValueResult) -> ValueResult {
    let (Some(a), Some(b)) = (as_area(left), as_area(right)) else {
        return ValueResult::Error(first_error(left, right).unwrap_or(ErrorCode::InvalidValue));
    };
    match a.intersect(&b) {
        Some(area) => ValueResult::Area(area),
        None => ValueResult::Error(ErrorCode::NullIntersection),
    }
}

/// The `:` operator between two references: their bounding box.
pub fn range_union(left: &ValueResult, right: &ValueResult) -> ValueResult {
    let (Some(a), Some(b)) = (as_area(left), as_area(right)) else {
        return ValueResult::Error(first_error(left, right).unwrap_or(ErrorCode::InvalidValue));
    };
    match a.bounding(&b) {
        Some(area) => ValueResult::Area(area),
        None => ValueResult::Error(ErrorCode::InvalidValue),
    }
}

fn first_error(left: &ValueResult, right: &ValueResult) -> Option<ErrorCode> {
    left.as_error().or_else(|| right.as_error())
}

/// Offsets a reference value by edge deltas, keeping its sheet anchoring.
/// The result is an area even when it covers a single cell.
pub fn offset(
    value: &ValueResult,
    dr_first: i64,
    dr_last: i64,
    dc_first: i64,
    dc_last: i64,
    limits: GridLimits,
) -> Result<AreaRef, ErrorCode> {
    match value {
        ValueResult::SingleRef(r) => r.offset(dr_first, dr_last, dc_first, dc_last, limits),
        ValueResult::Area(a) => a.offset(dr_first, dr_last, dc_first, dc_last, limits),
        ValueResult::Error(e) => Err(*e),
        _ => Err(ErrorCode::InvalidValue),
    }
}
