//! Seams between the evaluator, the workbook it reads, and the functions
//! it calls.

use biffcalc_common::{AreaRef, GridLimits, Token, ValueResult};
use chrono::NaiveDateTime;

/// Stored kind of a cell, as reported by the workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellType {
    Formula,
    Numeric,
    Text,
    Boolean,
    Error,
    Blank,
}

/// What a workbook-defined name stands for.
#[derive(Debug, Clone, PartialEq)]
pub enum DefinedName {
    /// A constant, formula or reference, evaluated in the caller's context.
    Formula(Token),
    /// A user-defined function name. The implementation is looked up in the
    /// registry when the name heads a user-defined function call.
    Function,
}

/* ─────────────────────────── Workbook ────────────────────────────── */

/// Read-only view of the cell graph. The evaluator never mutates the
/// workbook; whoever does must call `notify_cell_changed` afterwards.
pub trait EvaluationWorkbook {
    fn sheet_count(&self) -> usize;

    fn sheet_name(&self, sheet: usize) -> Option<&str>;

    /// Case-insensitive sheet lookup.
    fn sheet_index_by_name(&self, name: &str) -> Option<usize>;

    fn cell_type(&self, sheet: usize, row: u32, col: u32) -> CellType;

    /// Parsed formula of a `CellType::Formula` cell.
    fn formula_tokens(&self, sheet: usize, row: u32, col: u32) -> Option<&Token>;

    /// Value of a non-formula cell. Empty cells report `Blank`.
    fn literal_value(&self, sheet: usize, row: u32, col: u32) -> ValueResult;

    /// Sheet-scoped names shadow workbook-scoped ones.
    fn defined_name(&self, name: &str, sheet: usize) -> Option<&DefinedName>;

    fn max_row_index(&self) -> u32 {
        GridLimits::BIFF8.max_row
    }

    fn max_col_index(&self) -> u32 {
        GridLimits::BIFF8.max_col
    }

    /// Last populated `(row, col)` of a sheet, if known. Areas are not read
    /// past it; `None` means every cell of an area is visited.
    fn used_extent(&self, _sheet: usize) -> Option<(u32, u32)> {
        None
    }
}

/* ────────────────────────── Function side ────────────────────────── */

/// Everything a function may ask of the evaluation in progress.
///
/// Reads go through here so that they are recorded as dependencies of the
/// calling formula cell.
pub trait FunctionContext {
    /// Sheet of the formula being evaluated.
    fn sheet_index(&self) -> usize;

    fn row_index(&self) -> u32;

    fn column_index(&self) -> u32;

    fn limits(&self) -> GridLimits;

    /// Evaluated value of one cell. Formula cells are evaluated (or served
    /// from cache); the result is always a scalar.
    fn cell_value(&self, sheet: usize, row: u32, col: u32) -> ValueResult;

    /// Records a whole area as an input, so that later edits anywhere in it,
    /// including cells that are blank now, invalidate the caller.
    fn track_area(&self, area: &AreaRef);

    fn used_extent(&self, sheet: usize) -> Option<(u32, u32)>;

    fn sheet_index_by_name(&self, name: &str) -> Option<usize>;

    /// Evaluates a defined name in the caller's context.
    fn evaluate_name(&self, name: &str) -> ValueResult;

    /// True when `name` is defined in the workbook as a function name.
    fn is_function_name(&self, name: &str) -> bool;

    /// Marks the calling formula as depending on something other than cells.
    fn mark_volatile(&self);

    fn now(&self) -> NaiveDateTime;

    /// Uniform sample in `[0, 1)`.
    fn next_random(&self) -> f64;
}
