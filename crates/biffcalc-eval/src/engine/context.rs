use super::cache::{AreaKey, CellKey};
use super::eval::WorkbookEvaluator;
use crate::traits::{DefinedName, EvaluationWorkbook, FunctionContext};
use biffcalc_common::{AreaRef, ErrorCode, GridLimits, ValueResult};
use chrono::NaiveDateTime;

/// The evaluator as seen by one formula cell.
///
/// Reads made through it are recorded against the innermost frame of the
/// evaluation stack. A hard failure below a function call cannot travel
/// through the function's `ErrorCode` result, so it is latched on the
/// evaluator and the read sees `#REF!`; `evaluate` reports the latched
/// failure when the stack unwinds.
pub struct OperationContext<'a, W: EvaluationWorkbook> {
    evaluator: &'a WorkbookEvaluator<W>,
    sheet: usize,
    row: u32,
    col: u32,
}

impl<'a, W: EvaluationWorkbook> OperationContext<'a, W> {
    pub fn new(evaluator: &'a WorkbookEvaluator<W>, sheet: usize, row: u32, col: u32) -> Self {
        Self {
            evaluator,
            sheet,
            row,
            col,
        }
    }

    pub fn evaluator(&self) -> &'a WorkbookEvaluator<W> {
        self.evaluator
    }
}

impl<W: EvaluationWorkbook> FunctionContext for OperationContext<'_, W> {
    fn sheet_index(&self) -> usize {
        self.sheet
    }

    fn row_index(&self) -> u32 {
        self.row
    }

    fn column_index(&self) -> u32 {
        self.col
    }

    fn limits(&self) -> GridLimits {
        let wb = self.evaluator.workbook();
        GridLimits::new(wb.max_row_index(), wb.max_col_index())
    }

    fn cell_value(&self, sheet: usize, row: u32, col: u32) -> ValueResult {
        if self.evaluator.has_fault() {
            return ValueResult::Error(ErrorCode::InvalidReference);
        }
        match self.evaluator.read_cell(CellKey::new(sheet, row, col)) {
            Ok(v) => v,
            Err(e) => {
                self.evaluator.latch_fault(e);
                ValueResult::Error(ErrorCode::InvalidReference)
            }
        }
    }

    fn track_area(&self, area: &AreaRef) {
        self.evaluator.tracker().borrow_mut().accept_area(AreaKey(*area));
    }

    fn used_extent(&self, sheet: usize) -> Option<(u32, u32)> {
        self.evaluator.workbook().used_extent(sheet)
    }

    fn sheet_index_by_name(&self, name: &str) -> Option<usize> {
        self.evaluator.workbook().sheet_index_by_name(name)
    }

    fn evaluate_name(&self, name: &str) -> ValueResult {
        match self.evaluator.eval_name(name, self) {
            Ok(v) => v,
            Err(e) => {
                self.evaluator.latch_fault(e);
                ValueResult::Error(ErrorCode::InvalidReference)
            }
        }
    }

    fn is_function_name(&self, name: &str) -> bool {
        matches!(
            self.evaluator.workbook().defined_name(name, self.sheet),
            Some(DefinedName::Function)
        )
    }

    fn mark_volatile(&self) {
        self.evaluator.tracker().borrow_mut().mark_volatile();
    }

    fn now(&self) -> NaiveDateTime {
        self.evaluator.config().clock.now()
    }

    fn next_random(&self) -> f64 {
        self.evaluator.next_random()
    }
}
