//! Common test helpers
use std::sync::Mutex;

use crate::coercion::number_to_text;
use crate::engine::{new_evaluator, CellKey, EvalConfig, EvaluationListener, WorkbookEvaluator};
use crate::test_workbook::TestWorkbook;
use crate::timezone::ClockSpec;
use biffcalc_common::{column_to_letters, Token, ValueResult};
use chrono::NaiveDate;

pub type TestEvaluator = WorkbookEvaluator<TestWorkbook>;

/// Frozen clock at 2024-03-15 12:00 and a fixed RNG seed.
pub fn fixed_config() -> EvalConfig {
    let at = NaiveDate::from_ymd_opt(2024, 3, 15)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    EvalConfig {
        clock: ClockSpec::Fixed(at),
        rng_seed: Some(42),
        ..EvalConfig::default()
    }
}

pub fn evaluator(wb: TestWorkbook) -> TestEvaluator {
    new_evaluator(wb, fixed_config())
}

pub fn eval_a1(ev: &TestEvaluator, a1: &str) -> ValueResult {
    let (sheet, row, col) = ev.workbook().locate(a1);
    ev.evaluate(sheet, row, col).unwrap()
}

pub fn number_at(ev: &TestEvaluator, a1: &str) -> f64 {
    let v = eval_a1(ev, a1);
    v.as_number()
        .unwrap_or_else(|| panic!("{a1} is not a number: {v:?}"))
}

/// Ad hoc formula at Sheet1!Z100, well away from test data.
pub fn eval_formula(ev: &TestEvaluator, formula: Token) -> ValueResult {
    ev.evaluate_formula(0, 99, 25, &formula).unwrap()
}

pub fn set_value(ev: &mut TestEvaluator, a1: &str, v: impl Into<ValueResult>) {
    let (sheet, row, col) = ev.workbook().locate(a1);
    ev.workbook_mut().set_value(sheet, row, col, v);
    ev.notify_cell_changed(sheet, row, col);
}

pub fn set_formula(ev: &mut TestEvaluator, a1: &str, formula: Token) {
    let (sheet, row, col) = ev.workbook().locate(a1);
    ev.workbook_mut().set_formula(sheet, row, col, formula);
    ev.notify_cell_changed(sheet, row, col);
}

pub fn a1_name(key: CellKey) -> String {
    format!("{}{}", column_to_letters(key.col), key.row + 1)
}

fn show(v: &ValueResult) -> String {
    match v {
        ValueResult::Number(n) => number_to_text(*n),
        ValueResult::Text(s) => s.clone(),
        ValueResult::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        ValueResult::Error(e) => e.to_string(),
        ValueResult::Blank | ValueResult::MissingArgument => "#BLANK#".to_string(),
        other => format!("{other:?}"),
    }
}

/// Writes each cache event as a short line, e.g. `start A1` or `clear2 B1`.
#[derive(Debug, Default)]
pub struct RecordingListener {
    log: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.lock().unwrap())
    }

    fn push(&self, line: String) {
        self.log.lock().unwrap().push(line);
    }
}

impl EvaluationListener for RecordingListener {
    fn on_cache_hit(&self, cell: CellKey, value: &ValueResult) {
        self.push(format!("hit {} {}", a1_name(cell), show(value)));
    }

    fn on_read_plain_value(&self, cell: CellKey, value: &ValueResult) {
        self.push(format!("value {} {}", a1_name(cell), show(value)));
    }

    fn on_start_evaluate(&self, cell: CellKey) {
        self.push(format!("start {}", a1_name(cell)));
    }

    fn on_end_evaluate(&self, cell: CellKey, value: &ValueResult) {
        self.push(format!("end {} {}", a1_name(cell), show(value)));
    }

    fn on_clear_whole_cache(&self) {
        self.push("clear all".to_string());
    }

    fn on_clear_cached_value(&self, cell: CellKey) {
        self.push(format!("clear {}", a1_name(cell)));
    }

    fn on_clear_dependent_cached_value(&self, cell: CellKey, depth: usize) {
        self.push(format!("clear{depth} {}", a1_name(cell)));
    }
}
