//! Fixtures shared by the unit tests: a stub `FunctionContext` for calling
//! functions directly, and terse token builders for engine scenarios.

use std::cell::{Cell, RefCell};

use crate::function_metadata;
use crate::traits::FunctionContext;
use biffcalc_common::{
    parse_a1_reference, AreaRef, BinaryOp, ErrorCode, GridLimits, SheetTarget, Token, ValueResult,
};
use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;

/* ─────────────────────────── StubContext ─────────────────────────── */

/// A `FunctionContext` over a fixed map of cell values. Formula cells do
/// not exist here; every cell is whatever was put in.
#[derive(Debug, Clone, Default)]
pub struct StubContext {
    pub sheet: usize,
    pub row: u32,
    pub col: u32,
    pub cells: FxHashMap<(usize, u32, u32), ValueResult>,
    pub sheets: Vec<String>,
    pub names: FxHashMap<String, ValueResult>,
    pub function_names: Vec<String>,
    pub extent: Option<(u32, u32)>,
    pub now: NaiveDateTime,
    pub random: f64,
    pub volatile: Cell<bool>,
    pub tracked: RefCell<Vec<AreaRef>>,
}

impl StubContext {
    /// A context evaluating at (`sheet`, `row`, `col`).
    pub fn at(sheet: usize, row: u32, col: u32) -> Self {
        Self {
            sheet,
            row,
            col,
            ..Self::default()
        }
    }

    /// Puts a value on sheet 0.
    pub fn with_cell(mut self, row: u32, col: u32, value: impl Into<ValueResult>) -> Self {
        self.cells.insert((0, row, col), value.into());
        self
    }

    pub fn with_used_extent(mut self, row: u32, col: u32) -> Self {
        self.extent = Some((row, col));
        self
    }

    pub fn with_sheet_name(mut self, name: &str) -> Self {
        self.sheets.push(name.to_string());
        self
    }

    pub fn with_name(mut self, name: &str, value: ValueResult) -> Self {
        self.names.insert(name.to_uppercase(), value);
        self
    }

    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }
}

impl FunctionContext for StubContext {
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
        GridLimits::BIFF8
    }

    fn cell_value(&self, sheet: usize, row: u32, col: u32) -> ValueResult {
        self.cells
            .get(&(sheet, row, col))
            .cloned()
            .unwrap_or(ValueResult::Blank)
    }

    fn track_area(&self, area: &AreaRef) {
        self.tracked.borrow_mut().push(*area);
    }

    fn used_extent(&self, _sheet: usize) -> Option<(u32, u32)> {
        self.extent
    }

    fn sheet_index_by_name(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|s| s.eq_ignore_ascii_case(name))
    }

    fn evaluate_name(&self, name: &str) -> ValueResult {
        self.names
            .get(&name.to_uppercase())
            .cloned()
            .unwrap_or(ValueResult::Error(ErrorCode::InvalidName))
    }

    fn is_function_name(&self, name: &str) -> bool {
        self.function_names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    fn mark_volatile(&self) {
        self.volatile.set(true);
    }

    fn now(&self) -> NaiveDateTime {
        self.now
    }

    fn next_random(&self) -> f64 {
        self.random
    }
}

/* ────────────────────────── Token builders ───────────────────────── */

pub fn num(n: f64) -> Token {
    Token::Number(n)
}

pub fn txt(s: &str) -> Token {
    Token::text(s)
}

fn sheet_target(sheet: Option<String>) -> SheetTarget {
    sheet.map_or(SheetTarget::Current, SheetTarget::Named)
}

/// Cell reference from A1 text, optionally sheet-qualified (`Sheet2!B3`).
pub fn r(a1: &str) -> Token {
    let parsed = parse_a1_reference(a1).expect("cell reference");
    let bounds = parsed.bounds().expect("cell bounds");
    Token::Ref {
        sheet: sheet_target(parsed.sheet),
        row: bounds.first_row.expect("row"),
        col: bounds.first_col.expect("col"),
    }
}

/// Area reference from A1 text: `A1:B4`, `C:C`, `Data!2:3`.
pub fn ar(a1: &str) -> Token {
    let parsed = parse_a1_reference(a1).expect("area reference");
    let bounds = parsed.bounds().expect("area bounds");
    Token::Area {
        sheet: sheet_target(parsed.sheet),
        bounds,
    }
}

/// Function call by name, resolved to its table index.
pub fn call(name: &str, args: Vec<Token>) -> Token {
    let meta = function_metadata::get_by_name(name).unwrap_or_else(|| panic!("unknown function {name}"));
    Token::func(meta.index, args)
}

pub fn bin(op: BinaryOp, left: Token, right: Token) -> Token {
    Token::binary(op, left, right)
}

/// Installs a `tracing` subscriber honoring `RUST_LOG`, once per process.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
