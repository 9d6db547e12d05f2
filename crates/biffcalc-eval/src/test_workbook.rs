//! In-memory workbook for tests, benches and embedding experiments.

use crate::coercion::{parse_boolean, parse_double};
use crate::traits::{CellType, DefinedName, EvaluationWorkbook};
use biffcalc_common::{parse_a1_reference, ErrorCode, Token, ValueResult};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
pub enum TestCell {
    Value(ValueResult),
    Formula(Token),
}

#[derive(Debug, Clone, Default)]
struct TestSheet {
    name: String,
    cells: FxHashMap<(u32, u32), TestCell>,
}

/// A workbook held in hash maps. Starts with one sheet, `Sheet1`.
#[derive(Debug, Clone)]
pub struct TestWorkbook {
    sheets: Vec<TestSheet>,
    /// Keyed by (scope sheet, upper-case name); `None` is workbook scope.
    names: FxHashMap<(Option<usize>, String), DefinedName>,
}

impl Default for TestWorkbook {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkbook {
    pub fn new() -> Self {
        Self {
            sheets: vec![TestSheet {
                name: "Sheet1".into(),
                ..TestSheet::default()
            }],
            names: FxHashMap::default(),
        }
    }

    pub fn with_sheet(mut self, name: &str) -> Self {
        self.sheets.push(TestSheet {
            name: name.to_string(),
            ..TestSheet::default()
        });
        self
    }

    pub fn with_value(mut self, sheet: usize, row: u32, col: u32, v: impl Into<ValueResult>) -> Self {
        self.set_value(sheet, row, col, v);
        self
    }

    pub fn with_value_a1(mut self, a1: &str, v: impl Into<ValueResult>) -> Self {
        self.set_value_a1(a1, v);
        self
    }

    /// Stores `input` as typed into a cell: numbers, `TRUE`/`FALSE` and
    /// error texts become values of their kind, anything else is text.
    pub fn with_input_a1(mut self, a1: &str, input: &str) -> Self {
        let v = if input.is_empty() {
            ValueResult::Blank
        } else if let Some(n) = parse_double(input) {
            ValueResult::Number(n)
        } else if let Some(b) = parse_boolean(input) {
            ValueResult::Boolean(b)
        } else if let Some(e) = ErrorCode::parse(input) {
            ValueResult::Error(e)
        } else {
            ValueResult::Text(input.to_string())
        };
        self.set_value_a1(a1, v);
        self
    }

    pub fn with_formula(mut self, sheet: usize, row: u32, col: u32, formula: Token) -> Self {
        self.set_formula(sheet, row, col, formula);
        self
    }

    pub fn with_formula_a1(mut self, a1: &str, formula: Token) -> Self {
        self.set_formula_a1(a1, formula);
        self
    }

    /// Workbook-scoped name.
    pub fn with_name(mut self, name: &str, definition: Token) -> Self {
        self.names
            .insert((None, name.to_ascii_uppercase()), DefinedName::Formula(definition));
        self
    }

    /// Name visible only from formulas on `sheet`; shadows a workbook name.
    pub fn with_sheet_scoped_name(mut self, sheet: usize, name: &str, definition: Token) -> Self {
        self.names.insert(
            (Some(sheet), name.to_ascii_uppercase()),
            DefinedName::Formula(definition),
        );
        self
    }

    /// Declares `name` as a user-defined function name.
    pub fn with_function_name(mut self, name: &str) -> Self {
        self.names
            .insert((None, name.to_ascii_uppercase()), DefinedName::Function);
        self
    }

    /* ─────────────────────────── Edits ─────────────────────────── */

    /// Sets a plain value; `Blank` empties the cell.
    pub fn set_value(&mut self, sheet: usize, row: u32, col: u32, v: impl Into<ValueResult>) {
        let v = v.into();
        let cells = &mut self.sheets[sheet].cells;
        if v.is_blank() {
            cells.remove(&(row, col));
        } else {
            cells.insert((row, col), TestCell::Value(v));
        }
    }

    pub fn set_formula(&mut self, sheet: usize, row: u32, col: u32, formula: Token) {
        self.sheets[sheet].cells.insert((row, col), TestCell::Formula(formula));
    }

    pub fn clear(&mut self, sheet: usize, row: u32, col: u32) {
        self.sheets[sheet].cells.remove(&(row, col));
    }

    pub fn set_value_a1(&mut self, a1: &str, v: impl Into<ValueResult>) {
        let (sheet, row, col) = self.locate(a1);
        self.set_value(sheet, row, col, v);
    }

    pub fn set_formula_a1(&mut self, a1: &str, formula: Token) {
        let (sheet, row, col) = self.locate(a1);
        self.set_formula(sheet, row, col, formula);
    }

    pub fn clear_a1(&mut self, a1: &str) {
        let (sheet, row, col) = self.locate(a1);
        self.clear(sheet, row, col);
    }

    /// `(sheet, row, col)` of `B3` or `Sheet2!B3`; unqualified means sheet 0.
    pub fn locate(&self, a1: &str) -> (usize, u32, u32) {
        let parsed = parse_a1_reference(a1).expect("bad A1 reference");
        let bounds = parsed.bounds().expect("A1 reference is not a cell");
        let sheet = match &parsed.sheet {
            Some(name) => self.sheet_index_by_name(name).expect("unknown sheet in A1 reference"),
            None => 0,
        };
        (
            sheet,
            bounds.first_row.expect("A1 reference has no row"),
            bounds.first_col.expect("A1 reference has no column"),
        )
    }

    fn cell(&self, sheet: usize, row: u32, col: u32) -> Option<&TestCell> {
        self.sheets.get(sheet)?.cells.get(&(row, col))
    }
}

impl EvaluationWorkbook for TestWorkbook {
    fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    fn sheet_name(&self, sheet: usize) -> Option<&str> {
        self.sheets.get(sheet).map(|s| s.name.as_str())
    }

    fn sheet_index_by_name(&self, name: &str) -> Option<usize> {
        self.sheets
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
    }

    fn cell_type(&self, sheet: usize, row: u32, col: u32) -> CellType {
        match self.cell(sheet, row, col) {
            None => CellType::Blank,
            Some(TestCell::Formula(_)) => CellType::Formula,
            Some(TestCell::Value(v)) => match v {
                ValueResult::Number(_) => CellType::Numeric,
                ValueResult::Text(_) => CellType::Text,
                ValueResult::Boolean(_) => CellType::Boolean,
                ValueResult::Error(_) => CellType::Error,
                _ => CellType::Blank,
            },
        }
    }

    fn formula_tokens(&self, sheet: usize, row: u32, col: u32) -> Option<&Token> {
        match self.cell(sheet, row, col)? {
            TestCell::Formula(t) => Some(t),
            TestCell::Value(_) => None,
        }
    }

    fn literal_value(&self, sheet: usize, row: u32, col: u32) -> ValueResult {
        match self.cell(sheet, row, col) {
            Some(TestCell::Value(v)) => v.clone(),
            _ => ValueResult::Blank,
        }
    }

    fn defined_name(&self, name: &str, sheet: usize) -> Option<&DefinedName> {
        let upper = name.to_ascii_uppercase();
        self.names
            .get(&(Some(sheet), upper.clone()))
            .or_else(|| self.names.get(&(None, upper)))
    }

    fn used_extent(&self, sheet: usize) -> Option<(u32, u32)> {
        let cells = &self.sheets.get(sheet)?.cells;
        let last_row = cells.keys().map(|(r, _)| *r).max()?;
        let last_col = cells.keys().map(|(_, c)| *c).max()?;
        Some((last_row, last_col))
    }
}
