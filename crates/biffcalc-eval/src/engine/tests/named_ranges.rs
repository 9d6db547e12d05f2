//! Defined names: constants, formulas, references and self-reference.
use super::common::*;
use crate::test_utils::{ar, bin, call, num, r, txt};
use crate::test_workbook::TestWorkbook;
use biffcalc_common::{BinaryOp, ErrorCode, Token};

fn name(n: &str) -> Token {
    Token::Name(n.to_string())
}

fn workbook() -> TestWorkbook {
    TestWorkbook::new()
        .with_sheet("Other")
        .with_value_a1("A1", 10.0)
        .with_value_a1("A2", 20.0)
        .with_value_a1("A3", 30.0)
        .with_name("Rate", num(0.5))
        .with_name("Twice", bin(BinaryOp::Mul, r("Sheet1!A1"), num(2.0)))
        .with_name("Prices", ar("Sheet1!A1:A3"))
        .with_name("Looped", bin(BinaryOp::Add, name("Looped"), num(1.0)))
        .with_sheet_scoped_name(1, "Rate", num(0.25))
}

#[test]
fn constant_and_formula_names() {
    let wb = workbook()
        .with_formula_a1("B1", bin(BinaryOp::Mul, r("A1"), name("rate")))
        .with_formula_a1("B2", bin(BinaryOp::Add, name("Twice"), num(1.0)))
        .with_formula_a1("Other!B1", bin(BinaryOp::Mul, r("Sheet1!A1"), name("Rate")));
    let ev = evaluator(wb);
    assert_eq!(number_at(&ev, "B1"), 5.0);
    assert_eq!(number_at(&ev, "B2"), 21.0);
    // the sheet-level definition shadows the workbook one
    assert_eq!(number_at(&ev, "Other!B1"), 2.5);
}

#[test]
fn reference_names() {
    let wb = workbook()
        .with_formula_a1("B1", call("SUM", vec![name("Prices")]))
        .with_formula_a1("B2", call("ROWS", vec![name("Prices")]))
        .with_formula_a1("B3", call("SUM", vec![call("INDIRECT", vec![txt("Prices")])]));
    let mut ev = evaluator(wb);
    assert_eq!(number_at(&ev, "B1"), 60.0);
    assert_eq!(number_at(&ev, "B2"), 3.0);
    assert_eq!(number_at(&ev, "B3"), 60.0);

    // cells read through a name are dependencies like any other
    set_value(&mut ev, "A2", 25.0);
    assert_eq!(number_at(&ev, "B1"), 65.0);
}

#[test]
fn recursive_name_is_circular() {
    let wb = workbook().with_formula_a1("B1", name("Looped"));
    let ev = evaluator(wb);
    assert_eq!(eval_a1(&ev, "B1").as_error(), Some(ErrorCode::CircularReference));
}

#[test]
fn unknown_and_function_names() {
    let wb = workbook()
        .with_function_name("MyFunc")
        .with_formula_a1("B1", bin(BinaryOp::Add, name("Nowhere"), num(1.0)))
        .with_formula_a1("B2", name("MyFunc"));
    let ev = evaluator(wb);
    assert_eq!(eval_a1(&ev, "B1").as_error(), Some(ErrorCode::InvalidName));
    assert_eq!(eval_a1(&ev, "B2").as_error(), Some(ErrorCode::InvalidName));
}
