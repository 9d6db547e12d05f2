//! Circular references evaluate to an error value instead of recursing.
use super::common::*;
use crate::test_utils::{bin, call, num, r};
use crate::test_workbook::TestWorkbook;
use biffcalc_common::{BinaryOp, ErrorCode, Token};

fn circ() -> Option<ErrorCode> {
    Some(ErrorCode::CircularReference)
}

#[test]
fn two_cell_cycle() {
    // A1 = B1 + 1, B1 = A1 + 1
    let wb = TestWorkbook::new()
        .with_formula_a1("A1", bin(BinaryOp::Add, r("B1"), num(1.0)))
        .with_formula_a1("B1", bin(BinaryOp::Add, r("A1"), num(1.0)));
    let ev = evaluator(wb);
    assert_eq!(eval_a1(&ev, "A1").as_error(), circ());
    assert_eq!(eval_a1(&ev, "B1").as_error(), circ());
    // and again, from cache or not
    assert_eq!(eval_a1(&ev, "A1").as_error(), circ());
}

#[test]
fn five_cell_cycle() {
    // A1 -> A2 -> ... -> A5 -> A1
    let mut wb = TestWorkbook::new();
    for row in 0..5u32 {
        wb.set_formula(0, row, 0, Token::cell((row + 1) % 5, 0));
    }
    let ev = evaluator(wb);
    for a1 in ["A3", "A1", "A2", "A4", "A5"] {
        assert_eq!(eval_a1(&ev, a1).as_error(), circ(), "{a1}");
    }
}

#[test]
fn only_the_entry_cell_caches_the_cycle() {
    let wb = TestWorkbook::new()
        .with_formula_a1("A1", r("B1"))
        .with_formula_a1("B1", r("A1"));
    let ev = evaluator(wb);
    eval_a1(&ev, "A1");
    assert_eq!(ev.cached_formula_count(), 1);
}

#[test]
fn self_reference() {
    let wb = TestWorkbook::new().with_formula_a1("A1", bin(BinaryOp::Mul, r("A1"), num(2.0)));
    let ev = evaluator(wb);
    assert_eq!(eval_a1(&ev, "A1").as_error(), circ());
}

#[test]
fn offset_onto_own_cell() {
    let wb = TestWorkbook::new().with_formula_a1("A1", call("OFFSET", vec![r("A1"), num(0.0), num(0.0)]));
    let ev = evaluator(wb);
    assert_eq!(eval_a1(&ev, "A1").as_error(), circ());
}

#[test]
fn cycle_through_area() {
    // B1 sums a column that contains B1 itself
    let wb = TestWorkbook::new()
        .with_value_a1("B2", 1.0)
        .with_formula_a1("B1", call("SUM", vec![crate::test_utils::ar("B1:B3")]));
    let ev = evaluator(wb);
    assert_eq!(eval_a1(&ev, "B1").as_error(), circ());
}

#[test]
fn breaking_the_cycle_recovers() {
    let wb = TestWorkbook::new()
        .with_formula_a1("A1", bin(BinaryOp::Add, r("B1"), num(1.0)))
        .with_formula_a1("B1", bin(BinaryOp::Add, r("A1"), num(1.0)));
    let mut ev = evaluator(wb);
    assert_eq!(eval_a1(&ev, "A1").as_error(), circ());
    set_value(&mut ev, "B1", 10.0);
    assert_eq!(number_at(&ev, "A1"), 11.0);
}
