//! Cache hits, dirty propagation and the evaluation log.
use std::sync::Arc;

use super::common::*;
use crate::test_utils::{ar, bin, call, num, r};
use crate::test_workbook::TestWorkbook;
use biffcalc_common::{BinaryOp, Token};

fn lines(expected: &[&str]) -> Vec<String> {
    expected.iter().map(|s| s.to_string()).collect()
}

/// A1 = MAX(B1:B2), B1 = C2-C1, B2 = B3*C1-C2, C1..C3 sum blocks of D:E.
fn medium_complex() -> TestWorkbook {
    TestWorkbook::new()
        .with_formula_a1("A1", call("MAX", vec![ar("B1:B2")]))
        .with_formula_a1("B1", bin(BinaryOp::Sub, r("C2"), r("C1")))
        .with_formula_a1(
            "B2",
            bin(BinaryOp::Sub, bin(BinaryOp::Mul, r("B3"), r("C1")), r("C2")),
        )
        .with_value_a1("B3", 2.0)
        .with_formula_a1("C1", call("SUM", vec![ar("D1:E2")]))
        .with_formula_a1("C2", call("SUM", vec![ar("D2:E3")]))
        .with_formula_a1("C3", call("SUM", vec![ar("D3:E4")]))
        .with_value_a1("D1", 12.0)
        .with_value_a1("E1", 13.0)
        .with_value_a1("D2", 14.0)
        .with_value_a1("E2", 15.0)
        .with_value_a1("D3", 16.0)
        .with_value_a1("E3", 17.0)
}

fn logged(wb: TestWorkbook) -> (TestEvaluator, Arc<RecordingListener>) {
    let log = Arc::new(RecordingListener::default());
    let ev = evaluator(wb).with_listener(log.clone());
    (ev, log)
}

#[test]
fn medium_complex_low_level_change() {
    let (mut ev, log) = logged(medium_complex());
    assert_eq!(number_at(&ev, "A1"), 46.0);
    assert_eq!(
        log.take(),
        lines(&[
            "start A1",
            "start B1",
            "start C2",
            "value D2 14",
            "value E2 15",
            "value D3 16",
            "value E3 17",
            "end C2 62",
            "start C1",
            "value D1 12",
            "value E1 13",
            "value D2 14",
            "value E2 15",
            "end C1 54",
            "end B1 8",
            "start B2",
            "value B3 2",
            "hit C1 54",
            "hit C2 62",
            "end B2 46",
            "end A1 46",
        ])
    );

    assert_eq!(number_at(&ev, "A1"), 46.0);
    assert_eq!(log.take(), lines(&["hit A1 46"]));

    set_value(&mut ev, "D1", 10.0);
    assert_eq!(
        log.take(),
        lines(&["clear1 C1", "clear2 B1", "clear2 B2", "clear3 A1"])
    );

    assert_eq!(number_at(&ev, "A1"), 42.0);
    assert_eq!(
        log.take(),
        lines(&[
            "start A1",
            "start B1",
            "hit C2 62",
            "start C1",
            "value D1 10",
            "value E1 13",
            "value D2 14",
            "value E2 15",
            "end C1 52",
            "end B1 10",
            "start B2",
            "value B3 2",
            "hit C1 52",
            "hit C2 62",
            "end B2 42",
            "end A1 42",
        ])
    );
}

#[test]
fn medium_complex_intermediate_change() {
    let (mut ev, log) = logged(medium_complex());
    assert_eq!(number_at(&ev, "A1"), 46.0);
    log.take();

    set_value(&mut ev, "B3", 3.0);
    assert_eq!(log.take(), lines(&["clear1 B2", "clear2 A1"]));

    assert_eq!(number_at(&ev, "A1"), 100.0);
    assert_eq!(
        log.take(),
        lines(&[
            "start A1",
            "hit B1 8",
            "start B2",
            "value B3 3",
            "hit C1 54",
            "hit C2 62",
            "end B2 100",
            "end A1 100",
        ])
    );
}

#[test]
fn medium_complex_formula_change() {
    let (mut ev, log) = logged(medium_complex());
    assert_eq!(number_at(&ev, "A1"), 46.0);
    log.take();

    set_formula(
        &mut ev,
        "B2",
        bin(BinaryOp::Sub, bin(BinaryOp::Mul, r("B3"), r("C2")), r("C3")),
    );
    assert_eq!(log.take(), lines(&["clear B2", "clear1 A1"]));
    assert_eq!(number_at(&ev, "A1"), 91.0);

    // B2 no longer reads C1, so a change below C1 only reaches B1 and A1
    log.take();
    set_value(&mut ev, "D1", 11.0);
    assert_eq!(log.take(), lines(&["clear1 C1", "clear2 B1", "clear3 A1"]));
}

#[test]
fn chain_costs_one_miss_per_cell() {
    const N: u32 = 30;
    let mut wb = TestWorkbook::new().with_value(0, 0, 0, 1.0);
    for row in 1..N {
        let prev = || Token::cell(row - 1, 0);
        // four reads of the previous cell behind a short-circuit
        let f = call(
            "IF",
            vec![
                bin(BinaryOp::Ge, prev(), num(0.0)),
                bin(BinaryOp::Add, prev(), prev()),
                bin(BinaryOp::Sub, num(0.0), prev()),
            ],
        );
        wb.set_formula(0, row, 0, f);
    }
    let mut ev = evaluator(wb);
    let last = ev.evaluate(0, N - 1, 0).unwrap();
    assert_eq!(last.as_number(), Some(2f64.powi(N as i32 - 1)));
    assert_eq!(ev.metrics().misses(), (N - 1) as u64);

    set_value(&mut ev, "A1", 2.0);
    let before = ev.metrics().misses();
    let last = ev.evaluate(0, N - 1, 0).unwrap();
    assert_eq!(last.as_number(), Some(2f64.powi(N as i32)));
    assert_eq!(ev.metrics().misses() - before, (N - 1) as u64);

    // an edit halfway down recomputes only the tail
    set_formula(&mut ev, "A15", num(1.0));
    let before = ev.metrics().misses();
    ev.evaluate(0, N - 1, 0).unwrap();
    assert_eq!(ev.metrics().misses() - before, (N - 14) as u64);
}

#[test]
fn redundant_update_keeps_dependents() {
    let wb = TestWorkbook::new()
        .with_value_a1("A1", 5.0)
        .with_formula_a1("B1", bin(BinaryOp::Mul, r("A1"), num(2.0)));
    let (mut ev, log) = logged(wb);
    assert_eq!(number_at(&ev, "B1"), 10.0);
    log.take();

    set_value(&mut ev, "A1", 5.0);
    assert!(log.take().is_empty());
    assert_eq!(number_at(&ev, "B1"), 10.0);
    assert_eq!(log.take(), lines(&["hit B1 10"]));

    set_value(&mut ev, "A1", 6.0);
    assert_eq!(log.take(), lines(&["clear1 B1"]));
    assert_eq!(number_at(&ev, "B1"), 12.0);
}

#[test]
fn blank_cell_later_set() {
    let wb = TestWorkbook::new().with_formula_a1("B1", bin(BinaryOp::Add, r("A1"), num(1.0)));
    let mut ev = evaluator(wb);
    assert_eq!(number_at(&ev, "B1"), 1.0);
    set_value(&mut ev, "A1", 3.0);
    assert_eq!(number_at(&ev, "B1"), 4.0);
}

#[test]
fn area_reader_sees_cells_past_used_extent() {
    let wb = TestWorkbook::new()
        .with_value_a1("A1", 1.0)
        .with_value_a1("A2", 2.0)
        .with_formula_a1("B1", call("SUM", vec![ar("A1:A10")]));
    let mut ev = evaluator(wb);
    assert_eq!(number_at(&ev, "B1"), 3.0);

    // A7 was never read: it lay past the last populated row
    set_value(&mut ev, "A7", 4.0);
    assert_eq!(number_at(&ev, "B1"), 7.0);

    // outside the area: no recomputation
    let misses = ev.metrics().misses();
    set_value(&mut ev, "A11", 100.0);
    assert_eq!(number_at(&ev, "B1"), 7.0);
    assert_eq!(ev.metrics().misses(), misses);
}

#[test]
fn deleted_cell_reads_blank() {
    let wb = TestWorkbook::new()
        .with_formula_a1("A1", num(5.0))
        .with_formula_a1("B1", bin(BinaryOp::Add, r("A1"), num(1.0)));
    let (mut ev, log) = logged(wb);
    assert_eq!(number_at(&ev, "B1"), 6.0);
    log.take();

    ev.workbook_mut().clear_a1("A1");
    ev.notify_cell_deleted(0, 0, 0);
    assert_eq!(log.take(), lines(&["clear A1", "clear1 B1"]));
    assert_eq!(number_at(&ev, "B1"), 1.0);
}

#[test]
fn clear_all_recomputes_everything() {
    let (ev, log) = logged(medium_complex());
    assert_eq!(number_at(&ev, "A1"), 46.0);
    assert_eq!(ev.cached_formula_count(), 5);
    log.take();

    ev.clear_all_cached_values();
    assert_eq!(log.take(), lines(&["clear all"]));
    assert_eq!(ev.cached_formula_count(), 0);
    let misses = ev.metrics().misses();
    assert_eq!(number_at(&ev, "A1"), 46.0);
    assert_eq!(ev.metrics().misses() - misses, 5);
}

#[test]
fn hits_and_misses_are_counted() {
    let ev = evaluator(medium_complex());
    number_at(&ev, "A1");
    // A1 B1 C2 C1 B2 computed; C1 and C2 hit once from B2
    assert_eq!(ev.metrics().misses(), 5);
    assert_eq!(ev.metrics().hits(), 2);
    number_at(&ev, "A1");
    assert_eq!(ev.metrics().hits(), 3);
}

#[test]
fn unrelated_area_readers_stay_cached() {
    // 200 SUMs over disjoint blocks of column A, plus one over column B
    let mut wb = TestWorkbook::new();
    for i in 0..200u32 {
        let block = format!("A{}:A{}", i * 5 + 1, i * 5 + 5);
        wb.set_formula(0, i, 3, call("SUM", vec![ar(&block)]));
    }
    wb.set_formula_a1("E1", call("SUM", vec![ar("B1:B1000")]));
    let (mut ev, log) = logged(wb);
    for row in 0..200 {
        ev.evaluate(0, row, 3).unwrap();
    }
    assert_eq!(number_at(&ev, "E1"), 0.0);
    log.take();

    set_value(&mut ev, "A13", 1.0);
    assert_eq!(log.take(), lines(&["clear1 D3"]));
    set_value(&mut ev, "B999", 1.0);
    assert_eq!(log.take(), lines(&["clear1 E1"]));

    let misses = ev.metrics().misses();
    assert_eq!(number_at(&ev, "D3"), 1.0);
    assert_eq!(number_at(&ev, "D4"), 0.0);
    assert_eq!(ev.metrics().misses() - misses, 1);
}
