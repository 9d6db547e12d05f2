use biffcalc_common::{BinaryOp, Token};
use biffcalc_eval::function_metadata::FUNCTION_INDEX_IF;
use biffcalc_eval::test_workbook::TestWorkbook;
use biffcalc_eval::timezone::ClockSpec;
use biffcalc_eval::{new_evaluator, EvalConfig};
use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

/// Column A: A1 = 1, then each cell reads the one above four times
/// through IF.
fn chain(n: u32) -> TestWorkbook {
    let mut wb = TestWorkbook::new().with_value(0, 0, 0, 1.0);
    for row in 1..n {
        let prev = || Token::cell(row - 1, 0);
        let f = Token::func(
            FUNCTION_INDEX_IF,
            vec![
                Token::binary(BinaryOp::Ge, prev(), Token::Number(0.0)),
                Token::binary(BinaryOp::Add, prev(), prev()),
                Token::binary(BinaryOp::Sub, Token::Number(0.0), prev()),
            ],
        );
        wb.set_formula(0, row, 0, f);
    }
    wb
}

fn config() -> EvalConfig {
    EvalConfig {
        clock: ClockSpec::Fixed(Default::default()),
        rng_seed: Some(7),
        ..EvalConfig::default()
    }
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("Chain");

    // Chains stay short enough for the main thread's stack.
    for n in [100u32, 400, 800] {
        // Every cell computed once.
        group.bench_with_input(BenchmarkId::new("Cold", n), &n, |b, &n| {
            b.iter_batched(
                || new_evaluator(chain(n), config()),
                |ev| ev.evaluate(0, black_box(n - 1), 0),
                BatchSize::SmallInput,
            )
        });

        // Served from cache.
        let ev = new_evaluator(chain(n), config());
        let _ = ev.evaluate(0, n - 1, 0);
        group.bench_with_input(BenchmarkId::new("Warm", n), &n, |b, &n| {
            b.iter(|| ev.evaluate(0, black_box(n - 1), 0))
        });

        // Head edit: the whole chain goes stale.
        group.bench_with_input(BenchmarkId::new("Invalidate", n), &n, |b, &n| {
            b.iter_batched(
                || {
                    let mut ev = new_evaluator(chain(n), config());
                    let _ = ev.evaluate(0, n - 1, 0);
                    ev.workbook_mut().set_value(0, 0, 0, 2.0);
                    ev
                },
                |ev| {
                    ev.notify_cell_changed(0, 0, 0);
                    ev.evaluate(0, black_box(n - 1), 0)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_chain);
criterion_main!(benches);
