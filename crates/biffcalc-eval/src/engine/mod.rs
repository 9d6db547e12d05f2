//! Memoizing workbook evaluator
//!
//! Evaluates formula cells on demand, caching each result together with the
//! cells it read, so that edits invalidate exactly the dependent formulas.

pub mod cache;
pub mod context;
pub mod eval;
pub mod interval_tree;
pub mod listener;
pub mod metrics;
pub mod tracker;

#[cfg(test)]
mod tests;

pub use cache::{AreaKey, CellKey, EvaluationCache};
pub use context::OperationContext;
pub use eval::WorkbookEvaluator;
pub use listener::EvaluationListener;
pub use metrics::CacheMetrics;

use crate::timezone::ClockSpec;
use thiserror::Error;

/// Configuration for the evaluator
#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Source of NOW()/TODAY().
    pub clock: ClockSpec,
    /// Keep results of formulas that called a volatile function. Legacy
    /// behavior is to cache them until an input changes.
    pub cache_volatile_results: bool,
    /// Seed for RAND(); `None` seeds from the clock.
    pub rng_seed: Option<u64>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            clock: ClockSpec::default(),
            cache_volatile_results: true,
            rng_seed: None,
        }
    }
}

/// Hard failures: the token tree or the function table is inconsistent
/// with the workbook. These abort the whole `evaluate` call instead of
/// becoming a cell error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("formula refers to sheet '{0}' which does not exist")]
    UnknownSheet(String),

    #[error("function index {0} is not in the function table")]
    UnknownFunctionIndex(u16),

    #[error("cell ({sheet}, {row}, {col}) is a formula cell without tokens")]
    InvalidCell { sheet: usize, row: u32, col: u32 },

    #[error("sheet index {0} is out of range")]
    SheetIndexOutOfRange(usize),
}

/// Construct a new evaluator over `workbook` with the full built-in table.
pub fn new_evaluator<W>(workbook: W, config: EvalConfig) -> WorkbookEvaluator<W>
where
    W: crate::traits::EvaluationWorkbook,
{
    WorkbookEvaluator::new(
        workbook,
        std::sync::Arc::new(crate::function_registry::FunctionRegistry::with_builtins()),
        config,
    )
}
