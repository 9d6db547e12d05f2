pub mod coercion;
pub mod function;
pub mod function_metadata;
pub mod function_registry;
pub mod operators;
pub mod timezone;
pub mod traits;

pub mod builtins;
pub mod reference;

pub use engine::{new_evaluator, EngineError, EvalConfig, WorkbookEvaluator};
pub use traits::{CellType, DefinedName, EvaluationWorkbook, FunctionContext};

mod macros;
#[cfg(test)]
pub mod test_utils;
pub mod test_workbook;

pub mod engine;
