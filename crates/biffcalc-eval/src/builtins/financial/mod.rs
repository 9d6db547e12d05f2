//! Financial functions: PV, FV, PMT, NPER, NPV

mod tvm;

pub use tvm::*;

pub fn register_builtins(reg: &mut crate::function_registry::FunctionRegistry) {
    tvm::register_builtins(reg);
}
