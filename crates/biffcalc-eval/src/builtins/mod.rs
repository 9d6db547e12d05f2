pub mod datetime;
pub mod financial;
pub mod info;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod random;
pub mod reference_fns;
pub mod text;
pub(crate) mod utils;

use crate::function_registry::FunctionRegistry;

/// Installs every built-in function at its table index.
pub fn register_builtins(reg: &mut FunctionRegistry) {
    logical::register_builtins(reg);
    math::register_builtins(reg);
    info::register_builtins(reg);
    text::register_builtins(reg);
    lookup::register_builtins(reg);
    reference_fns::register_builtins(reg);
    datetime::register_builtins(reg);
    financial::register_builtins(reg);
    random::register_builtins(reg);
}
