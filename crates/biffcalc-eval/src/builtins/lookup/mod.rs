pub mod core;
pub mod lookup_utils;
pub mod reference_info;

pub use self::core::*;
pub use reference_info::*;

pub fn register_builtins(reg: &mut crate::function_registry::FunctionRegistry) {
    self::core::register_builtins(reg);
    reference_info::register_builtins(reg);
}
