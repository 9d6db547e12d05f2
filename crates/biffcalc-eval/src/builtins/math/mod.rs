pub mod aggregate;
pub mod criteria;
pub mod numeric;

pub use aggregate::*;
pub use criteria::*;
pub use numeric::*;

pub fn register_builtins(reg: &mut crate::function_registry::FunctionRegistry) {
    numeric::register_builtins(reg);
    aggregate::register_builtins(reg);
    criteria::register_builtins(reg);
}
