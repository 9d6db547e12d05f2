//! Date and time functions: DATE, TIME, YEAR, MONTH, DAY, HOUR, MINUTE,
//! SECOND, WEEKDAY, NOW, TODAY

mod date_parts;
mod date_time;
mod serial;
mod today_now;

pub use date_parts::*;
pub use date_time::*;
pub use serial::*;
pub use today_now::*;

pub fn register_builtins(reg: &mut crate::function_registry::FunctionRegistry) {
    date_time::register_builtins(reg);
    date_parts::register_builtins(reg);
    today_now::register_builtins(reg);
}
