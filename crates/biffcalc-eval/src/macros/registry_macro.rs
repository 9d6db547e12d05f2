/// Installs built-in functions into a `FunctionRegistry` at their table
/// indices: `register_functions!(reg, 4 => SumFn, 5 => AverageFn)`.
#[macro_export]
macro_rules! register_functions {
    ( $reg:expr, $($idx:expr => $fn:expr),+ $(,)? ) => {{
        use std::sync::Arc;
        $(
            $reg.install($idx, Arc::new($fn));
        )+
    }};
}

/// Expands to a `caps()` method returning the given flags:
/// `func_caps!(PURE, REDUCTION);`
#[macro_export]
macro_rules! func_caps {
    ( $($cap:ident),+ $(,)? ) => {
        fn caps(&self) -> $crate::function::FnCaps {
            $( $crate::function::FnCaps::$cap )|+
        }
    };
}
