//! Index-addressed function table plus the add-in and user-defined maps.
//!
//! The registry is built once, then shared read-only (`Arc`) by every
//! evaluator that uses it.

use std::fmt;
use std::sync::Arc;

use crate::engine::EngineError;
use crate::function::{FnCaps, Function};
use crate::function_metadata::{self, FUNCTION_INDEX_EXTERNAL, FUNCTION_INDEX_USER_DEFINED};
use crate::traits::FunctionContext;
use biffcalc_common::{ErrorCode, ValueResult};
use rustc_hash::FxHashMap;

pub struct FunctionRegistry {
    slots: Vec<Option<Arc<dyn Function>>>,
    addins: FxHashMap<String, Arc<dyn Function>>,
    user_defined: FxHashMap<String, Arc<dyn Function>>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("builtins", &self.implemented_count())
            .field("addins", &self.addins.len())
            .field("user_defined", &self.user_defined.len())
            .finish()
    }
}

impl FunctionRegistry {
    /// An empty registry: every known index evaluates to
    /// `FunctionNotImplemented`.
    pub fn new() -> Self {
        Self {
            slots: vec![None; function_metadata::max_index() as usize + 1],
            addins: FxHashMap::default(),
            user_defined: FxHashMap::default(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        crate::builtins::register_builtins(&mut reg);
        reg
    }

    /// Adds an add-in function, called through index 255.
    pub fn with_addin(mut self, name: &str, f: Arc<dyn Function>) -> Self {
        self.addins.insert(name.to_ascii_uppercase(), f);
        self
    }

    /// Adds the implementation of a workbook function name, called through
    /// the user-defined index.
    pub fn with_user_defined(mut self, name: &str, f: Arc<dyn Function>) -> Self {
        self.user_defined.insert(name.to_ascii_uppercase(), f);
        self
    }

    /// Puts `f` in slot `index`. Indices outside the table are ignored, as
    /// nothing can call them.
    pub fn install(&mut self, index: u16, f: Arc<dyn Function>) {
        if function_metadata::get_by_index(index).is_none() {
            #[cfg(feature = "tracing")]
            tracing::warn!(index, name = f.name(), "ignoring function at unknown index");
            return;
        }
        self.slots[index as usize] = Some(f);
    }

    pub fn get(&self, index: u16) -> Option<&Arc<dyn Function>> {
        self.slots.get(index as usize).and_then(Option::as_ref)
    }

    pub fn get_addin(&self, name: &str) -> Option<&Arc<dyn Function>> {
        self.addins.get(&name.to_ascii_uppercase())
    }

    pub fn get_user_defined(&self, name: &str) -> Option<&Arc<dyn Function>> {
        self.user_defined.get(&name.to_ascii_uppercase())
    }

    pub fn implemented_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Calls the function at `index`.
    ///
    /// For the add-in and user-defined indices the first argument carries
    /// the target name as `Text`, and is not passed on.
    pub fn dispatch(
        &self,
        index: u16,
        args: &[ValueResult],
        ctx: &dyn FunctionContext,
    ) -> Result<ValueResult, EngineError> {
        match index {
            FUNCTION_INDEX_EXTERNAL => Ok(self.dispatch_addin(args, ctx)),
            FUNCTION_INDEX_USER_DEFINED => Ok(self.dispatch_user_defined(args, ctx)),
            _ => {
                let meta = function_metadata::get_by_index(index)
                    .ok_or(EngineError::UnknownFunctionIndex(index))?;
                let Some(f) = self.get(index) else {
                    return Ok(ValueResult::Error(ErrorCode::FunctionNotImplemented));
                };
                if !meta.accepts(args.len()) {
                    return Ok(ValueResult::Error(ErrorCode::InvalidValue));
                }
                Ok(call(f.as_ref(), args, ctx))
            }
        }
    }

    fn dispatch_addin(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> ValueResult {
        let Some((ValueResult::Text(name), rest)) = args.split_first() else {
            return ValueResult::Error(ErrorCode::InvalidName);
        };
        match self.get_addin(name) {
            Some(f) => call(f.as_ref(), rest, ctx),
            None => {
                #[cfg(feature = "tracing")]
                tracing::warn!(addin = %name, "add-in function not implemented");
                ValueResult::Error(ErrorCode::FunctionNotImplemented)
            }
        }
    }

    fn dispatch_user_defined(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> ValueResult {
        let Some((ValueResult::Text(name), rest)) = args.split_first() else {
            return ValueResult::Error(ErrorCode::InvalidName);
        };
        if !ctx.is_function_name(name) {
            return ValueResult::Error(ErrorCode::InvalidName);
        }
        match self.get_user_defined(name) {
            Some(f) => call(f.as_ref(), rest, ctx),
            None => ValueResult::Error(ErrorCode::InvalidName),
        }
    }
}

fn call(f: &dyn Function, args: &[ValueResult], ctx: &dyn FunctionContext) -> ValueResult {
    if f.caps().contains(FnCaps::VOLATILE) {
        ctx.mark_volatile();
    }
    match f.eval(args, ctx) {
        Ok(v) => v,
        Err(e) => ValueResult::Error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::StubContext;

    struct Seven;

    impl Function for Seven {
        fn name(&self) -> &'static str {
            "SEVEN"
        }
        fn eval(&self, args: &[ValueResult], _: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
            Ok(ValueResult::Number(7.0 + args.len() as f64))
        }
    }

    #[test]
    fn unknown_and_unimplemented_indices() {
        let reg = FunctionRegistry::new();
        let ctx = StubContext::default();
        assert!(matches!(
            reg.dispatch(53, &[], &ctx),
            Err(EngineError::UnknownFunctionIndex(53))
        ));
        let v = reg.dispatch(4, &[], &ctx).unwrap();
        assert_eq!(v.as_error(), Some(ErrorCode::FunctionNotImplemented));
    }

    #[test]
    fn arity_is_checked() {
        let mut reg = FunctionRegistry::new();
        reg.install(38, Arc::new(Seven));
        let ctx = StubContext::default();
        let v = reg.dispatch(38, &[], &ctx).unwrap();
        assert_eq!(v.as_error(), Some(ErrorCode::InvalidValue));
        let v = reg.dispatch(38, &[ValueResult::Blank], &ctx).unwrap();
        assert_eq!(v.as_number(), Some(8.0));
    }

    #[test]
    fn addin_strips_name() {
        let reg = FunctionRegistry::new().with_addin("seven", Arc::new(Seven));
        let ctx = StubContext::default();
        let args = [ValueResult::from("SEVEN"), ValueResult::Number(1.0)];
        let v = reg.dispatch(FUNCTION_INDEX_EXTERNAL, &args, &ctx).unwrap();
        assert_eq!(v.as_number(), Some(8.0));
        let v = reg
            .dispatch(FUNCTION_INDEX_EXTERNAL, &[ValueResult::from("NOPE")], &ctx)
            .unwrap();
        assert_eq!(v.as_error(), Some(ErrorCode::FunctionNotImplemented));
    }

    #[test]
    fn user_defined_needs_workbook_function_name() {
        let reg = FunctionRegistry::new().with_user_defined("myFn", Arc::new(Seven));
        let mut ctx = StubContext::default();
        let args = [ValueResult::from("MYFN")];
        let v = reg.dispatch(FUNCTION_INDEX_USER_DEFINED, &args, &ctx).unwrap();
        assert_eq!(v.as_error(), Some(ErrorCode::InvalidName));

        ctx.function_names.push("myfn".into());
        let v = reg.dispatch(FUNCTION_INDEX_USER_DEFINED, &args, &ctx).unwrap();
        assert_eq!(v.as_number(), Some(7.0));
    }
}
