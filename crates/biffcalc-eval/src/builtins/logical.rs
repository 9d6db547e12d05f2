// Logical functions. IF and CHOOSE are also short-circuited by the
// evaluator; the eager versions here serve direct registry calls.

use super::utils::{arg_bool, arg_int};
use crate::coercion::{coerce_to_boolean, resolve_here};
use crate::function::Function;
use crate::reference::{as_area, visit_area};
use crate::traits::FunctionContext;
use biffcalc_common::{ErrorCode, ValueResult};

/* ─────────────────────────── TRUE() ─────────────────────────────── */

#[derive(Debug)]
pub struct TrueFn;

impl Function for TrueFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "TRUE"
    }

    fn eval(&self, _args: &[ValueResult], _ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        Ok(ValueResult::Boolean(true))
    }
}

/* ─────────────────────────── FALSE() ────────────────────────────── */

#[derive(Debug)]
pub struct FalseFn;

impl Function for FalseFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "FALSE"
    }

    fn eval(&self, _args: &[ValueResult], _ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        Ok(ValueResult::Boolean(false))
    }
}

/* ───────────────────────── AND() / OR() ─────────────────────────── */

/// Folds the boolean opinions of all arguments. Text and blanks inside
/// references have no opinion; direct text must say TRUE or FALSE. With no
/// opinion at all the result is `#VALUE!`.
fn fold_booleans(
    args: &[ValueResult],
    ctx: &dyn FunctionContext,
    init: bool,
    op: fn(bool, bool) -> bool,
) -> Result<ValueResult, ErrorCode> {
    let mut acc: Option<bool> = None;
    for arg in args {
        if let Some(area) = as_area(arg) {
            let mut err = None;
            visit_area(ctx, &area, |v| match coerce_to_boolean(&v, true) {
                Ok(Some(b)) => {
                    acc = Some(op(acc.unwrap_or(init), b));
                    true
                }
                Ok(None) => true,
                Err(e) => {
                    err = Some(e);
                    false
                }
            });
            if let Some(e) = err {
                return Err(e);
            }
        } else if let Some(b) = coerce_to_boolean(arg, false)? {
            acc = Some(op(acc.unwrap_or(init), b));
        }
    }
    acc.map(ValueResult::Boolean).ok_or(ErrorCode::InvalidValue)
}

#[derive(Debug)]
pub struct AndFn;

impl Function for AndFn {
    crate::func_caps!(PURE, REDUCTION);

    fn name(&self) -> &'static str {
        "AND"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        fold_booleans(args, ctx, true, |a, b| a && b)
    }
}

#[derive(Debug)]
pub struct OrFn;

impl Function for OrFn {
    crate::func_caps!(PURE, REDUCTION);

    fn name(&self) -> &'static str {
        "OR"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        fold_booleans(args, ctx, false, |a, b| a || b)
    }
}

/* ─────────────────────────── NOT() ──────────────────────────────── */

#[derive(Debug)]
pub struct NotFn;

impl Function for NotFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "NOT"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        Ok(ValueResult::Boolean(!arg_bool(ctx, &args[0])?))
    }
}

/* ─────────────────────────── IF() ───────────────────────────────── */

#[derive(Debug)]
pub struct IfFn;

impl Function for IfFn {
    crate::func_caps!(PURE, SHORT_CIRCUIT);

    fn name(&self) -> &'static str {
        "IF"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let cond = coerce_to_boolean(&resolve_here(ctx, &args[0])?, false)?.unwrap_or(false);
        if cond {
            Ok(args[1].clone())
        } else {
            Ok(args.get(2).cloned().unwrap_or(ValueResult::Boolean(false)))
        }
    }
}

/* ───────────────────────── CHOOSE() ─────────────────────────────── */

#[derive(Debug)]
pub struct ChooseFn;

impl Function for ChooseFn {
    crate::func_caps!(PURE, SHORT_CIRCUIT);

    fn name(&self) -> &'static str {
        "CHOOSE"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let i = arg_int(ctx, &args[0])?;
        if i < 1 || i as usize >= args.len() {
            return Err(ErrorCode::InvalidValue);
        }
        Ok(args[i as usize].clone())
    }
}

pub fn register_builtins(reg: &mut crate::function_registry::FunctionRegistry) {
    crate::register_functions!(reg,
        1 => IfFn,
        34 => TrueFn,
        35 => FalseFn,
        36 => AndFn,
        37 => OrFn,
        38 => NotFn,
        100 => ChooseFn,
    );
}

/* ─────────────────────────── tests ─────────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::StubContext;
    use biffcalc_common::{AreaRef, SheetSpan};

    fn b(x: bool) -> ValueResult {
        ValueResult::Boolean(x)
    }

    #[test]
    fn and_or_over_scalars() {
        let ctx = StubContext::default();
        assert_eq!(AndFn.eval(&[b(true), 1.0.into()], &ctx).unwrap().as_bool(), Some(true));
        assert_eq!(AndFn.eval(&[b(true), 0.0.into()], &ctx).unwrap().as_bool(), Some(false));
        assert_eq!(OrFn.eval(&[b(false), "TRUE".into()], &ctx).unwrap().as_bool(), Some(true));
        assert_eq!(OrFn.eval(&["maybe".into()], &ctx).err(), Some(ErrorCode::InvalidValue));
    }

    #[test]
    fn text_in_ranges_has_no_opinion() {
        let ctx = StubContext::default().with_cell(0, 0, "x").with_cell(1, 0, true);
        let area = ValueResult::Area(AreaRef::new(SheetSpan::single(0), 0, 0, 2, 0));
        assert_eq!(AndFn.eval(&[area], &ctx).unwrap().as_bool(), Some(true));

        let only_text = ValueResult::Area(AreaRef::new(SheetSpan::single(0), 0, 0, 0, 0));
        assert_eq!(OrFn.eval(&[only_text], &ctx).err(), Some(ErrorCode::InvalidValue));
    }

    #[test]
    fn choose_floors_its_index() {
        let ctx = StubContext::default();
        let args = [2.9.into(), "a".into(), "b".into()];
        assert_eq!(ChooseFn.eval(&args, &ctx).unwrap().as_text(), Some("b"));
        let args = [3.0.into(), "a".into(), "b".into()];
        assert_eq!(ChooseFn.eval(&args, &ctx).err(), Some(ErrorCode::InvalidValue));
    }

    #[test]
    fn if_without_else_is_false() {
        let ctx = StubContext::default();
        let v = IfFn.eval(&[b(false), 1.0.into()], &ctx).unwrap();
        assert_eq!(v.as_bool(), Some(false));
        assert_eq!(NotFn.eval(&[ValueResult::Blank], &ctx).unwrap().as_bool(), Some(true));
    }
}
