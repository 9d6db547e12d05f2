//! `COUNTIF` / `SUMIF` and the criteria predicate they share.
//!
//! A criterion is a number, boolean or error (plain equality), or text with
//! an optional operator prefix: `=`, `<>`, `<`, `<=`, `>`, `>=`. The rest of
//! the text is read as a number, boolean or error literal when it can be,
//! otherwise as a text pattern where `*`, `?` and `~` work as wildcards for
//! `=` and `<>`.

use super::super::utils::{has_wildcards, wildcard_match};
use crate::coercion::{parse_boolean, parse_double, resolve_here};
use crate::function::Function;
use crate::operators::{compare_numbers, compare_text};
use crate::reference::as_area;
use crate::traits::FunctionContext;
use biffcalc_common::{AreaRef, ErrorCode, ValueResult};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    /// Splits a leading operator off `s`. No operator means `=`.
    fn split(s: &str) -> (CmpOp, &str) {
        for (prefix, op) in [
            ("<=", CmpOp::Le),
            (">=", CmpOp::Ge),
            ("<>", CmpOp::Ne),
            ("<", CmpOp::Lt),
            (">", CmpOp::Gt),
            ("=", CmpOp::Eq),
        ] {
            if let Some(rest) = s.strip_prefix(prefix) {
                return (op, rest);
            }
        }
        (CmpOp::Eq, s)
    }

    fn holds(self, ord: Ordering) -> bool {
        match self {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Ge => ord != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Number(f64),
    Boolean(bool),
    Error(ErrorCode),
    Text(String),
    /// `""`, `"="` and `"<>"` with nothing after the operator.
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    op: CmpOp,
    operand: Operand,
    /// An operator was written out. `"="` matches blank cells only, while
    /// `""` also matches empty text.
    explicit_op: bool,
}

impl Criterion {
    /// Builds a criterion from a resolved scalar. Blank criteria match
    /// nothing and give `None`.
    pub fn parse(v: &ValueResult) -> Option<Criterion> {
        let plain = |operand| Criterion {
            op: CmpOp::Eq,
            operand,
            explicit_op: false,
        };
        match v {
            ValueResult::Number(n) => Some(plain(Operand::Number(*n))),
            ValueResult::Boolean(b) => Some(plain(Operand::Boolean(*b))),
            ValueResult::Error(e) => Some(plain(Operand::Error(*e))),
            ValueResult::Text(s) => {
                let (op, rest) = CmpOp::split(s);
                let explicit_op = rest.len() != s.len();
                let operand = if rest.is_empty() {
                    Operand::Empty
                } else if let Some(n) = parse_double(rest) {
                    Operand::Number(n)
                } else if let Some(b) = parse_boolean(rest) {
                    Operand::Boolean(b)
                } else if let Some(e) = ErrorCode::parse(rest) {
                    Operand::Error(e)
                } else {
                    Operand::Text(rest.to_string())
                };
                Some(Criterion {
                    op,
                    operand,
                    explicit_op,
                })
            }
            _ => None,
        }
    }

    pub fn matches(&self, cell: &ValueResult) -> bool {
        match &self.operand {
            Operand::Empty => {
                let is_empty = match cell {
                    ValueResult::Blank => true,
                    ValueResult::Text(s) => s.is_empty() && !self.explicit_op,
                    _ => false,
                };
                match self.op {
                    CmpOp::Ne => !matches!(cell, ValueResult::Blank),
                    CmpOp::Eq => is_empty,
                    _ => false,
                }
            }
            Operand::Number(n) => {
                let x = match cell {
                    ValueResult::Number(x) => Some(*x),
                    ValueResult::Text(s) if self.op == CmpOp::Eq => parse_double(s),
                    _ => None,
                };
                match x {
                    Some(x) => self.op.holds(compare_numbers(x, *n)),
                    None => self.op == CmpOp::Ne,
                }
            }
            Operand::Boolean(b) => match cell {
                ValueResult::Boolean(x) => self.op.holds(x.cmp(b)),
                _ => self.op == CmpOp::Ne,
            },
            Operand::Error(e) => match cell {
                ValueResult::Error(x) => (x == e) == (self.op != CmpOp::Ne),
                _ => self.op == CmpOp::Ne,
            },
            Operand::Text(pattern) => match cell {
                ValueResult::Text(s) => match self.op {
                    CmpOp::Eq | CmpOp::Ne => {
                        let hit = if has_wildcards(pattern) {
                            wildcard_match(pattern, s)
                        } else {
                            compare_text(s, pattern) == Ordering::Equal
                        };
                        hit == (self.op == CmpOp::Eq)
                    }
                    op => op.holds(compare_text(s, pattern)),
                },
                _ => self.op == CmpOp::Ne,
            },
        }
    }

    fn matches_blank(&self) -> bool {
        self.matches(&ValueResult::Blank)
    }
}

/// Criteria argument, resolved at the formula position.
fn criterion_arg(ctx: &dyn FunctionContext, v: &ValueResult) -> Result<Option<Criterion>, ErrorCode> {
    match resolve_here(ctx, v) {
        Ok(r) => Ok(Criterion::parse(&r)),
        Err(e) => Ok(Criterion::parse(&ValueResult::Error(e))),
    }
}

/// Visits `(row offset, col offset, value)` of every cell that can match.
/// When blanks match, every cell is read; otherwise reads stop at the used
/// extent.
fn for_each_candidate<F>(ctx: &dyn FunctionContext, area: &AreaRef, crit: &Criterion, mut f: F)
where
    F: FnMut(u32, u32, &ValueResult),
{
    ctx.track_area(area);
    for sheet in area.sheets.sheets() {
        let scan = if crit.matches_blank() {
            Some(*area)
        } else {
            match ctx.used_extent(sheet) {
                Some((last_row, last_col)) => area.clip(last_row, last_col),
                None => Some(*area),
            }
        };
        let Some(scan) = scan else { continue };
        for row in scan.first_row..=scan.last_row {
            for col in scan.first_col..=scan.last_col {
                let v = ctx.cell_value(sheet, row, col);
                f(row - area.first_row, col - area.first_col, &v);
            }
        }
    }
}

/* ─────────────────────────── COUNTIF() ─────────────────────────── */

#[derive(Debug)]
pub struct CountIfFn;

impl Function for CountIfFn {
    crate::func_caps!(PURE, REDUCTION);

    fn name(&self) -> &'static str {
        "COUNTIF"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let area = as_area(&args[0]).ok_or(ErrorCode::InvalidValue)?;
        let Some(crit) = criterion_arg(ctx, &args[1])? else {
            return Ok(ValueResult::ZERO);
        };
        let mut count = 0u64;
        for_each_candidate(ctx, &area, &crit, |_, _, v| {
            if crit.matches(v) {
                count += 1;
            }
        });
        Ok(ValueResult::Number(count as f64))
    }
}

/* ──────────────────────────── SUMIF() ──────────────────────────── */

/// `SUMIF(range, criteria, [sum_range])`. The sum range is re-shaped to the
/// criteria range from its top-left cell; only numbers are added.
#[derive(Debug)]
pub struct SumIfFn;

impl Function for SumIfFn {
    crate::func_caps!(PURE, REDUCTION);

    fn name(&self) -> &'static str {
        "SUMIF"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let area = as_area(&args[0]).ok_or(ErrorCode::InvalidValue)?;
        let Some(crit) = criterion_arg(ctx, &args[1])? else {
            return Ok(ValueResult::ZERO);
        };
        let sum_area = match args.get(2) {
            None | Some(ValueResult::MissingArgument) => area,
            Some(v) => {
                let base = as_area(v).ok_or(ErrorCode::InvalidValue)?;
                AreaRef::new(
                    base.sheets,
                    base.first_row,
                    base.first_col,
                    base.first_row + area.height() - 1,
                    base.first_col + area.width() - 1,
                )
            }
        };
        if sum_area != area {
            ctx.track_area(&sum_area);
        }
        let mut total = 0.0;
        let mut err = None;
        for_each_candidate(ctx, &area, &crit, |r, c, v| {
            if err.is_some() || !crit.matches(v) {
                return;
            }
            let x = if sum_area == area {
                v.clone()
            } else {
                ctx.cell_value(sum_area.sheets.first, sum_area.first_row + r, sum_area.first_col + c)
            };
            match x {
                ValueResult::Number(n) => total += n,
                ValueResult::Error(e) => err = Some(e),
                _ => {}
            }
        });
        if let Some(e) = err {
            return Err(e);
        }
        Ok(ValueResult::Number(total))
    }
}

pub fn register_builtins(reg: &mut crate::function_registry::FunctionRegistry) {
    crate::register_functions!(reg,
        345 => SumIfFn,
        346 => CountIfFn,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::StubContext;
    use biffcalc_common::SheetSpan;

    fn crit(v: impl Into<ValueResult>) -> Criterion {
        Criterion::parse(&v.into()).unwrap()
    }

    #[test]
    fn operator_prefixes() {
        assert!(crit(">5").matches(&6.0.into()));
        assert!(!crit(">5").matches(&5.0.into()));
        assert!(crit("<=5").matches(&5.0.into()));
        assert!(crit("<>5").matches(&ValueResult::Blank));
        assert!(crit("<>5").matches(&"abc".into()));
        assert!(!crit(">5").matches(&"abc".into()));
        assert!(crit(5.0).matches(&"5".into()));
        assert!(crit("=TRUE").matches(&true.into()));
        assert!(crit("#N/A").matches(&ValueResult::Error(ErrorCode::NotAvailable)));
    }

    #[test]
    fn text_and_wildcards() {
        assert!(crit("app*").matches(&"Apple".into()));
        assert!(crit("APPLE").matches(&"apple".into()));
        assert!(!crit("<>a?c").matches(&"abc".into()));
        assert!(crit(">b").matches(&"c".into()));
        assert!(!crit("a*").matches(&1.0.into()));
    }

    #[test]
    fn empty_criteria() {
        assert!(crit("").matches(&ValueResult::Blank));
        assert!(crit("").matches(&"".into()));
        assert!(crit("=").matches(&ValueResult::Blank));
        assert!(!crit("=").matches(&"".into()));
        assert!(crit("<>").matches(&1.0.into()));
        assert!(!crit("<>").matches(&ValueResult::Blank));
        assert!(Criterion::parse(&ValueResult::Blank).is_none());
    }

    #[test]
    fn countif_counts_blanks_past_extent() {
        let ctx = StubContext::default()
            .with_cell(0, 0, 1.0)
            .with_cell(1, 0, 2.0)
            .with_used_extent(1, 0);
        let area = ValueResult::Area(AreaRef::new(SheetSpan::single(0), 0, 0, 9, 0));
        let v = CountIfFn.eval(&[area.clone(), "".into()], &ctx).unwrap();
        assert_eq!(v.as_number(), Some(8.0));
        let v = CountIfFn.eval(&[area, ">1".into()], &ctx).unwrap();
        assert_eq!(v.as_number(), Some(1.0));
    }

    #[test]
    fn sumif_with_separate_sum_range() {
        let ctx = StubContext::default()
            .with_cell(0, 0, "a")
            .with_cell(1, 0, "b")
            .with_cell(2, 0, "a")
            .with_cell(0, 1, 10.0)
            .with_cell(1, 1, 20.0)
            .with_cell(2, 1, 30.0);
        let keys = ValueResult::Area(AreaRef::new(SheetSpan::single(0), 0, 0, 2, 0));
        let sums = ValueResult::Area(AreaRef::new(SheetSpan::single(0), 0, 1, 0, 1));
        let v = SumIfFn.eval(&[keys, "a".into(), sums], &ctx).unwrap();
        assert_eq!(v.as_number(), Some(40.0));
    }
}
