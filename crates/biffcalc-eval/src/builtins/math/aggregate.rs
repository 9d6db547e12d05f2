use super::super::utils::{RefPolicy, arg_int, checked, collect_numbers, flatten_values};
use crate::coercion::{coerce_to_number, parse_double, resolve_here};
use crate::function::Function;
use crate::reference::{as_area, total_cells, visit_area};
use crate::traits::FunctionContext;
use biffcalc_common::{AreaRef, ErrorCode, ValueResult};

/// The numeric reductions shared by the named functions and `SUBTOTAL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Sum,
    Average,
    Count,
    CountA,
    Min,
    Max,
    Product,
    StDev,
    StDevP,
    Var,
    VarP,
}

impl Reduction {
    /// `SUBTOTAL` function codes 1-11; 101-111 are the same reductions.
    pub fn from_subtotal_code(code: i64) -> Option<Self> {
        let code = if (101..=111).contains(&code) { code - 100 } else { code };
        Some(match code {
            1 => Reduction::Average,
            2 => Reduction::Count,
            3 => Reduction::CountA,
            4 => Reduction::Max,
            5 => Reduction::Min,
            6 => Reduction::Product,
            7 => Reduction::StDev,
            8 => Reduction::StDevP,
            9 => Reduction::Sum,
            10 => Reduction::Var,
            11 => Reduction::VarP,
            _ => return None,
        })
    }

    pub fn apply(self, ctx: &dyn FunctionContext, args: &[ValueResult]) -> Result<ValueResult, ErrorCode> {
        match self {
            Reduction::Count => Ok(ValueResult::Number(count_numbers(ctx, args) as f64)),
            Reduction::CountA => Ok(ValueResult::Number(count_non_blank(ctx, args) as f64)),
            _ => {
                let nums = collect_numbers(ctx, args, RefPolicy::NumbersOnly)?;
                checked(self.fold(&nums)?)
            }
        }
    }

    fn fold(self, nums: &[f64]) -> Result<f64, ErrorCode> {
        let n = nums.len() as f64;
        match self {
            Reduction::Sum => Ok(nums.iter().sum()),
            Reduction::Average => {
                if nums.is_empty() {
                    return Err(ErrorCode::DivByZero);
                }
                Ok(nums.iter().sum::<f64>() / n)
            }
            Reduction::Min => Ok(nums.iter().copied().reduce(f64::min).unwrap_or(0.0)),
            Reduction::Max => Ok(nums.iter().copied().reduce(f64::max).unwrap_or(0.0)),
            Reduction::Product => {
                if nums.is_empty() {
                    return Ok(0.0);
                }
                Ok(nums.iter().product())
            }
            Reduction::Var | Reduction::StDev => {
                if nums.len() < 2 {
                    return Err(ErrorCode::DivByZero);
                }
                let var = sum_sq_dev(nums) / (n - 1.0);
                Ok(if self == Reduction::StDev { var.sqrt() } else { var })
            }
            Reduction::VarP | Reduction::StDevP => {
                if nums.is_empty() {
                    return Err(ErrorCode::DivByZero);
                }
                let var = sum_sq_dev(nums) / n;
                Ok(if self == Reduction::StDevP { var.sqrt() } else { var })
            }
            Reduction::Count | Reduction::CountA => Ok(n),
        }
    }
}

fn mean(nums: &[f64]) -> f64 {
    nums.iter().sum::<f64>() / nums.len() as f64
}

fn sum_sq_dev(nums: &[f64]) -> f64 {
    let m = mean(nums);
    nums.iter().map(|x| (x - m) * (x - m)).sum()
}

/// `COUNT`: numbers in references; numbers, booleans, numeric text and
/// empty slots among direct arguments. Errors are not counted.
fn count_numbers(ctx: &dyn FunctionContext, args: &[ValueResult]) -> usize {
    let mut count = 0;
    for arg in args {
        match as_area(arg) {
            Some(area) => visit_area(ctx, &area, |v| {
                if matches!(v, ValueResult::Number(_)) {
                    count += 1;
                }
                true
            }),
            None => {
                let counts = match arg {
                    ValueResult::Number(_) | ValueResult::Boolean(_) | ValueResult::MissingArgument => true,
                    ValueResult::Text(s) => parse_double(s).is_some(),
                    _ => false,
                };
                if counts {
                    count += 1;
                }
            }
        }
    }
    count
}

/// `COUNTA`: everything except blank cells. An empty argument slot counts.
fn count_non_blank(ctx: &dyn FunctionContext, args: &[ValueResult]) -> usize {
    flatten_values(ctx, args)
        .iter()
        .filter(|v| !v.is_blank())
        .count()
}

/* ─────────────────────── Named reductions ──────────────────────── */

macro_rules! reduction_fn {
    ($ty:ident, $name:literal, $red:expr) => {
        #[derive(Debug)]
        pub struct $ty;

        impl Function for $ty {
            crate::func_caps!(PURE, REDUCTION);

            fn name(&self) -> &'static str {
                $name
            }

            fn eval(
                &self,
                args: &[ValueResult],
                ctx: &dyn FunctionContext,
            ) -> Result<ValueResult, ErrorCode> {
                $red.apply(ctx, args)
            }
        }
    };
}

reduction_fn!(SumFn, "SUM", Reduction::Sum);
reduction_fn!(AverageFn, "AVERAGE", Reduction::Average);
reduction_fn!(CountFn, "COUNT", Reduction::Count);
reduction_fn!(CountAFn, "COUNTA", Reduction::CountA);
reduction_fn!(MinFn, "MIN", Reduction::Min);
reduction_fn!(MaxFn, "MAX", Reduction::Max);
reduction_fn!(ProductFn, "PRODUCT", Reduction::Product);
reduction_fn!(StDevFn, "STDEV", Reduction::StDev);
reduction_fn!(StDevPFn, "STDEVP", Reduction::StDevP);
reduction_fn!(VarFn, "VAR", Reduction::Var);
reduction_fn!(VarPFn, "VARP", Reduction::VarP);

/* ───────────────────────── MINA / MAXA ─────────────────────────── */

#[derive(Debug)]
pub struct MinAFn;

impl Function for MinAFn {
    crate::func_caps!(PURE, REDUCTION);

    fn name(&self) -> &'static str {
        "MINA"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let nums = collect_numbers(ctx, args, RefPolicy::Everything)?;
        checked(nums.into_iter().reduce(f64::min).unwrap_or(0.0))
    }
}

#[derive(Debug)]
pub struct MaxAFn;

impl Function for MaxAFn {
    crate::func_caps!(PURE, REDUCTION);

    fn name(&self) -> &'static str {
        "MAXA"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let nums = collect_numbers(ctx, args, RefPolicy::Everything)?;
        checked(nums.into_iter().reduce(f64::max).unwrap_or(0.0))
    }
}

/* ───────────────────── Distribution shape ──────────────────────── */

#[derive(Debug)]
pub struct MedianFn;

impl Function for MedianFn {
    crate::func_caps!(PURE, REDUCTION);

    fn name(&self) -> &'static str {
        "MEDIAN"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let mut nums = collect_numbers(ctx, args, RefPolicy::NumbersOnly)?;
        if nums.is_empty() {
            return Err(ErrorCode::NumOverflow);
        }
        nums.sort_by(f64::total_cmp);
        let mid = nums.len() / 2;
        let m = if nums.len() % 2 == 0 {
            (nums[mid - 1] + nums[mid]) / 2.0
        } else {
            nums[mid]
        };
        checked(m)
    }
}

#[derive(Debug)]
pub struct DevSqFn;

impl Function for DevSqFn {
    crate::func_caps!(PURE, REDUCTION);

    fn name(&self) -> &'static str {
        "DEVSQ"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let nums = collect_numbers(ctx, args, RefPolicy::NumbersOnly)?;
        if nums.is_empty() {
            return Err(ErrorCode::NumOverflow);
        }
        checked(sum_sq_dev(&nums))
    }
}

#[derive(Debug)]
pub struct AveDevFn;

impl Function for AveDevFn {
    crate::func_caps!(PURE, REDUCTION);

    fn name(&self) -> &'static str {
        "AVEDEV"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let nums = collect_numbers(ctx, args, RefPolicy::NumbersOnly)?;
        if nums.is_empty() {
            return Err(ErrorCode::NumOverflow);
        }
        let m = mean(&nums);
        checked(nums.iter().map(|x| (x - m).abs()).sum::<f64>() / nums.len() as f64)
    }
}

#[derive(Debug)]
pub struct SumSqFn;

impl Function for SumSqFn {
    crate::func_caps!(PURE, REDUCTION);

    fn name(&self) -> &'static str {
        "SUMSQ"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let nums = collect_numbers(ctx, args, RefPolicy::NumbersOnly)?;
        checked(nums.iter().map(|x| x * x).sum())
    }
}

/* ───────────────────────── LARGE / SMALL ───────────────────────── */

fn kth(ctx: &dyn FunctionContext, args: &[ValueResult], largest: bool) -> Result<ValueResult, ErrorCode> {
    let mut nums = collect_numbers(ctx, &args[..1], RefPolicy::NumbersOnly)?;
    let k = arg_int(ctx, &args[1])?;
    if k < 1 || k as usize > nums.len() {
        return Err(ErrorCode::NumOverflow);
    }
    nums.sort_by(f64::total_cmp);
    if largest {
        nums.reverse();
    }
    Ok(ValueResult::Number(nums[k as usize - 1]))
}

#[derive(Debug)]
pub struct LargeFn;

impl Function for LargeFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "LARGE"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        kth(ctx, args, true)
    }
}

#[derive(Debug)]
pub struct SmallFn;

impl Function for SmallFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "SMALL"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        kth(ctx, args, false)
    }
}

/* ───────────────────────── COUNTBLANK() ────────────────────────── */

/// Counts empty cells and cells holding `""`. Cells past the used extent
/// are counted without being read.
#[derive(Debug)]
pub struct CountBlankFn;

impl Function for CountBlankFn {
    crate::func_caps!(PURE, REFERENCE_ARGS);

    fn name(&self) -> &'static str {
        "COUNTBLANK"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let area = as_area(&args[0]).ok_or(ErrorCode::InvalidValue)?;
        let mut filled = 0u64;
        visit_area(ctx, &area, |v| {
            let empty = match &v {
                ValueResult::Blank => true,
                ValueResult::Text(s) => s.is_empty(),
                _ => false,
            };
            if !empty {
                filled += 1;
            }
            true
        });
        Ok(ValueResult::Number((total_cells(&area) - filled) as f64))
    }
}

/* ───────────────────────── SUMPRODUCT() ────────────────────────── */

/// Multiplies same-shaped ranges element-wise and sums the products.
/// Non-numeric cells count as 0; any error cell is returned.
#[derive(Debug)]
pub struct SumProductFn;

impl Function for SumProductFn {
    crate::func_caps!(PURE, REDUCTION);

    fn name(&self) -> &'static str {
        "SUMPRODUCT"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        if args.len() == 1 && as_area(&args[0]).is_none() {
            return checked(coerce_to_number(&resolve_here(ctx, &args[0])?)?);
        }
        let mut areas: Vec<AreaRef> = Vec::with_capacity(args.len());
        for arg in args {
            match as_area(arg) {
                Some(a) if a.sheets.is_single() => areas.push(a),
                _ => return Err(arg.as_error().unwrap_or(ErrorCode::InvalidValue)),
            }
        }
        let (h, w) = (areas[0].height(), areas[0].width());
        if areas.iter().any(|a| a.height() != h || a.width() != w) {
            return Err(ErrorCode::InvalidValue);
        }
        for a in &areas {
            ctx.track_area(a);
        }
        let mut total = 0.0;
        for r in 0..h {
            for c in 0..w {
                let mut product = 1.0;
                for a in &areas {
                    match ctx.cell_value(a.sheets.first, a.first_row + r, a.first_col + c) {
                        ValueResult::Number(n) => product *= n,
                        ValueResult::Error(e) => return Err(e),
                        _ => product = 0.0,
                    }
                }
                total += product;
            }
        }
        checked(total)
    }
}

/* ────────────────────────── SUBTOTAL() ─────────────────────────── */

#[derive(Debug)]
pub struct SubtotalFn;

impl Function for SubtotalFn {
    crate::func_caps!(PURE, REDUCTION);

    fn name(&self) -> &'static str {
        "SUBTOTAL"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let code = arg_int(ctx, &args[0])?;
        let reduction = Reduction::from_subtotal_code(code).ok_or(ErrorCode::InvalidValue)?;
        reduction.apply(ctx, &args[1..])
    }
}

pub fn register_builtins(reg: &mut crate::function_registry::FunctionRegistry) {
    crate::register_functions!(reg,
        0 => CountFn,
        4 => SumFn,
        5 => AverageFn,
        6 => MinFn,
        7 => MaxFn,
        12 => StDevFn,
        46 => VarFn,
        169 => CountAFn,
        183 => ProductFn,
        193 => StDevPFn,
        194 => VarPFn,
        227 => MedianFn,
        228 => SumProductFn,
        269 => AveDevFn,
        318 => DevSqFn,
        321 => SumSqFn,
        325 => LargeFn,
        326 => SmallFn,
        344 => SubtotalFn,
        347 => CountBlankFn,
        362 => MaxAFn,
        363 => MinAFn,
    );
}
