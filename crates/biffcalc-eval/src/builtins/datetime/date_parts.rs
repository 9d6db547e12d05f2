//! YEAR, MONTH, DAY, HOUR, MINUTE, SECOND and WEEKDAY

use super::serial::{serial_to_hms, serial_to_ymd, weekday_from_sunday};
use crate::builtins::utils::{arg_number, opt_number};
use crate::function::Function;
use crate::traits::FunctionContext;
use biffcalc_common::{ErrorCode, ValueResult};

macro_rules! part_fn {
    ($ty:ident, $name:literal, $split:ident, |$parts:pat_param| $pick:expr) => {
        #[derive(Debug)]
        pub struct $ty;

        impl Function for $ty {
            crate::func_caps!(PURE);

            fn name(&self) -> &'static str {
                $name
            }

            fn eval(
                &self,
                args: &[ValueResult],
                ctx: &dyn FunctionContext,
            ) -> Result<ValueResult, ErrorCode> {
                let $parts = $split(arg_number(ctx, &args[0])?)?;
                Ok(ValueResult::Number($pick as f64))
            }
        }
    };
}

part_fn!(YearFn, "YEAR", serial_to_ymd, |(y, _, _)| y);
part_fn!(MonthFn, "MONTH", serial_to_ymd, |(_, m, _)| m);
part_fn!(DayFn, "DAY", serial_to_ymd, |(_, _, d)| d);
part_fn!(HourFn, "HOUR", serial_to_hms, |(h, _, _)| h);
part_fn!(MinuteFn, "MINUTE", serial_to_hms, |(_, m, _)| m);
part_fn!(SecondFn, "SECOND", serial_to_hms, |(_, _, s)| s);

/// WEEKDAY(serial, [type]). Type 1: Sunday=1..Saturday=7; type 2:
/// Monday=1..Sunday=7; type 3: Monday=0..Sunday=6.
#[derive(Debug)]
pub struct WeekdayFn;

impl Function for WeekdayFn {
    crate::func_caps!(PURE);

    fn name(&self) -> &'static str {
        "WEEKDAY"
    }

    fn eval(&self, args: &[ValueResult], ctx: &dyn FunctionContext) -> Result<ValueResult, ErrorCode> {
        let from_sunday = weekday_from_sunday(arg_number(ctx, &args[0])?)?;
        let from_monday = (from_sunday + 6) % 7;
        let n = match opt_number(ctx, args, 1, 1.0)?.floor() as i64 {
            1 => from_sunday + 1,
            2 => from_monday + 1,
            3 => from_monday,
            _ => return Err(ErrorCode::NumOverflow),
        };
        Ok(ValueResult::Number(n as f64))
    }
}

pub fn register_builtins(reg: &mut crate::function_registry::FunctionRegistry) {
    crate::register_functions!(reg,
        67 => DayFn,
        68 => MonthFn,
        69 => YearFn,
        70 => WeekdayFn,
        71 => HourFn,
        72 => MinuteFn,
        73 => SecondFn,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::StubContext;

    fn part(f: &dyn Function, serial: f64) -> f64 {
        f.eval(&[serial.into()], &StubContext::default())
            .unwrap()
            .as_number()
            .unwrap()
    }

    #[test]
    fn calendar_parts() {
        // 2008-02-29 18:30:15
        let serial = 39507.0 + (18.0 * 3600.0 + 30.0 * 60.0 + 15.0) / 86400.0;
        assert_eq!(part(&YearFn, serial), 2008.0);
        assert_eq!(part(&MonthFn, serial), 2.0);
        assert_eq!(part(&DayFn, serial), 29.0);
        assert_eq!(part(&HourFn, serial), 18.0);
        assert_eq!(part(&MinuteFn, serial), 30.0);
        assert_eq!(part(&SecondFn, serial), 15.0);
        assert_eq!(part(&DayFn, 60.0), 29.0);
        assert_eq!(part(&DayFn, 0.0), 0.0);
    }

    #[test]
    fn weekday_types() {
        let ctx = StubContext::default();
        // 2008-01-01 was a Tuesday
        let wd = |t: f64| WeekdayFn.eval(&[39448.0.into(), t.into()], &ctx).unwrap().as_number();
        assert_eq!(wd(1.0), Some(3.0));
        assert_eq!(wd(2.0), Some(2.0));
        assert_eq!(wd(3.0), Some(1.0));
        assert_eq!(part(&WeekdayFn, 1.0), 1.0);
        assert_eq!(
            WeekdayFn.eval(&[1.0.into(), 4.0.into()], &ctx).err(),
            Some(ErrorCode::NumOverflow)
        );
    }
}
