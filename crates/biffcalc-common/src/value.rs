use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::reference::{AreaRef, CellRef};

/// The value of any evaluated expression.
///
/// References stay unresolved until a consumer needs a scalar, which lets
/// functions such as ROWS or OFFSET see the shape rather than the contents.
///
/// There is deliberately no `PartialEq`: spreadsheet comparison has its own
/// cross-kind ordering (see `operators::compare`) and structural equality
/// would silently disagree with it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub enum ValueResult {
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(ErrorCode),
    /// An empty cell. Not zero and not `""`, although it coerces to both.
    Blank,
    /// An omitted function argument.
    MissingArgument,
    SingleRef(CellRef),
    Area(AreaRef),
}

impl ValueResult {
    pub const ZERO: ValueResult = ValueResult::Number(0.0);

    pub const fn is_error(&self) -> bool {
        matches!(self, ValueResult::Error(_))
    }

    pub const fn is_blank(&self) -> bool {
        matches!(self, ValueResult::Blank)
    }

    pub const fn is_missing(&self) -> bool {
        matches!(self, ValueResult::MissingArgument)
    }

    pub const fn is_reference(&self) -> bool {
        matches!(self, ValueResult::SingleRef(_) | ValueResult::Area(_))
    }

    pub const fn as_number(&self) -> Option<f64> {
        match self {
            ValueResult::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ValueResult::Text(s) => Some(s),
            _ => None,
        }
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            ValueResult::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub const fn as_error(&self) -> Option<ErrorCode> {
        match self {
            ValueResult::Error(e) => Some(*e),
            _ => None,
        }
    }

    pub const fn as_cell_ref(&self) -> Option<&CellRef> {
        match self {
            ValueResult::SingleRef(r) => Some(r),
            _ => None,
        }
    }

    pub const fn as_area(&self) -> Option<&AreaRef> {
        match self {
            ValueResult::Area(a) => Some(a),
            _ => None,
        }
    }

    /// Short kind name for logs and diagnostics.
    pub const fn type_name(&self) -> &'static str {
        match self {
            ValueResult::Number(_) => "number",
            ValueResult::Text(_) => "text",
            ValueResult::Boolean(_) => "boolean",
            ValueResult::Error(_) => "error",
            ValueResult::Blank => "blank",
            ValueResult::MissingArgument => "missing",
            ValueResult::SingleRef(_) => "ref",
            ValueResult::Area(_) => "area",
        }
    }

    /// Identity of two *literal* values, used to detect redundant cell
    /// updates. Numbers compare bitwise and text case-sensitively; this is
    /// not the spreadsheet `=` operator.
    pub fn same_literal(&self, other: &ValueResult) -> bool {
        match (self, other) {
            (ValueResult::Number(a), ValueResult::Number(b)) => a.to_bits() == b.to_bits(),
            (ValueResult::Text(a), ValueResult::Text(b)) => a == b,
            (ValueResult::Boolean(a), ValueResult::Boolean(b)) => a == b,
            (ValueResult::Error(a), ValueResult::Error(b)) => a == b,
            (ValueResult::Blank, ValueResult::Blank) => true,
            _ => false,
        }
    }
}

impl From<f64> for ValueResult {
    fn from(n: f64) -> Self {
        ValueResult::Number(n)
    }
}

impl From<bool> for ValueResult {
    fn from(b: bool) -> Self {
        ValueResult::Boolean(b)
    }
}

impl From<&str> for ValueResult {
    fn from(s: &str) -> Self {
        ValueResult::Text(s.to_string())
    }
}

impl From<String> for ValueResult {
    fn from(s: String) -> Self {
        ValueResult::Text(s)
    }
}

impl From<ErrorCode> for ValueResult {
    fn from(e: ErrorCode) -> Self {
        ValueResult::Error(e)
    }
}

impl fmt::Display for ValueResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueResult::Number(n) => write!(f, "{n}"),
            ValueResult::Text(s) => write!(f, "\"{s}\""),
            ValueResult::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            ValueResult::Error(e) => write!(f, "{e}"),
            ValueResult::Blank => f.write_str("#BLANK#"),
            ValueResult::MissingArgument => f.write_str("#MISSING#"),
            ValueResult::SingleRef(r) => write!(f, "{r}"),
            ValueResult::Area(a) => write!(f, "{a}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_match_variants() {
        assert_eq!(ValueResult::Number(2.5).as_number(), Some(2.5));
        assert_eq!(ValueResult::from("x").as_text(), Some("x"));
        assert_eq!(ValueResult::Boolean(true).as_bool(), Some(true));
        assert_eq!(
            ValueResult::Error(ErrorCode::NotAvailable).as_error(),
            Some(ErrorCode::NotAvailable)
        );
        assert!(ValueResult::Blank.is_blank());
        assert!(!ValueResult::MissingArgument.is_blank());
        assert!(ValueResult::SingleRef(CellRef::new(0, 0, 0)).is_reference());
    }

    #[test]
    fn same_literal_is_bitwise_for_numbers() {
        assert!(ValueResult::Number(1.0).same_literal(&ValueResult::Number(1.0)));
        assert!(!ValueResult::Number(0.0).same_literal(&ValueResult::Number(-0.0)));
        assert!(!ValueResult::from("a").same_literal(&ValueResult::from("A")));
        assert!(!ValueResult::Blank.same_literal(&ValueResult::from("")));
    }
}
