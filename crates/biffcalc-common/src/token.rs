//! Parsed formula tree consumed by the evaluator.
//!
//! The engine never tokenizes text. A host (file reader, formula parser,
//! test fixture) hands it a [`Token`] tree whose shape mirrors the formula:
//! operators own their operands, function calls own their arguments.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

/// Which sheet(s) a reference token points at.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SheetTarget {
    /// The sheet holding the formula.
    Current,
    Named(String),
    /// 3-D reference: every sheet from `first` to `last` in workbook order.
    Span { first: String, last: String },
}

/// Rectangle bounds with optional edges. `None` means open-ended, so
/// `A:A` has no row bounds and `3:3` has no column bounds.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AreaBounds {
    pub first_row: Option<u32>,
    pub first_col: Option<u32>,
    pub last_row: Option<u32>,
    pub last_col: Option<u32>,
}

impl AreaBounds {
    pub const fn new(first_row: u32, first_col: u32, last_row: u32, last_col: u32) -> Self {
        Self {
            first_row: Some(first_row),
            first_col: Some(first_col),
            last_row: Some(last_row),
            last_col: Some(last_col),
        }
    }

    /// Whole columns `first..=last`.
    pub const fn columns(first: u32, last: u32) -> Self {
        Self {
            first_row: None,
            first_col: Some(first),
            last_row: None,
            last_col: Some(last),
        }
    }

    /// Whole rows `first..=last`.
    pub const fn rows(first: u32, last: u32) -> Self {
        Self {
            first_row: Some(first),
            first_col: None,
            last_row: Some(last),
            last_col: None,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Plus,
    Minus,
    /// Postfix `%`.
    Percent,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// `:` between two references.
    Range,
    /// The space operator.
    Intersect,
}

impl BinaryOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
            BinaryOp::Concat => "&",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Range => ":",
            BinaryOp::Intersect => " ",
        }
    }

    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

/// One node of a parsed formula.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(ErrorCode),
    /// An argument slot left empty, as in `IF(A1,,2)`.
    MissingArg,
    Ref {
        sheet: SheetTarget,
        row: u32,
        col: u32,
    },
    Area {
        sheet: SheetTarget,
        bounds: AreaBounds,
    },
    /// A reference whose target was deleted; always `#REF!`.
    RefError,
    /// A workbook-defined name.
    Name(String),
    Unary {
        op: UnaryOp,
        operand: Box<Token>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Token>,
        right: Box<Token>,
    },
    /// Function call by table index. The two indirection indices take the
    /// real function's name as their first argument.
    Func {
        index: u16,
        args: Vec<Token>,
    },
    Paren(Box<Token>),
}

impl Token {
    /// Reference to a cell on the formula's own sheet.
    pub const fn cell(row: u32, col: u32) -> Self {
        Token::Ref {
            sheet: SheetTarget::Current,
            row,
            col,
        }
    }

    /// Area on the formula's own sheet.
    pub const fn area(bounds: AreaBounds) -> Self {
        Token::Area {
            sheet: SheetTarget::Current,
            bounds,
        }
    }

    pub fn text<S: Into<String>>(s: S) -> Self {
        Token::Text(s.into())
    }

    pub fn unary(op: UnaryOp, operand: Token) -> Self {
        Token::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, left: Token, right: Token) -> Self {
        Token::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn func(index: u16, args: Vec<Token>) -> Self {
        Token::Func { index, args }
    }

    /// Visits this token and every descendant, parents first.
    pub fn walk<F: FnMut(&Token)>(&self, f: &mut F) {
        f(self);
        match self {
            Token::Unary { operand, .. } | Token::Paren(operand) => operand.walk(f),
            Token::Binary { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            Token::Func { args, .. } => args.iter().for_each(|a| a.walk(f)),
            _ => {}
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Text(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            Token::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Token::Error(e) => write!(f, "{e}"),
            Token::MissingArg => Ok(()),
            Token::Ref { sheet, row, col } => {
                write_sheet(f, sheet)?;
                write!(f, "{}{}", crate::address::column_to_letters(*col), row + 1)
            }
            Token::Area { sheet, bounds } => {
                write_sheet(f, sheet)?;
                write_bound(f, bounds.first_row, bounds.first_col)?;
                f.write_str(":")?;
                write_bound(f, bounds.last_row, bounds.last_col)
            }
            Token::RefError => f.write_str("#REF!"),
            Token::Name(n) => f.write_str(n),
            Token::Unary { op, operand } => match op {
                UnaryOp::Plus => write!(f, "+{operand}"),
                UnaryOp::Minus => write!(f, "-{operand}"),
                UnaryOp::Percent => write!(f, "{operand}%"),
            },
            Token::Binary { op, left, right } => write!(f, "{left}{}{right}", op.symbol()),
            Token::Func { index, args } => {
                write!(f, "FN{index}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{a}")?;
                }
                f.write_str(")")
            }
            Token::Paren(inner) => write!(f, "({inner})"),
        }
    }
}

fn write_sheet(f: &mut fmt::Formatter<'_>, sheet: &SheetTarget) -> fmt::Result {
    match sheet {
        SheetTarget::Current => Ok(()),
        SheetTarget::Named(n) => write!(f, "{n}!"),
        SheetTarget::Span { first, last } => write!(f, "{first}:{last}!"),
    }
}

fn write_bound(f: &mut fmt::Formatter<'_>, row: Option<u32>, col: Option<u32>) -> fmt::Result {
    if let Some(c) = col {
        f.write_str(&crate::address::column_to_letters(c))?;
    }
    if let Some(r) = row {
        write!(f, "{}", r + 1)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_reads_like_a_formula() {
        let t = Token::binary(
            BinaryOp::Add,
            Token::cell(0, 0),
            Token::func(
                4,
                vec![Token::area(AreaBounds::new(0, 1, 9, 1)), Token::MissingArg],
            ),
        );
        assert_eq!(t.to_string(), "A1+FN4(B1:B10,)");
        assert_eq!(Token::area(AreaBounds::columns(2, 3)).to_string(), "C:D");
        assert_eq!(Token::text("a\"b").to_string(), "\"a\"\"b\"");
    }

    #[test]
    fn walk_visits_all_nodes() {
        let t = Token::unary(
            UnaryOp::Minus,
            Token::Paren(Box::new(Token::binary(
                BinaryOp::Mul,
                Token::Number(2.0),
                Token::Name("rate".into()),
            ))),
        );
        let mut count = 0;
        t.walk(&mut |_| count += 1);
        assert_eq!(count, 5);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn token_tree_serializes() {
        let t = Token::binary(
            BinaryOp::Add,
            Token::cell(0, 0),
            Token::func(4, vec![Token::area(AreaBounds::columns(0, 1)), Token::MissingArg]),
        );
        let json = serde_json::to_string(&t).unwrap();
        let back: Token = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
