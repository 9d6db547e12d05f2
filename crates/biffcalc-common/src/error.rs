//! Spreadsheet error codes as evaluation values.
//!
//! Seven of the codes exist in the legacy file format and carry their BIFF
//! byte. The remaining two are synthesized by the evaluator and never reach
//! a file: a cycle detected mid-evaluation and a hole in the function table.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// All error values an evaluation can produce.
///
/// **Note:** names are CamelCase (idiomatic Rust) while `Display`
/// renders them exactly as the spreadsheet shows them (`#DIV/0!`, …).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NullIntersection,
    DivByZero,
    InvalidValue,
    InvalidReference,
    InvalidName,
    NumOverflow,
    NotAvailable,
    CircularReference,
    FunctionNotImplemented,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

impl std::error::Error for ErrorCode {}

impl ErrorCode {
    /// Every code in the order ERROR.TYPE numbers them, engine codes last.
    pub const ALL: [ErrorCode; 9] = [
        ErrorCode::NullIntersection,
        ErrorCode::DivByZero,
        ErrorCode::InvalidValue,
        ErrorCode::InvalidReference,
        ErrorCode::InvalidName,
        ErrorCode::NumOverflow,
        ErrorCode::NotAvailable,
        ErrorCode::CircularReference,
        ErrorCode::FunctionNotImplemented,
    ];

    /// The text a spreadsheet shows for this error.
    pub const fn text(self) -> &'static str {
        match self {
            Self::NullIntersection => "#NULL!",
            Self::DivByZero => "#DIV/0!",
            Self::InvalidValue => "#VALUE!",
            Self::InvalidReference => "#REF!",
            Self::InvalidName => "#NAME?",
            Self::NumOverflow => "#NUM!",
            Self::NotAvailable => "#N/A",
            Self::CircularReference => "~CIRCULAR~REF~",
            Self::FunctionNotImplemented => "~FUNCTION~NOT~IMPLEMENTED~",
        }
    }

    /// Error byte as stored in BIFF records. Engine-only codes use
    /// negative values that no file can contain.
    pub const fn biff_code(self) -> i32 {
        match self {
            Self::NullIntersection => 0x00,
            Self::DivByZero => 0x07,
            Self::InvalidValue => 0x0F,
            Self::InvalidReference => 0x17,
            Self::InvalidName => 0x1D,
            Self::NumOverflow => 0x24,
            Self::NotAvailable => 0x2A,
            Self::CircularReference => -60,
            Self::FunctionNotImplemented => -30,
        }
    }

    pub fn from_biff_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.biff_code() == code)
    }

    /// Parses the display text, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.text().eq_ignore_ascii_case(s))
    }

    /// True for the two codes the file format cannot represent.
    pub const fn is_engine_synthesized(self) -> bool {
        matches!(
            self,
            Self::CircularReference | Self::FunctionNotImplemented
        )
    }
}
