//! A1-style address helpers shared by the evaluator and its test fixtures.
//!
//! Only the pieces the engine needs at runtime live here: column letters,
//! cell/row/column parts, and `Sheet!Part:Part` references as used by
//! INDIRECT. Parsing whole formulas is a separate concern.

use std::error::Error;
use std::fmt;

use crate::token::AreaBounds;

/// Reasons a textual reference failed to parse.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum A1ParseError {
    Empty,
    /// Part is neither a cell, a bare column, nor a bare row.
    BadPart(String),
    /// Row number 0 or column letters past `u32` range.
    OutOfRange(String),
    /// The two sides of `:` are of different kinds (`A1:B`).
    MixedKinds,
    /// A quoted sheet name was not closed.
    UnterminatedQuote,
}

impl fmt::Display for A1ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            A1ParseError::Empty => write!(f, "empty reference"),
            A1ParseError::BadPart(p) => write!(f, "'{p}' is not a cell, row or column"),
            A1ParseError::OutOfRange(p) => write!(f, "'{p}' is outside the addressable grid"),
            A1ParseError::MixedKinds => write!(f, "both sides of ':' must be the same kind"),
            A1ParseError::UnterminatedQuote => write!(f, "unterminated quoted sheet name"),
        }
    }
}

impl Error for A1ParseError {}

/// One side of an A1 reference.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum A1Part {
    Cell { row: u32, col: u32 },
    Column(u32),
    Row(u32),
}

/// A parsed `[Sheet!]part[:part]` reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct A1Reference {
    pub sheet: Option<String>,
    pub first: A1Part,
    pub last: Option<A1Part>,
}

impl A1Reference {
    /// Bounds suitable for `AreaRef::from_bounds`; `None` for a lone row or
    /// column, which is not a valid reference by itself.
    pub fn bounds(&self) -> Option<AreaBounds> {
        let last = self.last.unwrap_or(self.first);
        match (self.first, last) {
            (A1Part::Cell { row: r1, col: c1 }, A1Part::Cell { row: r2, col: c2 }) => {
                Some(AreaBounds::new(r1, c1, r2, c2))
            }
            (A1Part::Column(c1), A1Part::Column(c2)) if self.last.is_some() => {
                Some(AreaBounds::columns(c1, c2))
            }
            (A1Part::Row(r1), A1Part::Row(r2)) if self.last.is_some() => {
                Some(AreaBounds::rows(r1, r2))
            }
            _ => None,
        }
    }

    pub fn is_single_cell(&self) -> bool {
        matches!(self.first, A1Part::Cell { .. }) && self.last.is_none()
    }
}

/// 0-based column index to letters (`0 -> "A"`, `27 -> "AB"`).
pub fn column_to_letters(mut col: u32) -> String {
    let mut buf = Vec::new();
    loop {
        let rem = (col % 26) as u8;
        buf.push(b'A' + rem);
        col /= 26;
        if col == 0 {
            break;
        }
        col -= 1;
    }
    buf.reverse();
    buf.into_iter().map(char::from).collect()
}

/// Letters to a 0-based column index. Case-insensitive.
pub fn letters_to_column(s: &str) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for ch in s.bytes() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let val = (ch.to_ascii_uppercase() - b'A') as u32 + 1;
        col = col.checked_mul(26)?.checked_add(val)?;
    }
    Some(col - 1)
}

/// Parses one side of a reference: `$B$7`, `B`, or `7`. Dollar signs are
/// accepted and ignored.
pub fn parse_a1_part(text: &str) -> Result<A1Part, A1ParseError> {
    let s: String = text.trim().chars().filter(|c| *c != '$').collect();
    if s.is_empty() {
        return Err(A1ParseError::Empty);
    }
    let split = s
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(s.len());
    let (letters, digits) = s.split_at(split);
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(A1ParseError::BadPart(text.to_string()));
    }
    let col = if letters.is_empty() {
        None
    } else {
        Some(letters_to_column(letters).ok_or_else(|| A1ParseError::BadPart(text.to_string()))?)
    };
    let row = if digits.is_empty() {
        None
    } else {
        let n: u32 = digits
            .parse()
            .map_err(|_| A1ParseError::OutOfRange(text.to_string()))?;
        if n == 0 {
            return Err(A1ParseError::OutOfRange(text.to_string()));
        }
        Some(n - 1)
    };
    match (row, col) {
        (Some(row), Some(col)) => Ok(A1Part::Cell { row, col }),
        (None, Some(col)) => Ok(A1Part::Column(col)),
        (Some(row), None) => Ok(A1Part::Row(row)),
        (None, None) => Err(A1ParseError::BadPart(text.to_string())),
    }
}

/// Parses a cell address such as `C12` into `(row, col)`, 0-based.
pub fn parse_a1_cell(text: &str) -> Result<(u32, u32), A1ParseError> {
    match parse_a1_part(text)? {
        A1Part::Cell { row, col } => Ok((row, col)),
        _ => Err(A1ParseError::BadPart(text.to_string())),
    }
}

/// Parses `Sheet1!A1`, `'My Sheet'!A1:B4`, `C:C`, `3:5` and friends.
pub fn parse_a1_reference(text: &str) -> Result<A1Reference, A1ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(A1ParseError::Empty);
    }
    let (sheet, rest) = split_sheet(text)?;
    let (first, last) = match rest.split_once(':') {
        Some((a, b)) => {
            let a = parse_a1_part(a)?;
            let b = parse_a1_part(b)?;
            if std::mem::discriminant(&a) != std::mem::discriminant(&b) {
                return Err(A1ParseError::MixedKinds);
            }
            (a, Some(b))
        }
        None => (parse_a1_part(rest)?, None),
    };
    Ok(A1Reference { sheet, first, last })
}

fn split_sheet(text: &str) -> Result<(Option<String>, &str), A1ParseError> {
    if let Some(quoted) = text.strip_prefix('\'') {
        // '' inside a quoted name is an escaped quote
        let mut name = String::new();
        let mut chars = quoted.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c == '\'' {
                if matches!(chars.peek(), Some((_, '\''))) {
                    name.push('\'');
                    chars.next();
                    continue;
                }
                let rest = quoted[i + 1..]
                    .strip_prefix('!')
                    .ok_or_else(|| A1ParseError::BadPart(text.to_string()))?;
                return Ok((Some(name), rest));
            }
            name.push(c);
        }
        return Err(A1ParseError::UnterminatedQuote);
    }
    match text.rsplit_once('!') {
        Some((sheet, rest)) => Ok((Some(sheet.to_string()), rest)),
        None => Ok((None, text)),
    }
}
