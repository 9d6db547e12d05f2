//! Resolved cell and area references.
//!
//! These are the payloads of `ValueResult::SingleRef` and `ValueResult::Area`.
//! Everything here is pure geometry: rows and columns are 0-based, sheets are
//! workbook indices, and bounds are always normalized so `first <= last`.
//! Fetching the values behind a reference is the evaluator's job.

use std::fmt;
use std::ops::RangeInclusive;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::address::column_to_letters;
use crate::error::ErrorCode;
use crate::token::AreaBounds;

/// Grid size of a workbook format. Whole-row and whole-column references
/// are clamped to these bounds when they are resolved.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridLimits {
    pub max_row: u32,
    pub max_col: u32,
}

impl GridLimits {
    /// BIFF8: 65 536 rows by 256 columns.
    pub const BIFF8: GridLimits = GridLimits {
        max_row: 0xFFFF,
        max_col: 0xFF,
    };

    pub const fn new(max_row: u32, max_col: u32) -> Self {
        Self { max_row, max_col }
    }

    pub fn contains(&self, row: i64, col: i64) -> bool {
        (0..=self.max_row as i64).contains(&row) && (0..=self.max_col as i64).contains(&col)
    }
}

impl Default for GridLimits {
    fn default() -> Self {
        Self::BIFF8
    }
}

/// Inclusive run of sheet indices. A plain reference has `first == last`;
/// a 3-D reference such as `Sheet1:Sheet3!A1` spans several.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SheetSpan {
    pub first: usize,
    pub last: usize,
}

impl SheetSpan {
    pub const fn single(sheet: usize) -> Self {
        Self {
            first: sheet,
            last: sheet,
        }
    }

    pub fn new(a: usize, b: usize) -> Self {
        Self {
            first: a.min(b),
            last: a.max(b),
        }
    }

    pub const fn is_single(&self) -> bool {
        self.first == self.last
    }

    pub fn contains(&self, sheet: usize) -> bool {
        (self.first..=self.last).contains(&sheet)
    }

    pub fn sheets(&self) -> RangeInclusive<usize> {
        self.first..=self.last
    }

    pub const fn count(&self) -> usize {
        self.last - self.first + 1
    }
}

/// A single resolved cell.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub sheets: SheetSpan,
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub const fn new(sheet: usize, row: u32, col: u32) -> Self {
        Self {
            sheets: SheetSpan::single(sheet),
            row,
            col,
        }
    }

    pub const fn with_span(sheets: SheetSpan, row: u32, col: u32) -> Self {
        Self { sheets, row, col }
    }

    /// The same cell viewed as a 1×1 area.
    pub const fn as_area(&self) -> AreaRef {
        AreaRef {
            sheets: self.sheets,
            first_row: self.row,
            first_col: self.col,
            last_row: self.row,
            last_col: self.col,
        }
    }

    /// See [`AreaRef::offset`].
    pub fn offset(
        &self,
        dr_first: i64,
        dr_last: i64,
        dc_first: i64,
        dc_last: i64,
        limits: GridLimits,
    ) -> Result<AreaRef, ErrorCode> {
        self.as_area()
            .offset(dr_first, dr_last, dc_first, dc_last, limits)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_sheets(f, &self.sheets)?;
        write!(f, "{}{}", column_to_letters(self.col), self.row + 1)
    }
}

/// A normalized rectangular range, possibly spanning several sheets.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AreaRef {
    pub sheets: SheetSpan,
    pub first_row: u32,
    pub first_col: u32,
    pub last_row: u32,
    pub last_col: u32,
}

impl AreaRef {
    /// Builds an area from two corners in any order.
    pub fn new(sheets: SheetSpan, row_a: u32, col_a: u32, row_b: u32, col_b: u32) -> Self {
        Self {
            sheets,
            first_row: row_a.min(row_b),
            first_col: col_a.min(col_b),
            last_row: row_a.max(row_b),
            last_col: col_a.max(col_b),
        }
    }

    /// Resolves possibly open-ended token bounds. A missing start becomes 0
    /// and a missing end becomes the grid maximum, so `A:A` covers every row.
    pub fn from_bounds(sheets: SheetSpan, bounds: &AreaBounds, limits: GridLimits) -> Self {
        let r1 = bounds.first_row.unwrap_or(0).min(limits.max_row);
        let c1 = bounds.first_col.unwrap_or(0).min(limits.max_col);
        let r2 = bounds.last_row.unwrap_or(limits.max_row).min(limits.max_row);
        let c2 = bounds.last_col.unwrap_or(limits.max_col).min(limits.max_col);
        Self::new(sheets, r1, c1, r2, c2)
    }

    pub const fn height(&self) -> u32 {
        self.last_row - self.first_row + 1
    }

    pub const fn width(&self) -> u32 {
        self.last_col - self.first_col + 1
    }

    /// Number of cells on each sheet of the span.
    pub const fn cell_count(&self) -> u64 {
        self.height() as u64 * self.width() as u64
    }

    /// True when the area is exactly one row tall.
    pub const fn is_row(&self) -> bool {
        self.first_row == self.last_row
    }

    /// True when the area is exactly one column wide.
    pub const fn is_column(&self) -> bool {
        self.first_col == self.last_col
    }

    pub const fn is_single_cell(&self) -> bool {
        self.is_row() && self.is_column()
    }

    pub const fn contains_row(&self, row: u32) -> bool {
        row >= self.first_row && row <= self.last_row
    }

    pub const fn contains_column(&self, col: u32) -> bool {
        col >= self.first_col && col <= self.last_col
    }

    pub fn contains(&self, sheet: usize, row: u32, col: u32) -> bool {
        self.sheets.contains(sheet) && self.contains_row(row) && self.contains_column(col)
    }

    pub const fn top_left(&self) -> CellRef {
        CellRef::with_span(self.sheets, self.first_row, self.first_col)
    }

    /// Shifts each edge independently: `dr_first` moves the top edge,
    /// `dr_last` the bottom edge, and likewise for columns. Edges that cross
    /// are re-ordered. Landing outside the grid is `#REF!`.
    pub fn offset(
        &self,
        dr_first: i64,
        dr_last: i64,
        dc_first: i64,
        dc_last: i64,
        limits: GridLimits,
    ) -> Result<AreaRef, ErrorCode> {
        let edge = |base: u32, delta: i64| (base as i64).checked_add(delta);
        let (Some(r1), Some(r2), Some(c1), Some(c2)) = (
            edge(self.first_row, dr_first),
            edge(self.last_row, dr_last),
            edge(self.first_col, dc_first),
            edge(self.last_col, dc_last),
        ) else {
            return Err(ErrorCode::InvalidReference);
        };
        if !limits.contains(r1, c1) || !limits.contains(r2, c2) {
            return Err(ErrorCode::InvalidReference);
        }
        Ok(Self::new(self.sheets, r1 as u32, c1 as u32, r2 as u32, c2 as u32))
    }

    /// Common cells of two areas on the same sheets, if any.
    pub fn intersect(&self, other: &AreaRef) -> Option<AreaRef> {
        if self.sheets != other.sheets {
            return None;
        }
        let first_row = self.first_row.max(other.first_row);
        let last_row = self.last_row.min(other.last_row);
        let first_col = self.first_col.max(other.first_col);
        let last_col = self.last_col.min(other.last_col);
        (first_row <= last_row && first_col <= last_col).then_some(AreaRef {
            sheets: self.sheets,
            first_row,
            first_col,
            last_row,
            last_col,
        })
    }

    /// Smallest area covering both inputs; `None` across different sheets.
    pub fn bounding(&self, other: &AreaRef) -> Option<AreaRef> {
        if self.sheets != other.sheets {
            return None;
        }
        Some(AreaRef {
            sheets: self.sheets,
            first_row: self.first_row.min(other.first_row),
            first_col: self.first_col.min(other.first_col),
            last_row: self.last_row.max(other.last_row),
            last_col: self.last_col.max(other.last_col),
        })
    }

    /// Clips the area to rows/columns `0..=last_row`, `0..=last_col`.
    pub fn clip(&self, last_row: u32, last_col: u32) -> Option<AreaRef> {
        if self.first_row > last_row || self.first_col > last_col {
            return None;
        }
        Some(AreaRef {
            last_row: self.last_row.min(last_row),
            last_col: self.last_col.min(last_col),
            ..*self
        })
    }
}

impl fmt::Display for AreaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_sheets(f, &self.sheets)?;
        write!(
            f,
            "{}{}:{}{}",
            column_to_letters(self.first_col),
            self.first_row + 1,
            column_to_letters(self.last_col),
            self.last_row + 1
        )
    }
}

fn write_sheets(f: &mut fmt::Formatter<'_>, sheets: &SheetSpan) -> fmt::Result {
    if sheets.is_single() {
        write!(f, "[{}]!", sheets.first)
    } else {
        write!(f, "[{}:{}]!", sheets.first, sheets.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a1_b2() -> AreaRef {
        AreaRef::new(SheetSpan::single(0), 0, 0, 1, 1)
    }

    #[test]
    fn offset_moves_each_edge() {
        let moved = a1_b2().offset(1, 1, 1, 1, GridLimits::BIFF8).unwrap();
        assert_eq!((moved.first_row, moved.first_col), (1, 1));
        assert_eq!((moved.last_row, moved.last_col), (2, 2));
        assert_eq!(moved.sheets, SheetSpan::single(0));
    }

    #[test]
    fn offset_off_grid_is_ref_error() {
        assert_eq!(
            a1_b2().offset(-1, 0, 0, 0, GridLimits::BIFF8),
            Err(ErrorCode::InvalidReference)
        );
        assert_eq!(
            a1_b2().offset(0, 0, 0, 255, GridLimits::BIFF8),
            Err(ErrorCode::InvalidReference)
        );
        assert_eq!(
            a1_b2().offset(i64::MAX, i64::MAX, 0, 0, GridLimits::BIFF8),
            Err(ErrorCode::InvalidReference)
        );
    }

    #[test]
    fn crossing_edges_are_reordered() {
        let flipped = a1_b2().offset(3, 0, 0, 0, GridLimits::BIFF8).unwrap();
        assert_eq!((flipped.first_row, flipped.last_row), (1, 3));
    }

    #[test]
    fn open_bounds_resolve_to_grid_edges() {
        let whole_col = AreaBounds {
            first_row: None,
            first_col: Some(2),
            last_row: None,
            last_col: Some(2),
        };
        let area = AreaRef::from_bounds(SheetSpan::single(0), &whole_col, GridLimits::BIFF8);
        assert_eq!(area.first_row, 0);
        assert_eq!(area.last_row, 0xFFFF);
        assert!(area.is_column());
        assert!(!area.is_row());
    }

    #[test]
    fn intersection_and_bounding_box() {
        let a = AreaRef::new(SheetSpan::single(0), 0, 0, 4, 1);
        let b = AreaRef::new(SheetSpan::single(0), 2, 1, 6, 3);
        let i = a.intersect(&b).unwrap();
        assert_eq!((i.first_row, i.first_col, i.last_row, i.last_col), (2, 1, 4, 1));
        let u = a.bounding(&b).unwrap();
        assert_eq!((u.first_row, u.first_col, u.last_row, u.last_col), (0, 0, 6, 3));

        let c = AreaRef::new(SheetSpan::single(0), 10, 10, 11, 11);
        assert!(a.intersect(&c).is_none());
        let other_sheet = AreaRef::new(SheetSpan::single(1), 0, 0, 4, 1);
        assert!(a.bounding(&other_sheet).is_none());
    }

    #[test]
    fn display_uses_a1_notation() {
        assert_eq!(a1_b2().to_string(), "[0]!A1:B2");
        assert_eq!(CellRef::new(2, 9, 27).to_string(), "[2]!AB10");
    }
}
