//! Stack of formula cells currently being evaluated.
//!
//! Each frame collects the inputs its formula reads. A cell that is asked
//! for while already on the stack is a cycle.

use super::cache::{AreaKey, CellKey};
use rustc_hash::FxHashSet;

/// Inputs gathered while one formula cell was evaluated.
#[derive(Debug, Default)]
pub struct EvaluationFrame {
    pub key: Option<CellKey>,
    pub cells: FxHashSet<CellKey>,
    pub areas: FxHashSet<AreaKey>,
    pub volatile: bool,
}

#[derive(Debug, Default)]
pub struct EvaluationTracker {
    in_progress: FxHashSet<CellKey>,
    frames: Vec<EvaluationFrame>,
}

impl EvaluationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a frame for `key`. Returns false, pushing nothing, if `key`
    /// is already being evaluated.
    pub fn start(&mut self, key: CellKey) -> bool {
        if !self.in_progress.insert(key) {
            return false;
        }
        self.frames.push(EvaluationFrame {
            key: Some(key),
            ..EvaluationFrame::default()
        });
        true
    }

    /// Pops the frame for `key`.
    ///
    /// Frames are strictly nested, so `key` is always the top one; a
    /// mismatch leaves the stack untouched and yields an empty frame.
    pub fn end(&mut self, key: CellKey) -> EvaluationFrame {
        self.in_progress.remove(&key);
        match self.frames.last() {
            Some(top) if top.key == Some(key) => self.frames.pop().unwrap_or_default(),
            _ => {
                #[cfg(feature = "tracing")]
                tracing::error!(?key, "evaluation frames out of order");
                EvaluationFrame::default()
            }
        }
    }

    pub fn is_in_progress(&self, key: &CellKey) -> bool {
        self.in_progress.contains(key)
    }

    /// Number of frames on the stack; 1 while evaluating the outermost cell.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Records a cell read by the innermost formula. No-op with an empty
    /// stack (ad hoc formulas).
    pub fn accept_dependency(&mut self, key: CellKey) {
        if let Some(top) = self.frames.last_mut() {
            top.cells.insert(key);
        }
    }

    pub fn accept_area(&mut self, area: AreaKey) {
        if let Some(top) = self.frames.last_mut() {
            top.areas.insert(area);
        }
    }

    pub fn mark_volatile(&mut self) {
        if let Some(top) = self.frames.last_mut() {
            top.volatile = true;
        }
    }
}
