use std::cell::RefCell;
use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rustc_hash::{FxHashSet, FxHashMap};
use smallvec::SmallVec;

use super::cache::{CellKey, EvaluationCache};
use super::context::OperationContext;
use super::listener::EvaluationListener;
use super::metrics::CacheMetrics;
use super::tracker::EvaluationTracker;
use super::{EngineError, EvalConfig};
use crate::coercion::{coerce_to_boolean, coerce_to_int, resolve_here, resolve_single};
use crate::function_metadata::{
    FUNCTION_INDEX_CHOOSE, FUNCTION_INDEX_EXTERNAL, FUNCTION_INDEX_IF, FUNCTION_INDEX_USER_DEFINED,
};
use crate::function_registry::FunctionRegistry;
use crate::operators;
use crate::traits::{CellType, DefinedName, EvaluationWorkbook, FunctionContext};
use biffcalc_common::{AreaRef, CellRef, ErrorCode, SheetSpan, SheetTarget, Token, ValueResult};

/// Evaluates formula cells of one workbook, memoizing results until the
/// cells they read are reported changed.
///
/// The evaluator is single-threaded: interior state lives in `RefCell`s, so
/// it can move between threads but not be shared by them.
pub struct WorkbookEvaluator<W: EvaluationWorkbook> {
    workbook: W,
    registry: Arc<FunctionRegistry>,
    config: EvalConfig,
    cache: RefCell<EvaluationCache>,
    tracker: RefCell<EvaluationTracker>,
    metrics: CacheMetrics,
    listener: Option<Arc<dyn EvaluationListener>>,
    rng: RefCell<SmallRng>,
    /// First hard failure of the current `evaluate` call.
    fault: RefCell<Option<EngineError>>,
    /// Defined names being expanded, per sheet, to stop self-reference.
    names_in_progress: RefCell<FxHashSet<(usize, String)>>,
}

impl<W: EvaluationWorkbook> WorkbookEvaluator<W> {
    pub fn new(workbook: W, registry: Arc<FunctionRegistry>, config: EvalConfig) -> Self {
        let seed = config.rng_seed.unwrap_or_else(|| {
            config
                .clock
                .now()
                .and_utc()
                .timestamp_nanos_opt()
                .unwrap_or(0) as u64
        });
        Self {
            workbook,
            registry,
            config,
            cache: RefCell::new(EvaluationCache::new()),
            tracker: RefCell::new(EvaluationTracker::new()),
            metrics: CacheMetrics::new(),
            listener: None,
            rng: RefCell::new(SmallRng::seed_from_u64(seed)),
            fault: RefCell::new(None),
            names_in_progress: RefCell::new(FxHashSet::default()),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn EvaluationListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn workbook(&self) -> &W {
        &self.workbook
    }

    /// Mutable access for edits. Every edit must be followed by
    /// `notify_cell_changed` or `notify_cell_deleted`.
    pub fn workbook_mut(&mut self) -> &mut W {
        &mut self.workbook
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Number of formula results currently cached.
    pub fn cached_formula_count(&self) -> usize {
        self.cache.borrow().len()
    }

    /* ───────────────────────────── Public API ──────────────────────────── */

    /// Value of the cell at (`sheet`, `row`, `col`).
    ///
    /// Always a scalar: a reference result is dereferenced at the cell, and
    /// blank becomes 0. Spreadsheet errors are values; `Err` means the
    /// formula or the function table is inconsistent with the workbook.
    pub fn evaluate(&self, sheet: usize, row: u32, col: u32) -> Result<ValueResult, EngineError> {
        if sheet >= self.workbook.sheet_count() {
            return Err(EngineError::SheetIndexOutOfRange(sheet));
        }
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("evaluate", sheet, row, col).entered();

        self.fault.borrow_mut().take();
        let result = self.read_cell(CellKey::new(sheet, row, col));
        if let Some(fault) = self.fault.borrow_mut().take() {
            return Err(fault);
        }
        Ok(match result? {
            ValueResult::Blank | ValueResult::MissingArgument => ValueResult::ZERO,
            v => v,
        })
    }

    /// Evaluates `formula` as if it sat at (`sheet`, `row`, `col`). The
    /// result itself is not cached, but cells it reads are.
    pub fn evaluate_formula(
        &self,
        sheet: usize,
        row: u32,
        col: u32,
        formula: &Token,
    ) -> Result<ValueResult, EngineError> {
        if sheet >= self.workbook.sheet_count() {
            return Err(EngineError::SheetIndexOutOfRange(sheet));
        }
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("evaluate_formula", sheet, row, col).entered();

        self.fault.borrow_mut().take();
        let ctx = OperationContext::new(self, sheet, row, col);
        let result = self.eval_token(formula, &ctx).map(|v| Self::to_cell_value(&ctx, v));
        if let Some(fault) = self.fault.borrow_mut().take() {
            return Err(fault);
        }
        result
    }

    /// Tells the cache that the cell at (`sheet`, `row`, `col`) was set or
    /// changed. Formulas that read it, directly or through an area, are
    /// marked stale, transitively.
    pub fn notify_cell_changed(&self, sheet: usize, row: u32, col: u32) {
        let key = CellKey::new(sheet, row, col);
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("notify_cell_changed", sheet, row, col).entered();

        if self.workbook.cell_type(sheet, row, col) == CellType::Formula {
            let cleared = {
                let mut cache = self.cache.borrow_mut();
                cache.forget_plain(&key);
                cache.mark_dirty(&key) || cache.has_formula_entry(&key)
            };
            if cleared {
                self.notify(|l| l.on_clear_cached_value(key));
            }
        } else {
            let value = self.workbook.literal_value(sheet, row, col);
            let removed_formula = {
                let mut cache = self.cache.borrow_mut();
                let removed = cache.remove(&key);
                let unchanged = !removed
                    && cache
                        .plain_value(&key)
                        .is_some_and(|prev| prev.same_literal(&value));
                if unchanged {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("value unchanged, dependents kept");
                    return;
                }
                cache.refresh_plain(key, value);
                removed
            };
            if removed_formula {
                self.notify(|l| l.on_clear_cached_value(key));
            }
        }
        self.invalidate_dependents(key);
    }

    /// Tells the cache that the cell is gone. Its own entry is dropped and
    /// its readers are marked stale.
    pub fn notify_cell_deleted(&self, sheet: usize, row: u32, col: u32) {
        let key = CellKey::new(sheet, row, col);
        let removed = {
            let mut cache = self.cache.borrow_mut();
            cache.forget_plain(&key);
            cache.remove(&key)
        };
        if removed {
            self.notify(|l| l.on_clear_cached_value(key));
        }
        self.invalidate_dependents(key);
    }

    pub fn clear_all_cached_values(&self) {
        self.cache.borrow_mut().clear();
        #[cfg(feature = "tracing")]
        tracing::debug!("cache cleared");
        self.notify(|l| l.on_clear_whole_cache());
    }

    /* ──────────────────────── Crate-internal hooks ─────────────────────── */

    pub(crate) fn tracker(&self) -> &RefCell<EvaluationTracker> {
        &self.tracker
    }

    pub(crate) fn has_fault(&self) -> bool {
        self.fault.borrow().is_some()
    }

    /// Keeps the first failure; later ones are consequences of it.
    pub(crate) fn latch_fault(&self, err: EngineError) {
        let mut fault = self.fault.borrow_mut();
        if fault.is_none() {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %err, "evaluation aborted");
            *fault = Some(err);
        }
    }

    pub(crate) fn next_random(&self) -> f64 {
        self.rng.borrow_mut().r#gen::<f64>()
    }

    /// Value of one cell as a formula input: formula cells are evaluated or
    /// served from cache, plain cells read and snapshotted.
    pub(crate) fn read_cell(&self, key: CellKey) -> Result<ValueResult, EngineError> {
        self.tracker.borrow_mut().accept_dependency(key);
        if self.workbook.cell_type(key.sheet, key.row, key.col) == CellType::Formula {
            return self.formula_value(key);
        }
        let value = self.workbook.literal_value(key.sheet, key.row, key.col);
        if self.tracker.borrow().depth() > 0 {
            self.cache.borrow_mut().record_plain(key, value.clone());
        }
        self.notify(|l| l.on_read_plain_value(key, &value));
        Ok(value)
    }

    /// Expands a defined name in the caller's context.
    pub(crate) fn eval_name(
        &self,
        name: &str,
        ctx: &OperationContext<'_, W>,
    ) -> Result<ValueResult, EngineError> {
        let sheet = ctx.sheet_index();
        let token = match self.workbook.defined_name(name, sheet) {
            Some(DefinedName::Formula(token)) => token,
            // a function name is only callable, and unknown names are #NAME?
            Some(DefinedName::Function) | None => return Ok(ValueResult::Error(ErrorCode::InvalidName)),
        };
        let guard = (sheet, name.to_ascii_uppercase());
        if !self.names_in_progress.borrow_mut().insert(guard.clone()) {
            return Ok(ValueResult::Error(ErrorCode::CircularReference));
        }
        let result = self.eval_token(token, ctx);
        self.names_in_progress.borrow_mut().remove(&guard);
        result
    }

    /* ────────────────────────── Formula cells ──────────────────────────── */

    fn formula_value(&self, key: CellKey) -> Result<ValueResult, EngineError> {
        let cached = self.cache.borrow().cached_value(&key).cloned();
        if let Some(value) = cached {
            self.metrics.record_hit();
            #[cfg(feature = "tracing")]
            tracing::trace!(?key, "cache hit");
            self.notify(|l| l.on_cache_hit(key, &value));
            return Ok(value);
        }

        let tokens = self
            .workbook
            .formula_tokens(key.sheet, key.row, key.col)
            .ok_or(EngineError::InvalidCell {
                sheet: key.sheet,
                row: key.row,
                col: key.col,
            })?;
        if !self.tracker.borrow_mut().start(key) {
            #[cfg(feature = "tracing")]
            tracing::debug!(?key, "circular reference");
            return Ok(ValueResult::Error(ErrorCode::CircularReference));
        }
        let depth = self.tracker.borrow().depth();
        self.metrics.record_miss();
        self.notify(|l| l.on_start_evaluate(key));

        let ctx = OperationContext::new(self, key.sheet, key.row, key.col);
        let outcome = self
            .eval_token(tokens, &ctx)
            .map(|v| Self::to_cell_value(&ctx, v));
        let frame = self.tracker.borrow_mut().end(key);

        let value = outcome?;
        if let Some(fault) = self.fault.borrow().clone() {
            return Err(fault);
        }

        // Inner members of a cycle would cache an answer that depends on
        // where the cycle was entered.
        let inner_cycle = depth > 1 && value.as_error() == Some(ErrorCode::CircularReference);
        let volatile_skip = frame.volatile && !self.config.cache_volatile_results;
        let keep = (!inner_cycle && !volatile_skip).then(|| value.clone());
        self.cache
            .borrow_mut()
            .store(key, keep, frame.cells, frame.areas);
        if frame.volatile {
            self.tracker.borrow_mut().mark_volatile();
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(?key, value = ?value, "evaluated");
        self.notify(|l| l.on_end_evaluate(key, &value));
        Ok(value)
    }

    /// Final value of a formula: references are read at the formula's own
    /// cell, and blank becomes 0.
    fn to_cell_value(ctx: &OperationContext<'_, W>, value: ValueResult) -> ValueResult {
        match resolve_single(ctx, &value, ctx.row_index(), ctx.column_index()) {
            Ok(ValueResult::Blank | ValueResult::MissingArgument) => ValueResult::ZERO,
            Ok(v) => v,
            Err(e) => ValueResult::Error(e),
        }
    }

    /* ──────────────────────────── Token walk ───────────────────────────── */

    fn eval_token(&self, token: &Token, ctx: &OperationContext<'_, W>) -> Result<ValueResult, EngineError> {
        Ok(match token {
            Token::Number(n) => ValueResult::Number(*n),
            Token::Text(s) => ValueResult::Text(s.clone()),
            Token::Boolean(b) => ValueResult::Boolean(*b),
            Token::Error(e) => ValueResult::Error(*e),
            Token::MissingArg => ValueResult::MissingArgument,
            Token::RefError => ValueResult::Error(ErrorCode::InvalidReference),
            Token::Ref { sheet, row, col } => {
                let span = self.sheet_span(sheet, ctx.sheet_index())?;
                ValueResult::SingleRef(CellRef::with_span(span, *row, *col))
            }
            Token::Area { sheet, bounds } => {
                let span = self.sheet_span(sheet, ctx.sheet_index())?;
                ValueResult::Area(AreaRef::from_bounds(span, bounds, ctx.limits()))
            }
            Token::Name(name) => self.eval_name(name, ctx)?,
            Token::Paren(inner) => self.eval_token(inner, ctx)?,
            Token::Unary { op, operand } => {
                let v = self.eval_token(operand, ctx)?;
                operators::unary(ctx, *op, &v)
            }
            Token::Binary { op, left, right } => {
                let l = self.eval_token(left, ctx)?;
                let r = self.eval_token(right, ctx)?;
                operators::apply_binary(ctx, *op, &l, &r)
            }
            Token::Func { index, args } => self.eval_call(*index, args, ctx)?,
        })
    }

    fn sheet_span(&self, target: &SheetTarget, current: usize) -> Result<SheetSpan, EngineError> {
        let lookup = |name: &String| {
            self.workbook
                .sheet_index_by_name(name)
                .ok_or_else(|| EngineError::UnknownSheet(name.clone()))
        };
        Ok(match target {
            SheetTarget::Current => SheetSpan::single(current),
            SheetTarget::Named(name) => SheetSpan::single(lookup(name)?),
            SheetTarget::Span { first, last } => SheetSpan::new(lookup(first)?, lookup(last)?),
        })
    }

    fn eval_call(
        &self,
        index: u16,
        args: &[Token],
        ctx: &OperationContext<'_, W>,
    ) -> Result<ValueResult, EngineError> {
        match index {
            FUNCTION_INDEX_IF => return self.eval_if(args, ctx),
            FUNCTION_INDEX_CHOOSE => return self.eval_choose(args, ctx),
            _ => {}
        }
        let mut values: SmallVec<[ValueResult; 4]> = SmallVec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let v = match arg {
                // the indirection indices name their target in a leading name token
                Token::Name(name)
                    if i == 0
                        && matches!(index, FUNCTION_INDEX_EXTERNAL | FUNCTION_INDEX_USER_DEFINED) =>
                {
                    ValueResult::Text(name.clone())
                }
                _ => self.eval_token(arg, ctx)?,
            };
            values.push(v);
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(index, argc = values.len(), "call");
        self.registry.dispatch(index, &values, ctx)
    }

    /// `IF(cond, then, [else])`; only the chosen branch is evaluated.
    fn eval_if(&self, args: &[Token], ctx: &OperationContext<'_, W>) -> Result<ValueResult, EngineError> {
        if !(2..=3).contains(&args.len()) {
            return Ok(ValueResult::Error(ErrorCode::InvalidValue));
        }
        let cond = self.eval_token(&args[0], ctx)?;
        let chosen = match resolve_here(ctx, &cond).and_then(|v| coerce_to_boolean(&v, false)) {
            Ok(b) => b.unwrap_or(false),
            Err(e) => return Ok(ValueResult::Error(e)),
        };
        match (chosen, args.get(2)) {
            (true, _) => self.eval_token(&args[1], ctx),
            (false, Some(otherwise)) => self.eval_token(otherwise, ctx),
            (false, None) => Ok(ValueResult::Boolean(false)),
        }
    }

    /// `CHOOSE(index, v1, ...)`; only the selected value is evaluated.
    fn eval_choose(&self, args: &[Token], ctx: &OperationContext<'_, W>) -> Result<ValueResult, EngineError> {
        if args.len() < 2 {
            return Ok(ValueResult::Error(ErrorCode::InvalidValue));
        }
        let selector = self.eval_token(&args[0], ctx)?;
        let i = match resolve_here(ctx, &selector).and_then(|v| coerce_to_int(&v)) {
            Ok(i) => i,
            Err(e) => return Ok(ValueResult::Error(e)),
        };
        if i < 1 || i as usize >= args.len() {
            return Ok(ValueResult::Error(ErrorCode::InvalidValue));
        }
        self.eval_token(&args[i as usize], ctx)
    }

    /* ─────────────────────────── Invalidation ──────────────────────────── */

    /// Marks every transitive reader of `origin` stale.
    fn invalidate_dependents(&self, origin: CellKey) {
        let mut visited: FxHashMap<CellKey, usize> = FxHashMap::default();
        let mut frontier = vec![origin];
        let mut depth = 0;
        while !frontier.is_empty() {
            depth += 1;
            let mut next = Vec::new();
            for key in frontier {
                let readers = self.cache.borrow().consumers_of(&key);
                for reader in readers {
                    if visited.contains_key(&reader) {
                        continue;
                    }
                    visited.insert(reader, depth);
                    if self.cache.borrow_mut().mark_dirty(&reader) {
                        #[cfg(feature = "tracing")]
                        tracing::trace!(?reader, depth, "dependent cleared");
                        self.notify(|l| l.on_clear_dependent_cached_value(reader, depth));
                    }
                    next.push(reader);
                }
            }
            frontier = next;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(?origin, cleared = visited.len(), "invalidated dependents");
    }

    fn notify(&self, f: impl FnOnce(&dyn EvaluationListener)) {
        if let Some(listener) = &self.listener {
            f(listener.as_ref());
        }
    }
}
