//! Search orchestration over an archive of days
//!
//! The [`Archive`] owns every [`DayHistory`] and two independent result sets:
//! one of [`FullRecord`]s for manual searches and one of [`ScanRecord`]s for
//! a continuously re-triggered live search. A search clears only the set it
//! targets, so a live refresh never disturbs a manual result being studied.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::config::SearchConfig;
use crate::day::{DayHistory, Probe};
use crate::index::ScanPosition;
use crate::pattern::{Coefficients, NormalizedPattern};
use crate::pool::{CandidatePool, GraduatePool};
use crate::record::{sort_by_similarity, FullRecord, MatchRecord, Outcome, Polarity, ScanRecord};
use crate::{Bar, LowHigh, Period, Result, ScalarError};

/// Result set a search writes into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum Target {
    /// Full records, studied with take-profit and stop-loss
    #[default]
    Manual,
    /// Lightweight records of the live feed
    Live,
}

// ============================================================
// RESULT SET
// ============================================================

/// Sorted matches of the last search into one target
#[derive(Debug, Clone)]
pub struct ResultSet<R> {
    positives: Vec<R>,
    negatives: Vec<R>,
    best_seen: Option<f64>,
}

impl<R> Default for ResultSet<R> {
    fn default() -> Self {
        Self {
            positives: Vec::new(),
            negatives: Vec::new(),
            best_seen: None,
        }
    }
}

impl<R: MatchRecord> ResultSet<R> {
    /// Straight matches, best first
    #[inline]
    pub fn positives(&self) -> &[R] {
        &self.positives
    }

    /// Mirror matches, best first
    #[inline]
    pub fn negatives(&self) -> &[R] {
        &self.negatives
    }

    pub fn side(&self, polarity: Polarity) -> &[R] {
        match polarity {
            Polarity::Positive => &self.positives,
            Polarity::Negative => &self.negatives,
        }
    }

    pub fn get(&self, polarity: Polarity, index: usize) -> Option<&R> {
        self.side(polarity).get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positives.len() + self.negatives.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest score seen by the last graduate search, admitted or not
    #[inline]
    pub fn best_seen(&self) -> Option<f64> {
        self.best_seen
    }

    /// Lowest retained similarity across both sides
    pub fn worst_similarity(&self) -> Option<f64> {
        let tails = [self.positives.last(), self.negatives.last()];
        tails
            .into_iter()
            .flatten()
            .map(MatchRecord::similarity)
            .reduce(f64::min)
    }

    /// Highest retained similarity, or the best seen by a graduate search
    pub fn best_similarity(&self) -> Option<f64> {
        let heads = [self.positives.first(), self.negatives.first()];
        let retained = heads
            .into_iter()
            .flatten()
            .map(MatchRecord::similarity)
            .reduce(f64::max);
        match (self.best_seen, retained) {
            (Some(seen), Some(kept)) => Some(seen.max(kept)),
            (seen, kept) => seen.or(kept),
        }
    }

    fn clear(&mut self) {
        self.positives.clear();
        self.negatives.clear();
        self.best_seen = None;
    }

    fn sort(&mut self) {
        sort_by_similarity(&mut self.positives);
        sort_by_similarity(&mut self.negatives);
    }

    fn summarize(&self, pass: Pass) -> SearchSummary {
        SearchSummary {
            days_scanned: pass.days_scanned,
            cancelled: pass.cancelled,
            positives: self.positives.len(),
            negatives: self.negatives.len(),
            worst_similarity: self.worst_similarity(),
            best_similarity: self.best_similarity(),
        }
    }
}

/// Outcome of one search invocation
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct SearchSummary {
    pub days_scanned: usize,
    /// Stopped early through a [`CancelHandle`]; results are partial but sorted
    pub cancelled: bool,
    pub positives: usize,
    pub negatives: usize,
    pub worst_similarity: Option<f64>,
    pub best_similarity: Option<f64>,
}

/// Progress of a day loop
#[derive(Debug, Clone, Copy, Default)]
struct Pass {
    days_scanned: usize,
    cancelled: bool,
}

// ============================================================
// CANCELLATION
// ============================================================

/// Stops a running search between two days. Cloneable across threads.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ============================================================
// ARCHIVE
// ============================================================

/// Every loaded day plus the result sets of the last searches
#[derive(Debug, Default)]
pub struct Archive {
    days: Vec<DayHistory>,
    manual: ResultSet<FullRecord>,
    live: ResultSet<ScanRecord>,
    /// Weights every cached pattern and query is built with
    coefficients: Coefficients,
    cancel: CancelHandle,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a day after checking every bar
    pub fn push_day(&mut self, day: DayHistory) -> Result<()> {
        for (i, bar) in day.bars().iter().enumerate() {
            bar.validate().map_err(|e| match e {
                ScalarError::InvalidBar { reason, .. } => {
                    ScalarError::InvalidBar { index: i, reason }
                }
                other => other,
            })?;
        }
        tracing::debug!(day = %day.label(), bars = day.len(), "day loaded");
        self.days.push(day);
        Ok(())
    }

    #[inline]
    pub fn days(&self) -> &[DayHistory] {
        &self.days
    }

    pub fn day(&self, id: usize) -> Result<&DayHistory> {
        self.days.get(id).ok_or(ScalarError::UnknownDay(id))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.days.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Handle that can stop searches from another thread
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    #[inline]
    pub fn manual(&self) -> &ResultSet<FullRecord> {
        &self.manual
    }

    #[inline]
    pub fn live(&self) -> &ResultSet<ScanRecord> {
        &self.live
    }

    /// Coefficients of the last prepared shape
    #[inline]
    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }

    /// Bring the shared coefficients in line with `config`
    fn update_coefficients(&mut self, config: &SearchConfig) {
        let shape = &config.shape;
        if self
            .coefficients
            .update(shape.first_coefficient.get(), shape.candlesticks.get())
        {
            tracing::debug!(
                candlesticks = shape.candlesticks.get(),
                first = shape.first_coefficient.get(),
                "coefficients updated"
            );
        }
    }

    /// Bring every day's pattern cache in line with `config`. Days already
    /// built for the same shape are left alone.
    pub fn prepare(&mut self, config: &SearchConfig) {
        self.update_coefficients(config);
        let shape = config.shape;
        let coefficients = &self.coefficients;
        let rebuilt = self
            .days
            .par_iter_mut()
            .map(|day| day.rebuild(&shape, coefficients))
            .filter(|&rebuilt| rebuilt)
            .count();
        tracing::debug!(rebuilt, days = self.days.len(), "archive prepared");
    }

    // ===========================================
    // SEARCHES
    // ===========================================

    /// Keep the `candidates` best matches of `query` across all days.
    ///
    /// The query pattern is built from the trailing bars of `query`. A flat
    /// query fails with [`ScalarError::FlatWindow`] before any result is
    /// touched.
    pub fn search_best<T: LowHigh>(
        &mut self,
        query: &[T],
        config: &SearchConfig,
        candidates: Period,
        position: ScanPosition,
        target: Target,
    ) -> Result<SearchSummary> {
        let straight = self.begin(query, config)?;
        let mirror = config.use_mirror.then(|| straight.mirror());
        let probe = Probe {
            straight: &straight,
            mirror: mirror.as_ref(),
            coefficients: &self.coefficients,
            scope: config.scope,
            position,
        };

        let capacity = candidates.get();
        let distance = config.diversity_distance();
        let summary = match target {
            Target::Manual => best_into(
                &self.days,
                &mut self.manual,
                &probe,
                capacity,
                distance,
                &self.cancel,
            ),
            Target::Live => best_into(
                &self.days,
                &mut self.live,
                &probe,
                capacity,
                distance,
                &self.cancel,
            ),
        };

        tracing::info!(
            mode = "best",
            ?target,
            days = summary.days_scanned,
            positives = summary.positives,
            negatives = summary.negatives,
            worst = ?summary.worst_similarity,
            "search finished"
        );
        Ok(summary)
    }

    /// Keep every match of `query` scoring at least `threshold`.
    ///
    /// The best score seen is reported even when nothing qualifies.
    pub fn search_graduates<T: LowHigh>(
        &mut self,
        query: &[T],
        config: &SearchConfig,
        threshold: f64,
        position: ScanPosition,
        target: Target,
    ) -> Result<SearchSummary> {
        if threshold.is_nan() {
            return Err(ScalarError::InvalidValue("threshold is NaN"));
        }
        let straight = self.begin(query, config)?;
        let mirror = config.use_mirror.then(|| straight.mirror());
        let probe = Probe {
            straight: &straight,
            mirror: mirror.as_ref(),
            coefficients: &self.coefficients,
            scope: config.scope,
            position,
        };

        let distance = config.diversity_distance();
        let summary = match target {
            Target::Manual => graduates_into(
                &self.days,
                &mut self.manual,
                &probe,
                threshold,
                distance,
                &self.cancel,
            ),
            Target::Live => graduates_into(
                &self.days,
                &mut self.live,
                &probe,
                threshold,
                distance,
                &self.cancel,
            ),
        };

        tracing::info!(
            mode = "graduates",
            ?target,
            threshold,
            days = summary.days_scanned,
            positives = summary.positives,
            negatives = summary.negatives,
            best = ?summary.best_similarity,
            "search finished"
        );
        Ok(summary)
    }

    /// Validate, build the query pattern, prepare the days and arm cancellation
    fn begin<T: LowHigh>(
        &mut self,
        query: &[T],
        config: &SearchConfig,
    ) -> Result<NormalizedPattern> {
        config.validate()?;

        let need = config.query_len();
        if query.len() < need {
            return Err(ScalarError::InsufficientData {
                need,
                got: query.len(),
            });
        }
        let window = &query[query.len() - need..];

        self.update_coefficients(config);
        let built = NormalizedPattern::build(window, config.query_time_unit(), &self.coefficients);
        let straight = match built {
            Err(ScalarError::FlatWindow) => {
                tracing::warn!(bars = need, "query window is flat, search aborted");
                return Err(ScalarError::FlatWindow);
            }
            other => other?,
        };

        self.prepare(config);
        self.cancel.reset();
        Ok(straight)
    }

    // ===========================================
    // STUDIES
    // ===========================================

    /// Backtest manual matches: targets are scaled by each record's factor,
    /// longs enter at the last high and shorts at the last low.
    pub fn study_manual(&mut self, take_profit: f64, stop_loss: f64) -> Result<()> {
        let days = &self.days;
        let manual = &mut self.manual;
        for record in manual.positives.iter_mut().chain(manual.negatives.iter_mut()) {
            let day = days.get(record.day).ok_or(ScalarError::UnknownDay(record.day))?;
            let target = record.scale_factor * take_profit;
            let stop = record.scale_factor * stop_loss;
            let spot = record.trade_time_spot;

            record.best_buy_profit = day.forward_best_long(spot, record.last_high, stop);
            record.best_sell_profit = day.forward_best_short(spot, record.last_low, stop);
            record.outcome =
                Outcome::classify(record.best_buy_profit, record.best_sell_profit, target);
        }
        Ok(())
    }

    /// Best forward gains of live matches, in query price units
    pub fn study_live(&mut self, stop_loss: f64) -> Result<()> {
        let days = &self.days;
        let live = &mut self.live;
        for record in live.positives.iter_mut().chain(live.negatives.iter_mut()) {
            let day = days.get(record.day).ok_or(ScalarError::UnknownDay(record.day))?;
            let factor = record.scale_factor;
            let stop = factor * stop_loss;
            let spot = record.trade_time_spot;

            record.best_buy = day.forward_best_long(spot, record.last_high, stop) / factor;
            record.best_sell = day.forward_best_short(spot, record.last_low, stop) / factor;
        }
        Ok(())
    }

    /// Candlesticks of a manual match, running 20% past the trade spot when
    /// the day has room for it
    pub fn window_candles(&self, polarity: Polarity, index: usize) -> Option<Vec<Bar>> {
        let record = self.manual.get(polarity, index)?;
        let day = self.days.get(record.day)?;

        let time_unit = record.time_unit.max(1);
        let count = (record.trade_time_spot - record.sample_time_spot) / time_unit;
        let extended = count * 6 / 5;
        let drawn = if record.sample_time_spot + extended * time_unit < day.len() {
            extended
        } else {
            count
        };
        Some(day.candlesticks(record.sample_time_spot, time_unit, drawn))
    }
}

// ============================================================
// DAY LOOPS
// ============================================================

fn best_into<R: MatchRecord>(
    days: &[DayHistory],
    results: &mut ResultSet<R>,
    probe: &Probe<'_>,
    capacity: usize,
    distance: usize,
    cancel: &CancelHandle,
) -> SearchSummary {
    results.clear();
    let mut pass = Pass::default();
    {
        let mut pool = CandidatePool::new(
            &mut results.positives,
            &mut results.negatives,
            capacity,
            distance,
        );
        for (id, day) in days.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!(day = id, "search cancelled");
                pass.cancelled = true;
                break;
            }
            day.scan(probe, id, &mut pool);
            pass.days_scanned += 1;
        }
    }
    results.sort();
    results.summarize(pass)
}

fn graduates_into<R: MatchRecord>(
    days: &[DayHistory],
    results: &mut ResultSet<R>,
    probe: &Probe<'_>,
    threshold: f64,
    distance: usize,
    cancel: &CancelHandle,
) -> SearchSummary {
    results.clear();
    let mut pass = Pass::default();
    let mut best = 0.0_f64;
    {
        let mut pool = GraduatePool::new(
            &mut results.positives,
            &mut results.negatives,
            distance,
            threshold,
        );
        for (id, day) in days.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!(day = id, "search cancelled");
                pass.cancelled = true;
                break;
            }
            best = best.max(day.scan_threshold(probe, id, &mut pool));
            pass.days_scanned += 1;
        }
    }
    results.best_seen = Some(best);
    results.sort();
    results.summarize(pass)
}
