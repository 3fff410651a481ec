//! Match records produced by day scans
//!
//! Two record types share one trait: [`ScanRecord`] is the lightweight form
//! kept by continuously re-triggered live searches, [`FullRecord`] carries
//! calendar labels and backtest outcome fields for manual searches. The type
//! is picked once per search through the generic parameter of the pools.

use crate::day::DayHistory;

/// Time distance reported for records of different days
pub const FAR_APART: usize = usize::MAX;

/// Which query a match was scored against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Polarity {
    /// The straight query shape
    Positive,
    /// The mirror ("nemesis") shape
    Negative,
}

/// Everything a scan knows about one admitted offset
#[derive(Debug, Clone, Copy)]
pub struct Hit<'a> {
    pub history: &'a DayHistory,
    pub day: usize,
    pub sample_time_spot: usize,
    pub trade_time_spot: usize,
    pub time_unit: usize,
    pub similarity: f64,
    /// Matched window norm over query norm
    pub scale_factor: f64,
    pub last_low: f64,
    pub last_high: f64,
}

/// Common surface of retained matches
pub trait MatchRecord: Clone {
    fn from_hit(hit: &Hit<'_>) -> Self;
    fn similarity(&self) -> f64;
    fn day(&self) -> usize;
    fn trade_time_spot(&self) -> usize;

    /// Elementary units between two trade spots, [`FAR_APART`] across days
    #[inline]
    fn time_distance(&self, other: &Self) -> usize {
        if self.day() != other.day() {
            return FAR_APART;
        }
        self.trade_time_spot().abs_diff(other.trade_time_spot())
    }

    /// Position on the archive timeline
    #[inline]
    fn timeline_key(&self) -> (usize, usize) {
        (self.day(), self.trade_time_spot())
    }
}

/// Sort by descending similarity
pub fn sort_by_similarity<R: MatchRecord>(records: &mut [R]) {
    records.sort_by(|a, b| b.similarity().total_cmp(&a.similarity()));
}

// ============================================================
// OUTCOME
// ============================================================

/// Which side of a trade would have reached its target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Outcome {
    BuyOnly,
    SellOnly,
    Either,
    #[default]
    Neither,
}

impl Outcome {
    pub fn classify(best_buy: f64, best_sell: f64, target: f64) -> Self {
        match (best_buy >= target, best_sell >= target) {
            (true, true) => Outcome::Either,
            (true, false) => Outcome::BuyOnly,
            (false, true) => Outcome::SellOnly,
            (false, false) => Outcome::Neither,
        }
    }
}

// ============================================================
// RECORDS
// ============================================================

/// Lightweight record of live searches
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScanRecord {
    pub day: usize,
    pub trade_time_spot: usize,
    pub similarity: f64,
    pub scale_factor: f64,
    pub last_low: f64,
    pub last_high: f64,
    /// Best long gain in query units, after a study
    pub best_buy: f64,
    /// Best short gain in query units, after a study
    pub best_sell: f64,
}

impl MatchRecord for ScanRecord {
    fn from_hit(hit: &Hit<'_>) -> Self {
        Self {
            day: hit.day,
            trade_time_spot: hit.trade_time_spot,
            similarity: hit.similarity,
            scale_factor: hit.scale_factor,
            last_low: hit.last_low,
            last_high: hit.last_high,
            best_buy: 0.0,
            best_sell: 0.0,
        }
    }

    #[inline]
    fn similarity(&self) -> f64 {
        self.similarity
    }

    #[inline]
    fn day(&self) -> usize {
        self.day
    }

    #[inline]
    fn trade_time_spot(&self) -> usize {
        self.trade_time_spot
    }
}

/// Record of manual searches with calendar labels and backtest outcome
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FullRecord {
    pub date: String,
    pub time: String,
    pub day: usize,
    pub sample_time_spot: usize,
    pub trade_time_spot: usize,
    pub time_unit: usize,
    pub similarity: f64,
    pub scale_factor: f64,
    pub last_low: f64,
    pub last_high: f64,
    pub best_buy_profit: f64,
    pub best_sell_profit: f64,
    pub outcome: Outcome,
}

impl MatchRecord for FullRecord {
    fn from_hit(hit: &Hit<'_>) -> Self {
        Self {
            date: hit.history.label().to_owned(),
            time: hit.history.time_label(hit.trade_time_spot),
            day: hit.day,
            sample_time_spot: hit.sample_time_spot,
            trade_time_spot: hit.trade_time_spot,
            time_unit: hit.time_unit,
            similarity: hit.similarity,
            scale_factor: hit.scale_factor,
            last_low: hit.last_low,
            last_high: hit.last_high,
            best_buy_profit: 0.0,
            best_sell_profit: 0.0,
            outcome: Outcome::Neither,
        }
    }

    #[inline]
    fn similarity(&self) -> f64 {
        self.similarity
    }

    #[inline]
    fn day(&self) -> usize {
        self.day
    }

    #[inline]
    fn trade_time_spot(&self) -> usize {
        self.trade_time_spot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(day: usize, trade_time_spot: usize, similarity: f64) -> ScanRecord {
        ScanRecord {
            day,
            trade_time_spot,
            similarity,
            scale_factor: 1.0,
            last_low: 0.0,
            last_high: 0.0,
            best_buy: 0.0,
            best_sell: 0.0,
        }
    }

    #[test]
    fn test_time_distance() {
        let a = record(0, 10, 0.9);
        assert_eq!(a.time_distance(&record(0, 14, 0.5)), 4);
        assert_eq!(record(0, 14, 0.5).time_distance(&a), 4);
        assert_eq!(a.time_distance(&record(1, 10, 0.5)), FAR_APART);
    }

    #[test]
    fn test_sort_by_similarity() {
        let mut records = vec![record(0, 1, 0.5), record(0, 2, 0.9), record(0, 3, 0.7)];
        sort_by_similarity(&mut records);
        let order: Vec<_> = records.iter().map(|r| r.trade_time_spot).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn test_outcome_classify() {
        assert_eq!(Outcome::classify(2.0, 2.0, 1.0), Outcome::Either);
        assert_eq!(Outcome::classify(2.0, 0.5, 1.0), Outcome::BuyOnly);
        assert_eq!(Outcome::classify(0.5, 1.0, 1.0), Outcome::SellOnly);
        assert_eq!(Outcome::classify(0.5, 0.5, 1.0), Outcome::Neither);
    }

    #[test]
    fn test_full_record_from_hit() {
        let mut history = DayHistory::new("Tue 04 Jun");
        for _ in 0..390 {
            history.ingest(1.0, 2.0);
        }
        let hit = Hit {
            history: &history,
            day: 3,
            sample_time_spot: 30,
            trade_time_spot: 60,
            time_unit: 1,
            similarity: 0.97,
            scale_factor: 1.5,
            last_low: 1.0,
            last_high: 2.0,
        };
        let full = FullRecord::from_hit(&hit);
        assert_eq!(full.date, "Tue 04 Jun");
        // one hour into a 15:30 session
        assert_eq!(full.time, "16:30:00");
        assert_eq!(full.timeline_key(), (3, 60));
        assert_eq!(full.outcome, Outcome::Neither);

        let scan = ScanRecord::from_hit(&hit);
        assert_eq!(scan.similarity, 0.97);
        assert_eq!(scan.scale_factor, 1.5);
    }
}
