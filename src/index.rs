//! Offset ranges worth scanning within one day

use std::ops::Range;

/// Where "now" sits in the trading session
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub enum ScanPosition {
    /// Not a live position: scan every offset of the day
    #[default]
    Offline,
    /// Fraction of the session elapsed, in `[0, 1]`; anything else (or NaN)
    /// scans like [`Offline`](Self::Offline)
    Live(f64),
}

impl ScanPosition {
    /// Values outside `[0, 1]` (or NaN) mean offline
    pub fn from_fraction(now: f64) -> Self {
        if (0.0..=1.0).contains(&now) {
            Self::Live(now)
        } else {
            Self::Offline
        }
    }
}

/// Sizes of one day needed to place a scan window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayIndex {
    /// Derived patterns of the day
    pub pattern_count: usize,
    /// Elementary bars of the day
    pub day_len: usize,
}

impl DayIndex {
    pub fn new(pattern_count: usize, day_len: usize) -> Self {
        Self {
            pattern_count,
            day_len,
        }
    }

    /// Start offsets to score.
    ///
    /// Live searches only look at patterns that conclude within `scope`
    /// elementary units of the same time of day as the query.
    pub fn range(&self, position: ScanPosition, scope: usize, window: usize) -> Range<usize> {
        match position {
            ScanPosition::Offline => 0..self.pattern_count,
            ScanPosition::Live(now) if !(0.0..=1.0).contains(&now) => 0..self.pattern_count,
            ScanPosition::Live(now) => {
                let real_spot = (now * self.day_len as f64).floor() as usize;
                let final_spot = real_spot.saturating_sub(window);
                let end = final_spot.saturating_add(scope).min(self.pattern_count);
                let start = final_spot.saturating_sub(scope).min(end);
                start..end
            }
        }
    }
}
