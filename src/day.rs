//! One trading day: elementary bars plus their derived pattern cache

use crate::config::PatternShape;
use crate::index::{DayIndex, ScanPosition};
use crate::pattern::{aggregate, Coefficients, NormalizedPattern};
use crate::pool::{CandidatePool, GraduatePool};
use crate::record::{Hit, MatchRecord, Polarity};
use crate::Bar;

/// Seconds in a regular session
const SESSION_SECONDS: usize = 23_400;

/// Expected bars per day (one per session second)
const DAY_CAPACITY: usize = SESSION_SECONDS;

/// Query side of a day scan
#[derive(Debug, Clone, Copy)]
pub struct Probe<'a> {
    pub straight: &'a NormalizedPattern,
    /// Mirror shape, scored alongside the straight one when present
    pub mirror: Option<&'a NormalizedPattern>,
    pub coefficients: &'a Coefficients,
    /// Live half-width in elementary units
    pub scope: usize,
    pub position: ScanPosition,
}

/// Winning polarity at one offset
#[derive(Debug, Clone, Copy)]
struct Scored<'a> {
    offset: usize,
    pattern: &'a NormalizedPattern,
    polarity: Polarity,
    similarity: f64,
}

/// Bars of one day and the normalized patterns derived from them
#[derive(Debug, Clone)]
pub struct DayHistory {
    label: String,
    bars: Vec<Bar>,
    patterns: Vec<NormalizedPattern>,
    shape: Option<PatternShape>,
}

impl DayHistory {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            bars: Vec::with_capacity(DAY_CAPACITY),
            patterns: Vec::new(),
            shape: None,
        }
    }

    /// Append one elementary bar. The pattern cache is dropped until the
    /// next rebuild.
    pub fn ingest(&mut self, low: f64, high: f64) {
        self.bars.push(Bar::new(low, high));
        self.patterns.clear();
        self.shape = None;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Derived patterns, one per start offset in `[0, len - window)`
    #[inline]
    pub fn patterns(&self) -> &[NormalizedPattern] {
        &self.patterns
    }

    /// Shape the cache was last built for
    #[inline]
    pub fn shape(&self) -> Option<&PatternShape> {
        self.shape.as_ref()
    }

    /// Recompute the pattern cache for `shape`.
    ///
    /// Returns false when the cache already matches. A day shorter than one
    /// window ends up with no patterns.
    pub fn rebuild(&mut self, shape: &PatternShape, coefficients: &Coefficients) -> bool {
        if self.shape.as_ref() == Some(shape) {
            tracing::debug!(day = %self.label, "pattern cache up to date");
            return false;
        }
        debug_assert_eq!(coefficients.len(), shape.candlesticks.get());

        let window = shape.window();
        let time_unit = shape.time_unit.get();
        self.shape = Some(*shape);
        self.patterns.clear();

        if self.bars.len() >= window {
            let limit = self.bars.len() - window;
            self.patterns.reserve(limit);
            for start in 0..limit {
                self.patterns.push(NormalizedPattern::compute(
                    &self.bars[start..start + window],
                    time_unit,
                    coefficients,
                ));
            }
        }

        tracing::debug!(
            day = %self.label,
            patterns = self.patterns.len(),
            "rebuilt pattern cache"
        );
        true
    }

    // ============================================================
    // SCANS
    // ============================================================

    fn window(&self) -> usize {
        self.shape.map_or(0, |shape| shape.window())
    }

    /// Score every offset of the scan range, skipping flat windows.
    /// The straight score wins ties against the mirror score.
    fn scored<'a>(&'a self, probe: &'a Probe<'a>) -> impl Iterator<Item = Scored<'a>> + 'a {
        let range = DayIndex::new(self.patterns.len(), self.bars.len()).range(
            probe.position,
            probe.scope,
            self.window(),
        );

        self.patterns[range.clone()]
            .iter()
            .zip(range)
            .filter(|(pattern, _)| !pattern.is_flat())
            .map(move |(pattern, offset)| {
                let straight = probe.straight.similarity(pattern, probe.coefficients);
                let (polarity, similarity) = match probe.mirror {
                    Some(mirror) => {
                        let reflected = mirror.similarity(pattern, probe.coefficients);
                        if straight >= reflected {
                            (Polarity::Positive, straight)
                        } else {
                            (Polarity::Negative, reflected)
                        }
                    }
                    None => (Polarity::Positive, straight),
                };
                Scored {
                    offset,
                    pattern,
                    polarity,
                    similarity,
                }
            })
    }

    fn hit<'a>(&'a self, probe: &Probe<'_>, day: usize, scored: &Scored<'_>) -> Hit<'a> {
        let window = self.window();
        Hit {
            history: self,
            day,
            sample_time_spot: scored.offset,
            trade_time_spot: scored.offset + window,
            time_unit: self.shape.map_or(1, |shape| shape.time_unit.get()),
            similarity: scored.similarity,
            scale_factor: scored.pattern.norm() / probe.straight.norm(),
            last_low: scored.pattern.last_low(),
            last_high: scored.pattern.last_high(),
        }
    }

    /// Feed a candidate pool, admitting only while the pool's guard holds
    pub fn scan<R: MatchRecord>(
        &self,
        probe: &Probe<'_>,
        day: usize,
        pool: &mut CandidatePool<'_, R>,
    ) {
        for scored in self.scored(probe) {
            if pool.admits(scored.similarity) {
                let record = R::from_hit(&self.hit(probe, day, &scored));
                pool.add(scored.polarity, record);
            }
        }
    }

    /// Feed a graduate pool with every offset at or above its threshold.
    ///
    /// Returns the best score of the day (never below 0.0), admitted or not.
    pub fn scan_threshold<R: MatchRecord>(
        &self,
        probe: &Probe<'_>,
        day: usize,
        pool: &mut GraduatePool<'_, R>,
    ) -> f64 {
        let mut best = 0.0_f64;
        for scored in self.scored(probe) {
            best = best.max(scored.similarity);
            if pool.admits(scored.similarity) {
                let record = R::from_hit(&self.hit(probe, day, &scored));
                pool.add(scored.polarity, record);
            }
        }
        best
    }

    // ============================================================
    // FORWARD READS
    // ============================================================

    fn from_spot(&self, spot: usize) -> &[Bar] {
        &self.bars[spot.min(self.bars.len())..]
    }

    /// Best paper gain of a long entered at `entry`, held until a low
    /// touches `entry - stop_loss` or the day ends
    pub fn forward_best_long(&self, trade_spot: usize, entry: f64, stop_loss: f64) -> f64 {
        let limit = entry - stop_loss;
        self.from_spot(trade_spot)
            .iter()
            .take_while(|bar| bar.low > limit)
            .fold(entry, |best, bar| best.max(bar.high))
            - entry
    }

    /// Short counterpart of [`forward_best_long`](Self::forward_best_long)
    pub fn forward_best_short(&self, trade_spot: usize, entry: f64, stop_loss: f64) -> f64 {
        let limit = entry + stop_loss;
        entry
            - self
                .from_spot(trade_spot)
                .iter()
                .take_while(|bar| bar.high < limit)
                .fold(entry, |best, bar| best.min(bar.low))
    }

    /// Bars until a high reaches `goal`
    pub fn first_touch_long(&self, trade_spot: usize, goal: f64) -> Option<usize> {
        self.from_spot(trade_spot).iter().position(|bar| bar.high >= goal)
    }

    /// Bars until a low reaches `goal`
    pub fn first_touch_short(&self, trade_spot: usize, goal: f64) -> Option<usize> {
        self.from_spot(trade_spot).iter().position(|bar| bar.low <= goal)
    }

    /// Aggregated candlesticks from elementary offset `start`
    pub fn candlesticks(&self, start: usize, time_unit: usize, count: usize) -> Vec<Bar> {
        aggregate(self.from_spot(start), time_unit, count)
    }

    /// Wall-clock label of an elementary offset, session opening at 15:30
    pub fn time_label(&self, spot: usize) -> String {
        let seconds = match self.bars.len() {
            0 => 0,
            len => spot * SESSION_SECONDS / len,
        };
        let hour = 15 + (seconds + 1_800) / 3_600;
        let minute = (seconds / 60 + 30) % 60;
        let second = seconds % 60;
        format!("{hour}:{minute:02}:{second:02}")
    }
}
