//! Normalized window patterns
//!
//! A pattern is built from `candlesticks` aggregated candlesticks, each the
//! min-low / max-high of `time_unit` consecutive elementary bars. Values are
//! centered on the window mean and divided by the weighted L2 norm, so the
//! weighted inner product of two patterns behaves like a cosine.

use crate::{Bar, LowHigh, Result, ScalarError};

// ============================================================
// COEFFICIENTS
// ============================================================

/// Per-position weights, oldest candlestick first.
///
/// Patterns may only be compared when they were built with the same
/// coefficients; a day caches its patterns under the shape that produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coefficients {
    weights: Vec<f64>,
    uniform: bool,
}

impl Coefficients {
    /// Linear ramp from `first` (oldest) to `1.0` (most recent)
    pub fn linear(first: f64, candlesticks: usize) -> Self {
        let weights = match candlesticks {
            0 => Vec::new(),
            1 => vec![1.0],
            n => {
                let step = (1.0 - first) / (n - 1) as f64;
                (0..n).map(|i| first + i as f64 * step).collect()
            }
        };
        let uniform = weights.iter().all(|&w| w == 1.0);
        Self { weights, uniform }
    }

    /// Recompute in place. Returns false when the configuration is unchanged.
    pub fn update(&mut self, first: f64, candlesticks: usize) -> bool {
        let next = Self::linear(first, candlesticks);
        if next == *self {
            return false;
        }
        *self = next;
        true
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// All weights equal 1.0
    #[inline]
    pub fn is_uniform(&self) -> bool {
        self.uniform
    }
}

// ============================================================
// AGGREGATION
// ============================================================

/// Aggregate `count` candlesticks of `time_unit` elementary bars each.
/// A trailing partial group is dropped.
pub fn aggregate<T: LowHigh>(bars: &[T], time_unit: usize, count: usize) -> Vec<Bar> {
    bars.chunks_exact(time_unit.max(1))
        .take(count)
        .map(|group| {
            group.iter().skip(1).fold(
                Bar::new(group[0].low(), group[0].high()),
                |acc, bar| Bar::new(acc.low.min(bar.low()), acc.high.max(bar.high())),
            )
        })
        .collect()
}

// ============================================================
// NORMALIZED PATTERN
// ============================================================

/// Mean-centered, unit weighted-norm representation of one window
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPattern {
    candles: Vec<Bar>,
    norm: f64,
    last_low: f64,
    last_high: f64,
}

impl NormalizedPattern {
    /// Build from the first `time_unit * coefficients.len()` bars.
    ///
    /// Fails with [`ScalarError::FlatWindow`] when the weighted norm is zero.
    pub fn build<T: LowHigh>(
        bars: &[T],
        time_unit: usize,
        coefficients: &Coefficients,
    ) -> Result<Self> {
        let need = time_unit * coefficients.len();
        if coefficients.is_empty() || bars.len() < need {
            return Err(ScalarError::InsufficientData {
                need,
                got: bars.len(),
            });
        }

        let pattern = Self::compute(&bars[..need], time_unit, coefficients);
        if pattern.is_flat() {
            return Err(ScalarError::FlatWindow);
        }
        Ok(pattern)
    }

    /// Build without rejecting flat windows. A flat window keeps `norm == 0`
    /// and all-zero candles. Caller guarantees `bars` covers the window.
    pub(crate) fn compute<T: LowHigh>(
        bars: &[T],
        time_unit: usize,
        coefficients: &Coefficients,
    ) -> Self {
        let mut candles = aggregate(bars, time_unit, coefficients.len());
        let last = candles.last().copied().unwrap_or_default();

        // Exact test: a rounded mean would leave a tiny non-zero norm
        if candles.iter().all(|c| c.low == last.low && c.high == last.low) {
            candles.fill(Bar::default());
            return Self {
                candles,
                norm: 0.0,
                last_low: last.low,
                last_high: last.high,
            };
        }

        let mean = candles.iter().map(|c| c.low + c.high).sum::<f64>()
            / (2 * candles.len()) as f64;

        let mut weighted = 0.0;
        for (candle, weight) in candles.iter_mut().zip(coefficients.weights()) {
            candle.low -= mean;
            candle.high -= mean;
            weighted += (candle.low * candle.low + candle.high * candle.high) * weight;
        }

        let norm = weighted.sqrt();
        if norm > 0.0 {
            for candle in &mut candles {
                candle.low /= norm;
                candle.high /= norm;
            }
        }

        Self {
            candles,
            norm,
            last_low: last.low,
            last_high: last.high,
        }
    }

    /// Same shape reflected in time and price.
    ///
    /// Candlestick order is reversed and each becomes `(-high, -low)`. Norm
    /// and the raw last low/high are carried over unchanged.
    pub fn mirror(&self) -> Self {
        Self {
            candles: self
                .candles
                .iter()
                .rev()
                .map(|c| Bar::new(-c.high, -c.low))
                .collect(),
            norm: self.norm,
            last_low: self.last_low,
            last_high: self.last_high,
        }
    }

    /// Weighted inner product with another pattern of the same configuration
    pub fn similarity(&self, other: &Self, coefficients: &Coefficients) -> f64 {
        debug_assert_eq!(self.candles.len(), other.candles.len());
        debug_assert_eq!(self.candles.len(), coefficients.len());

        let pairs = self.candles.iter().zip(&other.candles);
        if coefficients.is_uniform() {
            pairs.map(|(a, b)| a.low * b.low + a.high * b.high).sum()
        } else {
            pairs
                .zip(coefficients.weights())
                .map(|((a, b), w)| (a.low * b.low + a.high * b.high) * w)
                .sum()
        }
    }

    /// Weighted norm of the centered window before normalization
    #[inline]
    pub fn norm(&self) -> f64 {
        self.norm
    }

    #[inline]
    pub fn is_flat(&self) -> bool {
        self.norm == 0.0
    }

    /// Raw low of the final aggregated candlestick
    #[inline]
    pub fn last_low(&self) -> f64 {
        self.last_low
    }

    /// Raw high of the final aggregated candlestick
    #[inline]
    pub fn last_high(&self) -> f64 {
        self.last_high
    }

    #[inline]
    pub fn candles(&self) -> &[Bar] {
        &self.candles
    }
}

// ============================================================
// TESTS
// ============================================================
