//! # Precedent - intraday shape-precedent search
//!
//! Searches an archive of intraday low/high bars for windows whose shape
//! resembles a query window, keeping a bounded, time-diverse set of the best
//! matches for both the query itself and its mirror ("nemesis") shape.
//!
//! ## Quick Start
//!
//! ```rust
//! use precedent::prelude::*;
//!
//! // One trading day of elementary bars
//! let mut day = DayHistory::new("Mon 03 Jun");
//! for i in 0..200 {
//!     let base = 100.0 + (i as f64 * 0.3).sin();
//!     day.ingest(base - 0.1, base + 0.1);
//! }
//!
//! let mut archive = Archive::new();
//! archive.push_day(day).unwrap();
//!
//! let config = SearchConfig::builder()
//!     .time_unit(2)
//!     .candlesticks(10)
//!     .first_coefficient(0.5)
//!     .use_mirror(true)
//!     .build()
//!     .unwrap();
//!
//! // The last 20 elementary bars of the live session
//! let query: Vec<Bar> = (0..20)
//!     .map(|i| {
//!         let base = 100.0 + (i as f64 * 0.3).sin();
//!         Bar::new(base - 0.1, base + 0.1)
//!     })
//!     .collect();
//!
//! let summary = archive
//!     .search_best(&query, &config, Period::new(5).unwrap(), ScanPosition::Offline, Target::Manual)
//!     .unwrap();
//! assert!(summary.positives + summary.negatives <= 5);
//! ```

pub mod archive;
pub mod config;
pub mod day;
pub mod index;
pub mod params;
pub mod pattern;
pub mod pool;
pub mod record;

pub mod prelude {
    pub use crate::{
        // Orchestration
        archive::{Archive, CancelHandle, ResultSet, SearchSummary, Target},
        // Configuration
        config::{PatternShape, SearchConfig, SearchConfigBuilder},
        // Day data
        day::{DayHistory, Probe},
        index::{DayIndex, ScanPosition},
        params::{ParamMeta, ParamType, Parameterized},
        // Patterns
        pattern::{Coefficients, NormalizedPattern},
        // Retention
        pool::{CandidatePool, GraduatePool},
        // Records
        record::{FullRecord, Hit, MatchRecord, Outcome, Polarity, ScanRecord},
        // Core types
        Bar,
        LowHigh,
        Period,
        Ratio,
        Result,
        ScalarError,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, ScalarError>;

/// Errors that can occur while building patterns or running searches
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScalarError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: &'static str },

    #[error("Window is flat: weighted norm is zero")]
    FlatWindow,

    #[error("Unknown day {0}")]
    UnknownDay(usize),
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(ScalarError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(ScalarError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Count of elementary units or candlesticks (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(ScalarError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// BARS
// ============================================================

/// Low/high price pair of one elementary time unit
pub trait LowHigh {
    fn low(&self) -> f64;
    fn high(&self) -> f64;

    /// Validate low/high consistency
    fn validate(&self) -> Result<()> {
        let (low, high) = (self.low(), self.high());
        if low.is_nan() || high.is_nan() {
            return Err(ScalarError::InvalidBar {
                index: 0,
                reason: "NaN in bar",
            });
        }
        if low.is_infinite() || high.is_infinite() {
            return Err(ScalarError::InvalidBar {
                index: 0,
                reason: "Infinite value in bar",
            });
        }
        if high < low {
            return Err(ScalarError::InvalidBar {
                index: 0,
                reason: "high < low",
            });
        }
        Ok(())
    }
}

/// Elementary bar, also used for aggregated and normalized candlesticks
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub low: f64,
    pub high: f64,
}

impl Bar {
    #[inline]
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

impl LowHigh for Bar {
    #[inline]
    fn low(&self) -> f64 {
        self.low
    }

    #[inline]
    fn high(&self) -> f64 {
        self.high
    }
}

impl LowHigh for (f64, f64) {
    #[inline]
    fn low(&self) -> f64 {
        self.0
    }

    #[inline]
    fn high(&self) -> f64 {
        self.1
    }
}

// ============================================================
// TESTS
// ============================================================
