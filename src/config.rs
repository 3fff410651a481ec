//! Search configuration
//!
//! [`PatternShape`] is everything that changes the derived pattern cache of a
//! day; [`SearchConfig`] adds the settings that only affect how the cache is
//! traversed.

use std::collections::HashMap;

use crate::params::{get_count, get_period, get_ratio, ParamMeta, Parameterized};
use crate::pattern::Coefficients;
use crate::{Period, Ratio, Result, ScalarError};

// ============================================================
// PATTERN SHAPE
// ============================================================

/// Cache key of a day's derived patterns
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PatternShape {
    /// Elementary bars aggregated into one candlestick
    pub time_unit: Period,
    /// Candlesticks per pattern
    pub candlesticks: Period,
    /// Weight of the oldest candlestick; the most recent one weighs 1.0
    pub first_coefficient: Ratio,
}

impl PatternShape {
    pub fn new(time_unit: Period, candlesticks: Period, first_coefficient: Ratio) -> Self {
        Self {
            time_unit,
            candlesticks,
            first_coefficient,
        }
    }

    /// Elementary bars covered by one pattern
    #[inline]
    pub fn window(&self) -> usize {
        self.time_unit.get() * self.candlesticks.get()
    }

    pub fn coefficients(&self) -> Coefficients {
        Coefficients::linear(self.first_coefficient.get(), self.candlesticks.get())
    }
}

impl Default for PatternShape {
    fn default() -> Self {
        Self {
            time_unit: Period::new_const(1),
            candlesticks: Period::new_const(30),
            first_coefficient: Ratio::new_const(1.0),
        }
    }
}

// ============================================================
// SEARCH CONFIG
// ============================================================

/// Full configuration of a search invocation
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SearchConfig {
    pub shape: PatternShape,
    /// Elementary units per bar of the query feed; `time_unit` must be a multiple
    #[serde(default = "default_feeding_time_unit")]
    pub feeding_time_unit: Period,
    /// Half-width, in elementary units, of the live window around "now"
    #[serde(default = "default_scope")]
    pub scope: usize,
    /// Minimum same-polarity separation; `None` uses the pattern window
    #[serde(default)]
    pub diversity: Option<usize>,
    /// Also score the mirror shape
    #[serde(default)]
    pub use_mirror: bool,
}

fn default_feeding_time_unit() -> Period {
    Period::new_const(1)
}

fn default_scope() -> usize {
    1_800
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            shape: PatternShape::default(),
            feeding_time_unit: default_feeding_time_unit(),
            scope: default_scope(),
            diversity: None,
            use_mirror: false,
        }
    }
}

impl SearchConfig {
    pub fn builder() -> SearchConfigBuilder {
        SearchConfigBuilder::new()
    }

    /// Temporal separation enforced between same-polarity matches
    #[inline]
    pub fn diversity_distance(&self) -> usize {
        self.diversity.unwrap_or_else(|| self.shape.window())
    }

    /// Time unit of the query feed, in feed bars per candlestick
    #[inline]
    pub fn query_time_unit(&self) -> usize {
        self.shape.time_unit.get() / self.feeding_time_unit.get()
    }

    /// Feed bars needed to build one query pattern
    #[inline]
    pub fn query_len(&self) -> usize {
        self.query_time_unit() * self.shape.candlesticks.get()
    }

    pub fn validate(&self) -> Result<()> {
        let time_unit = self.shape.time_unit.get();
        let feeding = self.feeding_time_unit.get();
        if time_unit % feeding != 0 {
            return Err(ScalarError::InvalidConfig(format!(
                "time_unit {time_unit} is not a multiple of feeding_time_unit {feeding}"
            )));
        }
        if self.diversity == Some(0) {
            return Err(ScalarError::InvalidValue("diversity must be > 0"));
        }
        Ok(())
    }
}

static SEARCH_PARAMS: [ParamMeta; 5] = [
    ParamMeta::period("time_unit", 1.0, (1.0, 60.0, 1.0), "Elementary bars per candlestick"),
    ParamMeta::period("candlesticks", 30.0, (5.0, 120.0, 5.0), "Candlesticks per pattern"),
    ParamMeta::ratio(
        "first_coefficient",
        1.0,
        (0.0, 1.0, 0.1),
        "Weight of the oldest candlestick",
    ),
    ParamMeta::count("scope", 1_800.0, (0.0, 23_400.0, 300.0), "Live half-width around now"),
    ParamMeta::period("feeding_time_unit", 1.0, (1.0, 60.0, 1.0), "Elementary units per feed bar"),
];

impl Parameterized for SearchConfig {
    fn param_meta() -> &'static [ParamMeta] {
        &SEARCH_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        for meta in Self::param_meta() {
            if let Some(&value) = params.get(meta.name) {
                meta.validate(value)?;
            }
        }
        let config = Self {
            shape: PatternShape {
                time_unit: get_period(params, "time_unit", 1)?,
                candlesticks: get_period(params, "candlesticks", 30)?,
                first_coefficient: get_ratio(params, "first_coefficient", 1.0)?,
            },
            feeding_time_unit: get_period(params, "feeding_time_unit", 1)?,
            scope: get_count(params, "scope", 1_800),
            diversity: None,
            use_mirror: params.get("use_mirror").is_some_and(|&v| v != 0.0),
        };
        config.validate()?;
        Ok(config)
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for [`SearchConfig`]; numeric settings are validated in `build`
#[derive(Debug, Clone)]
pub struct SearchConfigBuilder {
    time_unit: usize,
    candlesticks: usize,
    first_coefficient: f64,
    feeding_time_unit: usize,
    scope: usize,
    diversity: Option<usize>,
    use_mirror: bool,
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        let defaults = SearchConfig::default();
        Self {
            time_unit: defaults.shape.time_unit.get(),
            candlesticks: defaults.shape.candlesticks.get(),
            first_coefficient: defaults.shape.first_coefficient.get(),
            feeding_time_unit: defaults.feeding_time_unit.get(),
            scope: defaults.scope,
            diversity: defaults.diversity,
            use_mirror: defaults.use_mirror,
        }
    }

    pub fn time_unit(mut self, value: usize) -> Self {
        self.time_unit = value;
        self
    }

    pub fn candlesticks(mut self, value: usize) -> Self {
        self.candlesticks = value;
        self
    }

    pub fn first_coefficient(mut self, value: f64) -> Self {
        self.first_coefficient = value;
        self
    }

    pub fn feeding_time_unit(mut self, value: usize) -> Self {
        self.feeding_time_unit = value;
        self
    }

    pub fn scope(mut self, value: usize) -> Self {
        self.scope = value;
        self
    }

    /// Override the diversity distance (defaults to the pattern window)
    pub fn diversity(mut self, value: usize) -> Self {
        self.diversity = Some(value);
        self
    }

    pub fn use_mirror(mut self, enable: bool) -> Self {
        self.use_mirror = enable;
        self
    }

    pub fn build(self) -> Result<SearchConfig> {
        let config = SearchConfig {
            shape: PatternShape {
                time_unit: Period::new(self.time_unit)?,
                candlesticks: Period::new(self.candlesticks)?,
                first_coefficient: Ratio::new(self.first_coefficient)?,
            },
            feeding_time_unit: Period::new(self.feeding_time_unit)?,
            scope: self.scope,
            diversity: self.diversity,
            use_mirror: self.use_mirror,
        };
        config.validate()?;
        Ok(config)
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_and_diversity_default() {
        let config = SearchConfig::builder().time_unit(5).candlesticks(12).build().unwrap();
        assert_eq!(config.shape.window(), 60);
        assert_eq!(config.diversity_distance(), 60);

        let config = SearchConfig::builder().diversity(7).build().unwrap();
        assert_eq!(config.diversity_distance(), 7);
    }

    #[test]
    fn test_builder_rejects_bad_values() {
        assert!(SearchConfig::builder().time_unit(0).build().is_err());
        assert!(SearchConfig::builder().candlesticks(0).build().is_err());
        assert!(SearchConfig::builder().first_coefficient(1.5).build().is_err());
        assert!(SearchConfig::builder().diversity(0).build().is_err());
    }

    #[test]
    fn test_feeding_time_unit_must_divide_time_unit() {
        let err = SearchConfig::builder()
            .time_unit(5)
            .feeding_time_unit(2)
            .build()
            .unwrap_err();
        assert!(matches!(err, ScalarError::InvalidConfig(_)));

        let config = SearchConfig::builder()
            .time_unit(6)
            .feeding_time_unit(2)
            .candlesticks(10)
            .build()
            .unwrap();
        assert_eq!(config.query_time_unit(), 3);
        assert_eq!(config.query_len(), 30);
    }

    #[test]
    fn test_with_params() {
        let mut params = HashMap::new();
        params.insert("time_unit", 3.0);
        params.insert("first_coefficient", 0.4);
        params.insert("use_mirror", 1.0);

        let config = SearchConfig::with_params(&params).unwrap();
        assert_eq!(config.shape.time_unit.get(), 3);
        assert_eq!(config.shape.candlesticks.get(), 30);
        assert!((config.shape.first_coefficient.get() - 0.4).abs() < f64::EPSILON);
        assert!(config.use_mirror);
    }

    #[test]
    fn test_with_params_out_of_range() {
        let mut params = HashMap::new();
        params.insert("candlesticks", 500.0);
        assert!(matches!(
            SearchConfig::with_params(&params),
            Err(ScalarError::OutOfRange { field: "candlesticks", .. })
        ));
    }

    #[test]
    fn test_shape_coefficients_len() {
        let shape = PatternShape::new(
            Period::new(2).unwrap(),
            Period::new(8).unwrap(),
            Ratio::new(0.2).unwrap(),
        );
        let coefficients = shape.coefficients();
        assert_eq!(coefficients.len(), 8);
        assert!((coefficients.weights()[0] - 0.2).abs() < 1e-12);
        assert!((coefficients.weights()[7] - 1.0).abs() < 1e-12);
    }
}
