//! Parameter metadata for search configuration
//!
//! This module describes the tunable search parameters, enabling:
//! - Range checks for externally supplied settings
//! - Parameter documentation
//! - Building a configuration from a flat key/value map
//!
//! # Example
//!
//! ```rust
//! use precedent::params::Parameterized;
//! use precedent::prelude::*;
//!
//! for param in SearchConfig::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//! ```

use std::collections::HashMap;

use crate::{Period, Ratio, Result, ScalarError};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Ratio value in 0.0..=1.0
  Ratio,
  /// Strictly positive integer
  Period,
  /// Non-negative integer
  Count,
}

/// Metadata for a single search parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "first_coefficient")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Accepted range: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  pub const fn count(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Count, default, range, description }
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value.is_nan() || value < min || value > max {
      return Err(ScalarError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio => Ok(()),
      ParamType::Period if value < 1.0 || value.fract() != 0.0 => {
        Err(ScalarError::InvalidValue("Period must be a positive integer"))
      },
      ParamType::Count if value.fract() != 0.0 => {
        Err(ScalarError::InvalidValue("Count must be a non-negative integer"))
      },
      ParamType::Period | ParamType::Count => Ok(()),
    }
  }
}

// ============================================================
// PARAMETERIZED TRAIT
// ============================================================

/// Types that can be built from a flat parameter map
pub trait Parameterized: Sized {
  /// Returns metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Missing parameters use their default values.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  let value = params.get(key).copied().unwrap_or(default);
  Ratio::new(value)
}

pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  Period::new(value as usize)
}

pub fn get_count(params: &HashMap<&str, f64>, key: &str, default: usize) -> usize {
  params.get(key).map_or(default, |&v| v.max(0.0) as usize)
}

// ============================================================
// TESTS
// ============================================================
