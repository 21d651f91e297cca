//! Indicator implementations.
//!
//! Indicators are pure functions: price series in, numeric series out,
//! same length, with the first `lookback()` values `f64::NAN` (warmup).
//! Insufficient data (`len < period`) yields an all-NaN series, never an
//! error. Batch orchestration and request parsing live in `engine`.

pub mod ema;
pub mod engine;
pub mod rsi;
pub mod sma;

pub use ema::Ema;
pub use engine::{IndicatorEngine, IndicatorSpec, PanelKind};
pub use rsi::Rsi;
pub use sma::Sma;

/// Trait for indicators over a one-dimensional ordered price series.
///
/// No output value at index t may depend on input values after t.
pub trait Indicator: Send + Sync {
    /// Descriptive series name (e.g., "sma_20", "rsi_14").
    fn name(&self) -> &str;

    /// Number of leading outputs that are undefined (NaN warmup).
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire series.
    fn compute(&self, values: &[f64]) -> Vec<f64>;
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
