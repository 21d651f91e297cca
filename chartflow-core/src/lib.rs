//! ChartFlow Core — OHLCV normalization and transformation pipeline.
//!
//! Takes price-bar tables with unknown column naming, mixed timestamp
//! formats, gaps, and missing values, and produces a validated,
//! chronologically ordered, optionally down-sampled series with indicators
//! attached, serialized as column-major arrays for a charting front end.
//!
//! Stages, in control-flow order:
//! - Ingestor: raw bytes → decoded table with a parsed, sorted timestamp column
//! - ColumnMapper: arbitrary source columns → canonical `open,high,low,close,volume`
//! - Cleaner: missing-value repair (price fill, volume interpolation)
//! - Resampler: coarser timeframes with OHLC semantics and integrity checks
//! - IndicatorEngine: SMA / EMA / RSI series from a price column
//! - Serializer: aligned column-major arrays plus payload metadata
//!
//! Each stage consumes a `DataFrame` and returns a new one; no stage mutates
//! its input in place. A pipeline invocation is synchronous and shares no
//! state with other invocations, so concurrent calls need no locking.

pub mod data;
pub mod error;
pub mod indicators;
pub mod pipeline;
pub mod schema;
pub mod serialize;

pub use chrono_tz::Tz;
pub use error::PipelineError;
pub use pipeline::{FrameStore, Pipeline, PipelineOptions};
pub use serialize::{ChartPayload, TimestampUnit};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: pipeline entry types are Send + Sync, so callers
    /// may run invocations from a worker pool without wrappers.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<PipelineOptions>();
        require_sync::<PipelineOptions>();
        require_send::<PipelineError>();
        require_sync::<PipelineError>();
        require_send::<ChartPayload>();
        require_sync::<ChartPayload>();
        require_send::<FrameStore>();
        require_sync::<FrameStore>();
        require_send::<data::resample::Timeframe>();
        require_sync::<data::resample::Timeframe>();
        require_send::<indicators::engine::IndicatorSpec>();
        require_sync::<indicators::engine::IndicatorSpec>();
    }
}
