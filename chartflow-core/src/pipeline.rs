//! Pipeline orchestration.
//!
//! Runs Ingestor → ColumnMapper → Cleaner → (optional) Resampler →
//! IndicatorEngine → Serializer over one input. Each stage takes a table
//! and returns a new one. `FrameStore` is the explicit, caller-owned
//! replacement for a process-wide table cache: create it, hand it around,
//! evict when done.

use std::collections::HashMap;
use std::path::Path;

use chrono_tz::Tz;
use polars::prelude::DataFrame;
use tracing::debug;

use crate::data::clean::clean;
use crate::data::columns::{map_columns, ColumnMap};
use crate::data::ingest::{load_bytes, load_path};
use crate::data::resample::{resample, ResampleOptions, Timeframe};
use crate::error::PipelineError;
use crate::indicators::engine::IndicatorEngine;
use crate::schema::column_as_f64;
use crate::serialize::{to_payload, ChartPayload, TimestampUnit};

/// Options for one pipeline invocation.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Explicit canonical-field → source-column assignments.
    pub mapping: ColumnMap,
    /// Name of the timestamp-bearing column; auto-detected when `None`.
    pub timestamp_column: Option<String>,
    /// Target timeframe; `None` keeps the native frequency.
    pub timeframe: Option<Timeframe>,
    /// Zone a naive index is localized to before resampling (default UTC).
    pub tz: Option<Tz>,
    /// Zone to convert to after localization.
    pub target_tz: Option<Tz>,
    /// Indicator requests, e.g. `"sma:20"`, `"RSI:14"`.
    pub indicators: Vec<String>,
    /// Unit for serialized Unix timestamps.
    pub unit: TimestampUnit,
}

/// The synchronous, stateless pipeline entry point.
///
/// Invocations share no mutable state, so callers may run any number of
/// them concurrently (one per request, say) without locking.
pub struct Pipeline;

impl Pipeline {
    /// Run the full pipeline over a file on disk.
    pub fn run_path(path: &Path, opts: &PipelineOptions) -> Result<ChartPayload, PipelineError> {
        let df = load_path(path, opts.timestamp_column.as_deref())?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::run_frame(df, &filename, opts)
    }

    /// Run the full pipeline over in-memory bytes.
    pub fn run_bytes(
        bytes: &[u8],
        filename: &str,
        opts: &PipelineOptions,
    ) -> Result<ChartPayload, PipelineError> {
        let df = load_bytes(bytes, opts.timestamp_column.as_deref())?;
        Self::run_frame(df, filename, opts)
    }

    fn run_frame(
        df: DataFrame,
        filename: &str,
        opts: &PipelineOptions,
    ) -> Result<ChartPayload, PipelineError> {
        let mapped = map_columns(&df, &opts.mapping)?;
        let cleaned = clean(&mapped)?;
        debug!(rows = cleaned.height(), "cleaned table");

        let bars = match opts.timeframe {
            Some(tf) => {
                let ropts = ResampleOptions {
                    tz: opts.tz,
                    target_tz: opts.target_tz,
                };
                resample(&cleaned, tf, &ropts)?
            }
            None => cleaned,
        };

        let closes = column_as_f64(&bars, "close")?;
        let indicators = IndicatorEngine::compute_batch(&closes, &opts.indicators)?;

        to_payload(
            &bars,
            &indicators,
            opts.unit,
            filename,
            opts.timeframe.map(|tf| tf.canonical()).as_deref(),
        )
    }
}

/// Caller-owned store of loaded tables, keyed by name.
///
/// Explicit lifecycle — create, insert, fetch, evict — instead of a
/// module-level singleton, so two callers never share state by accident.
#[derive(Debug, Clone, Default)]
pub struct FrameStore {
    frames: HashMap<String, DataFrame>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a table, replacing any previous entry under the same key.
    pub fn insert(&mut self, key: impl Into<String>, df: DataFrame) -> Option<DataFrame> {
        self.frames.insert(key.into(), df)
    }

    pub fn get(&self, key: &str) -> Option<&DataFrame> {
        self.frames.get(key)
    }

    /// Remove and return a table.
    pub fn evict(&mut self, key: &str) -> Option<DataFrame> {
        self.frames.remove(key)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.frames.keys().map(String::as_str)
    }
}
