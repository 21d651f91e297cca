//! Column-major serialization for the charting front end.
//!
//! Output shape: `[timestamps, open, high, low, close, volume?,
//! indicator_1, indicator_2, ...]` with indicator columns ordered
//! alphabetically by name after the fixed OHLCV block. Timestamps become
//! integer Unix time (milliseconds or seconds; naive timestamps are
//! assumed UTC). Non-finite values turn into JSON `null` so the transport
//! format stays valid. Every array must have identical length; a mismatch
//! is fatal before the payload leaves this module.

use polars::prelude::DataFrame;
use serde::Serialize;
use serde_json::{Number, Value};

use crate::error::PipelineError;
use crate::indicators::engine::{ComputedIndicator, PanelKind};
use crate::schema::{column_as_f64, is_numeric_dtype, timestamps_ms, CANONICAL_FIELDS, TIMESTAMP};

/// Unit for serialized Unix timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampUnit {
    #[default]
    Milliseconds,
    Seconds,
}

/// Metadata record accompanying the column arrays.
#[derive(Debug, Clone, Serialize)]
pub struct PayloadMeta {
    pub filename: String,
    pub rows: usize,
    pub columns: usize,
    pub timeframe: Option<String>,
    /// Names of the computed indicator columns, in serialized order.
    pub indicators: Vec<String>,
    /// Pre-existing non-OHLCV numeric columns of the source table.
    pub available_indicators: Vec<String>,
    pub overlays: Vec<String>,
    pub subplots: Vec<String>,
}

/// The serialized chart payload: column-major arrays plus metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ChartPayload {
    pub columns: Vec<Vec<Value>>,
    pub meta: PayloadMeta,
}

/// Pivot a bar table and its computed indicators into a `ChartPayload`.
pub fn to_payload(
    df: &DataFrame,
    indicators: &[ComputedIndicator],
    unit: TimestampUnit,
    filename: &str,
    timeframe: Option<&str>,
) -> Result<ChartPayload, PipelineError> {
    let rows = df.height();

    let ts: Vec<Value> = timestamps_ms(df)?
        .into_iter()
        .map(|ms| match ms {
            Some(ms) => match unit {
                TimestampUnit::Milliseconds => Value::Number(Number::from(ms)),
                TimestampUnit::Seconds => Value::Number(Number::from(ms.div_euclid(1000))),
            },
            None => Value::Null,
        })
        .collect();

    let mut columns: Vec<Vec<Value>> = vec![ts];
    let mut column_names: Vec<String> = vec![TIMESTAMP.to_string()];

    for field in CANONICAL_FIELDS {
        if field == "volume" && df.column("volume").is_err() {
            continue;
        }
        columns.push(numeric_column(&column_as_f64(df, field)?));
        column_names.push(field.to_string());
    }

    let mut sorted: Vec<&ComputedIndicator> = indicators.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    for ind in &sorted {
        columns.push(numeric_column(&ind.values));
        column_names.push(ind.name.clone());
    }

    for (name, col) in column_names.iter().zip(&columns) {
        if col.len() != rows {
            return Err(PipelineError::AlignmentMismatch {
                column: name.clone(),
                expected: rows,
                actual: col.len(),
            });
        }
    }

    let available_indicators: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.as_str().to_string())
        .filter(|name| {
            name != TIMESTAMP
                && !CANONICAL_FIELDS.contains(&name.as_str())
                && df
                    .column(name)
                    .map(|c| is_numeric_dtype(c.dtype()))
                    .unwrap_or(false)
        })
        .collect();

    let meta = PayloadMeta {
        filename: filename.to_string(),
        rows,
        columns: columns.len(),
        timeframe: timeframe.map(str::to_string),
        indicators: sorted.iter().map(|i| i.name.clone()).collect(),
        available_indicators,
        overlays: sorted
            .iter()
            .filter(|i| i.panel == PanelKind::Overlay)
            .map(|i| i.name.clone())
            .collect(),
        subplots: sorted
            .iter()
            .filter(|i| i.panel == PanelKind::Subplot)
            .map(|i| i.name.clone())
            .collect(),
    };

    Ok(ChartPayload { columns, meta })
}

/// Finite values pass through; NaN and ±Inf become JSON null.
fn numeric_column(values: &[f64]) -> Vec<Value> {
    values
        .iter()
        .map(|&v| match Number::from_f64(v) {
            Some(n) if v.is_finite() => Value::Number(n),
            _ => Value::Null,
        })
        .collect()
}
