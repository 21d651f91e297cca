//! Canonical bar schema.
//!
//! The pipeline's only accepted internal representation: a `DataFrame` with
//! a `timestamp` column (Datetime, milliseconds, UTC semantics) plus the
//! canonical numeric fields `open, high, low, close` and optional `volume`.
//! Heterogeneous external tables are adapted to this schema at the
//! Ingestor/ColumnMapper boundary and nowhere else.

use polars::prelude::*;

use crate::error::PipelineError;

/// Name of the parsed timestamp column.
pub const TIMESTAMP: &str = "timestamp";

/// The four mandatory price fields, in canonical order.
pub const PRICE_FIELDS: [&str; 4] = ["open", "high", "low", "close"];

/// All five canonical fields, in canonical order.
pub const CANONICAL_FIELDS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// True for dtypes the pipeline accepts as numeric.
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Extract a canonical column as `f64` values with nulls mapped to NaN.
pub fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>, PipelineError> {
    let col = df.column(name).map_err(|_| PipelineError::ColumnNotFound {
        column: name.to_string(),
        available: available_columns(df),
        suggestions: vec![],
    })?;
    let casted = col
        .cast(&DataType::Float64)
        .map_err(|_| PipelineError::NonNumericColumn {
            column: name.to_string(),
            dtype: col.dtype().to_string(),
        })?;
    let ca = casted.f64().map_err(|_| PipelineError::NonNumericColumn {
        column: name.to_string(),
        dtype: col.dtype().to_string(),
    })?;
    Ok(ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// Extract the timestamp column as epoch milliseconds, nulls preserved.
pub fn timestamps_ms(df: &DataFrame) -> Result<Vec<Option<i64>>, PipelineError> {
    let col = df
        .column(TIMESTAMP)
        .map_err(|_| PipelineError::MalformedInput {
            reason: format!("table has no '{TIMESTAMP}' column"),
        })?;
    let casted = col
        .cast(&DataType::Int64)
        .map_err(|e| PipelineError::MalformedInput {
            reason: format!("'{TIMESTAMP}' column is not temporal: {e}"),
        })?;
    let ca = casted.i64().map_err(|e| PipelineError::MalformedInput {
        reason: format!("'{TIMESTAMP}' column is not temporal: {e}"),
    })?;
    Ok(ca.into_iter().collect())
}

/// Comma-separated column names, for error messages.
pub fn available_columns(df: &DataFrame) -> String {
    df.get_column_names()
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check the OHLC relationship and volume sign for every row.
///
/// Rows with NaN in any price field are skipped (the cleaner owns NaN
/// repair); a finite violation is reported with its row index.
pub fn verify_bar_invariants(df: &DataFrame) -> Result<(), PipelineError> {
    let open = column_as_f64(df, "open")?;
    let high = column_as_f64(df, "high")?;
    let low = column_as_f64(df, "low")?;
    let close = column_as_f64(df, "close")?;
    let volume = if df.column("volume").is_ok() {
        Some(column_as_f64(df, "volume")?)
    } else {
        None
    };

    for i in 0..df.height() {
        let (o, h, l, c) = (open[i], high[i], low[i], close[i]);
        if o.is_nan() || h.is_nan() || l.is_nan() || c.is_nan() {
            continue;
        }
        if h < o.max(c) {
            return Err(PipelineError::DataIntegrityViolation {
                reason: format!("row {i}: high {h} < max(open, close) {}", o.max(c)),
            });
        }
        if l > o.min(c) {
            return Err(PipelineError::DataIntegrityViolation {
                reason: format!("row {i}: low {l} > min(open, close) {}", o.min(c)),
            });
        }
        if let Some(vol) = &volume {
            if !vol[i].is_nan() && vol[i] < 0.0 {
                return Err(PipelineError::DataIntegrityViolation {
                    reason: format!("row {i}: negative volume {}", vol[i]),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn sample_frame() -> DataFrame {
        df!(
            "timestamp" => &[1_700_000_000_000_i64, 1_700_000_060_000, 1_700_000_120_000],
            "open" => &[100.0, 101.0, 102.0],
            "high" => &[105.0, 106.0, 107.0],
            "low" => &[99.0, 100.0, 101.0],
            "close" => &[101.0, 102.0, 103.0],
            "volume" => &[1000.0, 2000.0, 3000.0],
        )
        .unwrap()
    }

    #[test]
    fn numeric_dtypes_accepted() {
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(is_numeric_dtype(&DataType::Int32));
        assert!(is_numeric_dtype(&DataType::UInt64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn column_as_f64_maps_nulls_to_nan() {
        let df = df!(
            "open" => &[Some(1.0), None, Some(3.0)],
        )
        .unwrap();
        let values = column_as_f64(&df, "open").unwrap();
        assert_eq!(values[0], 1.0);
        assert!(values[1].is_nan());
        assert_eq!(values[2], 3.0);
    }

    #[test]
    fn verify_bar_invariants_accepts_valid_frame() {
        assert!(verify_bar_invariants(&sample_frame()).is_ok());
    }

    #[test]
    fn verify_bar_invariants_rejects_high_below_close() {
        let df = df!(
            "open" => &[100.0],
            "high" => &[100.5],
            "low" => &[99.0],
            "close" => &[101.0], // above high
        )
        .unwrap();
        let err = verify_bar_invariants(&df).unwrap_err();
        assert!(matches!(err, PipelineError::DataIntegrityViolation { .. }));
    }

    #[test]
    fn verify_bar_invariants_rejects_negative_volume() {
        let df = df!(
            "open" => &[100.0],
            "high" => &[105.0],
            "low" => &[99.0],
            "close" => &[101.0],
            "volume" => &[-5.0],
        )
        .unwrap();
        let err = verify_bar_invariants(&df).unwrap_err();
        assert!(matches!(err, PipelineError::DataIntegrityViolation { .. }));
    }

    #[test]
    fn verify_bar_invariants_skips_nan_rows() {
        let df = df!(
            "open" => &[f64::NAN],
            "high" => &[0.0],
            "low" => &[10.0],
            "close" => &[5.0],
        )
        .unwrap();
        assert!(verify_bar_invariants(&df).is_ok());
    }
}
