//! Missing-value repair.
//!
//! Rows with a null timestamp are dropped first. Then, on the surviving
//! rows: price fields are forward-filled and any leading nulls
//! back-filled; volume is linearly interpolated between valid neighbors,
//! then forward/back-filled, then defaulted to zero. An empty table after
//! row removal is a valid output, not an error.

use polars::prelude::*;
use tracing::debug;

use crate::error::PipelineError;
use crate::schema::{column_as_f64, timestamps_ms, PRICE_FIELDS};

/// Repair missing values, returning a new table.
pub fn clean(df: &DataFrame) -> Result<DataFrame, PipelineError> {
    let ts = timestamps_ms(df)?;
    let keep: Vec<usize> = (0..df.height()).filter(|&i| ts[i].is_some()).collect();
    let dropped = df.height() - keep.len();
    if dropped > 0 {
        debug!(dropped, "dropped rows with undefined timestamps");
    }

    let mut out = take_rows(df, &keep)?;
    if out.height() == 0 {
        return Ok(out);
    }

    for field in PRICE_FIELDS {
        let mut values = column_as_f64(&out, field)?;
        forward_fill(&mut values);
        backward_fill(&mut values);
        replace_column(&mut out, field, values)?;
    }

    if out.column("volume").is_ok() {
        let mut values = column_as_f64(&out, "volume")?;
        interpolate_linear(&mut values);
        forward_fill(&mut values);
        backward_fill(&mut values);
        for v in values.iter_mut() {
            if v.is_nan() {
                *v = 0.0;
            }
        }
        replace_column(&mut out, "volume", values)?;
    }

    Ok(out)
}

fn take_rows(df: &DataFrame, rows: &[usize]) -> Result<DataFrame, PipelineError> {
    let idx: IdxCa = rows.iter().map(|&i| Some(i as IdxSize)).collect();
    df.take(&idx).map_err(|e| PipelineError::MalformedInput {
        reason: format!("row filter failed: {e}"),
    })
}

fn replace_column(
    df: &mut DataFrame,
    name: &str,
    values: Vec<f64>,
) -> Result<(), PipelineError> {
    let series = Series::new(name.into(), values);
    df.replace(name, series)
        .map_err(|e| PipelineError::MalformedInput {
            reason: format!("column replace failed: {e}"),
        })?;
    Ok(())
}

/// Copy the last valid value forward over NaN runs.
fn forward_fill(values: &mut [f64]) {
    let mut last = f64::NAN;
    for v in values.iter_mut() {
        if v.is_nan() {
            if !last.is_nan() {
                *v = last;
            }
        } else {
            last = *v;
        }
    }
}

/// Fill leading (and any remaining) NaN runs from the next valid value.
fn backward_fill(values: &mut [f64]) {
    let mut next = f64::NAN;
    for v in values.iter_mut().rev() {
        if v.is_nan() {
            if !next.is_nan() {
                *v = next;
            }
        } else {
            next = *v;
        }
    }
}

/// Linear interpolation across interior NaN runs. Boundary runs (no valid
/// neighbor on one side) are left NaN for the fill passes.
fn interpolate_linear(values: &mut [f64]) {
    let n = values.len();
    let mut i = 0;
    while i < n {
        if values[i].is_nan() {
            let start = i;
            while i < n && values[i].is_nan() {
                i += 1;
            }
            // Run is values[start..i]; valid neighbors at start-1 and i.
            if start > 0 && i < n {
                let left = values[start - 1];
                let right = values[i];
                let span = (i - start + 1) as f64;
                for (k, v) in values[start..i].iter_mut().enumerate() {
                    let t = (k + 1) as f64 / span;
                    *v = left + (right - left) * t;
                }
            }
        } else {
            i += 1;
        }
    }
}
