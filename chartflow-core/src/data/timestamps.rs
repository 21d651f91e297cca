//! Timestamp parsing with format auto-detection.
//!
//! Cascade, tried in order until one step parses every non-null value:
//! 1. already temporal (Datetime/Date) — accepted as-is
//! 2. numeric epoch: values in `9e8..4e9` are seconds, `9e11..4e12` milliseconds
//! 3. calendar strings, month before day
//! 4. calendar strings, day before month
//!
//! The parsed column is stored as `Datetime(Milliseconds, None)` with UTC
//! semantics. A column no step can fully parse is a fatal error.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;

use crate::error::PipelineError;
use crate::schema::{is_numeric_dtype, TIMESTAMP};

/// Epoch-seconds detection range (roughly 1998–2096).
const EPOCH_SECONDS: (f64, f64) = (9e8, 4e9);
/// Epoch-milliseconds detection range.
const EPOCH_MILLIS: (f64, f64) = (9e11, 4e12);

/// Candidate names for the timestamp-bearing column, checked in order.
const TIMESTAMP_NAMES: [&str; 5] = ["timestamp", "time", "date", "datetime", "t"];

/// Parse `column` (or an auto-detected one) into a `timestamp` Datetime
/// column, returning a new frame with the original column replaced.
pub fn parse_timestamp_column(
    df: &DataFrame,
    column: Option<&str>,
) -> Result<DataFrame, PipelineError> {
    let name = match column {
        Some(name) => {
            if df.column(name).is_err() {
                return Err(PipelineError::TimestampParseFailure {
                    column: name.to_string(),
                    reason: "column not present in table".into(),
                });
            }
            name.to_string()
        }
        None => detect_timestamp_column(df)?,
    };

    let col = df.column(&name).expect("column checked above");
    let parsed_ms = parse_column(col).ok_or_else(|| PipelineError::TimestampParseFailure {
        column: name.clone(),
        reason: "no supported format (epoch seconds/milliseconds, ISO, US or EU calendar) parses every value".into(),
    })?;

    if name != TIMESTAMP && df.column(TIMESTAMP).is_ok() {
        return Err(PipelineError::MalformedInput {
            reason: format!(
                "parsed timestamp source is '{name}' but the table already has an unrelated '{TIMESTAMP}' column"
            ),
        });
    }

    let mut out = df.clone();
    let series = Series::new(TIMESTAMP.into(), parsed_ms)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        .map_err(|e| PipelineError::TimestampParseFailure {
            column: name.clone(),
            reason: e.to_string(),
        })?;
    if name != TIMESTAMP {
        out = out.drop(&name).map_err(|e| PipelineError::MalformedInput {
            reason: e.to_string(),
        })?;
    }
    out.with_column(series)
        .map_err(|e| PipelineError::MalformedInput {
            reason: e.to_string(),
        })?;
    Ok(out)
}

/// Pick the timestamp-bearing column: well-known names first, then the
/// first column the cascade can fully parse.
fn detect_timestamp_column(df: &DataFrame) -> Result<String, PipelineError> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.as_str().to_string())
        .collect();

    for candidate in TIMESTAMP_NAMES {
        if let Some(n) = names.iter().find(|n| n.to_lowercase() == candidate) {
            return Ok(n.clone());
        }
    }
    for n in &names {
        if let Ok(col) = df.column(n) {
            if parse_column(col).is_some() {
                return Ok(n.clone());
            }
        }
    }
    Err(PipelineError::TimestampParseFailure {
        column: "<auto>".into(),
        reason: format!("no timestamp-bearing column found among: {}", names.join(", ")),
    })
}

/// Run the cascade over one column. Returns epoch milliseconds per row
/// (nulls preserved) or `None` when no step parses all values.
fn parse_column(col: &Column) -> Option<Vec<Option<i64>>> {
    match col.dtype() {
        DataType::Datetime(_, _) | DataType::Date => {
            let casted = col
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
                .ok()?;
            let ms = casted.cast(&DataType::Int64).ok()?;
            Some(ms.i64().ok()?.into_iter().collect())
        }
        dtype if is_numeric_dtype(dtype) => {
            let values: Vec<Option<f64>> = col
                .cast(&DataType::Float64)
                .ok()?
                .f64()
                .ok()?
                .into_iter()
                .collect();
            parse_numeric_epoch(&values)
        }
        DataType::String => {
            let values: Vec<Option<&str>> = col.str().ok()?.into_iter().collect();
            // Numeric-looking strings go through the epoch ranges first.
            if let Some(numeric) = all_numeric(&values) {
                if let Some(parsed) = parse_numeric_epoch(&numeric) {
                    return Some(parsed);
                }
            }
            parse_calendar(&values, false).or_else(|| parse_calendar(&values, true))
        }
        _ => None,
    }
}

/// Interpret a numeric column as epoch seconds or milliseconds by range.
///
/// Mixed or out-of-range values fail the step (no per-row guessing), so the
/// cascade can fall through to calendar parsing.
fn parse_numeric_epoch(values: &[Option<f64>]) -> Option<Vec<Option<i64>>> {
    let finite: Vec<f64> = values.iter().flatten().copied().collect();
    if finite.is_empty() {
        return None;
    }
    if finite.iter().all(|v| (EPOCH_SECONDS.0..=EPOCH_SECONDS.1).contains(v)) {
        Some(
            values
                .iter()
                .map(|v| v.map(|s| (s * 1000.0) as i64))
                .collect(),
        )
    } else if finite.iter().all(|v| (EPOCH_MILLIS.0..=EPOCH_MILLIS.1).contains(v)) {
        Some(values.iter().map(|v| v.map(|ms| ms as i64)).collect())
    } else {
        None
    }
}

fn all_numeric(values: &[Option<&str>]) -> Option<Vec<Option<f64>>> {
    let mut out = Vec::with_capacity(values.len());
    for v in values {
        match v {
            Some(s) => out.push(Some(s.trim().parse::<f64>().ok()?)),
            None => out.push(None),
        }
    }
    Some(out)
}

/// Calendar-string parse. `day_first` switches ambiguous `a/b/yyyy` forms
/// from month-day to day-month order.
fn parse_calendar(values: &[Option<&str>], day_first: bool) -> Option<Vec<Option<i64>>> {
    let mut out = Vec::with_capacity(values.len());
    let mut any = false;
    for v in values {
        match v {
            Some(s) => {
                let ms = parse_calendar_value(s.trim(), day_first)?;
                out.push(Some(ms));
                any = true;
            }
            None => out.push(None),
        }
    }
    if any {
        Some(out)
    } else {
        None
    }
}

fn parse_calendar_value(s: &str, day_first: bool) -> Option<i64> {
    // Zone-aware forms first; offsets are normalized to UTC.
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }

    const ISO_DATETIME: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];
    const ISO_DATE: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
    const MDY_DATETIME: [&str; 3] = ["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M", "%m-%d-%Y %H:%M:%S"];
    const MDY_DATE: [&str; 3] = ["%m/%d/%Y", "%m-%d-%Y", "%m/%d/%y"];
    const DMY_DATETIME: [&str; 3] = ["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M", "%d-%m-%Y %H:%M:%S"];
    const DMY_DATE: [&str; 4] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d/%m/%y"];

    for fmt in ISO_DATETIME {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    for fmt in ISO_DATE {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(midnight_ms(d));
        }
    }

    let (dt_fmts, d_fmts): (&[&str], &[&str]) = if day_first {
        (&DMY_DATETIME, &DMY_DATE)
    } else {
        (&MDY_DATETIME, &MDY_DATE)
    };
    for fmt in dt_fmts {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    for fmt in d_fmts {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(midnight_ms(d));
        }
    }
    None
}

fn midnight_ms(d: NaiveDate) -> i64 {
    d.and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc()
        .timestamp_millis()
}
