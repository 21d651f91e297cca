//! Raw tabular ingestion.
//!
//! Loads raw bytes (from a file or an in-memory buffer), decodes them as
//! UTF-8 with a Latin-1 fallback, parses CSV with schema inference, parses
//! the timestamp column via the format cascade, and returns a table sorted
//! ascending by timestamp (stable sort). This is the only stage that
//! touches the filesystem; everything downstream is a pure transform.

use std::io::Cursor;
use std::path::Path;

use polars::prelude::*;
use tracing::debug;

use crate::data::timestamps::parse_timestamp_column;
use crate::error::PipelineError;
use crate::schema::TIMESTAMP;

/// Load a table from a file on disk.
pub fn load_path(path: &Path, timestamp_column: Option<&str>) -> Result<DataFrame, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    if path.is_dir() {
        return Err(PipelineError::MalformedInput {
            reason: format!("'{}' is a directory, not a file", path.display()),
        });
    }
    let bytes = std::fs::read(path).map_err(|e| PipelineError::MalformedInput {
        reason: format!("could not read '{}': {e}", path.display()),
    })?;
    load_bytes(&bytes, timestamp_column)
}

/// Load a table from raw bytes.
pub fn load_bytes(bytes: &[u8], timestamp_column: Option<&str>) -> Result<DataFrame, PipelineError> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(PipelineError::EmptyInput {
            reason: "input contains no data".into(),
        });
    }

    let text = decode_text(bytes);
    let df = parse_csv(&text)?;
    if df.height() == 0 {
        return Err(PipelineError::EmptyInput {
            reason: "table has a header but no rows".into(),
        });
    }
    debug!(rows = df.height(), cols = df.width(), "ingested raw table");

    let df = parse_timestamp_column(&df, timestamp_column)?;
    sort_by_timestamp(df)
}

/// Decode bytes as UTF-8, falling back to Latin-1 (a total decoding:
/// every byte maps to the code point of the same value).
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn parse_csv(text: &str) -> Result<DataFrame, PipelineError> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .into_reader_with_file_handle(Cursor::new(text.as_bytes().to_vec()))
        .finish()
        .map_err(|e| PipelineError::MalformedInput {
            reason: format!("CSV parse failed: {e}"),
        })
}

/// Stable ascending sort by the parsed timestamp column.
fn sort_by_timestamp(df: DataFrame) -> Result<DataFrame, PipelineError> {
    df.sort(
        [TIMESTAMP],
        SortMultipleOptions::default()
            .with_order_descending(false)
            .with_maintain_order(true)
            .with_nulls_last(true),
    )
    .map_err(|e| PipelineError::MalformedInput {
        reason: format!("sort by timestamp failed: {e}"),
    })
}
