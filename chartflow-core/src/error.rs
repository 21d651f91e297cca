//! Pipeline error kinds.
//!
//! Structural errors (bad schema, unparseable timestamps, integrity
//! violations, alignment mismatches) are fatal: they abort the whole
//! pipeline call. The only locally recovered failure is a single
//! indicator inside a batch, which is logged and skipped by the engine.

use thiserror::Error;

/// Errors surfaced by any pipeline stage.
///
/// Every variant carries enough context for a caller-facing message:
/// the offending value, available alternatives, and ranked suggestions
/// for column issues.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    #[error("empty input: {reason}")]
    EmptyInput { reason: String },

    #[error("malformed input: {reason}")]
    MalformedInput { reason: String },

    #[error("missing required column(s): {missing}. Available columns: [{available}]{}", format_suggestions(.suggestions))]
    MissingRequiredColumn {
        missing: String,
        available: String,
        suggestions: Vec<String>,
    },

    #[error("column '{column}' not found. Available columns: [{available}]{}", format_suggestions(.suggestions))]
    ColumnNotFound {
        column: String,
        available: String,
        suggestions: Vec<String>,
    },

    #[error("column '{column}' is not numeric (dtype: {dtype})")]
    NonNumericColumn { column: String, dtype: String },

    #[error("duplicate column mapping: source column '{column}' assigned to both '{first}' and '{second}'")]
    DuplicateColumnMapping {
        column: String,
        first: String,
        second: String,
    },

    #[error("could not parse timestamp column '{column}': {reason}")]
    TimestampParseFailure { column: String, reason: String },

    #[error("invalid timeframe '{value}': expected <number><unit> with unit in min/h/d/w/m (e.g. '5min', '1h', '1D')")]
    InvalidTimeframeFormat { value: String },

    #[error("data integrity violation: {reason}")]
    DataIntegrityViolation { reason: String },

    #[error("serializer alignment mismatch: column '{column}' has {actual} values, expected {expected}")]
    AlignmentMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("unknown indicator type '{kind}'. Supported: sma, ema, rsi")]
    UnknownIndicatorType { kind: String },

    #[error("invalid indicator parameter for '{spec}': {reason}")]
    InvalidIndicatorParameter { spec: String, reason: String },
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(". Did you mean: {}?", suggestions.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_not_found_message_includes_suggestions() {
        let err = PipelineError::ColumnNotFound {
            column: "opne".into(),
            available: "open, high, low, close".into(),
            suggestions: vec!["open".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'opne'"));
        assert!(msg.contains("Did you mean: open?"));
    }

    #[test]
    fn missing_column_message_without_suggestions() {
        let err = PipelineError::MissingRequiredColumn {
            missing: "open,high,low,close".into(),
            available: "price, quantity".into(),
            suggestions: vec![],
        };
        let msg = err.to_string();
        assert!(msg.contains("open,high,low,close"));
        assert!(!msg.contains("Did you mean"));
    }
}
