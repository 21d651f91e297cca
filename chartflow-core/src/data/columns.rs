//! Column detection and mapping to the canonical OHLCV schema.
//!
//! Resolution order per canonical field:
//! 1. explicit caller assignment
//! 2. exact case-insensitive match of the canonical name (exact lowercase wins ties)
//! 3. single-letter abbreviation (`o/h/l/c/v`)
//!
//! `open,high,low,close` are mandatory; `volume` is optional. Each resolved
//! source column must exist, be numeric, and be claimed by at most one
//! canonical field. Unresolved columns produce errors carrying up to three
//! ranked suggestions from the available column names.

use std::collections::HashMap;

use polars::prelude::*;

use crate::error::PipelineError;
use crate::schema::{available_columns, is_numeric_dtype, CANONICAL_FIELDS};

/// A validated finite mapping from canonical field → source column.
///
/// Invariant: each canonical field maps to at most one source column and
/// each source column is claimed by at most one canonical field.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    entries: Vec<(String, String)>,
}

impl ColumnMap {
    /// Build a map from (field, source column) pairs, rejecting duplicate
    /// targets on either side.
    pub fn new(pairs: Vec<(String, String)>) -> Result<Self, PipelineError> {
        let mut seen_sources: HashMap<String, String> = HashMap::new();
        let mut seen_fields: HashMap<String, String> = HashMap::new();
        for (field, source) in &pairs {
            if let Some(first) = seen_sources.get(source) {
                return Err(PipelineError::DuplicateColumnMapping {
                    column: source.clone(),
                    first: first.clone(),
                    second: field.clone(),
                });
            }
            if let Some(prev) = seen_fields.get(field) {
                return Err(PipelineError::DuplicateColumnMapping {
                    column: prev.clone(),
                    first: field.clone(),
                    second: field.clone(),
                });
            }
            seen_sources.insert(source.clone(), field.clone());
            seen_fields.insert(field.clone(), source.clone());
        }
        Ok(Self { entries: pairs })
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, s)| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(f, s)| (f.as_str(), s.as_str()))
    }
}

/// Map a table's columns to the canonical schema.
///
/// `explicit` assigns source columns per canonical field and takes
/// precedence over detection. Non-OHLCV columns pass through unchanged,
/// order preserved. Returns a new frame; the input is not modified.
pub fn map_columns(df: &DataFrame, explicit: &ColumnMap) -> Result<DataFrame, PipelineError> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.as_str().to_string())
        .collect();

    let mut resolved: Vec<(String, String)> = Vec::new(); // (field, source)
    let mut missing: Vec<&str> = Vec::new();

    for field in CANONICAL_FIELDS {
        if let Some(source) = explicit.get(field) {
            if !names.iter().any(|n| n == source) {
                return Err(PipelineError::ColumnNotFound {
                    column: source.to_string(),
                    available: available_columns(df),
                    suggestions: suggest(source, &names),
                });
            }
            resolved.push((field.to_string(), source.to_string()));
            continue;
        }
        match detect(field, &names) {
            Some(source) => resolved.push((field.to_string(), source)),
            None if field == "volume" => {} // optional
            None => missing.push(field),
        }
    }

    if !missing.is_empty() {
        let suggestions = missing
            .iter()
            .flat_map(|f| suggest(f, &names))
            .take(3)
            .collect();
        return Err(PipelineError::MissingRequiredColumn {
            missing: missing.join(","),
            available: available_columns(df),
            suggestions,
        });
    }

    // Duplicate-target detection before any rename.
    let mut claimed: HashMap<&str, &str> = HashMap::new();
    for (field, source) in &resolved {
        if let Some(first) = claimed.insert(source.as_str(), field.as_str()) {
            return Err(PipelineError::DuplicateColumnMapping {
                column: source.clone(),
                first: first.to_string(),
                second: field.clone(),
            });
        }
    }

    // Numeric check on every resolved source column.
    for (_, source) in &resolved {
        let col = df.column(source).map_err(|_| PipelineError::ColumnNotFound {
            column: source.clone(),
            available: available_columns(df),
            suggestions: suggest(source, &names),
        })?;
        if !is_numeric_dtype(col.dtype()) {
            return Err(PipelineError::NonNumericColumn {
                column: source.clone(),
                dtype: col.dtype().to_string(),
            });
        }
    }

    let mut out = df.clone();
    for (field, source) in &resolved {
        if field != source {
            out.rename(source, field.as_str().into())
                .map_err(|e| PipelineError::MalformedInput {
                    reason: format!("rename '{source}' -> '{field}' failed: {e}"),
                })?;
        }
    }
    Ok(out)
}

/// Detect the source column for one canonical field.
fn detect(field: &str, names: &[String]) -> Option<String> {
    // Exact lowercase match wins over other case variants.
    if names.iter().any(|n| n == field) {
        return Some(field.to_string());
    }
    if let Some(n) = names.iter().find(|n| n.to_lowercase() == field) {
        return Some(n.clone());
    }
    // Single-letter abbreviation: o/h/l/c/v.
    let abbrev = &field[..1];
    if let Some(n) = names.iter().find(|n| n.to_lowercase() == abbrev) {
        return Some(n.clone());
    }
    None
}

/// Up to 3 ranked suggestions for an unresolved column name.
///
/// Case-insensitive exact matches first, then bigram Dice similarity
/// above 0.5, descending. Stable order on equal scores.
pub fn suggest(target: &str, names: &[String]) -> Vec<String> {
    let target_lower = target.to_lowercase();
    let mut exact: Vec<String> = Vec::new();
    let mut scored: Vec<(f64, String)> = Vec::new();

    for name in names {
        let name_lower = name.to_lowercase();
        if name_lower == target_lower {
            exact.push(name.clone());
        } else {
            let score = dice_similarity(&target_lower, &name_lower);
            if score > 0.5 {
                scored.push((score, name.clone()));
            }
        }
    }
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    exact
        .into_iter()
        .chain(scored.into_iter().map(|(_, n)| n))
        .take(3)
        .collect()
}

/// Sørensen–Dice coefficient over character bigrams, in [0, 1].
fn dice_similarity(a: &str, b: &str) -> f64 {
    let bigrams = |s: &str| -> Vec<(char, char)> {
        let chars: Vec<char> = s.chars().collect();
        chars.windows(2).map(|w| (w[0], w[1])).collect()
    };
    let (ba, bb) = (bigrams(a), bigrams(b));
    if ba.is_empty() || bb.is_empty() {
        return if a == b { 1.0 } else { 0.0 };
    }
    let mut remaining = bb.clone();
    let mut matches = 0usize;
    for bg in &ba {
        if let Some(pos) = remaining.iter().position(|x| x == bg) {
            remaining.swap_remove(pos);
            matches += 1;
        }
    }
    (2.0 * matches as f64) / (ba.len() + bb.len()) as f64
}
