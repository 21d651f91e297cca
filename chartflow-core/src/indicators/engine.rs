//! Indicator request parsing and batch computation.
//!
//! Requests arrive as strings like `"RSI:14"` — case-insensitive type,
//! optional colon-delimited period. An unknown type is a fatal
//! configuration error; an invalid parameter or a failed computation
//! inside a batch is logged and that indicator skipped, letting the rest
//! of the batch succeed.

use std::str::FromStr;

use tracing::warn;

use super::{Ema, Indicator, Rsi, Sma};
use crate::error::PipelineError;

/// Where the renderer places an indicator: on the price panel or below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    Overlay,
    Subplot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
}

impl IndicatorKind {
    fn default_period(self) -> usize {
        match self {
            IndicatorKind::Sma | IndicatorKind::Ema => 20,
            IndicatorKind::Rsi => 14,
        }
    }

    /// Moving averages share the price scale; oscillators get their own panel.
    pub fn panel(self) -> PanelKind {
        match self {
            IndicatorKind::Sma | IndicatorKind::Ema => PanelKind::Overlay,
            IndicatorKind::Rsi => PanelKind::Subplot,
        }
    }
}

/// A parsed and validated indicator request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorSpec {
    pub kind: IndicatorKind,
    pub period: usize,
}

impl IndicatorSpec {
    /// Series name, e.g. `sma_20`.
    pub fn name(&self) -> String {
        let prefix = match self.kind {
            IndicatorKind::Sma => "sma",
            IndicatorKind::Ema => "ema",
            IndicatorKind::Rsi => "rsi",
        };
        format!("{prefix}_{}", self.period)
    }

    fn build(&self) -> Box<dyn Indicator> {
        match self.kind {
            IndicatorKind::Sma => Box::new(Sma::new(self.period)),
            IndicatorKind::Ema => Box::new(Ema::new(self.period)),
            IndicatorKind::Rsi => Box::new(Rsi::new(self.period)),
        }
    }
}

impl FromStr for IndicatorSpec {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (kind_str, period_str) = match trimmed.split_once(':') {
            Some((k, p)) => (k.trim(), Some(p.trim())),
            None => (trimmed, None),
        };

        let kind = match kind_str.to_lowercase().as_str() {
            "sma" => IndicatorKind::Sma,
            "ema" => IndicatorKind::Ema,
            "rsi" => IndicatorKind::Rsi,
            _ => {
                return Err(PipelineError::UnknownIndicatorType {
                    kind: kind_str.to_string(),
                })
            }
        };

        let period = match period_str {
            None | Some("") => kind.default_period(),
            Some(p) => {
                let parsed: usize =
                    p.parse().map_err(|_| PipelineError::InvalidIndicatorParameter {
                        spec: s.to_string(),
                        reason: format!("period '{p}' is not a positive integer"),
                    })?;
                if parsed == 0 {
                    return Err(PipelineError::InvalidIndicatorParameter {
                        spec: s.to_string(),
                        reason: "period must be >= 1".into(),
                    });
                }
                parsed
            }
        };

        Ok(IndicatorSpec { kind, period })
    }
}

/// One successfully computed indicator series, aligned 1:1 with the bars.
#[derive(Debug, Clone)]
pub struct ComputedIndicator {
    pub name: String,
    pub panel: PanelKind,
    pub values: Vec<f64>,
}

/// Batch indicator computation over a single price series.
pub struct IndicatorEngine;

impl IndicatorEngine {
    /// Compute all requested indicators over `prices`.
    ///
    /// An unknown indicator type aborts the call. An invalid parameter is
    /// logged and skipped; the remaining requests still compute. Duplicate
    /// names compute once.
    pub fn compute_batch(
        prices: &[f64],
        requests: &[String],
    ) -> Result<Vec<ComputedIndicator>, PipelineError> {
        let mut out: Vec<ComputedIndicator> = Vec::with_capacity(requests.len());

        for request in requests {
            let spec = match request.parse::<IndicatorSpec>() {
                Ok(spec) => spec,
                Err(err @ PipelineError::UnknownIndicatorType { .. }) => return Err(err),
                Err(err) => {
                    warn!(request = %request, error = %err, "skipping indicator");
                    continue;
                }
            };

            let name = spec.name();
            if out.iter().any(|c| c.name == name) {
                warn!(indicator = %name, "duplicate indicator request ignored");
                continue;
            }

            let values = spec.build().compute(prices);
            if values.len() != prices.len() {
                warn!(
                    indicator = %name,
                    expected = prices.len(),
                    actual = values.len(),
                    "indicator output misaligned, skipping"
                );
                continue;
            }
            out.push(ComputedIndicator {
                name,
                panel: spec.kind.panel(),
                values,
            });
        }

        Ok(out)
    }
}
