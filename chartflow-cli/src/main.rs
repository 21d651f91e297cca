//! ChartFlow CLI — run the normalization pipeline over one file.
//!
//! Reads a tabular price file, maps/cleans/resamples it, computes the
//! requested indicators, and prints the column-major chart payload as
//! JSON on stdout. Logging goes to stderr, controlled by `RUST_LOG`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use chartflow_core::data::columns::ColumnMap;
use chartflow_core::data::resample::Timeframe;
use chartflow_core::{Pipeline, PipelineOptions, TimestampUnit, Tz};

#[derive(Parser)]
#[command(
    name = "chartflow",
    about = "ChartFlow — OHLCV normalization and charting pipeline"
)]
struct Cli {
    /// Input file (CSV with a header row).
    file: PathBuf,

    /// Target timeframe, e.g. 5min, 1h, 1D, 1W, 1M. Omit to keep the
    /// native frequency.
    #[arg(long)]
    timeframe: Option<String>,

    /// Indicator request, repeatable: sma, ema:9, RSI:14.
    #[arg(long = "indicator", short = 'i')]
    indicators: Vec<String>,

    /// Column assignment, repeatable: field=column (e.g. close=Last).
    #[arg(long = "map", short = 'm')]
    mappings: Vec<String>,

    /// Name of the timestamp column. Auto-detected when omitted.
    #[arg(long)]
    timestamp_column: Option<String>,

    /// Zone to localize a naive index to before resampling (default UTC).
    #[arg(long)]
    tz: Option<String>,

    /// Zone to convert to after localization.
    #[arg(long)]
    target_tz: Option<String>,

    /// Emit timestamps as epoch seconds instead of milliseconds.
    #[arg(long, default_value_t = false)]
    seconds: bool,

    /// Pretty-print the JSON payload.
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let timeframe = cli
        .timeframe
        .as_deref()
        .map(str::parse::<Timeframe>)
        .transpose()?;

    let pairs = cli
        .mappings
        .iter()
        .map(|m| {
            m.split_once('=')
                .map(|(field, column)| (field.trim().to_string(), column.trim().to_string()))
                .with_context(|| format!("invalid --map '{m}': expected field=column"))
        })
        .collect::<Result<Vec<_>>>()?;
    let mapping = ColumnMap::new(pairs)?;

    let tz: Option<Tz> = cli
        .tz
        .as_deref()
        .map(|z| z.parse().map_err(|e| anyhow::anyhow!("invalid --tz: {e}")))
        .transpose()?;
    let target_tz: Option<Tz> = cli
        .target_tz
        .as_deref()
        .map(|z| z.parse().map_err(|e| anyhow::anyhow!("invalid --target-tz: {e}")))
        .transpose()?;

    let opts = PipelineOptions {
        mapping,
        timestamp_column: cli.timestamp_column,
        timeframe,
        tz,
        target_tz,
        indicators: cli.indicators,
        unit: if cli.seconds {
            TimestampUnit::Seconds
        } else {
            TimestampUnit::Milliseconds
        },
    };

    let payload = Pipeline::run_path(&cli.file, &opts)?;
    let json = if cli.pretty {
        serde_json::to_string_pretty(&payload)?
    } else {
        serde_json::to_string(&payload)?
    };
    println!("{json}");
    Ok(())
}
