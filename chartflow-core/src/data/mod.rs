//! Data normalization stages: ingestion, column mapping, cleaning, resampling.

pub mod clean;
pub mod columns;
pub mod ingest;
pub mod resample;
pub mod timestamps;

pub use clean::clean;
pub use columns::{map_columns, ColumnMap};
pub use ingest::{load_bytes, load_path};
pub use resample::{resample, ResampleOptions, Timeframe};
