//! Timeframe resampling with OHLC semantics.
//!
//! Aggregation per output bin: open = first, high = max, low = min,
//! close = last, volume = sum; bins with no input rows are dropped. A
//! timezone-naive index is localized to the caller's zone (default UTC)
//! before binning; a different target zone converts after localization.
//! Fixed-duration units (`min`, `h`) bin on the instant timeline with
//! epoch-anchored truncation, so DST transitions neither drop nor
//! duplicate bins and repeated fall-back wall hours stay distinct.
//! Calendar units (`D`, `W`, `M`) truncate wall-clock time in the
//! working zone.
//!
//! After aggregation, integrity is verified before returning: volume
//! conservation, per-bar OHLC invariants, and (for fixed-duration intraday
//! frequencies) even output spacing.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use polars::prelude::*;
use tracing::debug;

use crate::error::PipelineError;
use crate::schema::{
    column_as_f64, is_numeric_dtype, timestamps_ms, verify_bar_invariants, CANONICAL_FIELDS,
    TIMESTAMP,
};

/// Relative tolerance for volume conservation.
const VOLUME_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeframeUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl TimeframeUnit {
    /// Canonical suffix: minutes/hours lowercase, calendar units uppercase.
    fn suffix(self) -> &'static str {
        match self {
            TimeframeUnit::Minute => "min",
            TimeframeUnit::Hour => "h",
            TimeframeUnit::Day => "D",
            TimeframeUnit::Week => "W",
            TimeframeUnit::Month => "M",
        }
    }

    /// Fixed duration in milliseconds, for intraday units only.
    fn fixed_ms(self) -> Option<i64> {
        match self {
            TimeframeUnit::Minute => Some(60_000),
            TimeframeUnit::Hour => Some(3_600_000),
            _ => None,
        }
    }
}

/// A validated `<positive integer><unit>` timeframe, e.g. "5min", "1h", "1D".
///
/// Units: `min`, `h`, `d`/`D`, `w`/`W`, `m`/`M` (case-insensitive; `m` alone
/// is months). Seconds and years are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeframe {
    multiplier: u32,
    unit: TimeframeUnit,
}

impl Timeframe {
    pub fn new(multiplier: u32, unit: TimeframeUnit) -> Result<Self, PipelineError> {
        if multiplier == 0 {
            return Err(PipelineError::InvalidTimeframeFormat {
                value: format!("0{}", unit.suffix()),
            });
        }
        Ok(Self { multiplier, unit })
    }

    pub fn unit(&self) -> TimeframeUnit {
        self.unit
    }

    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    /// Canonical form, e.g. `5min`, `1h`, `1D`, `2W`, `3M`.
    pub fn canonical(&self) -> String {
        format!("{}{}", self.multiplier, self.unit.suffix())
    }

    /// Expected bin spacing in milliseconds, for fixed-duration units.
    fn fixed_spacing_ms(&self) -> Option<i64> {
        self.unit.fixed_ms().map(|ms| ms * self.multiplier as i64)
    }

    /// Truncate a wall-clock time to the start of its bin. Fixed-duration
    /// units truncate on the epoch-anchored instant grid; calendar units
    /// truncate in calendar terms.
    fn bin_start(&self, wall: NaiveDateTime) -> NaiveDateTime {
        let m = self.multiplier as i64;
        match self.unit {
            TimeframeUnit::Minute | TimeframeUnit::Hour => {
                let step = self.fixed_spacing_ms().expect("fixed-duration unit");
                let ms = wall.and_utc().timestamp_millis().div_euclid(step) * step;
                DateTime::from_timestamp_millis(ms)
                    .expect("truncation stays in range")
                    .naive_utc()
            }
            TimeframeUnit::Day => {
                let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch");
                let days = wall.date().signed_duration_since(epoch).num_days();
                let binned = days.div_euclid(m) * m;
                (epoch + Duration::days(binned)).and_hms_opt(0, 0, 0).expect("midnight")
            }
            TimeframeUnit::Week => {
                // Weeks start on Monday; 1970-01-05 is the first epoch Monday.
                let anchor = NaiveDate::from_ymd_opt(1970, 1, 5).expect("anchor");
                let days = wall.date().signed_duration_since(anchor).num_days();
                let weeks = days.div_euclid(7 * m) * m;
                (anchor + Duration::weeks(weeks)).and_hms_opt(0, 0, 0).expect("midnight")
            }
            TimeframeUnit::Month => {
                let months = i64::from(wall.year()) * 12 + i64::from(wall.month0());
                let binned = months.div_euclid(m) * m;
                let year = binned.div_euclid(12) as i32;
                let month = (binned.rem_euclid(12) + 1) as u32;
                NaiveDate::from_ymd_opt(year, month, 1)
                    .expect("first of month")
                    .and_hms_opt(0, 0, 0)
                    .expect("midnight")
            }
        }
    }
}

impl FromStr for Timeframe {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PipelineError::InvalidTimeframeFormat {
            value: s.to_string(),
        };
        let trimmed = s.trim();
        let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
        let rest = &trimmed[digits.len()..];
        if digits.is_empty() || rest.is_empty() {
            return Err(invalid());
        }
        let multiplier: u32 = digits.parse().map_err(|_| invalid())?;
        let unit = match rest.to_lowercase().as_str() {
            "min" => TimeframeUnit::Minute,
            "h" => TimeframeUnit::Hour,
            "d" => TimeframeUnit::Day,
            "w" => TimeframeUnit::Week,
            "m" => TimeframeUnit::Month,
            // Seconds and years are explicitly unsupported.
            _ => return Err(invalid()),
        };
        Timeframe::new(multiplier, unit)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Resampling options. A naive index is localized to `tz` (default UTC);
/// `target_tz` converts the localized instants before binning.
#[derive(Debug, Clone, Default)]
pub struct ResampleOptions {
    pub tz: Option<Tz>,
    pub target_tz: Option<Tz>,
}

struct Bin {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume_sum: f64,
    /// last non-NaN value per passthrough column
    passthrough: Vec<f64>,
}

/// Aggregate a bar table to a coarser timeframe. Returns a new table with
/// bin-start timestamps (UTC instants); verifies integrity before returning.
pub fn resample(
    df: &DataFrame,
    timeframe: Timeframe,
    opts: &ResampleOptions,
) -> Result<DataFrame, PipelineError> {
    let ts = timestamps_ms(df)?;
    if ts.iter().any(|t| t.is_none()) {
        return Err(PipelineError::DataIntegrityViolation {
            reason: "resample input has undefined timestamps (run the cleaner first)".into(),
        });
    }
    let n = df.height();

    let open = column_as_f64(df, "open")?;
    let high = column_as_f64(df, "high")?;
    let low = column_as_f64(df, "low")?;
    let close = column_as_f64(df, "close")?;
    let has_volume = df.column("volume").is_ok();
    let volume = if has_volume {
        Some(column_as_f64(df, "volume")?)
    } else {
        None
    };

    // Numeric passthrough columns survive with last-value aggregation.
    let passthrough_names: Vec<String> = df
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
    let passthrough: Vec<Vec<f64>> = passthrough_names
        .iter()
        .map(|name| column_as_f64(df, name))
        .collect::<Result<_, _>>()?;

    let source_tz = opts.tz.unwrap_or(chrono_tz::UTC);
    let working_tz = opts.target_tz.unwrap_or(source_tz);

    let spacing = timeframe.fixed_spacing_ms();
    let mut bins: BTreeMap<i64, Bin> = BTreeMap::new();
    for i in 0..n {
        let naive_ms = ts[i].expect("checked above");
        let instant = localize(naive_ms, source_tz)?;
        // Fixed-duration bins are epoch-anchored instants; wall-clock
        // truncation would collapse the repeated fall-back hour.
        let bin_ms = match spacing {
            Some(step) => instant.timestamp_millis().div_euclid(step) * step,
            None => {
                let wall = instant.with_timezone(&working_tz).naive_local();
                localize_wall(timeframe.bin_start(wall), working_tz).timestamp_millis()
            }
        };

        let bin = bins.entry(bin_ms).or_insert_with(|| Bin {
            open: f64::NAN,
            high: f64::NAN,
            low: f64::NAN,
            close: f64::NAN,
            volume_sum: 0.0,
            passthrough: vec![f64::NAN; passthrough_names.len()],
        });
        if bin.open.is_nan() && !open[i].is_nan() {
            bin.open = open[i];
        }
        if !high[i].is_nan() && !(bin.high >= high[i]) {
            bin.high = high[i];
        }
        if !low[i].is_nan() && !(bin.low <= low[i]) {
            bin.low = low[i];
        }
        if !close[i].is_nan() {
            bin.close = close[i];
        }
        if let Some(vol) = &volume {
            if !vol[i].is_nan() {
                bin.volume_sum += vol[i];
            }
        }
        for (j, col) in passthrough.iter().enumerate() {
            if !col[i].is_nan() {
                bin.passthrough[j] = col[i];
            }
        }
    }
    debug!(input_rows = n, output_rows = bins.len(), timeframe = %timeframe, "resampled");

    let out = bins_to_frame(&bins, &passthrough_names, has_volume)?;
    verify_integrity(df, &out, timeframe)?;
    Ok(out)
}

/// Interpret naive epoch milliseconds as wall-clock time in `tz`.
fn localize(naive_ms: i64, tz: Tz) -> Result<DateTime<Tz>, PipelineError> {
    let wall = DateTime::from_timestamp_millis(naive_ms)
        .ok_or_else(|| PipelineError::DataIntegrityViolation {
            reason: format!("timestamp {naive_ms} out of range"),
        })?
        .naive_utc();
    Ok(localize_wall(wall, tz))
}

/// Resolve a wall-clock time in `tz`, handling DST edges: ambiguous times
/// take the earlier offset; skipped times roll forward one hour.
fn localize_wall(wall: NaiveDateTime, tz: Tz) -> DateTime<Tz> {
    match tz.from_local_datetime(&wall) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let shifted = wall + Duration::hours(1);
            match tz.from_local_datetime(&shifted) {
                LocalResult::Single(dt) => dt,
                LocalResult::Ambiguous(earliest, _) => earliest,
                LocalResult::None => Utc
                    .from_utc_datetime(&wall)
                    .with_timezone(&tz),
            }
        }
    }
}

fn bins_to_frame(
    bins: &BTreeMap<i64, Bin>,
    passthrough_names: &[String],
    has_volume: bool,
) -> Result<DataFrame, PipelineError> {
    let ts: Vec<i64> = bins.keys().copied().collect();
    let to_opt = |v: f64| if v.is_nan() { None } else { Some(v) };

    let ts_series = Series::new(TIMESTAMP.into(), ts)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        .map_err(|e| PipelineError::MalformedInput {
            reason: e.to_string(),
        })?;

    let mut cols = vec![Column::from(ts_series)];
    let fields: [(&str, fn(&Bin) -> f64); 4] = [
        ("open", |b| b.open),
        ("high", |b| b.high),
        ("low", |b| b.low),
        ("close", |b| b.close),
    ];
    for (name, get) in fields {
        let values: Vec<Option<f64>> = bins.values().map(|b| to_opt(get(b))).collect();
        cols.push(Column::from(Series::new(name.into(), values)));
    }
    if has_volume {
        let values: Vec<f64> = bins.values().map(|b| b.volume_sum).collect();
        cols.push(Column::from(Series::new("volume".into(), values)));
    }
    for (j, name) in passthrough_names.iter().enumerate() {
        let values: Vec<Option<f64>> = bins.values().map(|b| to_opt(b.passthrough[j])).collect();
        cols.push(Column::from(Series::new(name.as_str().into(), values)));
    }

    DataFrame::new(cols).map_err(|e| PipelineError::MalformedInput {
        reason: e.to_string(),
    })
}

/// Post-aggregation integrity verification.
fn verify_integrity(
    input: &DataFrame,
    output: &DataFrame,
    timeframe: Timeframe,
) -> Result<(), PipelineError> {
    // (1) Volume conservation, undefined values excluded from the sums.
    if input.column("volume").is_ok() && output.column("volume").is_ok() {
        let sum = |df: &DataFrame| -> Result<f64, PipelineError> {
            Ok(column_as_f64(df, "volume")?
                .iter()
                .filter(|v| !v.is_nan())
                .sum())
        };
        let vol_in = sum(input)?;
        let vol_out = sum(output)?;
        let tolerance = VOLUME_TOLERANCE * vol_in.abs().max(1.0);
        if (vol_in - vol_out).abs() > tolerance {
            return Err(PipelineError::DataIntegrityViolation {
                reason: format!(
                    "volume not conserved: input total {vol_in}, output total {vol_out}"
                ),
            });
        }
    }

    // (2) Every output bar satisfies the OHLC invariants.
    verify_bar_invariants(output)?;

    // (3) Even spacing for fixed-duration frequencies. Calendar units are
    // exempt (month lengths and DST days vary legitimately).
    if let Some(expected) = timeframe.fixed_spacing_ms() {
        let ts: Vec<i64> = timestamps_ms(output)?.into_iter().flatten().collect();
        for pair in ts.windows(2) {
            let gap = pair[1] - pair[0];
            if gap != expected {
                return Err(PipelineError::DataIntegrityViolation {
                    reason: format!(
                        "uneven output spacing for {timeframe}: gap of {gap}ms between bins, expected {expected}ms"
                    ),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn minute_frame(start_ms: i64, closes: &[f64]) -> DataFrame {
        let n = closes.len();
        let ts: Vec<i64> = (0..n as i64).map(|i| start_ms + i * 60_000).collect();
        let opens: Vec<f64> = closes.iter().map(|c| c - 0.5).collect();
        let highs: Vec<f64> = closes.iter().map(|c| c + 1.0).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 1.0).collect();
        let volumes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        let ts_series = Series::new(TIMESTAMP.into(), ts)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        DataFrame::new(vec![
            Column::from(ts_series),
            Column::from(Series::new("open".into(), opens)),
            Column::from(Series::new("high".into(), highs)),
            Column::from(Series::new("low".into(), lows)),
            Column::from(Series::new("close".into(), closes)),
            Column::from(Series::new("volume".into(), volumes)),
        ])
        .unwrap()
    }

    #[test]
    fn timeframe_parses_and_normalizes_casing() {
        assert_eq!("5MIN".parse::<Timeframe>().unwrap().canonical(), "5min");
        assert_eq!("1H".parse::<Timeframe>().unwrap().canonical(), "1h");
        assert_eq!("1d".parse::<Timeframe>().unwrap().canonical(), "1D");
        assert_eq!("2w".parse::<Timeframe>().unwrap().canonical(), "2W");
        assert_eq!("3m".parse::<Timeframe>().unwrap().canonical(), "3M");
    }

    #[test]
    fn timeframe_rejects_seconds_years_and_garbage() {
        for bad in ["30s", "1sec", "1y", "1year", "h", "5", "", "-1h", "1.5h", "0min"] {
            assert!(
                bad.parse::<Timeframe>().is_err(),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn five_minute_aggregation_uses_ohlc_semantics() {
        // 10 one-minute bars starting on a 5-minute boundary.
        let start = 1_700_000_100_000_i64 / 300_000 * 300_000;
        let df = minute_frame(start, &[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0, 18.0, 19.0]);
        let tf: Timeframe = "5min".parse().unwrap();
        let out = resample(&df, tf, &ResampleOptions::default()).unwrap();

        assert_eq!(out.height(), 2);
        let open = column_as_f64(&out, "open").unwrap();
        let high = column_as_f64(&out, "high").unwrap();
        let low = column_as_f64(&out, "low").unwrap();
        let close = column_as_f64(&out, "close").unwrap();
        let volume = column_as_f64(&out, "volume").unwrap();

        assert_eq!(open[0], 9.5); // first open
        assert_eq!(high[0], 15.0); // max high of first 5 bars
        assert_eq!(low[0], 9.0); // min low
        assert_eq!(close[0], 14.0); // last close
        assert_eq!(volume[0], 100.0 + 101.0 + 102.0 + 103.0 + 104.0);
        assert_eq!(close[1], 19.0);
    }

    #[test]
    fn total_volume_is_conserved() {
        let start = 1_700_000_400_000_i64;
        let df = minute_frame(start, &[10.0; 30]);
        let tf: Timeframe = "5min".parse().unwrap();
        let out = resample(&df, tf, &ResampleOptions::default()).unwrap();

        let vol_in: f64 = column_as_f64(&df, "volume").unwrap().iter().sum();
        let vol_out: f64 = column_as_f64(&out, "volume").unwrap().iter().sum();
        assert!((vol_in - vol_out).abs() < 1e-6 * vol_in.abs());
    }

    #[test]
    fn output_bars_satisfy_invariants() {
        let start = 1_700_000_400_000_i64;
        let df = minute_frame(start, &[10.0, 20.0, 5.0, 15.0, 12.0]);
        let tf: Timeframe = "5min".parse().unwrap();
        let out = resample(&df, tf, &ResampleOptions::default()).unwrap();
        assert!(verify_bar_invariants(&out).is_ok());
    }

    #[test]
    fn gap_in_fixed_frequency_output_is_fatal() {
        // Two clusters an hour apart: the 5-minute output has a gap.
        let start = 1_700_000_400_000_i64;
        let a = minute_frame(start, &[10.0, 11.0, 12.0, 13.0, 14.0]);
        let b = minute_frame(start + 3_600_000, &[20.0, 21.0, 22.0, 23.0, 24.0]);
        let df = a.vstack(&b).unwrap();
        let tf: Timeframe = "5min".parse().unwrap();
        let err = resample(&df, tf, &ResampleOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::DataIntegrityViolation { .. }));
    }

    #[test]
    fn calendar_units_tolerate_uneven_spacing() {
        // Daily bars with a weekend gap resampled to 1D: bins are dropped,
        // spacing is uneven, and that is fine for calendar units.
        let day = 86_400_000_i64;
        let friday = 1_699_574_400_000_i64; // 2023-11-10 00:00 UTC
        let ts = vec![friday, friday + 3 * day]; // Friday, Monday
        let ts_series = Series::new(TIMESTAMP.into(), ts)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        let df = DataFrame::new(vec![
            Column::from(ts_series),
            Column::from(Series::new("open".into(), &[1.0, 2.0])),
            Column::from(Series::new("high".into(), &[2.0, 3.0])),
            Column::from(Series::new("low".into(), &[0.5, 1.5])),
            Column::from(Series::new("close".into(), &[1.5, 2.5])),
            Column::from(Series::new("volume".into(), &[10.0, 20.0])),
        ])
        .unwrap();
        let tf: Timeframe = "1D".parse().unwrap();
        let out = resample(&df, tf, &ResampleOptions::default()).unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn week_bins_start_on_monday() {
        let tf: Timeframe = "1W".parse().unwrap();
        // 2023-11-15 is a Wednesday; its week starts Monday 2023-11-13.
        let wed = NaiveDate::from_ymd_opt(2023, 11, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let start = tf.bin_start(wed);
        assert_eq!(start.date(), NaiveDate::from_ymd_opt(2023, 11, 13).unwrap());
    }

    #[test]
    fn month_bins_truncate_to_first() {
        let tf: Timeframe = "1M".parse().unwrap();
        let mid = NaiveDate::from_ymd_opt(2024, 2, 14)
            .unwrap()
            .and_hms_opt(15, 30, 0)
            .unwrap();
        let start = tf.bin_start(mid);
        assert_eq!(start.date(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(start.time().hour(), 0);
    }

    #[test]
    fn dst_transition_preserves_all_bins() {
        // US/Eastern spring-forward: 2024-03-10, 02:00 wall time skipped.
        // Hourly input in UTC covering the transition, resampled to 1h in
        // New York: every input bar must land in exactly one bin.
        let ny: Tz = "America/New_York".parse().unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(5, 0, 0) // 00:00 New York
            .unwrap()
            .and_utc()
            .timestamp_millis();
        let n = 6;
        let ts: Vec<i64> = (0..n).map(|i| start + i * 3_600_000).collect();
        let ts_series = Series::new(TIMESTAMP.into(), ts)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        let df = DataFrame::new(vec![
            Column::from(ts_series),
            Column::from(Series::new("open".into(), closes.clone())),
            Column::from(Series::new("high".into(), closes.iter().map(|c| c + 1.0).collect::<Vec<_>>())),
            Column::from(Series::new("low".into(), closes.iter().map(|c| c - 1.0).collect::<Vec<_>>())),
            Column::from(Series::new("close".into(), closes.clone())),
            Column::from(Series::new("volume".into(), vec![1.0; n as usize])),
        ])
        .unwrap();

        let tf: Timeframe = "1h".parse().unwrap();
        let opts = ResampleOptions {
            tz: Some(chrono_tz::UTC),
            target_tz: Some(ny),
        };
        let out = resample(&df, tf, &opts).unwrap();

        assert_eq!(out.height() as i64, n, "no bin dropped or duplicated");
        let vol: f64 = column_as_f64(&out, "volume").unwrap().iter().sum();
        assert_eq!(vol, n as f64);
    }

    #[test]
    fn dst_fall_back_keeps_repeated_hours_distinct() {
        // US/Eastern fall-back: 2024-11-03, the 01:00 wall hour occurs
        // twice. Hourly UTC input across the transition, resampled to 1h
        // in New York: both 01:00 hours stay separate bins and the output
        // remains evenly spaced.
        let ny: Tz = "America/New_York".parse().unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 11, 3)
            .unwrap()
            .and_hms_opt(4, 0, 0) // 00:00 New York (EDT)
            .unwrap()
            .and_utc()
            .timestamp_millis();
        let n = 6;
        let ts: Vec<i64> = (0..n).map(|i| start + i * 3_600_000).collect();
        let ts_series = Series::new(TIMESTAMP.into(), ts)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        let df = DataFrame::new(vec![
            Column::from(ts_series),
            Column::from(Series::new("open".into(), closes.clone())),
            Column::from(Series::new("high".into(), closes.iter().map(|c| c + 1.0).collect::<Vec<_>>())),
            Column::from(Series::new("low".into(), closes.iter().map(|c| c - 1.0).collect::<Vec<_>>())),
            Column::from(Series::new("close".into(), closes.clone())),
            Column::from(Series::new("volume".into(), vec![1.0; n as usize])),
        ])
        .unwrap();

        let tf: Timeframe = "1h".parse().unwrap();
        let opts = ResampleOptions {
            tz: Some(chrono_tz::UTC),
            target_tz: Some(ny),
        };
        let out = resample(&df, tf, &opts).unwrap();

        assert_eq!(out.height() as i64, n, "no bin dropped or merged");
        let vol: f64 = column_as_f64(&out, "volume").unwrap().iter().sum();
        assert_eq!(vol, n as f64);
    }

    #[test]
    fn non_dividing_multiplier_spans_midnight() {
        // 7 does not divide the day; contiguous minutes across midnight
        // must still land on one uniform epoch-anchored grid.
        let midnight = 1_700_006_400_000_i64;
        let start = midnight - 14 * 60_000;
        let df = minute_frame(start, &[10.0; 28]);
        let tf: Timeframe = "7min".parse().unwrap();
        let out = resample(&df, tf, &ResampleOptions::default()).unwrap();

        assert_eq!(out.height(), 5);
        let vol_in: f64 = column_as_f64(&df, "volume").unwrap().iter().sum();
        let vol_out: f64 = column_as_f64(&out, "volume").unwrap().iter().sum();
        assert!((vol_in - vol_out).abs() < 1e-6 * vol_in.abs());
    }

    #[test]
    fn passthrough_numeric_columns_take_last_value() {
        let start = 1_700_000_400_000_i64;
        let mut df = minute_frame(start, &[10.0, 11.0, 12.0, 13.0, 14.0]);
        df.with_column(Series::new("oi".into(), &[1.0, 2.0, 3.0, 4.0, 5.0]))
            .unwrap();
        let tf: Timeframe = "5min".parse().unwrap();
        let out = resample(&df, tf, &ResampleOptions::default()).unwrap();
        let oi = column_as_f64(&out, "oi").unwrap();
        assert_eq!(oi, vec![5.0]);
    }

    #[test]
    fn empty_bins_are_dropped_not_emitted() {
        let start = 1_700_006_400_000_i64; // hour boundary
        // Bars only in minutes 0-4; a 2min resample of 5 bars yields 3 bins,
        // none empty, all within the same 10-minute window.
        let df = minute_frame(start, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let tf: Timeframe = "2min".parse().unwrap();
        let out = resample(&df, tf, &ResampleOptions::default()).unwrap();
        assert_eq!(out.height(), 3);
    }
}
