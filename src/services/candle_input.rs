//! Request → candle decoding for the scan endpoints.
//!
//! Policy for both JSON and CSV input:
//! * a row that cannot be parsed, or whose prices break `low <= open,close <= high`,
//!   is skipped with a warning
//! * no surviving rows is a request error
//! * surviving candles are stably sorted by time (oldest first)

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::services::scanner::{Candle, ScanParameters};
use crate::utils::errors::ApiError;

const REQUIRED_COLUMNS: [&str; 5] = ["time", "open", "high", "low", "close"];

/// Epoch values above this are taken as milliseconds.
const MILLIS_THRESHOLD: f64 = 1e12;

/// `time` as sent by clients: text timestamp or epoch / sequence number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawTime {
    Number(f64),
    Text(String),
}

/// One candle record as it appears in a JSON body.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCandle {
    pub time:   RawTime,
    pub open:   f64,
    pub high:   f64,
    pub low:    f64,
    pub close:  f64,
    #[serde(default)]
    pub volume: Option<f64>,
}

/// Optional scan overrides. Accepts the long-standing short names too
/// (`retest_m5_window`, `sl_after_zone`, `tp1_pts`, `tp2_pts`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanOverrides {
    #[serde(default, alias = "retest_m5_window")]
    pub retest_window: Option<usize>,
    #[serde(default, alias = "sl_after_zone")]
    pub sl_offset_points: Option<f64>,
    #[serde(default, alias = "tp1_pts")]
    pub tp1_points: Option<f64>,
    #[serde(default, alias = "tp2_pts")]
    pub tp2_points: Option<f64>,
    #[serde(default)]
    pub body_ratio_filter: Option<f64>,
}

impl ScanOverrides {
    /// Fill unset fields from the configured defaults.
    pub fn resolve(&self, defaults: &ScanParameters) -> ScanParameters {
        ScanParameters {
            retest_window: self.retest_window.unwrap_or(defaults.retest_window),
            sl_offset_points: self.sl_offset_points.unwrap_or(defaults.sl_offset_points),
            tp1_points: self.tp1_points.unwrap_or(defaults.tp1_points),
            tp2_points: self.tp2_points.unwrap_or(defaults.tp2_points),
        }
    }
}

/// JSON body of `POST /scan` and `POST /scan/mtf`.
#[derive(Debug, Deserialize)]
pub struct ScanBody {
    pub data: Vec<Value>,
    #[serde(flatten)]
    pub overrides: ScanOverrides,
}

/// Parse a timestamp in any of the accepted layouts.
pub fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(n) = s.parse::<f64>() {
        return from_epoch(n);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    const LAYOUTS: [&str; 4] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];
    for layout in LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn from_epoch(n: f64) -> Option<DateTime<Utc>> {
    if !n.is_finite() {
        return None;
    }
    let millis = if n.abs() > MILLIS_THRESHOLD { n } else { n * 1_000.0 };
    DateTime::<Utc>::from_timestamp_millis(millis.round() as i64)
}

impl RawTime {
    fn resolve(&self) -> Option<DateTime<Utc>> {
        match self {
            RawTime::Number(n) => from_epoch(*n),
            RawTime::Text(s) => parse_time(s),
        }
    }
}

impl RawCandle {
    fn into_candle(self) -> Option<Candle> {
        Candle::try_new(
            self.time.resolve()?,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume.unwrap_or(0.0),
        )
    }
}

fn finish(mut candles: Vec<Candle>, total: usize) -> Result<Vec<Candle>, ApiError> {
    if candles.is_empty() {
        return Err(ApiError::NoUsableRows { total });
    }
    let skipped = total - candles.len();
    if skipped > 0 {
        log::warn!("skipped {skipped} of {total} malformed candle rows");
    }
    candles.sort_by_key(|c| c.time);
    Ok(candles)
}

/// Decode the `data` array of a JSON body.
pub fn candles_from_records(records: Vec<Value>) -> Result<Vec<Candle>, ApiError> {
    let total = records.len();
    let candles = records
        .into_iter()
        .enumerate()
        .filter_map(|(i, v)| match serde_json::from_value::<RawCandle>(v) {
            Ok(raw) => raw.into_candle().or_else(|| {
                log::debug!("row {i}: invalid time or OHLC values");
                None
            }),
            Err(e) => {
                log::debug!("row {i}: {e}");
                None
            }
        })
        .collect();
    finish(candles, total)
}

/// Decode a CSV upload. Header names are trimmed and matched
/// case-insensitively; extra columns are ignored.
pub fn candles_from_csv(body: &[u8]) -> Result<Vec<Candle>, ApiError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(body);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_lowercase()).collect();
    let col = |name: &str| headers.iter().position(|h| h == name);

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| col(c).is_none())
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::MissingColumns(missing));
    }
    let idx: Vec<usize> = REQUIRED_COLUMNS.iter().filter_map(|c| col(c)).collect();
    let volume_col = col("volume");

    let mut total = 0;
    let mut candles = Vec::new();
    for (line, record) in reader.records().enumerate() {
        total += 1;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                log::debug!("csv row {line}: {e}");
                continue;
            }
        };

        let price = |i: usize| record.get(idx[i]).and_then(|s| s.parse::<f64>().ok());
        let parsed = record.get(idx[0]).and_then(parse_time).and_then(|time| {
            let volume = volume_col
                .and_then(|v| record.get(v))
                .and_then(|s| s.parse::<f64>().ok())
                .unwrap_or(0.0);
            Candle::try_new(time, price(1)?, price(2)?, price(3)?, price(4)?, volume)
        });

        match parsed {
            Some(c) => candles.push(c),
            None => log::debug!("csv row {line}: invalid time or OHLC values"),
        }
    }
    finish(candles, total)
}
