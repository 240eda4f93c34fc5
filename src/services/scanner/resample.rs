// src/services/scanner/resample.rs

use chrono::{DateTime, Utc};

use super::candle::Candle;

/// Higher timeframes built from M5 input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    M15,
    H1,
}

impl Timeframe {
    pub fn seconds(&self) -> i64 {
        match self {
            Timeframe::M15 => 900,
            Timeframe::H1 => 3_600,
        }
    }
}

/// Aggregate time-sorted candles into epoch-aligned buckets.
///
/// open = first, high = max, low = min, close = last, volume = sum. Buckets
/// with no input are not emitted; each output bar is stamped with its bucket
/// start.
pub fn resample(candles: &[Candle], tf: Timeframe) -> Vec<Candle> {
    let secs = tf.seconds();
    let mut out: Vec<Candle> = Vec::new();

    for c in candles {
        let start = c.time.timestamp().div_euclid(secs) * secs;
        let Some(bucket) = DateTime::<Utc>::from_timestamp(start, 0) else {
            continue;
        };

        match out.last_mut() {
            Some(agg) if agg.time == bucket => {
                agg.high = agg.high.max(c.high);
                agg.low = agg.low.min(c.low);
                agg.close = c.close;
                agg.volume += c.volume;
            }
            _ => out.push(Candle { time: bucket, ..*c }),
        }
    }
    out
}
