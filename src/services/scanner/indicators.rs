// src/services/scanner/indicators.rs
//
// Rolling indicators over candle slices. Values that are not yet defined
// (warm-up bars) come back as `None` instead of NaN.

use super::candle::Candle;

/// True range per bar. The first bar has no previous close and is `None`.
pub fn true_range(candles: &[Candle]) -> Vec<Option<f64>> {
    candles
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let prev_close = candles.get(i.checked_sub(1)?)?.close;
            Some(
                c.range()
                    .max((c.high - prev_close).abs())
                    .max((c.low - prev_close).abs()),
            )
        })
        .collect()
}

/// Simple moving average of the last `period` true ranges.
///
/// The first defined value sits at index `period`, because the true range
/// of bar 0 is undefined.
pub fn atr(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    let tr = true_range(candles);
    if period == 0 {
        return vec![None; tr.len()];
    }

    (0..tr.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            let window = &tr[i + 1 - period..=i];
            let sum = window.iter().copied().sum::<Option<f64>>()?;
            Some(sum / period as f64)
        })
        .collect()
}

/// Last defined ATR value of the series, if the series is long enough.
pub fn last_atr(candles: &[Candle], period: usize) -> Option<f64> {
    atr(candles, period).last().copied().flatten()
}

/// Recursive EMA seeded with the first value, `alpha = 2 / (span + 1)`.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        let next = match prev {
            None => v,
            Some(p) => alpha * v + (1.0 - alpha) * p,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}
