// src/services/scanner/patterns.rs
//
// M5 confirmation candles after a zone touch: engulfing, pin bar, marubozu.

use serde::Serialize;

use super::candle::{Candle, Direction};

const ENGULF_MIN_ATR_FRACTION: f64 = 0.4;
const PIN_WICK_MULT: f64 = 2.0;
const PIN_CLOSE_UP: f64 = 0.70;
const PIN_CLOSE_DOWN: f64 = 0.30;
const MARUBOZU_BODY_RATIO: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confirmation {
    #[serde(rename = "Engulfing(M5)")]
    Engulfing,
    #[serde(rename = "PinBar(M5)")]
    PinBar,
    #[serde(rename = "Marubozu(M5)")]
    Marubozu,
}

/// Check bar `idx` (needs a previous bar) for a confirmation in `direction`.
///
/// `atr` gates the engulfing body size; without it no engulfing is reported.
pub fn confirm(candles: &[Candle], idx: usize, direction: Direction, atr: Option<f64>) -> Option<Confirmation> {
    if idx < 1 {
        return None;
    }
    let row = candles.get(idx)?;
    let prev = candles.get(idx - 1)?;

    let rng = row.range();
    if rng <= 0.0 {
        return None;
    }
    let body = row.body();

    let with_trend = match direction {
        Direction::Up => row.is_bullish(),
        Direction::Down => row.is_bearish(),
        Direction::None => return None,
    };

    let engulfs = row.open.min(row.close) <= prev.open.min(prev.close)
        && row.open.max(row.close) >= prev.open.max(prev.close)
        && atr.is_some_and(|a| body >= ENGULF_MIN_ATR_FRACTION * a);
    if engulfs && with_trend {
        return Some(Confirmation::Engulfing);
    }

    if body > 0.0
        && (row.upper_wick() >= PIN_WICK_MULT * body || row.lower_wick() >= PIN_WICK_MULT * body)
    {
        let close_pos = (row.close - row.low) / rng;
        let rejected = match direction {
            Direction::Up => close_pos >= PIN_CLOSE_UP,
            _ => close_pos <= PIN_CLOSE_DOWN,
        };
        if rejected {
            return Some(Confirmation::PinBar);
        }
    }

    if body / rng >= MARUBOZU_BODY_RATIO && with_trend {
        return Some(Confirmation::Marubozu);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn pair(prev: (f64, f64, f64, f64), row: (f64, f64, f64, f64)) -> Vec<Candle> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        [prev, row]
            .iter()
            .enumerate()
            .map(|(i, &(o, h, l, c))| {
                Candle::try_new(t0 + Duration::minutes(5 * i as i64), o, h, l, c, 0.0).unwrap()
            })
            .collect()
    }

    #[test]
    fn first_bar_never_confirms() {
        let c = pair((10.0, 11.0, 9.0, 10.5), (10.0, 12.0, 10.0, 12.0));
        assert_eq!(confirm(&c, 0, Direction::Up, Some(1.0)), None);
    }

    #[test]
    fn bullish_engulfing_with_atr() {
        // prev body 10.2..10.8, row body 10.0..11.0 covers it
        let c = pair((10.8, 11.0, 10.0, 10.2), (10.0, 11.5, 9.5, 11.0));
        assert_eq!(confirm(&c, 1, Direction::Up, Some(2.0)), Some(Confirmation::Engulfing));
        // same bar without ATR falls through; body ratio 0.5 is no marubozu
        assert_eq!(confirm(&c, 1, Direction::Up, None), None);
    }

    #[test]
    fn engulfing_against_direction_is_ignored() {
        let c = pair((10.8, 11.0, 10.0, 10.2), (10.0, 11.5, 9.5, 11.0));
        assert_eq!(confirm(&c, 1, Direction::Down, Some(2.0)), None);
    }

    #[test]
    fn hammer_is_bullish_pin_bar() {
        // long lower wick, close near the top
        let c = pair((10.0, 10.5, 9.5, 10.0), (9.8, 10.05, 8.0, 10.0));
        assert_eq!(confirm(&c, 1, Direction::Up, None), Some(Confirmation::PinBar));
        assert_eq!(confirm(&c, 1, Direction::Down, None), None);
    }

    #[test]
    fn shooting_star_is_bearish_pin_bar() {
        let c = pair((10.0, 10.5, 9.5, 10.0), (10.2, 12.0, 9.95, 10.0));
        assert_eq!(confirm(&c, 1, Direction::Down, None), Some(Confirmation::PinBar));
    }

    #[test]
    fn full_body_bar_is_marubozu() {
        let c = pair((10.0, 10.5, 9.5, 10.0), (12.0, 12.1, 9.9, 10.0));
        assert_eq!(confirm(&c, 1, Direction::Down, None), Some(Confirmation::Marubozu));
        assert_eq!(confirm(&c, 1, Direction::Up, None), None);
    }

    #[test]
    fn zero_range_bar_is_skipped() {
        let c = pair((10.0, 10.5, 9.5, 10.0), (10.0, 10.0, 10.0, 10.0));
        assert_eq!(confirm(&c, 1, Direction::Up, Some(1.0)), None);
    }

    #[test]
    fn labels_match_wire_names() {
        assert_eq!(serde_json::to_value(Confirmation::PinBar).unwrap(), "PinBar(M5)");
    }
}
