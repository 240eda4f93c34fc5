//! Candle-window breakout / retest scan.
//!
//! The sequence is split into a zone-forming prefix and the most recent
//! `retest_window` candles. The zone is the prefix's high/low band; the last
//! close decides the breakout direction, and any candle after the first
//! breakout close that dips (or pops) back into the band counts as a retest.
//!
//! When `retest_window` swallows the whole sequence the zone is built from
//! every candle and only the last candle is treated as recent. Since a close
//! never leaves its own bar's range, that degenerate case always reports
//! `none`.

use serde::{Deserialize, Serialize};

use super::candle::{Candle, Direction, Zone};
use crate::utils::errors::ScanError;

/// One candle for the zone, one to test against it.
pub const MIN_CANDLES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanParameters {
    /// Most-recent candles inspected for the breakout and retest.
    pub retest_window: usize,
    /// Distance beyond the zone for the stop-loss.
    pub sl_offset_points: f64,
    pub tp1_points: f64,
    pub tp2_points: f64,
}

impl Default for ScanParameters {
    fn default() -> Self {
        Self {
            retest_window: 24,
            sl_offset_points: 12.0,
            tp1_points: 25.0,
            tp2_points: 50.0,
        }
    }
}

impl ScanParameters {
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.retest_window == 0 {
            return Err(ScanError::invalid("retest_window", "must be positive"));
        }
        non_negative("sl_offset_points", self.sl_offset_points)?;
        non_negative("tp1_points", self.tp1_points)?;
        non_negative("tp2_points", self.tp2_points)?;
        Ok(())
    }
}

pub(crate) fn non_negative(name: &'static str, v: f64) -> Result<(), ScanError> {
    if !v.is_finite() {
        Err(ScanError::invalid(name, format!("must be finite, got {v}")))
    } else if v < 0.0 {
        Err(ScanError::invalid(name, format!("must be non-negative, got {v}")))
    } else {
        Ok(())
    }
}

/// Risk levels, only produced for an actual breakout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradeLevels {
    pub entry:         f64,
    pub stop_loss:     f64,
    pub take_profit_1: f64,
    pub take_profit_2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScanResult {
    pub direction: Direction,
    pub retest:    bool,
    pub zone_high: f64,
    pub zone_low:  f64,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub levels:    Option<TradeLevels>,
}

impl ScanResult {
    fn flat(zone: Zone) -> Self {
        Self {
            direction: Direction::None,
            retest: false,
            zone_high: zone.high,
            zone_low: zone.low,
            levels: None,
        }
    }
}

/// Scan `candles` (oldest first) for a breakout of the historical zone.
pub fn scan(candles: &[Candle], params: &ScanParameters) -> Result<ScanResult, ScanError> {
    if candles.len() < MIN_CANDLES {
        return Err(ScanError::InsufficientData {
            required: MIN_CANDLES,
            actual: candles.len(),
        });
    }
    params.validate()?;

    let window = params.retest_window.min(candles.len());
    let split = candles.len() - window;
    let (zone_src, recent) = if split == 0 {
        (candles, &candles[candles.len() - 1..])
    } else {
        candles.split_at(split)
    };

    let (Some(zone), Some(last)) = (Zone::spanning(zone_src), recent.last()) else {
        return Err(ScanError::InsufficientData {
            required: MIN_CANDLES,
            actual: candles.len(),
        });
    };

    let direction = if last.close > zone.high {
        Direction::Up
    } else if last.close < zone.low {
        Direction::Down
    } else {
        return Ok(ScanResult::flat(zone));
    };

    let levels = match direction {
        Direction::Up => TradeLevels {
            entry: last.close,
            stop_loss: zone.low - params.sl_offset_points,
            take_profit_1: last.close + params.tp1_points,
            take_profit_2: last.close + params.tp2_points,
        },
        _ => TradeLevels {
            entry: last.close,
            stop_loss: zone.high + params.sl_offset_points,
            take_profit_1: last.close - params.tp1_points,
            take_profit_2: last.close - params.tp2_points,
        },
    };

    Ok(ScanResult {
        direction,
        retest: has_retest(recent, &zone, direction),
        zone_high: zone.high,
        zone_low: zone.low,
        levels: Some(levels),
    })
}

/// Any candle after the first breakout close whose low (up) or high (down)
/// sits back inside the zone.
fn has_retest(recent: &[Candle], zone: &Zone, direction: Direction) -> bool {
    let broke_out = |c: &Candle| match direction {
        Direction::Up => c.close > zone.high,
        Direction::Down => c.close < zone.low,
        Direction::None => false,
    };

    let Some(brk) = recent.iter().position(broke_out) else {
        return false;
    };

    recent[brk + 1..].iter().any(|c| match direction {
        Direction::Up => zone.contains(c.low),
        Direction::Down => zone.contains(c.high),
        Direction::None => false,
    })
}

// ======================================================================
// UNIT TESTS
// ======================================================================
