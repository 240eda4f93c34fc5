//! M15 breakout + M5 confirmation scanner.
//!
//! Pipeline over a stream of M5 candles:
//! 1. resample to M15 / H1
//! 2. H1 swing pivots → upper / lower zones padded by a slice of H1 ATR
//! 3. H1 EMA50 trend filter
//! 4. latest strong-bodied M15 close beyond a zone (plus ATR buffer)
//! 5. M5 bars after the breakout: zone touch followed by a confirmation candle
//!
//! Short history is not an error here; it is reported through
//! [`SignalStatus`] so a client can keep polling.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{
    candle::{Candle, Direction, Zone},
    indicators::{atr, ema, last_atr},
    patterns::{confirm, Confirmation},
    resample::{resample, Timeframe},
    zone_scan::{non_negative, ScanParameters},
};
use crate::utils::errors::ScanError;

const MIN_M15_BARS: usize = 30;
const MIN_H1_BARS: usize = 10;
const ATR_PERIOD: usize = 14;
const TREND_EMA_SPAN: usize = 50;
const TREND_SLOPE_BARS: usize = 5;
const SWING_WINDOW: usize = 5;
const ZONE_PAD_ATR: f64 = 0.2;
const ZONE_PAD_FALLBACK: f64 = 0.5;
const BREAKOUT_LOOKBACK: usize = 40;
const BREAKOUT_BUFFER_MIN: f64 = 10.0;
const BREAKOUT_BUFFER_ATR: f64 = 0.15;
const TOUCH_TOL_ATR: f64 = 0.1;
const TOUCH_ATR_FALLBACK: f64 = 5.0;
const CONFIRM_BARS: usize = 4;

pub const DEFAULT_BODY_RATIO_FILTER: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStatus {
    NoData,
    NoSetup,
    Watch,
    WaitData,
    Buy,
    Sell,
}

impl SignalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalStatus::NoData => "NO_DATA",
            SignalStatus::NoSetup => "NO_SETUP",
            SignalStatus::Watch => "WATCH",
            SignalStatus::WaitData => "WAIT_DATA",
            SignalStatus::Buy => "BUY",
            SignalStatus::Sell => "SELL",
        }
    }
}

/// Entry details of a confirmed setup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfirmedSetup {
    pub direction:       Direction,
    pub h1_zone:         [f64; 2],
    pub retest_m5_time:  DateTime<Utc>,
    pub confirm_m5_time: DateTime<Utc>,
    pub confirm_type:    Confirmation,
    pub entry:           f64,
    pub sl:              f64,
    pub tp1:             f64,
    pub tp2:             f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MtfSignal {
    pub status: SignalStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reason: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakout_m15_time: Option<DateTime<Utc>>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub setup: Option<ConfirmedSetup>,
}

impl MtfSignal {
    fn pending(status: SignalStatus, reason: &str) -> Self {
        Self {
            status,
            reason: vec![reason.to_string()],
            breakout_m15_time: None,
            setup: None,
        }
    }
}

/// H1 trend flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Trend {
    up: bool,
    down: bool,
}

impl Trend {
    fn from_h1(h1: &[Candle], ema: &[f64]) -> Self {
        let n = h1.len();
        if n < TREND_SLOPE_BARS || ema.len() != n {
            return Trend::default();
        }
        let close = h1[n - 1].close;
        let slope = ema[n - 1] - ema[n - TREND_SLOPE_BARS];
        Trend {
            up: close > ema[n - 1] && slope > 0.0,
            down: close < ema[n - 1] && slope < 0.0,
        }
    }
}

/// Upper (resistance) and lower (support) zones around the latest H1 swing
/// high and swing low. `None` when either kind of pivot is missing.
fn find_h1_zones(h1: &[Candle]) -> Option<(Zone, Zone)> {
    let half = SWING_WINDOW / 2;
    if h1.len() < SWING_WINDOW {
        return None;
    }
    let centred = half..h1.len() - half;

    let last_swing_high = centred.clone().rev().find(|&i| {
        let max = h1[i - half..=i + half].iter().map(|c| c.high).fold(f64::MIN, f64::max);
        h1[i].high == max
    })?;
    let last_swing_low = centred.rev().find(|&i| {
        let min = h1[i - half..=i + half].iter().map(|c| c.low).fold(f64::MAX, f64::min);
        h1[i].low == min
    })?;

    let pad = last_atr(h1, ATR_PERIOD).map_or(ZONE_PAD_FALLBACK, |a| ZONE_PAD_ATR * a);
    Some((
        Zone::around(h1[last_swing_high].high, pad),
        Zone::around(h1[last_swing_low].low, pad),
    ))
}

/// First M5 bar touching the zone that is followed (within
/// `CONFIRM_BARS`) by a confirmation: `(touch_idx, confirm_idx, kind)`.
fn find_confirmation(
    bars: &[Candle],
    zone: &Zone,
    direction: Direction,
) -> Option<(usize, usize, Confirmation)> {
    let atr5 = atr(bars, ATR_PERIOD);

    for (j, bar) in bars.iter().enumerate() {
        let tol = TOUCH_TOL_ATR * atr5[j].unwrap_or(TOUCH_ATR_FALLBACK);
        if !zone.touched_by(bar.low, bar.high, tol) {
            continue;
        }
        for k in j..(j + CONFIRM_BARS).min(bars.len()) {
            if let Some(kind) = confirm(bars, k, direction, atr5[k]) {
                return Some((j, k, kind));
            }
        }
    }
    None
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Run the multi-timeframe scan over M5 candles in any order.
///
/// `params.retest_window` caps how many M5 bars after the breakout are
/// searched for the retest and confirmation.
pub fn scan_mtf(
    m5: &[Candle],
    params: &ScanParameters,
    body_ratio_filter: f64,
) -> Result<MtfSignal, ScanError> {
    params.validate()?;
    non_negative("body_ratio_filter", body_ratio_filter)?;

    if m5.is_empty() {
        return Ok(MtfSignal::pending(SignalStatus::NoData, "no candle data"));
    }

    let mut m5 = m5.to_vec();
    m5.sort_by_key(|c| c.time);

    let m15 = resample(&m5, Timeframe::M15);
    let h1 = resample(&m5, Timeframe::H1);
    if m15.len() < MIN_M15_BARS || h1.len() < MIN_H1_BARS {
        return Ok(MtfSignal::pending(SignalStatus::NoSetup, "not enough M5 history"));
    }

    let Some((upper, lower)) = find_h1_zones(&h1) else {
        return Ok(MtfSignal::pending(SignalStatus::NoSetup, "no H1 zone found"));
    };

    let closes: Vec<f64> = h1.iter().map(|c| c.close).collect();
    let trend = Trend::from_h1(&h1, &ema(&closes, TREND_EMA_SPAN));

    let buffer = last_atr(&m15, ATR_PERIOD)
        .map_or(BREAKOUT_BUFFER_MIN, |a| (BREAKOUT_BUFFER_ATR * a).max(BREAKOUT_BUFFER_MIN));

    // latest qualifying bar wins; the still-forming last M15 bar is skipped
    let mut breakout: Option<(Direction, usize, Zone)> = None;
    let first = m15.len().saturating_sub(BREAKOUT_LOOKBACK).max(1);
    for (i, bar) in m15.iter().enumerate().take(m15.len() - 1).skip(first) {
        if bar.body_ratio() < body_ratio_filter {
            continue;
        }
        if trend.up && bar.close > upper.high + buffer {
            breakout = Some((Direction::Up, i, upper));
        }
        if trend.down && bar.close < lower.low - buffer {
            breakout = Some((Direction::Down, i, lower));
        }
    }

    let Some((direction, brk_idx, zone)) = breakout else {
        return Ok(MtfSignal::pending(
            SignalStatus::Watch,
            "no M15 close beyond an H1 zone with trend support",
        ));
    };
    let brk_time = m15[brk_idx].time;
    log::debug!("M15 breakout {} at {brk_time} (zone {:.2}..{:.2})", direction.as_str(), zone.low, zone.high);

    let after: Vec<Candle> = m5
        .iter()
        .filter(|c| c.time >= brk_time)
        .take(params.retest_window)
        .copied()
        .collect();
    if after.is_empty() {
        return Ok(MtfSignal::pending(SignalStatus::WaitData, "no M5 bars after the breakout yet"));
    }

    let Some((touch_idx, conf_idx, kind)) = find_confirmation(&after, &zone, direction) else {
        return Ok(MtfSignal {
            breakout_m15_time: Some(brk_time),
            ..MtfSignal::pending(SignalStatus::Watch, "zone touched but no M5 confirmation yet")
        });
    };

    let entry = after[conf_idx].close;
    let (status, sl, tp1, tp2) = match direction {
        Direction::Up => (
            SignalStatus::Buy,
            zone.low - params.sl_offset_points,
            entry + params.tp1_points,
            entry + params.tp2_points,
        ),
        _ => (
            SignalStatus::Sell,
            zone.high + params.sl_offset_points,
            entry - params.tp1_points,
            entry - params.tp2_points,
        ),
    };

    Ok(MtfSignal {
        status,
        reason: Vec::new(),
        breakout_m15_time: Some(brk_time),
        setup: Some(ConfirmedSetup {
            direction,
            h1_zone: [round2(zone.low), round2(zone.high)],
            retest_m5_time: after[touch_idx].time,
            confirm_m5_time: after[conf_idx].time,
            confirm_type: kind,
            entry: round2(entry),
            sl: round2(sl),
            tp1: round2(tp1),
            tp2: round2(tp2),
        }),
    })
}

// ======================================================================
// UNIT TESTS
// ======================================================================
