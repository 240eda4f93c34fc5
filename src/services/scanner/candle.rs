// src/services/scanner/candle.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLC bar. Construct through [`Candle::try_new`] so the
/// `low <= open,close <= high` invariant holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time:   DateTime<Utc>,
    pub open:   f64,
    pub high:   f64,
    pub low:    f64,
    pub close:  f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    /// Returns `None` for non-finite prices or a bar whose open/close
    /// falls outside its own high/low.
    pub fn try_new(
        time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Option<Self> {
        let finite = [open, high, low, close].iter().all(|p| p.is_finite());
        if !finite || low > high {
            return None;
        }
        if open < low || open > high || close < low || close > high {
            return None;
        }

        Some(Self {
            time,
            open,
            high,
            low,
            close,
            volume: if volume.is_finite() { volume } else { 0.0 },
        })
    }

    #[inline]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    #[inline]
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Body as a fraction of the full range; 0 for a zero-range bar.
    pub fn body_ratio(&self) -> f64 {
        let rng = self.range();
        if rng == 0.0 {
            0.0
        } else {
            self.body() / rng
        }
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Breakout direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    None,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::None => "none",
        }
    }
}

/// Support/resistance band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Zone {
    pub low:  f64,
    pub high: f64,
}

impl Zone {
    /// Highest high / lowest low over `candles`. `None` when empty.
    pub fn spanning(candles: &[Candle]) -> Option<Self> {
        let first = candles.first()?;
        let init = Zone {
            low: first.low,
            high: first.high,
        };
        Some(candles.iter().skip(1).fold(init, |z, c| Zone {
            low: z.low.min(c.low),
            high: z.high.max(c.high),
        }))
    }

    /// Band of half-width `pad` around `mid`.
    pub fn around(mid: f64, pad: f64) -> Self {
        Zone {
            low: mid - pad,
            high: mid + pad,
        }
    }

    #[inline]
    pub fn contains(&self, price: f64) -> bool {
        price >= self.low && price <= self.high
    }

    /// Whether the `[lo, hi]` range overlaps the zone widened by `tol`.
    pub fn touched_by(&self, lo: f64, hi: f64, tol: f64) -> bool {
        !(hi < self.low - tol || lo > self.high + tol)
    }
}
