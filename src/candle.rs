// =============================================================================
// Candle & CandleBuffer — single-symbol bounded history of OHLCV bars
// =============================================================================

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default bound for a trading session's candle history.
pub const DEFAULT_MAX_CANDLES: usize = 200;

/// One fixed-interval OHLCV sample. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub symbol: String,
}

impl Candle {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
        symbol: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            symbol: symbol.into(),
        }
    }

    /// Midpoint of the bar's range.
    pub fn mid(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// Absolute size of the candle body.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// True if the close is at or above the open.
    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }
}

/// Bounded FIFO of the most recent candles for one instrument.
///
/// Appending past `max_candles` drops the oldest bar. Column accessors
/// return views ordered oldest-first (same order as internal storage).
pub struct CandleBuffer {
    candles: VecDeque<Candle>,
    max_candles: usize,
}

impl CandleBuffer {
    pub fn new(max_candles: usize) -> Self {
        Self {
            candles: VecDeque::with_capacity(max_candles.max(1)),
            max_candles: max_candles.max(1),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_MAX_CANDLES)
    }

    /// Append a new closed candle, trimming the oldest if over capacity.
    pub fn append(&mut self, candle: Candle) {
        self.candles.push_back(candle);
        while self.candles.len() > self.max_candles {
            self.candles.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Most recent candle, or `None` if the buffer is empty.
    pub fn last(&self) -> Option<&Candle> {
        self.candles.back()
    }

    /// All candles, oldest first.
    pub fn candles(&self) -> impl Iterator<Item = &Candle> {
        self.candles.iter()
    }

    /// Last `n` candles (or fewer, if the buffer holds fewer), oldest first.
    pub fn last_n(&self, n: usize) -> Vec<Candle> {
        let len = self.candles.len();
        let skip = len.saturating_sub(n);
        self.candles.iter().skip(skip).cloned().collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.low).collect()
    }

    pub fn volumes(&self) -> Vec<u64> {
        self.candles.iter().map(|c| c.volume).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn bar(close: f64, volume: u64) -> Candle {
        Candle::new(Utc::now(), close, close + 1.0, close - 1.0, close, volume, "MES")
    }

    #[test]
    fn ring_buffer_trimming() {
        let mut buf = CandleBuffer::new(3);
        for i in 0..5 {
            buf.append(bar(100.0 + i as f64, 10));
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.closes(), vec![102.0, 103.0, 104.0]);
    }

    #[test]
    fn last_close_empty_returns_none() {
        let buf = CandleBuffer::with_default_capacity();
        assert!(buf.last().is_none());
    }

    #[test]
    fn last_n_returns_fewer_when_buffer_short() {
        let mut buf = CandleBuffer::new(10);
        buf.append(bar(100.0, 10));
        buf.append(bar(101.0, 10));
        assert_eq!(buf.last_n(5).len(), 2);
    }

    #[test]
    fn derived_fields() {
        let c = Candle::new(Utc::now(), 100.0, 105.0, 95.0, 102.0, 10, "MES");
        assert_eq!(c.mid(), 100.0);
        assert_eq!(c.body(), 2.0);
        assert!(c.is_bullish());
    }
}
