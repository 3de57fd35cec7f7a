// =============================================================================
// Strategy Engine — indication / correction / continuation methodology
// =============================================================================
//
// Stateless in configuration but carries swing-reference memory (impulse
// high/low, correction high/low, correction bar count) across bars. Each
// call to `evaluate` dispatches purely on the caller-supplied FSM state.

use tracing::debug;

use crate::candle::CandleBuffer;
use crate::config::{InstrumentConfig, StrategyConfig};
use crate::fsm::FsmState;
use crate::indicators::{
    calculate_atr, calculate_ema, ema_slope, higher_highs, higher_lows, is_in_fib_zone,
    lower_highs, lower_lows, volume_above_average,
};

/// The strategy's recommendation for the current bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub action: String,
    pub entry: Option<f64>,
    pub stop: Option<f64>,
    pub target: Option<f64>,
    pub reason: String,
}

impl Signal {
    pub fn none(reason: impl Into<String>) -> Self {
        Self {
            action: "none".to_string(),
            entry: None,
            stop: None,
            target: None,
            reason: reason.into(),
        }
    }

    pub fn action(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            entry: None,
            stop: None,
            target: None,
            reason: String::new(),
        }
    }

    pub fn entry(
        action: impl Into<String>,
        entry: f64,
        stop: f64,
        target: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            entry: Some(entry),
            stop: Some(stop),
            target: Some(target),
            reason: reason.into(),
        }
    }
}

pub struct StrategyEngine {
    config: StrategyConfig,
    instrument: InstrumentConfig,
    impulse_high: Option<f64>,
    impulse_low: Option<f64>,
    correction_high: Option<f64>,
    correction_low: Option<f64>,
    correction_bar_count: u32,
}

impl StrategyEngine {
    pub fn new(config: StrategyConfig, instrument: InstrumentConfig) -> Self {
        Self {
            config,
            instrument,
            impulse_high: None,
            impulse_low: None,
            correction_high: None,
            correction_low: None,
            correction_bar_count: 0,
        }
    }

    /// Bars a live position may be held before the trader times it out.
    pub fn trade_timeout_bars(&self) -> u32 {
        self.config.trade_timeout_bars
    }

    /// Clear all swing-reference memory. Called whenever the FSM returns to
    /// `Flat`.
    pub fn reset(&mut self) {
        self.impulse_high = None;
        self.impulse_low = None;
        self.correction_high = None;
        self.correction_low = None;
        self.correction_bar_count = 0;
    }

    pub fn evaluate(&mut self, state: FsmState, buffer: &CandleBuffer) -> Signal {
        let warmup = (self.config.ema_period + 2).max(self.config.atr_period + 2);
        if buffer.len() < warmup {
            return Signal::none("Insufficient data");
        }

        match state {
            FsmState::Flat => self.check_indication(buffer),
            FsmState::IndicationUp => self.check_correction_up(buffer),
            FsmState::IndicationDown => self.check_correction_down(buffer),
            FsmState::CorrectionUp => self.check_continuation_up(buffer),
            FsmState::CorrectionDown => self.check_continuation_down(buffer),
            FsmState::ContinuationUp => self.build_long_entry(buffer),
            FsmState::ContinuationDown => self.build_short_entry(buffer),
            _ => Signal::none(""),
        }
    }

    fn check_indication(&mut self, buffer: &CandleBuffer) -> Signal {
        let closes = buffer.closes();
        let highs = buffer.highs();
        let lows = buffer.lows();
        let volumes = buffer.volumes();

        let slope = ema_slope(&closes, self.config.ema_period);

        let up = slope.map(|s| s > 0.0).unwrap_or(false)
            && higher_highs(&highs, 2)
            && higher_lows(&lows, 2)
            && volume_above_average(&volumes, self.config.volume_avg_period);

        if up {
            let n = highs.len();
            self.impulse_high = Some(highs[n - 3..].iter().cloned().fold(f64::MIN, f64::max));
            self.impulse_low = Some(lows[n - 3..].iter().cloned().fold(f64::MAX, f64::min));
            debug!("indication_up fired");
            return Signal::action("indication_up");
        }

        let down = slope.map(|s| s < 0.0).unwrap_or(false)
            && lower_lows(&lows, 2)
            && lower_highs(&highs, 2)
            && volume_above_average(&volumes, self.config.volume_avg_period);

        if down {
            let n = highs.len();
            self.impulse_high = Some(highs[n - 3..].iter().cloned().fold(f64::MIN, f64::max));
            self.impulse_low = Some(lows[n - 3..].iter().cloned().fold(f64::MAX, f64::min));
            debug!("indication_down fired");
            return Signal::action("indication_down");
        }

        Signal::none("")
    }

    fn check_correction_up(&mut self, buffer: &CandleBuffer) -> Signal {
        self.check_correction(buffer, "correction_up")
    }

    fn check_correction_down(&mut self, buffer: &CandleBuffer) -> Signal {
        self.check_correction(buffer, "correction_down")
    }

    fn check_correction(&mut self, buffer: &CandleBuffer, action: &str) -> Signal {
        let (Some(impulse_low), Some(impulse_high)) = (self.impulse_low, self.impulse_high) else {
            return Signal::none("No impulse reference");
        };
        let Some(candle) = buffer.last() else {
            return Signal::none("No candle");
        };

        if is_in_fib_zone(
            candle.close,
            impulse_low,
            impulse_high,
            self.config.fib_min,
            self.config.fib_max,
        ) {
            self.correction_high = Some(candle.high);
            self.correction_low = Some(candle.low);
            self.correction_bar_count = 0;
            Signal::action(action)
        } else {
            Signal::none("Waiting for correction")
        }
    }

    fn check_continuation_up(&mut self, buffer: &CandleBuffer) -> Signal {
        self.check_continuation(buffer, true)
    }

    fn check_continuation_down(&mut self, buffer: &CandleBuffer) -> Signal {
        self.check_continuation(buffer, false)
    }

    fn check_continuation(&mut self, buffer: &CandleBuffer, up: bool) -> Signal {
        if self.correction_high.is_none() {
            return Signal::none("No correction reference");
        }

        self.correction_bar_count += 1;
        if self.correction_bar_count > self.config.correction_max_bars {
            let mut s = Signal::action("timeout");
            s.reason = "Correction exceeded max bars".to_string();
            return s;
        }

        let Some(candle) = buffer.last() else {
            return Signal::none("No candle");
        };

        // Compare against the watermark established by prior bars, then
        // fold this bar's own range into the watermark for the next call.
        let prior_high = self.correction_high.unwrap();
        let prior_low = self.correction_low.unwrap();

        let volumes = buffer.volumes();
        let confirmed = volume_above_average(&volumes, self.config.continuation_volume_period);

        if up && candle.close > prior_high && confirmed {
            return Signal::action("continuation_up");
        }
        if !up && candle.close < prior_low && confirmed {
            return Signal::action("continuation_down");
        }

        self.correction_high = Some(prior_high.max(candle.high));
        self.correction_low = Some(prior_low.min(candle.low));
        Signal::none("Waiting for continuation break")
    }

    fn build_long_entry(&mut self, buffer: &CandleBuffer) -> Signal {
        let (Some(correction_low), Some(correction_high)) = (self.correction_low, self.correction_high)
        else {
            return Signal::none("");
        };
        let Some(atr) = self.current_atr(buffer) else {
            return Signal::none("ATR not available");
        };

        let entry = correction_high + self.instrument.tick_size;
        let stop = correction_low - self.config.stop_atr_mult * atr;
        let target = entry + self.config.target_atr_mult * atr;
        Signal::entry("enter_long", entry, stop, target, "")
    }

    fn build_short_entry(&mut self, buffer: &CandleBuffer) -> Signal {
        let (Some(correction_low), Some(correction_high)) = (self.correction_low, self.correction_high)
        else {
            return Signal::none("");
        };
        let Some(atr) = self.current_atr(buffer) else {
            return Signal::none("ATR not available");
        };

        let entry = correction_low - self.instrument.tick_size;
        let stop = correction_high + self.config.stop_atr_mult * atr;
        let target = entry - self.config.target_atr_mult * atr;
        Signal::entry("enter_short", entry, stop, target, "")
    }

    fn current_atr(&self, buffer: &CandleBuffer) -> Option<f64> {
        let highs = buffer.highs();
        let lows = buffer.lows();
        let closes = buffer.closes();
        calculate_atr(&highs, &lows, &closes, self.config.atr_period)
    }
}

/// Exposed for completeness with the indicator module; unused internally
/// but kept available to callers that want a raw EMA read.
#[allow(dead_code)]
fn ema_last(values: &[f64], period: usize) -> Option<f64> {
    calculate_ema(values, period).last().copied()
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::candle::Candle;
    use chrono::Utc;

    fn cfg() -> StrategyConfig {
        StrategyConfig {
            ema_period: 5,
            atr_period: 5,
            volume_avg_period: 5,
            continuation_volume_period: 3,
            fib_min: 0.382,
            fib_max: 0.618,
            correction_max_bars: 5,
            stop_atr_mult: 1.0,
            target_atr_mult: 2.0,
            trade_timeout_bars: 10,
        }
    }

    fn build_uptrend_buffer(n: usize, base_price: f64) -> CandleBuffer {
        let mut buf = CandleBuffer::with_default_capacity();
        for i in 0..n {
            let close = base_price + i as f64 * 0.5;
            let volume = if i == n - 1 { 2000 } else { 1000 };
            buf.append(Candle::new(
                Utc::now(),
                close - 0.3,
                close + 0.5,
                close - 0.5,
                close,
                volume,
                "MES",
            ));
        }
        buf
    }

    fn build_downtrend_buffer(n: usize, base_price: f64) -> CandleBuffer {
        let mut buf = CandleBuffer::with_default_capacity();
        for i in 0..n {
            let close = base_price - i as f64 * 0.5;
            let volume = if i == n - 1 { 2000 } else { 1000 };
            buf.append(Candle::new(
                Utc::now(),
                close + 0.3,
                close + 0.5,
                close - 0.5,
                close,
                volume,
                "MES",
            ));
        }
        buf
    }

    #[test]
    fn insufficient_data_yields_none() {
        let mut engine = StrategyEngine::new(cfg(), InstrumentConfig::default());
        let mut buf = CandleBuffer::with_default_capacity();
        buf.append(Candle::new(Utc::now(), 100.0, 101.0, 99.0, 100.0, 1000, "MES"));
        let signal = engine.evaluate(FsmState::Flat, &buf);
        assert_eq!(signal.action, "none");
    }

    #[test]
    fn uptrend_yields_indication_up() {
        let mut engine = StrategyEngine::new(cfg(), InstrumentConfig::default());
        let buf = build_uptrend_buffer(30, 100.0);
        let signal = engine.evaluate(FsmState::Flat, &buf);
        assert_eq!(signal.action, "indication_up");
        assert!(engine.impulse_high.is_some());
    }

    #[test]
    fn downtrend_yields_indication_down() {
        let mut engine = StrategyEngine::new(cfg(), InstrumentConfig::default());
        let buf = build_downtrend_buffer(30, 150.0);
        let signal = engine.evaluate(FsmState::Flat, &buf);
        assert_eq!(signal.action, "indication_down");
    }

    #[test]
    fn no_indication_on_flat_market() {
        let mut engine = StrategyEngine::new(cfg(), InstrumentConfig::default());
        let mut buf = CandleBuffer::with_default_capacity();
        for _ in 0..30 {
            buf.append(Candle::new(Utc::now(), 100.0, 100.5, 99.5, 100.0, 1000, "MES"));
        }
        let signal = engine.evaluate(FsmState::Flat, &buf);
        assert_eq!(signal.action, "none");
    }

    #[test]
    fn long_entry_has_ordered_levels() {
        let mut engine = StrategyEngine::new(cfg(), InstrumentConfig::default());
        engine.correction_high = Some(103.0);
        engine.correction_low = Some(101.0);
        let buf = build_uptrend_buffer(30, 100.0);
        let signal = engine.evaluate(FsmState::ContinuationUp, &buf);
        assert_eq!(signal.action, "enter_long");
        assert!(signal.stop.unwrap() < signal.entry.unwrap());
        assert!(signal.entry.unwrap() < signal.target.unwrap());
    }

    #[test]
    fn correction_timeout_after_max_bars() {
        let mut engine = StrategyEngine::new(cfg(), InstrumentConfig::default());
        engine.correction_high = Some(103.0);
        engine.correction_low = Some(101.0);
        // Flat buffer: closes never approach correction_high, so no
        // continuation breakout fires before the bar-count timeout does.
        let mut buf = CandleBuffer::with_default_capacity();
        for _ in 0..30 {
            buf.append(Candle::new(Utc::now(), 100.0, 100.5, 99.5, 100.0, 1000, "MES"));
        }
        let mut last = Signal::none("");
        for _ in 0..6 {
            last = engine.evaluate(FsmState::CorrectionUp, &buf);
            if last.action == "timeout" {
                break;
            }
        }
        assert_eq!(last.action, "timeout");
    }

    #[test]
    fn reset_clears_memory() {
        let mut engine = StrategyEngine::new(cfg(), InstrumentConfig::default());
        engine.impulse_high = Some(1.0);
        engine.correction_low = Some(1.0);
        engine.correction_bar_count = 3;
        engine.reset();
        assert!(engine.impulse_high.is_none());
        assert!(engine.correction_low.is_none());
        assert_eq!(engine.correction_bar_count, 0);
    }
}
