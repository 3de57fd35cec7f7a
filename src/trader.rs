// =============================================================================
// Trader — single-entry-point orchestrator
// =============================================================================
//
// `on_candle` is the sole entry point and drives the buffer, position
// tracker, risk engine, strategy engine, FSM, and order manager in a fixed
// sequence on every bar. The Trader is deliberately free of any internal
// locking: the core's concurrency model requires a single caller thread.

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::alert::{self, AlertSink};
use crate::broker::BrokerAdapter;
use crate::candle::{Candle, CandleBuffer};
use crate::config::{InstrumentConfig, RiskConfig, StrategyConfig};
use crate::events::{EventBus, EventKind};
use crate::fsm::{FsmState, IccStateMachine};
use crate::order_manager::{Order, OrderManager, OrderStatus, OrderType, Side};
use crate::payload;
use crate::position::PositionTracker;
use crate::risk::RiskEngine;
use crate::strategy::StrategyEngine;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub side: String,
    pub entry_price: f64,
    pub stop_price: f64,
    pub target_price: f64,
    pub bars_held: u32,
    pub unrealized_pnl: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleSnapshot {
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// The plain-map reader the core exposes to external observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub fsm_state: String,
    pub daily_pnl: f64,
    pub trade_count: u32,
    pub is_flat: bool,
    pub candle_count: usize,
    pub risk_killed: bool,
    pub position: Option<PositionSnapshot>,
    pub last_candle: Option<CandleSnapshot>,
}

pub struct Trader {
    fsm: IccStateMachine,
    risk: RiskEngine,
    strategy: StrategyEngine,
    oms: OrderManager,
    positions: PositionTracker,
    buffer: CandleBuffer,
    instrument: InstrumentConfig,
    trade_count: u32,
    alert_sink: Option<Box<dyn AlertSink>>,
    pub events: EventBus,
}

impl Trader {
    pub fn new(
        strategy_config: StrategyConfig,
        risk_config: RiskConfig,
        instrument: InstrumentConfig,
        broker: Box<dyn BrokerAdapter>,
        alert_sink: Option<Box<dyn AlertSink>>,
    ) -> Self {
        Self {
            fsm: IccStateMachine::new(),
            risk: RiskEngine::new(risk_config),
            strategy: StrategyEngine::new(strategy_config, instrument.clone()),
            oms: OrderManager::new(broker),
            positions: PositionTracker::new(),
            buffer: CandleBuffer::with_default_capacity(),
            instrument,
            trade_count: 0,
            alert_sink,
            events: EventBus::with_default_capacity(),
        }
    }

    pub fn fsm_state(&self) -> FsmState {
        self.fsm.state()
    }

    /// Reset risk, FSM, strategy memory, and the candle buffer for a new
    /// session.
    pub fn start_session(&mut self) {
        self.risk.reset_session();
        self.fsm.reset();
        self.strategy.reset();
        self.buffer = CandleBuffer::with_default_capacity();
        self.events.emit(EventKind::SessionStarted, payload! {});
    }

    /// Flatten any open position at `last_close`, then mark the session
    /// stopped. The caller is responsible for ceasing to deliver bars.
    pub fn stop_session(&mut self, last_close: f64) {
        if !self.positions.is_flat() {
            self.exit_position(last_close, "session_flatten");
        }
        self.events.emit(EventKind::SessionStopped, payload! {});
    }

    /// The sole entry point. Must not be called concurrently.
    pub fn on_candle(&mut self, candle: Candle) {
        // 1. Append + emit.
        self.buffer.append(candle.clone());
        self.events.emit(
            EventKind::Candle,
            payload! {
                "open" => candle.open,
                "high" => candle.high,
                "low" => candle.low,
                "close" => candle.close,
                "volume" => candle.volume,
                "timestamp" => candle.timestamp.to_rfc3339(),
            },
        );

        // 2. Exit check + timeout, if currently in a position.
        if !self.positions.is_flat() {
            if let Some(reason) = self.positions.check_stop_target(candle.high, candle.low) {
                let exit_price = self
                    .positions
                    .position()
                    .map(|p| if reason == "stop_hit" { p.stop_price } else { p.target_price })
                    .unwrap_or(candle.close);
                self.exit_position(exit_price, reason);
                return;
            }
            if self.positions.is_flat() {
                return;
            }
            let bars = self.positions.increment_bars();
            if bars >= self.strategy_timeout_bars() {
                self.exit_position(candle.close, "timeout_exit");
                return;
            }
        }

        // 3. Keep risk's open-position count current.
        self.risk.set_open_positions(self.positions.open_position_count());

        // 4. Kill switch check.
        if self.risk.check_kill_switch() {
            self.handle_kill_switch(candle);
            return;
        }

        // 5. Strategy evaluation.
        let signal = self.strategy.evaluate(self.fsm.state(), &self.buffer);
        if signal.action == "none" {
            return;
        }

        // 6/7. Entry vs. generic transition.
        if signal.action == "enter_long" || signal.action == "enter_short" {
            self.handle_entry(&signal, candle);
        } else if signal.action == "timeout" {
            self.fsm.transition("timeout");
            self.strategy.reset();
            self.emit_fsm_transition("timeout");
        } else {
            self.fsm.transition(&signal.action);
            self.emit_fsm_transition(&signal.action);
        }
    }

    fn strategy_timeout_bars(&self) -> u32 {
        self.strategy.trade_timeout_bars()
    }

    fn handle_entry(&mut self, signal: &crate::strategy::Signal, candle: Candle) {
        let (allowed, reason) = self.risk.can_open_trade();
        if !allowed {
            self.fsm.transition("risk_block");
            self.events
                .emit(EventKind::RiskVeto, payload! {"reason" => reason});
            return;
        }

        let side = if signal.action == "enter_long" {
            Side::Buy
        } else {
            Side::Sell
        };
        let order = Order::new(OrderType::Stop, side, signal.entry, 1);
        let filled = self.oms.submit(order);

        if filled.status == OrderStatus::Filled {
            let fill_price = filled.filled_price.unwrap_or(candle.close);
            let action = signal.action.clone();
            self.fsm.transition(&action);
            self.positions.open_position(
                side,
                fill_price,
                signal.stop.unwrap_or(fill_price),
                signal.target.unwrap_or(fill_price),
                1,
            );
            self.risk.record_trade();
            self.trade_count += 1;
            self.events.emit(
                EventKind::Entry,
                payload! {
                    "side" => format!("{side:?}"),
                    "entry_price" => fill_price,
                    "stop_price" => signal.stop.unwrap_or(fill_price),
                    "target_price" => signal.target.unwrap_or(fill_price),
                },
            );
        } else {
            self.fsm.transition("invalidate");
        }
    }

    fn exit_position(&mut self, exit_price: f64, reason: &str) {
        let side = self.positions.position().map(|p| format!("{:?}", p.side));
        let entry_price = self.positions.position().map(|p| p.entry_price);

        let commission = self.risk.compute_commission(2);
        let pnl = self
            .positions
            .close_position(exit_price, commission, self.instrument.point_value);
        self.risk.update_pnl(pnl);

        let transition_action = match reason {
            "stop_hit" | "target_hit" | "timeout_exit" => reason,
            _ => "exit",
        };
        self.fsm.transition(transition_action);
        self.fsm.transition("reset");
        self.strategy.reset();

        self.events.emit(
            EventKind::Exit,
            payload! {
                "side" => side.unwrap_or_default(),
                "entry_price" => entry_price.unwrap_or(0.0),
                "exit_price" => exit_price,
                "pnl" => pnl,
                "reason" => reason,
                "daily_pnl" => self.risk.state().daily_pnl,
            },
        );

        if pnl < 0.0 {
            alert::notify(
                self.alert_sink.as_deref(),
                "trade_loss",
                &format!("Trade closed at {exit_price:.2} for pnl {pnl:.2}"),
            );
        }
    }

    fn handle_kill_switch(&mut self, candle: Candle) {
        error!(daily_pnl = self.risk.state().daily_pnl, "kill switch triggered");
        if !self.positions.is_flat() {
            self.exit_position(candle.close, "kill_switch");
        }
        self.fsm.force_state(FsmState::RiskBlocked);
        self.events.emit(
            EventKind::KillSwitch,
            payload! {"daily_pnl" => self.risk.state().daily_pnl},
        );
        alert::notify(
            self.alert_sink.as_deref(),
            "kill_switch",
            "Daily loss kill switch triggered",
        );
    }

    fn emit_fsm_transition(&self, action: &str) {
        self.events.emit(
            EventKind::FsmTransition,
            payload! {"action" => action, "state" => self.fsm.state().to_string()},
        );
    }

    pub fn get_snapshot(&self) -> Snapshot {
        let position = self.positions.position().map(|p| PositionSnapshot {
            side: format!("{:?}", p.side),
            entry_price: p.entry_price,
            stop_price: p.stop_price,
            target_price: p.target_price,
            bars_held: p.bars_held,
            unrealized_pnl: self
                .buffer
                .last()
                .map(|c| p.unrealized_pnl(c.close, self.instrument.point_value))
                .unwrap_or(0.0),
        });

        let last_candle = self.buffer.last().map(|c| CandleSnapshot {
            timestamp: c.timestamp.to_rfc3339(),
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
        });

        Snapshot {
            fsm_state: self.fsm.state().to_string(),
            daily_pnl: self.risk.state().daily_pnl,
            trade_count: self.trade_count,
            is_flat: self.positions.is_flat(),
            candle_count: self.buffer.len(),
            risk_killed: self.risk.state().killed,
            position,
            last_candle,
        }
    }
}
