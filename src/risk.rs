// =============================================================================
// Risk Engine — gate-style pre-trade checks plus kill/pre-kill circuit breakers
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::RiskConfig;

/// Snapshot of the risk engine's running state. Resettable at session start.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskState {
    pub daily_pnl: f64,
    pub trade_count: u32,
    pub open_positions: u32,
    pub consecutive_losses: u32,
    #[serde(skip)]
    pub last_loss_time: Option<DateTime<Utc>>,
    pub killed: bool,
    pub pre_kill_triggered: bool,
}

/// Tracks daily P&L, trade count, open positions, and consecutive losses,
/// and exposes the ordered `can_open_trade` gate.
pub struct RiskEngine {
    config: RiskConfig,
    kill_cap: f64,
    prekill_cap: f64,
    state: RiskState,
}

impl RiskEngine {
    pub fn new(config: RiskConfig) -> Self {
        let kill_cap = config.account_size * config.daily_loss_kill_pct;
        let prekill_cap = config.account_size * config.daily_loss_prekill_pct;
        Self {
            config,
            kill_cap,
            prekill_cap,
            state: RiskState::default(),
        }
    }

    pub fn state(&self) -> &RiskState {
        &self.state
    }

    /// Apply a realized P&L delta. Negative deltas extend the consecutive-
    /// loss streak and start the cooldown clock; non-negative deltas reset
    /// the streak.
    pub fn update_pnl(&mut self, delta: f64) {
        self.state.daily_pnl += delta;
        if delta < 0.0 {
            self.state.consecutive_losses += 1;
            self.state.last_loss_time = Some(Utc::now());
        } else {
            self.state.consecutive_losses = 0;
        }
    }

    pub fn record_trade(&mut self) {
        self.state.trade_count += 1;
    }

    pub fn set_open_positions(&mut self, n: u32) {
        self.state.open_positions = n;
    }

    /// Latches `killed = true` iff daily P&L is negative and its magnitude
    /// meets or exceeds `kill_cap`.
    pub fn check_kill_switch(&mut self) -> bool {
        if self.state.daily_pnl < 0.0 && self.state.daily_pnl.abs() >= self.kill_cap {
            self.state.killed = true;
        }
        self.state.killed
    }

    /// Latches `pre_kill_triggered = true` analogously at `prekill_cap`.
    pub fn check_pre_kill(&mut self) -> bool {
        if self.state.daily_pnl < 0.0 && self.state.daily_pnl.abs() >= self.prekill_cap {
            self.state.pre_kill_triggered = true;
        }
        self.state.pre_kill_triggered
    }

    /// Ordered pre-trade gate. The first failing check wins; later checks
    /// are not probed once one fails.
    pub fn can_open_trade(&mut self) -> (bool, String) {
        if self.state.killed {
            warn!("risk gate: kill switch active");
            return (false, "Kill switch active".to_string());
        }
        if self.check_kill_switch() {
            warn!("risk gate: daily loss kill triggered");
            return (false, "Daily loss kill triggered".to_string());
        }
        if self.check_pre_kill() {
            warn!("risk gate: pre-kill threshold breached");
            return (
                false,
                "Pre-kill threshold breached — no new entries".to_string(),
            );
        }
        if self.state.trade_count >= self.config.max_trades_per_session {
            let msg = format!(
                "Max trades per session reached ({}/{})",
                self.state.trade_count, self.config.max_trades_per_session
            );
            warn!("{}", msg);
            return (false, msg);
        }
        if self.state.open_positions >= self.config.max_open_positions {
            let msg = format!(
                "Max open positions reached ({}/{})",
                self.state.open_positions, self.config.max_open_positions
            );
            warn!("{}", msg);
            return (false, msg);
        }
        if self.state.consecutive_losses >= self.config.max_consecutive_losses {
            let msg = format!(
                "Max consecutive losses reached ({}/{})",
                self.state.consecutive_losses, self.config.max_consecutive_losses
            );
            warn!("{}", msg);
            return (false, msg);
        }
        if let Some(last_loss) = self.state.last_loss_time {
            let elapsed = (Utc::now() - last_loss).num_seconds();
            if elapsed < self.config.cooldown_seconds {
                let remaining = self.config.cooldown_seconds - elapsed;
                let msg = format!("Cooldown active, {remaining}s remaining");
                warn!("{}", msg);
                return (false, msg);
            }
        }
        (true, "OK".to_string())
    }

    pub fn compute_commission(&self, sides: u32) -> f64 {
        self.config.commission_per_side * sides as f64
    }

    /// Apply slippage against the side: buyers pay up, sellers receive less.
    pub fn apply_slippage(&self, price: f64, side_is_buy: bool, tick_size: f64) -> f64 {
        let slip = self.config.slippage_ticks as f64 * tick_size;
        if side_is_buy {
            price + slip
        } else {
            price - slip
        }
    }

    /// Zero all risk state for a new session.
    pub fn reset_session(&mut self) {
        self.state = RiskState::default();
    }
}
