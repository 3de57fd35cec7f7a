// =============================================================================
// ICC State Machine — 11-state finite-state machine driving the strategy
// =============================================================================
//
// Transitions are a fixed table known at compile time; `transition()` looks
// up `(state, action)` and either moves to the resulting state or, for an
// unrecognized pair, logs a warning and stays put. `risk_block` is a
// wildcard: it fires from any state and forces `RiskBlocked`.

use tracing::{info, warn};

/// The eleven FSM states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FsmState {
    Flat,
    IndicationUp,
    IndicationDown,
    CorrectionUp,
    CorrectionDown,
    ContinuationUp,
    ContinuationDown,
    InTradeUp,
    InTradeDown,
    Exit,
    RiskBlocked,
}

impl std::fmt::Display for FsmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FsmState::Flat => "FLAT",
            FsmState::IndicationUp => "INDICATION_UP",
            FsmState::IndicationDown => "INDICATION_DOWN",
            FsmState::CorrectionUp => "CORRECTION_UP",
            FsmState::CorrectionDown => "CORRECTION_DOWN",
            FsmState::ContinuationUp => "CONTINUATION_UP",
            FsmState::ContinuationDown => "CONTINUATION_DOWN",
            FsmState::InTradeUp => "IN_TRADE_UP",
            FsmState::InTradeDown => "IN_TRADE_DOWN",
            FsmState::Exit => "EXIT",
            FsmState::RiskBlocked => "RISK_BLOCKED",
        };
        write!(f, "{s}")
    }
}

/// A listener observes every successful transition, including forced ones.
pub type Listener = Box<dyn Fn(FsmState, &str, FsmState) + Send + Sync>;

/// Look up the table entry for `(state, action)`. `None` means no-op.
fn lookup(state: FsmState, action: &str) -> Option<FsmState> {
    use FsmState::*;
    match (state, action) {
        (Flat, "indication_up") => Some(IndicationUp),
        (Flat, "indication_down") => Some(IndicationDown),

        (IndicationUp, "correction_up") => Some(CorrectionUp),
        (IndicationUp, "timeout") | (IndicationUp, "invalidate") => Some(Flat),

        (IndicationDown, "correction_down") => Some(CorrectionDown),
        (IndicationDown, "timeout") | (IndicationDown, "invalidate") => Some(Flat),

        (CorrectionUp, "continuation_up") => Some(ContinuationUp),
        (CorrectionUp, "timeout") | (CorrectionUp, "invalidate") => Some(Flat),

        (CorrectionDown, "continuation_down") => Some(ContinuationDown),
        (CorrectionDown, "timeout") | (CorrectionDown, "invalidate") => Some(Flat),

        (ContinuationUp, "enter_long") => Some(InTradeUp),
        (ContinuationUp, "timeout") | (ContinuationUp, "invalidate") => Some(Flat),

        (ContinuationDown, "enter_short") => Some(InTradeDown),
        (ContinuationDown, "timeout") | (ContinuationDown, "invalidate") => Some(Flat),

        (InTradeUp, "exit")
        | (InTradeUp, "stop_hit")
        | (InTradeUp, "target_hit")
        | (InTradeUp, "timeout_exit") => Some(Exit),

        (InTradeDown, "exit")
        | (InTradeDown, "stop_hit")
        | (InTradeDown, "target_hit")
        | (InTradeDown, "timeout_exit") => Some(Exit),

        (Exit, "reset") => Some(Flat),
        (RiskBlocked, "reset") => Some(Flat),

        _ => None,
    }
}

/// The state machine. Holds the current state and a set of listeners.
pub struct IccStateMachine {
    state: FsmState,
    listeners: Vec<Listener>,
}

impl Default for IccStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl IccStateMachine {
    pub fn new() -> Self {
        Self {
            state: FsmState::Flat,
            listeners: Vec::new(),
        }
    }

    pub fn state(&self) -> FsmState {
        self.state
    }

    pub fn add_listener(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    /// Apply `action` to the current state. `risk_block` is a wildcard that
    /// forces `RiskBlocked` from any state; everything else goes through the
    /// static table. Unknown pairs log a warning and leave the state as-is.
    pub fn transition(&mut self, action: &str) -> FsmState {
        if action == "risk_block" {
            return self.force_state_inner(FsmState::RiskBlocked, action);
        }

        match lookup(self.state, action) {
            Some(next) => {
                let old = self.state;
                self.state = next;
                self.notify(old, action, next);
                next
            }
            None => {
                warn!(state = %self.state, action, "no transition defined; ignoring");
                self.state
            }
        }
    }

    /// Force the state directly, bypassing the table, notifying with
    /// `action = "force"`.
    pub fn force_state(&mut self, state: FsmState) -> FsmState {
        self.force_state_inner(state, "force")
    }

    /// Force `Flat`, notifying with `action = "reset"`.
    pub fn reset(&mut self) -> FsmState {
        self.force_state_inner(FsmState::Flat, "reset")
    }

    fn force_state_inner(&mut self, state: FsmState, action: &str) -> FsmState {
        let old = self.state;
        self.state = state;
        self.notify(old, action, state);
        state
    }

    fn notify(&self, old: FsmState, action: &str, new: FsmState) {
        info!(%old, action, %new, "fsm transition");
        for listener in &self.listeners {
            listener(old, action, new);
        }
    }
}
