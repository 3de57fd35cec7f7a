// =============================================================================
// Position Tracker — owns at most one open position
// =============================================================================
//
// `open_position`/`close_position` enforce the single-position invariant by
// panicking on misuse — per the core's error-handling design, an attempt to
// double-open or close-with-none indicates a bug in the caller and must
// never be reached by correct use of the core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::order_manager::Side;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub side: Side,
    pub entry_price: f64,
    pub quantity: u32,
    pub stop_price: f64,
    pub target_price: f64,
    pub entry_time: DateTime<Utc>,
    pub bars_held: u32,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.side.is_buy()
    }

    /// `(current - entry) * point_value * qty` for long, mirrored for short.
    pub fn unrealized_pnl(&self, current_price: f64, point_value: f64) -> f64 {
        let direction = if self.is_long() { 1.0 } else { -1.0 };
        (current_price - self.entry_price) * direction * point_value * self.quantity as f64
    }
}

#[derive(Default)]
pub struct PositionTracker {
    position: Option<Position>,
    pub closed_pnl: f64,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    pub fn open_position_count(&self) -> u32 {
        if self.position.is_some() {
            1
        } else {
            0
        }
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Open a new position. Panics if one is already open.
    pub fn open_position(
        &mut self,
        side: Side,
        entry_price: f64,
        stop_price: f64,
        target_price: f64,
        quantity: u32,
    ) -> &Position {
        if self.position.is_some() {
            panic!("Already holding a position");
        }
        info!(?side, entry_price, stop_price, target_price, "position opened");
        self.position = Some(Position {
            side,
            entry_price,
            quantity,
            stop_price,
            target_price,
            entry_time: Utc::now(),
            bars_held: 0,
        });
        self.position.as_ref().unwrap()
    }

    /// Close the current position at `exit_price`, subtracting `commission`
    /// from the realized P&L. Panics if no position is open.
    pub fn close_position(&mut self, exit_price: f64, commission: f64, point_value: f64) -> f64 {
        let Some(position) = self.position.take() else {
            panic!("No position to close");
        };
        let pnl = position.unrealized_pnl(exit_price, point_value) - commission;
        info!(pnl, exit_price, "position closed");
        self.closed_pnl += pnl;
        pnl
    }

    /// Intra-bar exit check, evaluated before any new entry each bar. Stop
    /// is checked first on both sides: if a bar's range crosses both stop
    /// and target, the stop wins.
    pub fn check_stop_target(&self, high: f64, low: f64) -> Option<&'static str> {
        let position = self.position.as_ref()?;
        if position.is_long() {
            if low <= position.stop_price {
                Some("stop_hit")
            } else if high >= position.target_price {
                Some("target_hit")
            } else {
                None
            }
        } else if high >= position.stop_price {
            Some("stop_hit")
        } else if low <= position.target_price {
            Some("target_hit")
        } else {
            None
        }
    }

    /// Advance the held-bar counter and return its new value, or 0 if flat.
    pub fn increment_bars(&mut self) -> u32 {
        match self.position.as_mut() {
            Some(position) => {
                position.bars_held += 1;
                position.bars_held
            }
            None => 0,
        }
    }

    pub fn unrealized_pnl(&self, current_price: f64, point_value: f64) -> f64 {
        self.position
            .as_ref()
            .map(|p| p.unrealized_pnl(current_price, point_value))
            .unwrap_or(0.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    const POINT_VALUE: f64 = 5.0;

    #[test]
    fn opens_and_closes_long() {
        let mut tracker = PositionTracker::new();
        tracker.open_position(Side::Buy, 100.0, 98.0, 104.0, 1);
        assert!(!tracker.is_flat());
        let pnl = tracker.close_position(102.0, 5.0, POINT_VALUE);
        assert_eq!(pnl, (102.0 - 100.0) * POINT_VALUE - 5.0);
        assert!(tracker.is_flat());
        assert_eq!(tracker.closed_pnl, pnl);
    }

    #[test]
    #[should_panic(expected = "Already holding a position")]
    fn double_open_panics() {
        let mut tracker = PositionTracker::new();
        tracker.open_position(Side::Buy, 100.0, 98.0, 104.0, 1);
        tracker.open_position(Side::Buy, 101.0, 99.0, 105.0, 1);
    }

    #[test]
    #[should_panic(expected = "No position to close")]
    fn close_with_none_panics() {
        let mut tracker = PositionTracker::new();
        tracker.close_position(100.0, 0.0, POINT_VALUE);
    }

    #[test]
    fn long_stop_wins_on_simultaneous_cross() {
        let mut tracker = PositionTracker::new();
        tracker.open_position(Side::Buy, 100.0, 99.0, 102.0, 1);
        assert_eq!(tracker.check_stop_target(102.5, 98.5), Some("stop_hit"));
    }

    #[test]
    fn short_stop_wins_on_simultaneous_cross() {
        let mut tracker = PositionTracker::new();
        tracker.open_position(Side::Sell, 100.0, 101.0, 98.0, 1);
        assert_eq!(tracker.check_stop_target(101.5, 97.5), Some("stop_hit"));
    }

    #[test]
    fn no_hit_returns_none() {
        let mut tracker = PositionTracker::new();
        tracker.open_position(Side::Buy, 100.0, 95.0, 105.0, 1);
        assert_eq!(tracker.check_stop_target(101.0, 99.0), None);
    }

    #[test]
    fn flat_check_stop_target_returns_none() {
        let tracker = PositionTracker::new();
        assert_eq!(tracker.check_stop_target(101.0, 99.0), None);
    }

    #[test]
    fn increment_bars_tracks_hold_time() {
        let mut tracker = PositionTracker::new();
        assert_eq!(tracker.increment_bars(), 0);
        tracker.open_position(Side::Buy, 100.0, 95.0, 105.0, 1);
        assert_eq!(tracker.increment_bars(), 1);
        assert_eq!(tracker.increment_bars(), 2);
    }

    #[test]
    fn unrealized_pnl_long_and_short() {
        let mut tracker = PositionTracker::new();
        tracker.open_position(Side::Buy, 100.0, 95.0, 105.0, 1);
        assert_eq!(tracker.unrealized_pnl(102.0, POINT_VALUE), 10.0);
        tracker.close_position(102.0, 0.0, POINT_VALUE);

        tracker.open_position(Side::Sell, 100.0, 105.0, 95.0, 1);
        assert_eq!(tracker.unrealized_pnl(98.0, POINT_VALUE), 10.0);
    }
}
