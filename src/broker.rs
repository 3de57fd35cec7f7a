// =============================================================================
// Broker adapter contract + deterministic backtest implementation
// =============================================================================

use crate::order_manager::{Fill, Order, OrderType};

/// Capability set a broker must expose. Backtest and live implementations
/// are interchangeable at this boundary; only the backtest adapter is
/// provided here — live connectivity is out of scope for the core.
pub trait BrokerAdapter: Send + Sync {
    fn submit_order(&self, order: &Order) -> Option<Fill>;
    fn cancel_order(&self, order: &Order) -> bool;
    fn get_positions(&self) -> Vec<String>;
    fn connect(&mut self) -> bool;
    fn disconnect(&mut self);
}

/// Deterministic fill simulator: fills at the intended price plus slippage
/// against the side (or at the intended price outright for market orders),
/// and rejects any non-market order with no price.
pub struct BacktestBroker {
    slippage_ticks: u32,
    commission_per_side: f64,
    tick_size: f64,
    connected: bool,
}

impl BacktestBroker {
    pub fn new(slippage_ticks: u32, commission_per_side: f64) -> Self {
        Self {
            slippage_ticks,
            commission_per_side,
            tick_size: 0.25,
            connected: false,
        }
    }

    pub fn with_tick_size(mut self, tick_size: f64) -> Self {
        self.tick_size = tick_size;
        self
    }
}

impl BrokerAdapter for BacktestBroker {
    fn submit_order(&self, order: &Order) -> Option<Fill> {
        if order.price.is_none() && order.order_type != OrderType::Market {
            return None;
        }

        let slippage = self.slippage_ticks as f64 * self.tick_size;
        let fill_price = match order.order_type {
            OrderType::Market => order.price.unwrap_or(0.0),
            _ if order.side.is_buy() => order.price.unwrap_or(0.0) + slippage,
            _ => order.price.unwrap_or(0.0) - slippage,
        };

        Some(Fill {
            order_id: order.order_id.clone(),
            broker_order_id: format!("bt-{}", order.order_id),
            price: fill_price,
            quantity: order.quantity,
            side: order.side,
            timestamp: chrono::Utc::now(),
            commission: self.commission_per_side,
        })
    }

    fn cancel_order(&self, _order: &Order) -> bool {
        true
    }

    fn get_positions(&self) -> Vec<String> {
        Vec::new()
    }

    fn connect(&mut self) -> bool {
        self.connected = true;
        true
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::order_manager::Side;

    #[test]
    fn rejects_non_market_order_with_no_price() {
        let broker = BacktestBroker::new(1, 2.50);
        let order = Order::new(OrderType::Stop, Side::Buy, None, 1);
        assert!(broker.submit_order(&order).is_none());
    }

    #[test]
    fn buy_fills_with_slippage_against_buyer() {
        let broker = BacktestBroker::new(1, 2.50);
        let order = Order::new(OrderType::Stop, Side::Buy, Some(100.0), 1);
        let fill = broker.submit_order(&order).unwrap();
        assert_eq!(fill.price, 100.25);
        assert_eq!(fill.commission, 2.50);
    }

    #[test]
    fn sell_fills_with_slippage_against_seller() {
        let broker = BacktestBroker::new(1, 2.50);
        let order = Order::new(OrderType::Stop, Side::Sell, Some(100.0), 1);
        let fill = broker.submit_order(&order).unwrap();
        assert_eq!(fill.price, 99.75);
    }

    #[test]
    fn market_order_fills_at_intended_price() {
        let broker = BacktestBroker::new(1, 2.50);
        let order = Order::new(OrderType::Market, Side::Buy, Some(100.0), 1);
        let fill = broker.submit_order(&order).unwrap();
        assert_eq!(fill.price, 100.0);
    }

    #[test]
    fn cancel_always_succeeds() {
        let broker = BacktestBroker::new(1, 2.50);
        let order = Order::new(OrderType::Stop, Side::Buy, Some(100.0), 1);
        assert!(broker.cancel_order(&order));
    }

    #[test]
    fn connect_disconnect_toggle_state() {
        let mut broker = BacktestBroker::new(1, 2.50);
        assert!(broker.connect());
        broker.disconnect();
        assert!(!broker.connected);
    }
}
