// =============================================================================
// Order Manager — submits orders to a broker adapter with bounded retry
// =============================================================================

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use crate::broker::BrokerAdapter;

pub const MAX_RETRIES: u32 = 3;
pub const RETRY_BACKOFF_SEC: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn is_buy(&self) -> bool {
        matches!(self, Side::Buy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Submitted,
    Filled,
    Rejected,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    /// The id the broker reports back for this order, if any. Stays empty
    /// until a fill (or other broker acknowledgement) reports one.
    pub broker_order_id: String,
    pub order_type: OrderType,
    pub side: Side,
    pub quantity: u32,
    pub price: Option<f64>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub filled_price: Option<f64>,
    pub filled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Build a new, not-yet-submitted order. `order_id` is assigned by
    /// `OrderManager::submit`.
    pub fn new(order_type: OrderType, side: Side, price: Option<f64>, quantity: u32) -> Self {
        Self {
            order_id: String::new(),
            broker_order_id: String::new(),
            order_type,
            side,
            quantity,
            price,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            filled_price: None,
            filled_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: String,
    pub broker_order_id: String,
    pub price: f64,
    pub quantity: u32,
    pub side: Side,
    pub timestamp: DateTime<Utc>,
    pub commission: f64,
}

/// Submits orders through a `BrokerAdapter`, retrying on rejection with a
/// linear backoff, and tracks every order it has seen by its opaque id.
pub struct OrderManager {
    broker: Box<dyn BrokerAdapter>,
    orders: HashMap<String, Order>,
}

impl OrderManager {
    pub fn new(broker: Box<dyn BrokerAdapter>) -> Self {
        Self {
            broker,
            orders: HashMap::new(),
        }
    }

    /// Submit `order`, retrying up to `MAX_RETRIES` times with linear
    /// backoff (`RETRY_BACKOFF_SEC * attempt`). Returns the final order
    /// state — `Filled` on success, `Rejected` after exhaustion.
    pub fn submit(&mut self, mut order: Order) -> Order {
        order.order_id = Uuid::new_v4().to_string()[..8].to_string();
        order.status = OrderStatus::Submitted;

        for attempt in 1..=MAX_RETRIES {
            match self.broker.submit_order(&order) {
                Some(fill) => {
                    order.status = OrderStatus::Filled;
                    order.filled_price = Some(fill.price);
                    order.filled_at = Some(fill.timestamp);
                    order.broker_order_id = fill.broker_order_id.clone();
                    self.orders.insert(order.order_id.clone(), order.clone());
                    return order;
                }
                None => {
                    order.status = OrderStatus::Rejected;
                    warn!(order_id = %order.order_id, attempt, "order rejected by broker");
                }
            }
            if attempt < MAX_RETRIES {
                thread::sleep(Duration::from_secs(RETRY_BACKOFF_SEC * attempt as u64));
            }
        }

        error!(order_id = %order.order_id, "order rejected after exhausting retries");
        self.orders.insert(order.order_id.clone(), order.clone());
        order
    }

    /// Cancel a previously submitted order. No-op (returns `false`) if the
    /// order is unknown or already in a terminal state.
    pub fn cancel(&mut self, order_id: &str) -> bool {
        let Some(order) = self.orders.get(order_id) else {
            return false;
        };
        if matches!(
            order.status,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        ) {
            return false;
        }
        if self.broker.cancel_order(order) {
            if let Some(order) = self.orders.get_mut(order_id) {
                order.status = OrderStatus::Cancelled;
            }
            true
        } else {
            false
        }
    }

    pub fn get_order(&self, order_id: &str) -> Option<&Order> {
        self.orders.get(order_id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::BacktestBroker;

    fn manager() -> OrderManager {
        OrderManager::new(Box::new(BacktestBroker::new(1, 2.50)))
    }

    #[test]
    fn submit_assigns_opaque_id_and_fills() {
        let mut mgr = manager();
        let order = Order::new(OrderType::Stop, Side::Buy, Some(100.0), 1);
        let result = mgr.submit(order);
        assert_eq!(result.order_id.len(), 8);
        assert_eq!(result.status, OrderStatus::Filled);
        assert!(result.filled_price.is_some());
        assert_eq!(result.broker_order_id, format!("bt-{}", result.order_id));
    }

    #[test]
    fn market_order_with_no_price_is_rejected_then_retried() {
        let mut mgr = manager();
        // Non-market order with no price is rejected by the backtest broker
        // on every attempt, so it ends Rejected after exhausting retries.
        let order = Order::new(OrderType::Stop, Side::Buy, None, 1);
        let result = mgr.submit(order);
        assert_eq!(result.status, OrderStatus::Rejected);
    }

    #[test]
    fn cancel_unknown_order_is_noop() {
        let mut mgr = manager();
        assert!(!mgr.cancel("deadbeef"));
    }

    #[test]
    fn cancel_filled_order_is_noop() {
        let mut mgr = manager();
        let order = Order::new(OrderType::Stop, Side::Sell, Some(100.0), 1);
        let result = mgr.submit(order);
        assert!(!mgr.cancel(&result.order_id));
    }

    #[test]
    fn get_order_returns_stored_order() {
        let mut mgr = manager();
        let order = Order::new(OrderType::Stop, Side::Buy, Some(100.0), 1);
        let result = mgr.submit(order);
        assert!(mgr.get_order(&result.order_id).is_some());
    }
}
