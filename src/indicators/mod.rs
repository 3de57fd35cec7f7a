// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators the strategy
// engine needs: EMA (and its slope), Wilder ATR, Fibonacci retracement
// zones, swing-structure tests, and volume confirmation.

pub mod atr;
pub mod ema;
pub mod fib;

pub use atr::calculate_atr;
pub use ema::{calculate_ema, ema_slope};
pub use fib::{
    fibonacci_levels, higher_highs, higher_lows, is_in_fib_zone, lower_highs, lower_lows,
    volume_above_average,
};
