// =============================================================================
// Fibonacci retracement zone, swing structure, and volume filters
// =============================================================================

/// Standard Fibonacci retracement ratios against a swing low/high.
pub fn fibonacci_levels(swing_low: f64, swing_high: f64) -> [(f64, f64); 6] {
    let range = swing_high - swing_low;
    [
        (0.0, swing_high),
        (0.236, swing_high - 0.236 * range),
        (0.382, swing_high - 0.382 * range),
        (0.5, swing_high - 0.5 * range),
        (0.618, swing_high - 0.618 * range),
        (1.0, swing_low),
    ]
}

/// True if `price` lies within the `[fib_min, fib_max]` retracement zone of
/// the swing `[swing_low, swing_high]`. Always false when `swing_high <=
/// swing_low` (degenerate or inverted swing).
pub fn is_in_fib_zone(price: f64, swing_low: f64, swing_high: f64, fib_min: f64, fib_max: f64) -> bool {
    let range = swing_high - swing_low;
    if range <= 0.0 {
        return false;
    }
    let upper = swing_high - fib_min * range;
    let lower = swing_high - fib_max * range;
    lower <= price && price <= upper
}

/// Last `count` highs are each strictly greater than the one before.
pub fn higher_highs(highs: &[f64], count: usize) -> bool {
    ascending_run(highs, count, |a, b| a > b)
}

/// Last `count` lows are each strictly greater than the one before.
pub fn higher_lows(lows: &[f64], count: usize) -> bool {
    ascending_run(lows, count, |a, b| a > b)
}

/// Last `count` lows are each strictly less than the one before.
pub fn lower_lows(lows: &[f64], count: usize) -> bool {
    ascending_run(lows, count, |a, b| a < b)
}

/// Last `count` highs are each strictly less than the one before.
pub fn lower_highs(highs: &[f64], count: usize) -> bool {
    ascending_run(highs, count, |a, b| a < b)
}

fn ascending_run(values: &[f64], count: usize, cmp: impl Fn(f64, f64) -> bool) -> bool {
    if values.len() < count + 1 {
        return false;
    }
    let len = values.len();
    for i in (len - count)..len {
        if !cmp(values[i], values[i - 1]) {
            return false;
        }
    }
    true
}

/// True if the last volume strictly exceeds the mean of the last `period`
/// volumes. False if fewer than `period` samples are present.
pub fn volume_above_average(volumes: &[u64], period: usize) -> bool {
    if period == 0 || volumes.len() < period {
        return false;
    }
    let window = &volumes[volumes.len() - period..];
    let avg = window.iter().sum::<u64>() as f64 / period as f64;
    let last = *volumes.last().unwrap() as f64;
    last > avg
}
