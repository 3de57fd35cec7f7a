// =============================================================================
// Average True Range — Wilder's Smoothing Method
// =============================================================================
//
// True Range (TR) for each bar:
//   TR_t = max(H_t - L_t, |H_t - C_{t-1}|, |L_t - C_{t-1}|)
//
// ATR is then the smoothed average of TR using Wilder's method:
//   ATR_0 = SMA of the first `period` TR values
//   ATR_t = (ATR_{t-1} * (period - 1) + TR_t) / period
//
// Default period: 14.
// =============================================================================

/// Compute the most recent ATR value from parallel high/low/close series.
///
/// `highs`, `lows`, and `closes` must be the same length. Returns `None` if
/// the lengths mismatch, `period` is zero, or fewer than `period + 1` bars
/// are available.
pub fn calculate_atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Option<f64> {
    if highs.len() != lows.len() || highs.len() != closes.len() {
        return None;
    }
    if period == 0 || highs.len() < period + 1 {
        return None;
    }

    let mut tr_values = Vec::with_capacity(highs.len() - 1);
    for i in 1..highs.len() {
        let hl = highs[i] - lows[i];
        let hc = (highs[i] - closes[i - 1]).abs();
        let lc = (lows[i] - closes[i - 1]).abs();
        tr_values.push(hl.max(hc).max(lc));
    }

    if tr_values.len() < period {
        return None;
    }

    let seed: f64 = tr_values[..period].iter().sum::<f64>() / period as f64;
    if !seed.is_finite() {
        return None;
    }

    let period_f = period as f64;
    let mut atr = seed;
    for &tr in &tr_values[period..] {
        atr = (atr * (period_f - 1.0) + tr) / period_f;
        if !atr.is_finite() {
            return None;
        }
    }

    if atr.is_finite() {
        Some(atr)
    } else {
        None
    }
}
