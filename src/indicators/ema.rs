// =============================================================================
// Exponential Moving Average
// =============================================================================
//
// Seeded by the SMA of the first `period` values, then recurred as
//   ema_t = value_t * k + ema_{t-1} * (1 - k),  k = 2 / (period + 1)
// =============================================================================

/// Compute the EMA series for `values` at `period`.
///
/// Returns a sequence of length `values.len() - period + 1`, or empty if
/// `period` is zero or `values` is shorter than `period`.
pub fn calculate_ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let seed: f64 = values[..period].iter().sum::<f64>() / period as f64;
    if !seed.is_finite() {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(seed);

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = seed;
    for &v in &values[period..] {
        ema = v * k + ema * (1.0 - k);
        if !ema.is_finite() {
            break;
        }
        out.push(ema);
    }
    out
}

/// Slope between the last two EMA points; `None` if fewer than two exist.
pub fn ema_slope(values: &[f64], period: usize) -> Option<f64> {
    let ema = calculate_ema(values, period);
    if ema.len() < 2 {
        return None;
    }
    Some(ema[ema.len() - 1] - ema[ema.len() - 2])
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_empty_input() {
        assert!(calculate_ema(&[], 5).is_empty());
    }

    #[test]
    fn ema_period_zero() {
        assert!(calculate_ema(&[1.0, 2.0, 3.0], 0).is_empty());
    }

    #[test]
    fn ema_insufficient_data() {
        assert!(calculate_ema(&[1.0, 2.0], 5).is_empty());
    }

    #[test]
    fn ema_period_equals_length() {
        let values = vec![1.0, 2.0, 3.0];
        let ema = calculate_ema(&values, 3);
        assert_eq!(ema.len(), 1);
        assert!((ema[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn ema_known_values() {
        // period=2 on [1,2,3,4]: seed = (1+2)/2 = 1.5, k = 2/3
        // ema_2 = 3*(2/3) + 1.5*(1/3) = 2.5
        // ema_3 = 4*(2/3) + 2.5*(1/3) = 3.5
        let ema = calculate_ema(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(ema.len(), 3);
        assert!((ema[0] - 1.5).abs() < 1e-9);
        assert!((ema[1] - 2.5).abs() < 1e-9);
        assert!((ema[2] - 3.5).abs() < 1e-9);
    }

    #[test]
    fn ema_handles_nan_in_input() {
        let ema = calculate_ema(&[1.0, 2.0, f64::NAN, 4.0], 2);
        // seed uses [1.0, 2.0] (fine); recursion stops once NaN enters.
        assert_eq!(ema.len(), 1);
    }

    #[test]
    fn slope_requires_two_points() {
        assert!(ema_slope(&[1.0, 2.0, 3.0], 3).is_none());
    }

    #[test]
    fn slope_positive_on_uptrend() {
        let values: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let slope = ema_slope(&values, 3).unwrap();
        assert!(slope > 0.0);
    }

    #[test]
    fn slope_negative_on_downtrend() {
        let values: Vec<f64> = (0..10).map(|i| 100.0 - i as f64).collect();
        let slope = ema_slope(&values, 3).unwrap();
        assert!(slope < 0.0);
    }
}
