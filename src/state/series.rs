//! Numeric helpers over short indicator series.
//!
//! All functions are pure and ignore non-finite points.

/// Trading days used to annualize daily volatility.
const TRADING_DAYS: f64 = 252.0;

fn finite(points: &[f64]) -> Vec<f64> {
    points.iter().copied().filter(|p| p.is_finite()).collect()
}

/// Last finite point of a series.
pub fn latest(points: &[f64]) -> Option<f64> {
    points.iter().rev().copied().find(|p| p.is_finite())
}

/// Difference between the last two finite points.
pub fn first_difference(points: &[f64]) -> Option<f64> {
    let points = finite(points);
    match points.as_slice() {
        [.., prev, last] => Some(last - prev),
        _ => None,
    }
}

/// Change between the last point and the point `lookback` steps earlier.
///
/// Shorter series use their first point instead.
pub fn change_over(points: &[f64], lookback: usize) -> Option<f64> {
    let points = finite(points);
    if points.len() < 2 || lookback == 0 {
        return None;
    }
    let last = points[points.len() - 1];
    let start = points.len().saturating_sub(lookback + 1);
    Some(last - points[start])
}

pub fn mean(points: &[f64]) -> Option<f64> {
    let points = finite(points);
    if points.is_empty() {
        return None;
    }
    Some(points.iter().sum::<f64>() / points.len() as f64)
}

/// Annualized realized volatility in percent from daily closes.
///
/// Uses the sample standard deviation of the last `window` simple returns.
/// Needs at least three closes (two returns).
pub fn realized_volatility(closes: &[f64], window: usize) -> Option<f64> {
    let closes = finite(closes);
    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|pair| pair[0] != 0.0)
        .map(|pair| pair[1] / pair[0] - 1.0)
        .collect();
    let tail = &returns[returns.len().saturating_sub(window)..];
    if tail.len() < 2 {
        return None;
    }

    let n = tail.len() as f64;
    let avg = tail.iter().sum::<f64>() / n;
    let variance = tail.iter().map(|r| (r - avg).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt() * TRADING_DAYS.sqrt() * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_difference() {
        assert_eq!(first_difference(&[2.0, 3.5, 3.9]), Some(3.9 - 3.5));
        assert_eq!(first_difference(&[3.0]), None);
        assert_eq!(first_difference(&[2.0, f64::NAN, 2.5]), Some(0.5));
    }

    #[test]
    fn test_change_over_lookback() {
        let rates = [5.25, 5.25, 5.0, 4.75, 4.5];
        assert_eq!(change_over(&rates, 3), Some(4.5 - 5.25));
        assert_eq!(change_over(&rates, 1), Some(4.5 - 4.75));
        // Lookback longer than the series falls back to the first point
        assert_eq!(change_over(&rates, 10), Some(4.5 - 5.25));
        assert_eq!(change_over(&[1.0], 3), None);
    }

    #[test]
    fn test_latest_skips_nan() {
        assert_eq!(latest(&[1.0, 2.0, f64::NAN]), Some(2.0));
        assert_eq!(latest(&[]), None);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_flat_prices_have_zero_volatility() {
        let closes = vec![100.0; 40];
        assert_eq!(realized_volatility(&closes, 30), Some(0.0));
    }

    #[test]
    fn test_alternating_prices_are_volatile() {
        // +/-2% daily swings annualize to roughly 32%
        let closes: Vec<f64> = (0..40)
            .map(|i| if i % 2 == 0 { 100.0 } else { 102.0 })
            .collect();
        let vol = realized_volatility(&closes, 30).unwrap();
        assert!(vol > 30.0, "expected high volatility, got {vol}");
    }

    #[test]
    fn test_volatility_needs_two_returns() {
        assert_eq!(realized_volatility(&[100.0, 101.0], 30), None);
    }
}
