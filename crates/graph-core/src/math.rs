//! Overflow-safe aggregation over `f64` sequences.
//!
//! Each function orders its input and combines values from both ends so the
//! running result stays near unit magnitude, where a naive left-to-right fold
//! would overflow to infinity or underflow to zero.
//!
//! All three expect a non-empty slice. Empty input yields `NaN`.

use std::cmp::Ordering;

fn by_value(a: &f64, b: &f64) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

fn by_magnitude(a: &f64, b: &f64) -> Ordering {
    a.abs().partial_cmp(&b.abs()).unwrap_or(Ordering::Equal)
}

/// Sum of values
pub fn safe_sum(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(by_value);

    let mut result = sorted[0];
    let mut head = 1;
    let mut tail = sorted.len();

    // Positive running sum takes the next smallest, otherwise the largest.
    while head < tail {
        if result > 0.0 {
            result += sorted[head];
            head += 1;
        } else {
            tail -= 1;
            result += sorted[tail];
        }
    }

    result
}

/// Product of values
pub fn safe_mul(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(by_magnitude);

    let mut result = sorted[0];
    let mut head = 1;
    let mut tail = sorted.len();

    while head < tail {
        if result.abs() > 1.0 {
            result *= sorted[head];
            head += 1;
        } else {
            tail -= 1;
            result *= sorted[tail];
        }
    }

    result
}

/// Arithmetic mean of values
pub fn safe_avg(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(by_value);

    let mut result = 0.0_f64;
    let mut count = 1.0_f64;
    let mut head = 0;
    let mut tail = sorted.len();

    while head < tail {
        let value = if result > 0.0 {
            head += 1;
            sorted[head - 1]
        } else {
            tail -= 1;
            sorted[tail]
        };

        result += value / count - result / count;
        count += 1.0;
    }

    result
}

/// Count-weighted mean of `(value, weight)` pairs; `None` when the weights sum to zero
pub fn safe_weighted_avg(pairs: &[(f64, f64)]) -> Option<f64> {
    let total = safe_sum(&pairs.iter().map(|&(_, weight)| weight).collect::<Vec<_>>());
    if pairs.is_empty() || total == 0.0 || !total.is_finite() {
        return None;
    }

    let terms: Vec<f64> = pairs
        .iter()
        .map(|&(value, weight)| safe_mul(&[value, weight, 1.0 / total]))
        .collect();

    Some(safe_sum(&terms))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        if a == b {
            return true;
        }
        ((a - b) / a.abs().max(b.abs())).abs() < 1e-4
    }

    #[test]
    fn test_safe_sum_basic() {
        assert_eq!(safe_sum(&[1.0, 2.0, 3.0]), 6.0);
        assert_eq!(safe_sum(&[-5.0, 5.0]), 0.0);
        assert_eq!(safe_sum(&[42.0]), 42.0);
    }

    #[test]
    fn test_safe_sum_avoids_overflow() {
        // Naive left-to-right: MAX + MAX overflows before -MAX arrives.
        let values = [f64::MAX, f64::MAX, -f64::MAX];
        assert!((values.iter().sum::<f64>()).is_infinite());
        assert_eq!(safe_sum(&values), f64::MAX);
    }

    #[test]
    fn test_safe_sum_order_independent() {
        let a = [1e300, 1e-300, -1e300, 3.5, 7.25];
        let b = [7.25, -1e300, 3.5, 1e-300, 1e300];
        let c = [3.5, 1e300, 7.25, -1e300, 1e-300];
        let expected = safe_sum(&a);
        assert!(close(expected, 10.75));
        assert!(close(safe_sum(&b), expected));
        assert!(close(safe_sum(&c), expected));
    }

    #[test]
    fn test_safe_mul_extreme_magnitudes() {
        // Naive: 1e300 * 1e300 = inf before the small factors arrive.
        let values = [1e300, 1e300, 1e-300, 1e-300, 4.0];
        let naive: f64 = values.iter().product();
        assert!(naive.is_infinite());
        assert!(close(safe_mul(&values), 4.0));

        let shuffled = [1e-300, 4.0, 1e300, 1e-300, 1e300];
        assert!(close(safe_mul(&shuffled), 4.0));
    }

    #[test]
    fn test_safe_mul_signs() {
        assert_eq!(safe_mul(&[-2.0, 3.0]), -6.0);
        assert_eq!(safe_mul(&[-2.0, -3.0, 0.5]), 3.0);
        assert_eq!(safe_mul(&[0.0, 1e308, 1e308]), 0.0);
    }

    #[test]
    fn test_safe_avg() {
        assert!(close(safe_avg(&[1.0, 2.0, 3.0, 4.0]), 2.5));
        assert!(close(safe_avg(&[f64::MAX, f64::MAX]), f64::MAX));
        assert_eq!(safe_avg(&[-10.0, 10.0]), 0.0);
    }

    #[test]
    fn test_safe_avg_order_independent() {
        let a = [1e300, 1e-300, 2e300, 5.0];
        let b = [5.0, 2e300, 1e-300, 1e300];
        assert!(close(safe_avg(&a), 7.5e299));
        assert!(close(safe_avg(&a), safe_avg(&b)));
    }

    #[test]
    fn test_empty_input_is_nan() {
        assert!(safe_sum(&[]).is_nan());
        assert!(safe_mul(&[]).is_nan());
        assert!(safe_avg(&[]).is_nan());
    }

    #[test]
    fn test_safe_weighted_avg() {
        let avg = safe_weighted_avg(&[(10.0, 1.0), (20.0, 3.0)]).unwrap();
        assert!(close(avg, 17.5));
        assert_eq!(safe_weighted_avg(&[(10.0, 0.0)]), None);
        assert_eq!(safe_weighted_avg(&[]), None);
    }
}
