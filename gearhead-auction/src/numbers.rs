//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Round a f64 and clamp it to the i64 range, returning 0 for non-finite values.
#[must_use]
pub fn round_f64_to_i64(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    let min = cast::<i64, f64>(i64::MIN).unwrap_or(f64::MIN);
    let max = cast::<i64, f64>(i64::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).round();
    cast::<f64, i64>(clamped).unwrap_or(0)
}

/// Round a f32 and clamp it to the i32 range, returning 0 for NaN values.
#[must_use]
pub fn round_f32_to_i32(value: f32) -> i32 {
    if value.is_nan() {
        return 0;
    }
    let min = cast::<i32, f64>(i32::MIN).unwrap_or(f64::MIN);
    let max = cast::<i32, f64>(i32::MAX).unwrap_or(f64::MAX);
    let clamped = f64::from(value).clamp(min, max).round();
    cast::<f64, i32>(clamped).unwrap_or(0)
}

/// Convert i64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn i64_to_f64(value: i64) -> f64 {
    cast::<i64, f64>(value).unwrap_or(0.0)
}

/// Scale a money amount by a ratio, rounding to the nearest whole unit.
#[must_use]
pub fn scale_money(amount: i64, ratio: f32) -> i64 {
    round_f64_to_i64(i64_to_f64(amount) * f64::from(ratio))
}

/// Patience as a 0..=1 fraction of the 100-point scale.
#[must_use]
pub fn patience_fraction(patience: i32) -> f32 {
    let clamped = patience.clamp(0, crate::constants::PATIENCE_MAX);
    cast::<i32, f32>(clamped).unwrap_or(0.0) / 100.0
}

/// `part / whole` as a 0..=1 share; zero when `whole` is zero.
#[must_use]
pub fn share_of(part: usize, whole: usize) -> f32 {
    if whole == 0 {
        return 0.0;
    }
    let part = cast::<usize, f32>(part).unwrap_or(0.0);
    let whole = cast::<usize, f32>(whole).unwrap_or(1.0);
    (part / whole).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_handles_non_finite() {
        assert_eq!(round_f64_to_i64(f64::NAN), 0);
        assert_eq!(round_f64_to_i64(f64::INFINITY), 0);
        assert_eq!(round_f64_to_i64(2.5), 3);
        assert_eq!(round_f32_to_i32(f32::NAN), 0);
        assert_eq!(round_f32_to_i32(19.6), 20);
    }

    #[test]
    fn scale_money_rounds_to_units() {
        assert_eq!(scale_money(10_000, 1.05), 10_500);
        assert_eq!(scale_money(8_001, 0.5), 4_001);
        assert_eq!(scale_money(0, 3.0), 0);
    }

    #[test]
    fn patience_fraction_clamps() {
        assert!((patience_fraction(50) - 0.5).abs() < f32::EPSILON);
        assert!(patience_fraction(-4).abs() < f32::EPSILON);
        assert!((patience_fraction(250) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn share_of_handles_empty_whole() {
        assert!(share_of(3, 0).abs() < f32::EPSILON);
        assert!((share_of(1, 4) - 0.25).abs() < f32::EPSILON);
        assert!((share_of(9, 4) - 1.0).abs() < f32::EPSILON);
    }
}
