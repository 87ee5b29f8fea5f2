//! Standard normal distribution functions.
//!
//! This module provides generic implementations of:
//! - `norm_cdf`: cumulative distribution function
//! - `norm_pdf`: probability density function
//!
//! Both are generic over `T: Float` so they serve `f32` and `f64` callers.

use num_traits::Float;

/// Square root of 2.
const SQRT_2: f64 = std::f64::consts::SQRT_2;

/// 1 / sqrt(2 * pi)
const FRAC_1_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

/// Complementary error function.
///
/// Abramowitz and Stegun formula 7.1.26, maximum absolute error 1.5e-7.
#[inline]
fn erfc_approx<T: Float>(x: T) -> T {
    let one = T::one();
    let abs_x = x.abs();

    let a1 = T::from(0.254829592).unwrap();
    let a2 = T::from(-0.284496736).unwrap();
    let a3 = T::from(1.421413741).unwrap();
    let a4 = T::from(-1.453152027).unwrap();
    let a5 = T::from(1.061405429).unwrap();
    let p = T::from(0.3275911).unwrap();

    let t = one / (one + p * abs_x);
    let poly = a1 + t * (a2 + t * (a3 + t * (a4 + t * a5)));
    let erfc_abs = t * poly * (-abs_x * abs_x).exp();

    if x < T::zero() {
        T::from(2.0).unwrap() - erfc_abs
    } else {
        erfc_abs
    }
}

/// Standard normal cumulative distribution function.
///
/// Computes Φ(x) = ½·erfc(−x/√2).
///
/// # Accuracy
/// Accurate to about 1e-7 for all finite `x`.
///
/// # Examples
/// ```
/// use tranche_core::math::distributions::norm_cdf;
///
/// assert!((norm_cdf(0.0_f64) - 0.5).abs() < 1e-7);
/// assert!(norm_cdf(-3.0_f64) < 0.01);
/// assert!(norm_cdf(3.0_f64) > 0.99);
/// ```
#[inline]
pub fn norm_cdf<T: Float>(x: T) -> T {
    let sqrt_2 = T::from(SQRT_2).unwrap();
    let half = T::from(0.5).unwrap();
    half * erfc_approx(-x / sqrt_2)
}

/// Standard normal probability density function.
///
/// # Examples
/// ```
/// use tranche_core::math::distributions::norm_pdf;
///
/// assert!((norm_pdf(0.0_f64) - 0.3989422804).abs() < 1e-7);
/// ```
#[inline]
pub fn norm_pdf<T: Float>(x: T) -> T {
    let frac_1_sqrt_2pi = T::from(FRAC_1_SQRT_2PI).unwrap();
    let half = T::from(0.5).unwrap();
    frac_1_sqrt_2pi * (-half * x * x).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_cdf_reference_values() {
        assert_abs_diff_eq!(norm_cdf(1.0_f64), 0.841_344_746, epsilon = 2e-7);
        assert_abs_diff_eq!(norm_cdf(-1.644_853_627_f64), 0.05, epsilon = 2e-7);
        assert_abs_diff_eq!(norm_cdf(2.326_347_874_f64), 0.99, epsilon = 2e-7);
    }

    #[test]
    fn test_cdf_symmetry() {
        for &x in &[0.1_f64, 0.5, 1.3, 2.7, 4.0] {
            assert_abs_diff_eq!(norm_cdf(x) + norm_cdf(-x), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_cdf_is_monotone() {
        let mut prev = 0.0_f64;
        for i in -60..=60 {
            let c = norm_cdf(i as f64 * 0.1);
            assert!(c >= prev);
            prev = c;
        }
    }

    #[test]
    fn test_pdf_at_one() {
        assert_abs_diff_eq!(norm_pdf(1.0_f64), 0.241_970_724_5, epsilon = 1e-9);
    }

    #[test]
    fn test_f32_support() {
        assert!((norm_cdf(0.0_f32) - 0.5).abs() < 1e-6);
    }
}
