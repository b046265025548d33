// Complex values shared by the renderers and the streamline tracer.

pub use num_complex::Complex64;

/// A sampled function value. Either component may be non-finite; such values
/// are skip-sentinels and never reach the color math.
pub type ComplexValue = Complex64;

/// True when both components are finite.
#[inline]
pub fn is_defined(z: ComplexValue) -> bool {
    z.re.is_finite() && z.im.is_finite()
}

/// Phase in (-π, π], modulus, and `ln(1 + modulus)` for a defined value.
#[inline]
pub fn polar_log(z: ComplexValue) -> (f64, f64, f64) {
    let phase = z.im.atan2(z.re);
    let modulus = z.norm();
    (phase, modulus, modulus.ln_1p())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_is_defined_finite() {
        assert!(is_defined(ComplexValue::new(1.0, -2.0)));
    }

    #[test]
    fn test_is_defined_rejects_nan_and_inf() {
        assert!(!is_defined(ComplexValue::new(f64::NAN, 0.0)));
        assert!(!is_defined(ComplexValue::new(0.0, f64::INFINITY)));
        assert!(!is_defined(ComplexValue::new(f64::NEG_INFINITY, 1.0)));
    }

    #[test]
    fn test_polar_log_negative_real_axis() {
        let (phase, modulus, log_mod) = polar_log(ComplexValue::new(-1.0, 0.0));
        assert!((phase - PI).abs() < 1e-12);
        assert!((modulus - 1.0).abs() < 1e-12);
        assert!((log_mod - 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_polar_log_zero() {
        let (phase, modulus, log_mod) = polar_log(ComplexValue::new(0.0, 0.0));
        assert_eq!(phase, 0.0);
        assert_eq!(modulus, 0.0);
        assert_eq!(log_mod, 0.0);
    }
}
