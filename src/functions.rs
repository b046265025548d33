// Built-in complex function registry behind the `Evaluator` capability.

use std::f64::consts::PI;
use std::sync::OnceLock;

use num_complex::Complex64;
use serde::Deserialize;
use thiserror::Error;

use crate::complex::{is_defined, ComplexValue};

/// Real part left of which zeta is computed through the functional equation.
/// With continuation disabled, points at or left of it are left blank.
pub const ZETA_REFLECTION_ABSCISSA: f64 = 0.0;

/// Step for the central-difference derivative.
const DERIVATIVE_STEP: f64 = 1e-6;

/// Borwein acceleration order for the alternating zeta series.
const BORWEIN_TERMS: usize = 40;

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("function value is not finite")]
    NonFinite,
    #[error("pole at the evaluation point")]
    Pole,
    #[error("point lies outside the function's evaluated domain")]
    OutsideDomain,
}

/// Per-call evaluation knobs that are not part of the function identity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvalContext {
    pub zeta_continuation: bool,
}

impl Default for EvalContext {
    fn default() -> Self {
        Self { zeta_continuation: true }
    }
}

/// Function selector. Variants carry their own coefficients.
/// Complex coefficients are written as `[re, im]` pairs.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FunctionId {
    Identity,
    Square,
    /// Coefficients in ascending powers of z.
    Polynomial { coefficients: Vec<[f64; 2]> },
    /// (a z + b) / (c z + d)
    Mobius { a: [f64; 2], b: [f64; 2], c: [f64; 2], d: [f64; 2] },
    Exp,
    Sin,
    Reciprocal,
    Zeta,
}

impl Default for FunctionId {
    fn default() -> Self {
        FunctionId::cubic_roots_of_unity()
    }
}

impl FunctionId {
    /// z³ − 1
    pub fn cubic_roots_of_unity() -> Self {
        FunctionId::Polynomial {
            coefficients: vec![[-1.0, 0.0], [0.0, 0.0], [0.0, 0.0], [1.0, 0.0]],
        }
    }

    /// (z − 1) / (z + 1)
    pub fn cayley() -> Self {
        FunctionId::Mobius {
            a: [1.0, 0.0],
            b: [-1.0, 0.0],
            c: [1.0, 0.0],
            d: [1.0, 0.0],
        }
    }

    /// Look up a function by name, using default coefficients for parameterized kinds.
    pub fn from_name(name: &str) -> Result<Self, EvalError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "identity" | "z" => Ok(FunctionId::Identity),
            "square" | "z^2" => Ok(FunctionId::Square),
            "polynomial" | "poly" => Ok(FunctionId::cubic_roots_of_unity()),
            "mobius" | "möbius" => Ok(FunctionId::cayley()),
            "exp" => Ok(FunctionId::Exp),
            "sin" => Ok(FunctionId::Sin),
            "reciprocal" | "1/z" => Ok(FunctionId::Reciprocal),
            "zeta" => Ok(FunctionId::Zeta),
            _ => Err(EvalError::UnknownFunction(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FunctionId::Identity => "identity",
            FunctionId::Square => "square",
            FunctionId::Polynomial { .. } => "polynomial",
            FunctionId::Mobius { .. } => "mobius",
            FunctionId::Exp => "exp",
            FunctionId::Sin => "sin",
            FunctionId::Reciprocal => "reciprocal",
            FunctionId::Zeta => "zeta",
        }
    }

    /// Next function in the viewer's rotation.
    pub fn cycle(&self) -> Self {
        match self {
            FunctionId::Identity => FunctionId::Square,
            FunctionId::Square => FunctionId::cubic_roots_of_unity(),
            FunctionId::Polynomial { .. } => FunctionId::cayley(),
            FunctionId::Mobius { .. } => FunctionId::Exp,
            FunctionId::Exp => FunctionId::Sin,
            FunctionId::Sin => FunctionId::Reciprocal,
            FunctionId::Reciprocal => FunctionId::Zeta,
            FunctionId::Zeta => FunctionId::Identity,
        }
    }

    pub fn is_zeta_family(&self) -> bool {
        matches!(self, FunctionId::Zeta)
    }
}

/// Function evaluation service consumed by the renderers and the tracer.
/// Implementations must be pure in `(func, z, ctx)`.
pub trait Evaluator {
    fn evaluate(&self, func: &FunctionId, z: ComplexValue, ctx: &EvalContext) -> Result<ComplexValue, EvalError>;

    /// Numeric derivative by central difference along the real axis.
    fn derivative(&self, func: &FunctionId, z: ComplexValue, ctx: &EvalContext) -> Result<ComplexValue, EvalError> {
        let h = Complex64::new(DERIVATIVE_STEP, 0.0);
        let fp = self.evaluate(func, z + h, ctx)?;
        let fm = self.evaluate(func, z - h, ctx)?;
        let d = (fp - fm) / (2.0 * DERIVATIVE_STEP);
        if is_defined(d) {
            Ok(d)
        } else {
            Err(EvalError::NonFinite)
        }
    }
}

/// The built-in function set.
#[derive(Clone, Copy, Debug, Default)]
pub struct Builtins;

impl Evaluator for Builtins {
    fn evaluate(&self, func: &FunctionId, z: ComplexValue, ctx: &EvalContext) -> Result<ComplexValue, EvalError> {
        if !is_defined(z) {
            return Err(EvalError::NonFinite);
        }
        let w = match func {
            FunctionId::Identity => z,
            FunctionId::Square => z * z,
            FunctionId::Polynomial { coefficients } => horner(coefficients, z),
            FunctionId::Mobius { a, b, c, d } => {
                let den = to_c(c) * z + to_c(d);
                if den.norm_sqr() == 0.0 {
                    return Err(EvalError::Pole);
                }
                (to_c(a) * z + to_c(b)) / den
            }
            FunctionId::Exp => z.exp(),
            FunctionId::Sin => z.sin(),
            FunctionId::Reciprocal => {
                if z.norm_sqr() == 0.0 {
                    return Err(EvalError::Pole);
                }
                z.inv()
            }
            FunctionId::Zeta => zeta(z, ctx)?,
        };
        if is_defined(w) {
            Ok(w)
        } else {
            Err(EvalError::NonFinite)
        }
    }
}

#[inline]
fn to_c(c: &[f64; 2]) -> Complex64 {
    Complex64::new(c[0], c[1])
}

fn horner(coefficients: &[[f64; 2]], z: Complex64) -> Complex64 {
    coefficients
        .iter()
        .rev()
        .fold(Complex64::new(0.0, 0.0), |acc, c| acc * z + to_c(c))
}

/// Riemann zeta. Right of the reflection abscissa the Borwein-accelerated
/// alternating series is used directly; left of it the functional equation
/// maps the point across, if continuation is enabled.
fn zeta(s: Complex64, ctx: &EvalContext) -> Result<Complex64, EvalError> {
    if s.re >= ZETA_REFLECTION_ABSCISSA {
        return zeta_borwein(s);
    }
    if !ctx.zeta_continuation {
        return Err(EvalError::OutsideDomain);
    }
    // ζ(s) = 2^s π^(s−1) sin(πs/2) Γ(1−s) ζ(1−s)
    let one = Complex64::new(1.0, 0.0);
    let two = Complex64::new(2.0, 0.0);
    let pi = Complex64::new(PI, 0.0);
    let reflected = zeta_borwein(one - s)?;
    Ok(two.powc(s) * pi.powc(s - one) * (s * (PI / 2.0)).sin() * gamma(one - s) * reflected)
}

fn zeta_borwein(s: Complex64) -> Result<Complex64, EvalError> {
    let one = Complex64::new(1.0, 0.0);
    let denom = one - Complex64::new(2.0, 0.0).powc(one - s);
    if denom.norm() < 1e-12 {
        return Err(EvalError::Pole);
    }

    let n = BORWEIN_TERMS;
    let d = borwein_weights();
    let dn = d[n];

    let mut sum = Complex64::new(0.0, 0.0);
    for k in 0..n {
        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
        let base = Complex64::new((k + 1) as f64, 0.0);
        sum += base.powc(-s) * (sign * (d[k] - dn));
    }
    Ok(-sum / (denom * dn))
}

/// d[k] = n Σ_{i≤k} (n+i−1)! 4^i / ((n−i)! (2i)!), computed once.
fn borwein_weights() -> &'static [f64; BORWEIN_TERMS + 1] {
    static WEIGHTS: OnceLock<[f64; BORWEIN_TERMS + 1]> = OnceLock::new();
    WEIGHTS.get_or_init(|| {
        let nf = BORWEIN_TERMS as f64;
        let mut d = [0.0; BORWEIN_TERMS + 1];
        let mut term = 1.0 / nf;
        let mut acc = term;
        d[0] = nf * acc;
        for i in 1..=BORWEIN_TERMS {
            let fi = i as f64;
            term *= 4.0 * (nf + fi - 1.0) * (nf - fi + 1.0) / ((2.0 * fi) * (2.0 * fi - 1.0));
            acc += term;
            d[i] = nf * acc;
        }
        d
    })
}

/// Lanczos approximation, reflected for Re(z) < 1/2.
fn gamma(z: Complex64) -> Complex64 {
    if z.re < 0.5 {
        let pi = Complex64::new(PI, 0.0);
        return pi / ((z * PI).sin() * gamma(Complex64::new(1.0, 0.0) - z));
    }
    let z = z - 1.0;
    let mut x = Complex64::new(LANCZOS_COEFFS[0], 0.0);
    for (i, &c) in LANCZOS_COEFFS.iter().enumerate().skip(1) {
        x += c / (z + i as f64);
    }
    let t = z + LANCZOS_G + 0.5;
    (2.0 * PI).sqrt() * t.powc(z + 0.5) * (-t).exp() * x
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn eval(func: &FunctionId, z: Complex64) -> Result<Complex64, EvalError> {
        Builtins.evaluate(func, z, &EvalContext::default())
    }

    #[test]
    fn test_identity_and_square() {
        assert_eq!(eval(&FunctionId::Identity, c(1.0, 2.0)), Ok(c(1.0, 2.0)));
        assert_eq!(eval(&FunctionId::Square, c(0.0, 1.0)), Ok(c(-1.0, 0.0)));
    }

    #[test]
    fn test_polynomial_roots_of_unity() {
        let f = FunctionId::cubic_roots_of_unity();
        let w = eval(&f, c(1.0, 0.0)).unwrap();
        assert!(w.norm() < 1e-12);
        let root = c(-0.5, 3f64.sqrt() / 2.0);
        assert!(eval(&f, root).unwrap().norm() < 1e-12);
    }

    #[test]
    fn test_mobius_pole_is_error() {
        assert_eq!(eval(&FunctionId::cayley(), c(-1.0, 0.0)), Err(EvalError::Pole));
        let w = eval(&FunctionId::cayley(), c(0.0, 0.0)).unwrap();
        assert!((w - c(-1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_reciprocal_pole_is_error() {
        assert_eq!(eval(&FunctionId::Reciprocal, c(0.0, 0.0)), Err(EvalError::Pole));
    }

    #[test]
    fn test_non_finite_input_rejected() {
        assert_eq!(eval(&FunctionId::Identity, c(f64::NAN, 0.0)), Err(EvalError::NonFinite));
    }

    #[test]
    fn test_exp_overflow_is_non_finite() {
        assert_eq!(eval(&FunctionId::Exp, c(1000.0, 0.0)), Err(EvalError::NonFinite));
    }

    #[test]
    fn test_borwein_weights_shared_and_increasing() {
        let d = borwein_weights();
        assert!(std::ptr::eq(d, borwein_weights()));
        assert!((d[0] - 1.0).abs() < 1e-15);
        assert!(d.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_zeta_known_values() {
        let z2 = eval(&FunctionId::Zeta, c(2.0, 0.0)).unwrap();
        assert!((z2.re - PI * PI / 6.0).abs() < 1e-9, "zeta(2) = {z2}");
        assert!(z2.im.abs() < 1e-9);

        let zh = eval(&FunctionId::Zeta, c(0.5, 0.0)).unwrap();
        assert!((zh.re - (-1.460_354_508_809_586_8)).abs() < 1e-8, "zeta(1/2) = {zh}");
    }

    #[test]
    fn test_zeta_continuation_values() {
        // ζ(0) = −1/2, ζ(−1) = −1/12
        let z0 = eval(&FunctionId::Zeta, c(0.0, 0.0)).unwrap();
        assert!((z0.re + 0.5).abs() < 1e-8, "zeta(0) = {z0}");
        let zm1 = eval(&FunctionId::Zeta, c(-1.0, 0.0)).unwrap();
        assert!((zm1.re + 1.0 / 12.0).abs() < 1e-8, "zeta(-1) = {zm1}");
    }

    #[test]
    fn test_zeta_first_nontrivial_zero() {
        let w = eval(&FunctionId::Zeta, c(0.5, 14.134_725_141_734_693)).unwrap();
        assert!(w.norm() < 1e-6, "|zeta| = {}", w.norm());
    }

    #[test]
    fn test_zeta_pole_at_one() {
        assert_eq!(eval(&FunctionId::Zeta, c(1.0, 0.0)), Err(EvalError::Pole));
    }

    #[test]
    fn test_zeta_without_continuation() {
        let ctx = EvalContext { zeta_continuation: false };
        assert_eq!(
            Builtins.evaluate(&FunctionId::Zeta, c(-1.0, 0.0), &ctx),
            Err(EvalError::OutsideDomain)
        );
        assert!(Builtins.evaluate(&FunctionId::Zeta, c(2.0, 0.0), &ctx).is_ok());
    }

    #[test]
    fn test_gamma_integers() {
        assert!((gamma(c(5.0, 0.0)) - c(24.0, 0.0)).norm() < 1e-9);
        assert!((gamma(c(0.5, 0.0)).re - PI.sqrt()).abs() < 1e-10);
    }

    #[test]
    fn test_derivative_of_square() {
        let d = Builtins
            .derivative(&FunctionId::Square, c(1.5, -0.5), &EvalContext::default())
            .unwrap();
        assert!((d - c(3.0, -1.0)).norm() < 1e-6, "got {d}");
    }

    #[test]
    fn test_derivative_propagates_pole() {
        let d = Builtins.derivative(&FunctionId::Reciprocal, c(DERIVATIVE_STEP, 0.0), &EvalContext::default());
        assert!(d.is_err());
    }

    #[test]
    fn test_from_name() {
        assert_eq!(FunctionId::from_name("Zeta"), Ok(FunctionId::Zeta));
        assert_eq!(FunctionId::from_name("1/z"), Ok(FunctionId::Reciprocal));
        assert_eq!(
            FunctionId::from_name("gamma"),
            Err(EvalError::UnknownFunction("gamma".to_string()))
        );
    }

    #[test]
    fn test_cycle_visits_every_kind() {
        let mut f = FunctionId::Identity;
        let mut names = Vec::new();
        for _ in 0..8 {
            names.push(f.name());
            f = f.cycle();
        }
        assert_eq!(f, FunctionId::Identity);
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 8);
    }

    #[test]
    fn test_deserialize_tagged_function() {
        let f: FunctionId = serde_yaml::from_str("kind: polynomial\ncoefficients: [[0, 0], [1, 0]]\n").unwrap();
        assert_eq!(f, FunctionId::Polynomial { coefficients: vec![[0.0, 0.0], [1.0, 0.0]] });
        let z: FunctionId = serde_yaml::from_str("kind: zeta\n").unwrap();
        assert!(z.is_zeta_family());
    }
}
