use std::f64::consts::{LN_2, PI, TAU};

use serde::Deserialize;

use crate::complex::{is_defined, polar_log, ComplexValue};

/// Lightness never reaches pure black or white so hue stays readable.
pub(crate) const LIGHTNESS_MIN: f64 = 0.05;
pub(crate) const LIGHTNESS_MAX: f64 = 0.95;

/// Below this contour angle the value is treated as a zero and drawn black.
const ZERO_GUARD_ANGLE: f64 = -10.0;

/// Color-shaping knobs for domain coloring.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ColorParams {
    pub brightness: f64,
    pub contrast: f64,
    /// Contour rings per doubling of `1 + |f|`.
    pub lightness_cycles: f64,
    pub saturation: f64,
}

impl Default for ColorParams {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            lightness_cycles: 1.0,
            saturation: 0.9,
        }
    }
}

/// Phase in (-π, π] to hue in [0, 360). Both ends of the branch cut map to 0.
#[inline]
pub fn phase_to_hue(phase: f64) -> f64 {
    ((phase + PI) / TAU * 360.0).rem_euclid(360.0)
}

/// Banded lightness from log-modulus: one sine period per `ln 2 / cycles`,
/// centered at 0.5 with amplitude 0.25.
#[inline]
pub fn base_lightness(log_modulus: f64, cycles: f64) -> f64 {
    // ring count is unsigned
    let angle = TAU * log_modulus * cycles.abs() / LN_2;
    if angle < ZERO_GUARD_ANGLE {
        return 0.0;
    }
    0.5 + 0.25 * angle.sin()
}

/// Apply contrast around 0.5, then brightness and lighting, then clamp.
#[inline]
pub fn shade_lightness(base: f64, params: &ColorParams, lighting: f64) -> f64 {
    let l = (base - 0.5) * params.contrast + 0.5;
    (l * params.brightness * lighting).clamp(LIGHTNESS_MIN, LIGHTNESS_MAX)
}

/// HSL to 8-bit RGB. Degenerate input yields black.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> [u8; 3] {
    if !(h.is_finite() && s.is_finite() && l.is_finite()) {
        return [0, 0, 0];
    }
    let h = h.rem_euclid(360.0);
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    [
        ((r1 + m) * 255.0).round().clamp(0.0, 255.0) as u8,
        ((g1 + m) * 255.0).round().clamp(0.0, 255.0) as u8,
        ((b1 + m) * 255.0).round().clamp(0.0, 255.0) as u8,
    ]
}

/// Map phase / log-modulus / lighting to an opaque RGBA pixel.
pub fn domain_color(phase: f64, log_modulus: f64, lighting: f64, params: &ColorParams) -> [u8; 4] {
    let hue = phase_to_hue(phase);
    let l = shade_lightness(base_lightness(log_modulus, params.lightness_cycles), params, lighting);
    let s = params.saturation.clamp(0.0, 1.0);
    let [r, g, b] = hsl_to_rgb(hue, s, l);
    [r, g, b, 255]
}

/// Color a function value, or `None` when it is undefined.
#[inline]
pub fn color_value(z: ComplexValue, lighting: f64, params: &ColorParams) -> Option<[u8; 4]> {
    if !is_defined(z) {
        return None;
    }
    let (phase, _, log_modulus) = polar_log(z);
    Some(domain_color(phase, log_modulus, lighting, params))
}
