// Midpoint (RK2) integral curves of the vector field derived from f(z).

use serde::Deserialize;
use tracing::debug;

use crate::complex::{is_defined, ComplexValue};
use crate::functions::{EvalContext, Evaluator, FunctionId};
use crate::projection::ViewRange;
use crate::scene::Scene;

/// Both components below this mark a stagnation point.
pub(crate) const STAGNATION_EPS: f64 = 1e-9;

/// Reciprocal field is zeroed when |f|² falls below this.
pub(crate) const RECIPROCAL_MIN_NORM_SQR: f64 = 1e-12;

/// How the 2D vector field is derived from the function value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldMode {
    /// f(z)
    #[default]
    Direct,
    /// 1/f(z)
    Reciprocal,
    /// f'(z)
    Derivative,
}

impl FieldMode {
    pub fn next(self) -> Self {
        match self {
            FieldMode::Direct => FieldMode::Reciprocal,
            FieldMode::Reciprocal => FieldMode::Derivative,
            FieldMode::Derivative => FieldMode::Direct,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FieldMode::Direct => "f(z)",
            FieldMode::Reciprocal => "1/f(z)",
            FieldMode::Derivative => "f'(z)",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VectorFieldSample {
    pub vx: f64,
    pub vy: f64,
}

impl VectorFieldSample {
    pub const ZERO: VectorFieldSample = VectorFieldSample { vx: 0.0, vy: 0.0 };

    /// Zero vector for undefined values.
    pub fn from_value(w: ComplexValue) -> Self {
        if is_defined(w) {
            Self { vx: w.re, vy: w.im }
        } else {
            Self::ZERO
        }
    }

    pub fn magnitude(&self) -> f64 {
        self.vx.hypot(self.vy)
    }

    /// Near-zero or non-finite.
    fn is_degenerate(&self) -> bool {
        let stagnant = self.vx.abs() < STAGNATION_EPS && self.vy.abs() < STAGNATION_EPS;
        stagnant || !(self.vx.is_finite() && self.vy.is_finite())
    }
}

/// 1/f via conjugate division; zero near poles of 1/f.
pub fn reciprocal_vector(w: ComplexValue) -> VectorFieldSample {
    if !is_defined(w) {
        return VectorFieldSample::ZERO;
    }
    let norm_sqr = w.norm_sqr();
    if norm_sqr < RECIPROCAL_MIN_NORM_SQR {
        return VectorFieldSample::ZERO;
    }
    VectorFieldSample::from_value(ComplexValue::new(w.re / norm_sqr, -w.im / norm_sqr))
}

/// Sample the field at `(x, y)`. Evaluation failures yield the zero vector.
pub fn sample_field<E: Evaluator + ?Sized>(
    mode: FieldMode,
    func: &FunctionId,
    x: f64,
    y: f64,
    ctx: &EvalContext,
    evaluator: &E,
) -> VectorFieldSample {
    let z = ComplexValue::new(x, y);
    match mode {
        FieldMode::Direct => evaluator
            .evaluate(func, z, ctx)
            .map(VectorFieldSample::from_value)
            .unwrap_or(VectorFieldSample::ZERO),
        FieldMode::Reciprocal => evaluator
            .evaluate(func, z, ctx)
            .map(reciprocal_vector)
            .unwrap_or(VectorFieldSample::ZERO),
        FieldMode::Derivative => evaluator
            .derivative(func, z, ctx)
            .map(VectorFieldSample::from_value)
            .unwrap_or(VectorFieldSample::ZERO),
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreamlinePoint {
    pub x: f64,
    pub y: f64,
    pub magnitude: f64,
}

/// Why tracing stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    BoundaryExit,
    Stagnation,
    MaxLength,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Streamline {
    pub points: Vec<StreamlinePoint>,
    pub termination: Termination,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TraceParams {
    /// Integration step in world units.
    pub step_size: f64,
    /// Maximum number of recorded points.
    pub max_length: usize,
}

/// Trace one streamline from `seed`.
///
/// Each iteration records the current point with the field magnitude there,
/// stops if the point left `range` or the field vanishes (or is not finite),
/// and otherwise takes a midpoint step, falling back to Euler when the
/// midpoint sample is degenerate.
pub fn trace<F>(seed: (f64, f64), mut sampler: F, range: &ViewRange, params: &TraceParams) -> Streamline
where
    F: FnMut(f64, f64) -> VectorFieldSample,
{
    let (mut x, mut y) = seed;
    let h = params.step_size;
    let mut points = Vec::with_capacity(params.max_length.min(4096));

    while points.len() < params.max_length {
        let k1 = sampler(x, y);
        points.push(StreamlinePoint { x, y, magnitude: k1.magnitude() });

        if !range.contains(x, y) {
            return Streamline { points, termination: Termination::BoundaryExit };
        }
        if k1.is_degenerate() {
            return Streamline { points, termination: Termination::Stagnation };
        }

        let mx = x + 0.5 * h * k1.vx;
        let my = y + 0.5 * h * k1.vy;
        let k2 = sampler(mx, my);

        if k2.is_degenerate() {
            x += h * k1.vx;
            y += h * k1.vy;
        } else {
            x += h * k2.vx;
            y += h * k2.vy;
        }
    }

    Streamline { points, termination: Termination::MaxLength }
}

/// Trace a streamline of the scene's field mode through the evaluator.
pub fn trace_field<E: Evaluator + ?Sized>(
    seed: (f64, f64),
    scene: &Scene,
    evaluator: &E,
    range: &ViewRange,
    params: &TraceParams,
) -> Streamline {
    let line = trace(
        seed,
        |x, y| sample_field(scene.field_mode, &scene.function, x, y, &scene.eval, evaluator),
        range,
        params,
    );
    debug!(
        seed_x = seed.0,
        seed_y = seed.1,
        points = line.points.len(),
        termination = ?line.termination,
        "traced streamline"
    );
    line
}

/// Cell-centered `density × density` grid of seed points over `range`.
pub fn seed_grid(range: &ViewRange, density: usize) -> Vec<(f64, f64)> {
    if density == 0 {
        return Vec::new();
    }
    let x_step = range.width() / density as f64;
    let y_step = range.height() / density as f64;
    let mut seeds = Vec::with_capacity(density * density);
    for j in 0..density {
        for i in 0..density {
            seeds.push((
                range.x_min + (i as f64 + 0.5) * x_step,
                range.y_min + (j as f64 + 0.5) * y_step,
            ));
        }
    }
    seeds
}

/// Trace from every seed of a grid over `range`, keeping lines with at least one step.
pub fn trace_grid<E: Evaluator + ?Sized>(
    scene: &Scene,
    evaluator: &E,
    range: &ViewRange,
    params: &TraceParams,
    density: usize,
) -> Vec<Streamline> {
    let lines: Vec<Streamline> = seed_grid(range, density)
        .into_iter()
        .map(|seed| trace_field(seed, scene, evaluator, range, params))
        .filter(|line| line.points.len() > 1)
        .collect();
    let count = |t: Termination| lines.iter().filter(|l| l.termination == t).count();
    debug!(
        seeds = density * density,
        kept = lines.len(),
        boundary = count(Termination::BoundaryExit),
        stagnation = count(Termination::Stagnation),
        max_length = count(Termination::MaxLength),
        mode = scene.field_mode.label(),
        "traced streamline grid"
    );
    lines
}
