// Per-frame visualization context threaded through every render and trace call.

use serde::Deserialize;

use crate::complex::{is_defined, ComplexValue};
use crate::functions::{EvalContext, Evaluator, FunctionId, ZETA_REFLECTION_ABSCISSA};
use crate::renderer::ColorParams;
use crate::streamline::FieldMode;

/// Where a pixel's complex value comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSource {
    /// Evaluate the active function at the pixel's coordinate.
    #[default]
    Function,
    /// Color the coordinate itself (world plane / world sphere).
    World,
}

impl ColorSource {
    pub fn toggle(self) -> Self {
        match self {
            ColorSource::Function => ColorSource::World,
            ColorSource::World => ColorSource::Function,
        }
    }
}

/// Immutable snapshot of everything a frame needs besides geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub function: FunctionId,
    pub source: ColorSource,
    pub color: ColorParams,
    pub eval: EvalContext,
    pub field_mode: FieldMode,
    /// Planar sampling block size in pixels (1 = every pixel).
    pub sampling_stride: usize,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            function: FunctionId::default(),
            source: ColorSource::Function,
            color: ColorParams::default(),
            eval: EvalContext::default(),
            field_mode: FieldMode::Direct,
            sampling_stride: 1,
        }
    }
}

impl Scene {
    /// Value to color at domain point `z`, or `None` to leave the pixel untouched.
    pub fn resolve<E: Evaluator + ?Sized>(&self, z: ComplexValue, evaluator: &E) -> Option<ComplexValue> {
        if !is_defined(z) {
            return None;
        }
        match self.source {
            ColorSource::World => Some(z),
            ColorSource::Function => {
                if self.suppresses(z) {
                    return None;
                }
                evaluator
                    .evaluate(&self.function, z, &self.eval)
                    .ok()
                    .filter(|w| is_defined(*w))
            }
        }
    }

    /// Zeta without continuation is blank at and left of the reflection abscissa.
    fn suppresses(&self, z: ComplexValue) -> bool {
        self.function.is_zeta_family() && !self.eval.zeta_continuation && z.re <= ZETA_REFLECTION_ABSCISSA
    }
}
