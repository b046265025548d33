// Planar domain coloring.

use tracing::debug;

use super::color::color_value;
use super::{PixelBuffer, RenderStats};
use crate::complex::ComplexValue;
use crate::functions::Evaluator;
use crate::projection::{to_world, PlaneParams};
use crate::scene::Scene;

/// Render the plane view into `buf` (resized to the plane's size).
///
/// Samples the center of the top-left pixel of every `stride × stride` block
/// and replicates the color over the block.
pub fn render_plane<E: Evaluator + ?Sized>(
    buf: &mut PixelBuffer,
    plane: &PlaneParams,
    scene: &Scene,
    evaluator: &E,
) -> RenderStats {
    buf.resize(plane.width, plane.height);
    buf.clear();

    let stride = scene.sampling_stride.max(1);
    let mut stats = RenderStats::default();

    for by in (0..plane.height).step_by(stride) {
        for bx in (0..plane.width).step_by(stride) {
            let (wx, wy) = to_world(bx as f64 + 0.5, by as f64 + 0.5, plane);
            let rgba = scene
                .resolve(ComplexValue::new(wx, wy), evaluator)
                .and_then(|w| color_value(w, 1.0, &scene.color));
            match rgba {
                Some(rgba) => {
                    buf.fill_block(bx, by, stride, rgba);
                    stats.colored += 1;
                }
                None => stats.skipped += 1,
            }
        }
    }

    debug!(
        function = scene.function.name(),
        colored = stats.colored,
        skipped = stats.skipped,
        "rendered plane"
    );
    stats
}
