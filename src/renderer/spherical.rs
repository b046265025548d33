// Riemann sphere renderer: orthographic view of a lit, oriented unit sphere.

use tracing::debug;

use super::color::color_value;
use super::{PixelBuffer, RenderStats};
use crate::functions::Evaluator;
use crate::projection::{inverse_rotate_3d, sphere_to_complex, SphereParams, Vec3};
use crate::scene::Scene;

/// Phong lighting constants for the sphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightingModel {
    /// Direction towards the light, camera space. Normalized on use.
    pub direction: Vec3,
    pub ambient: f64,
    pub diffuse: f64,
    pub specular: f64,
    pub shininess: i32,
}

/// Light from the upper left, slightly in front of the sphere.
pub const LIGHTING: LightingModel = LightingModel {
    direction: Vec3::new(-0.5, 0.6, 0.9),
    ambient: 0.45,
    diffuse: 0.7,
    specular: 0.35,
    shininess: 24,
};

const INTENSITY_MIN: f64 = 0.1;
const INTENSITY_MAX: f64 = 1.75;

impl LightingModel {
    pub fn light_dir(&self) -> Vec3 {
        self.direction.normalize()
    }
}

/// Light intensity for camera-space unit normal `n` and unit light direction `l`.
pub fn light_intensity(n: Vec3, l: Vec3, model: &LightingModel) -> f64 {
    let n_dot_l = n.dot(l);
    let diffuse = n_dot_l.max(0.0);
    let specular = if diffuse > 0.0 {
        // reflect(L, N) = 2 (N·L) N − L; the viewer looks down −z
        let r = n.scale(2.0 * n_dot_l).sub(l);
        r.z.max(0.0).powi(model.shininess)
    } else {
        0.0
    };
    (model.ambient + diffuse * model.diffuse + specular * model.specular).clamp(INTENSITY_MIN, INTENSITY_MAX)
}

/// Render the sphere into `buf` (resized to `width × height`).
/// Pixels outside the sphere's disc stay transparent.
pub fn render_sphere<E: Evaluator + ?Sized>(
    buf: &mut PixelBuffer,
    width: usize,
    height: usize,
    sphere: &SphereParams,
    scene: &Scene,
    evaluator: &E,
) -> RenderStats {
    buf.resize(width, height);
    buf.clear();

    let mut stats = RenderStats::default();
    if sphere.is_degenerate() {
        return stats;
    }

    let r = sphere.radius;
    let cx = sphere.center_x;
    let cy = sphere.center_y;
    let light = LIGHTING.light_dir();

    // Bounding box of the disc, clipped to the buffer
    let x0 = (cx - r).floor().max(0.0) as usize;
    let y0 = (cy - r).floor().max(0.0) as usize;
    let x1 = ((cx + r).ceil().max(0.0) as usize).min(width);
    let y1 = ((cy + r).ceil().max(0.0) as usize).min(height);

    for sy in y0..y1 {
        for sx in x0..x1 {
            let nx = (sx as f64 + 0.5 - cx) / r;
            let ny = (cy - (sy as f64 + 0.5)) / r; // y up
            let r2 = nx * nx + ny * ny;
            if r2 > 1.0 {
                continue;
            }

            let normal = Vec3::new(nx, ny, (1.0 - r2).sqrt());
            let intrinsic = inverse_rotate_3d(normal, sphere.rot_x, sphere.rot_y);
            let z = sphere_to_complex(intrinsic);

            let lighting = light_intensity(normal, light, &LIGHTING);
            match scene.resolve(z, evaluator).and_then(|w| color_value(w, lighting, &scene.color)) {
                Some(rgba) => {
                    buf.put(sx, sy, rgba);
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
        "rendered sphere"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{Builtins, FunctionId};
    use crate::scene::ColorSource;
    use std::f64::consts::FRAC_PI_2;

    fn world_scene() -> Scene {
        Scene { source: ColorSource::World, ..Scene::default() }
    }

    #[test]
    fn test_intensity_bounds() {
        let l = LIGHTING.light_dir();
        for i in 0..=20 {
            for j in 0..=20 {
                let nx = -1.0 + i as f64 / 10.0;
                let ny = -1.0 + j as f64 / 10.0;
                let r2 = nx * nx + ny * ny;
                if r2 > 1.0 {
                    continue;
                }
                let n = Vec3::new(nx, ny, (1.0 - r2).sqrt());
                let v = light_intensity(n, l, &LIGHTING);
                assert!((INTENSITY_MIN..=INTENSITY_MAX).contains(&v));
            }
        }
    }

    #[test]
    fn test_facing_light_is_brightest() {
        let l = LIGHTING.light_dir();
        let lit = light_intensity(l, l, &LIGHTING);
        let grazing = light_intensity(Vec3::new(1.0, 0.0, 0.0), l, &LIGHTING);
        assert!(lit > grazing);
        // normal == light: full diffuse plus full specular
        let expected = (LIGHTING.ambient + LIGHTING.diffuse + LIGHTING.specular * l.z.powi(LIGHTING.shininess))
            .clamp(INTENSITY_MIN, INTENSITY_MAX);
        assert!((lit - expected).abs() < 1e-12);
    }

    #[test]
    fn test_intensity_clamped_high() {
        let bright = LightingModel { ambient: 1.0, diffuse: 1.0, specular: 1.0, ..LIGHTING };
        let l = bright.light_dir();
        assert_eq!(light_intensity(l, l, &bright), INTENSITY_MAX);
    }

    #[test]
    fn test_intensity_clamped_low() {
        let dark = LightingModel { ambient: 0.0, diffuse: 0.0, specular: 0.0, ..LIGHTING };
        let l = dark.light_dir();
        assert_eq!(light_intensity(l, l, &dark), INTENSITY_MIN);
        assert_eq!(light_intensity(Vec3::new(1.0, 0.0, 0.0), l, &dark), INTENSITY_MIN);
    }

    #[test]
    fn test_back_lit_is_ambient_only() {
        let l = Vec3::new(0.0, 0.0, 1.0);
        let v = light_intensity(Vec3::new(0.0, 0.0, -1.0), l, &LIGHTING);
        assert!((v - LIGHTING.ambient).abs() < 1e-12);
    }

    #[test]
    fn test_outside_disc_untouched() {
        let sphere = SphereParams::fit(20, 20, 0.4, 0.3, -0.2);
        let mut buf = PixelBuffer::new(0, 0);
        let stats = render_sphere(&mut buf, 20, 20, &sphere, &world_scene(), &Builtins);
        assert!(stats.colored > 0);
        assert_eq!(buf.get(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(buf.get(19, 19), Some([0, 0, 0, 0]));
        assert_eq!(buf.get(10, 10).unwrap()[3], 255);
    }

    #[test]
    fn test_front_center_shows_rotated_point() {
        // a quarter turn about Y brings z = 1 (phase 0, cyan) to the front
        let sphere = SphereParams { center_x: 5.5, center_y: 5.5, radius: 100.0, rot_x: 0.0, rot_y: -FRAC_PI_2 };
        let mut buf = PixelBuffer::new(0, 0);
        render_sphere(&mut buf, 10, 10, &sphere, &world_scene(), &Builtins);
        let [r, g, b, a] = buf.get(5, 5).unwrap();
        assert_eq!(a, 255);
        assert!(r < g && r < b);
    }

    #[test]
    fn test_degenerate_radius_renders_nothing() {
        let sphere = SphereParams { center_x: 5.0, center_y: 5.0, radius: 0.0, rot_x: 0.0, rot_y: 0.0 };
        let mut buf = PixelBuffer::new(0, 0);
        let stats = render_sphere(&mut buf, 10, 10, &sphere, &world_scene(), &Builtins);
        assert_eq!(stats, RenderStats::default());
        assert!(buf.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sphere_partially_offscreen() {
        let sphere = SphereParams { center_x: -2.0, center_y: 3.0, radius: 6.0, rot_x: 0.0, rot_y: 0.0 };
        let mut buf = PixelBuffer::new(0, 0);
        let stats = render_sphere(&mut buf, 8, 8, &sphere, &world_scene(), &Builtins);
        assert!(stats.colored > 0);
        assert_eq!(buf.get(0, 3).unwrap()[3], 255);
    }

    #[test]
    fn test_function_mode_skips_poles() {
        // unrotated, the north pole faces the camera and maps to 0, a pole of 1/z
        let sphere = SphereParams { center_x: 4.5, center_y: 4.5, radius: 4.0, rot_x: 0.0, rot_y: 0.0 };
        let scene = Scene { function: FunctionId::Reciprocal, ..Scene::default() };
        let mut buf = PixelBuffer::new(0, 0);
        let stats = render_sphere(&mut buf, 9, 9, &sphere, &scene, &Builtins);
        assert!(stats.colored > 0);
        assert_eq!(stats.skipped, 1);
        assert_eq!(buf.get(4, 4), Some([0, 0, 0, 0]));
    }
}
