// Canvas <-> world mapping, stereographic projection and sphere orientation.

use crate::complex::ComplexValue;

/// Points closer than this to the north pole are sent to infinity.
const POLE_EPS: f64 = 1e-9;

/// Camera-space z above which a sphere point counts as facing the viewer.
/// Slightly negative so the silhouette edge is not dropped.
const VISIBLE_Z_EPS: f64 = -0.01;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const NAN: Vec3 = Vec3::new(f64::NAN, f64::NAN, f64::NAN);

    #[inline]
    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn scale(self, f: f64) -> Vec3 {
        Vec3::new(self.x * f, self.y * f, self.z * f)
    }

    #[inline]
    pub fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction; the zero vector stays zero.
    pub fn normalize(self) -> Vec3 {
        let len = self.length();
        if len > 0.0 && len.is_finite() {
            self.scale(1.0 / len)
        } else {
            Vec3::new(0.0, 0.0, 0.0)
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// World-space rectangle visible on the canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewRange {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl ViewRange {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}

/// Planar view geometry. `origin_*` is the pixel position of world (0, 0),
/// `scale_*` is pixels per world unit.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaneParams {
    pub origin_x: f64,
    pub origin_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub width: usize,
    pub height: usize,
    pub range: ViewRange,
}

impl PlaneParams {
    pub fn new(width: usize, height: usize, origin: (f64, f64), scale: (f64, f64)) -> Self {
        let mut plane = Self {
            origin_x: origin.0,
            origin_y: origin.1,
            scale_x: scale.0,
            scale_y: scale.1,
            width,
            height,
            range: ViewRange { x_min: 0.0, x_max: 0.0, y_min: 0.0, y_max: 0.0 },
        };
        recompute_visible_range(&mut plane);
        plane
    }

    /// World origin at the canvas center with isotropic scale.
    pub fn centered(width: usize, height: usize, pixels_per_unit: f64) -> Self {
        Self::new(
            width,
            height,
            (width as f64 / 2.0, height as f64 / 2.0),
            (pixels_per_unit, pixels_per_unit),
        )
    }

    /// Shift the view by a pixel offset.
    pub fn pan(&mut self, dx_px: f64, dy_px: f64) {
        self.origin_x += dx_px;
        self.origin_y += dy_px;
        recompute_visible_range(self);
    }

    /// Multiply the scale by `factor`, keeping the canvas center fixed in world space.
    pub fn zoom(&mut self, factor: f64) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let cx = self.width as f64 / 2.0;
        let cy = self.height as f64 / 2.0;
        self.origin_x = cx + (self.origin_x - cx) * factor;
        self.origin_y = cy + (self.origin_y - cy) * factor;
        self.scale_x *= factor;
        self.scale_y *= factor;
        recompute_visible_range(self);
    }

    /// Change canvas size, keeping the world origin at the same relative position.
    pub fn resize(&mut self, width: usize, height: usize) {
        if self.width > 0 && self.height > 0 {
            self.origin_x *= width as f64 / self.width as f64;
            self.origin_y *= height as f64 / self.height as f64;
        }
        self.width = width;
        self.height = height;
        recompute_visible_range(self);
    }

    fn has_valid_scale(&self) -> bool {
        self.scale_x.is_finite() && self.scale_y.is_finite() && self.scale_x != 0.0 && self.scale_y != 0.0
    }
}

/// Screen-space placement and orientation of the Riemann sphere.
#[derive(Clone, Debug, PartialEq)]
pub struct SphereParams {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
    pub rot_x: f64,
    pub rot_y: f64,
}

impl SphereParams {
    /// Sphere centered on the canvas, radius a fraction of the shorter side.
    pub fn fit(width: usize, height: usize, radius_fraction: f64, rot_x: f64, rot_y: f64) -> Self {
        Self {
            center_x: width as f64 / 2.0,
            center_y: height as f64 / 2.0,
            radius: width.min(height) as f64 * radius_fraction,
            rot_x,
            rot_y,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.radius.is_finite() && self.radius > 0.0 && self.center_x.is_finite() && self.center_y.is_finite())
    }
}

/// World -> pixel. The y axis points up in world space and down on screen.
pub fn to_canvas(world_x: f64, world_y: f64, plane: &PlaneParams) -> (f64, f64) {
    (
        plane.origin_x + world_x * plane.scale_x,
        plane.origin_y - world_y * plane.scale_y,
    )
}

/// Pixel -> world. Returns NaN coordinates when either scale is zero or non-finite.
pub fn to_world(pixel_x: f64, pixel_y: f64, plane: &PlaneParams) -> (f64, f64) {
    if !plane.has_valid_scale() {
        return (f64::NAN, f64::NAN);
    }
    (
        (pixel_x - plane.origin_x) / plane.scale_x,
        (plane.origin_y - pixel_y) / plane.scale_y,
    )
}

/// Inverse stereographic projection of `re + i·im` onto the unit sphere.
/// The origin lands on the south pole, infinity on the north pole.
pub fn complex_to_sphere(re: f64, im: f64) -> Vec3 {
    if !(re.is_finite() && im.is_finite()) {
        return Vec3::NAN;
    }
    let r2 = re * re + im * im;
    let d = r2 + 1.0;
    if d == 0.0 || !d.is_finite() {
        return Vec3::NAN;
    }
    Vec3::new(2.0 * re / d, 2.0 * im / d, (r2 - 1.0) / d)
}

/// Stereographic projection from the north pole.
///
/// At the pole the result is the point at infinity, reported per component as
/// `±∞` following the sign of `x` / `y`, or `0` when that coordinate is exactly 0.
pub fn sphere_to_complex(p: Vec3) -> ComplexValue {
    let denom = 1.0 - p.z;
    if denom.abs() < POLE_EPS {
        return ComplexValue::new(signed_infinity(p.x), signed_infinity(p.y));
    }
    ComplexValue::new(p.x / denom, p.y / denom)
}

fn signed_infinity(v: f64) -> f64 {
    if v > 0.0 {
        f64::INFINITY
    } else if v < 0.0 {
        f64::NEG_INFINITY
    } else {
        0.0
    }
}

/// Rotate about Y by `rot_y`, then about X by `rot_x`.
pub fn rotate_3d(p: Vec3, rot_x: f64, rot_y: f64) -> Vec3 {
    let (sy, cy) = rot_y.sin_cos();
    let x1 = p.x * cy + p.z * sy;
    let z1 = -p.x * sy + p.z * cy;

    let (sx, cx) = rot_x.sin_cos();
    let y2 = p.y * cx - z1 * sx;
    let z2 = p.y * sx + z1 * cx;

    Vec3::new(x1, y2, z2)
}

/// Inverse of [`rotate_3d`]: about X by `-rot_x`, then about Y by `-rot_y`.
pub fn inverse_rotate_3d(p: Vec3, rot_x: f64, rot_y: f64) -> Vec3 {
    let (sx, cx) = rot_x.sin_cos();
    let y1 = p.y * cx + p.z * sx;
    let z1 = -p.y * sx + p.z * cx;

    let (sy, cy) = rot_y.sin_cos();
    let x2 = p.x * cy - z1 * sy;
    let z2 = p.x * sy + z1 * cy;

    Vec3::new(x2, y1, z2)
}

/// Orthographic projection of a camera-space sphere point.
/// Returns `(pixel_x, pixel_y, is_visible)`.
pub fn project_sphere_to_canvas(rotated: Vec3, center_x: f64, center_y: f64, radius: f64) -> (f64, f64, bool) {
    (
        center_x + rotated.x * radius,
        center_y - rotated.y * radius,
        rotated.z > VISIBLE_Z_EPS,
    )
}

/// Derive the visible world rectangle from origin, scale and canvas size.
/// Leaves the previous range untouched when the geometry is degenerate.
pub fn recompute_visible_range(plane: &mut PlaneParams) {
    if plane.width == 0 || plane.height == 0 || !plane.has_valid_scale() {
        return;
    }
    if !(plane.origin_x.is_finite() && plane.origin_y.is_finite()) {
        return;
    }
    let (ax, ay) = to_world(0.0, 0.0, plane);
    let (bx, by) = to_world(plane.width as f64, plane.height as f64, plane);
    plane.range = ViewRange {
        x_min: ax.min(bx),
        x_max: ax.max(bx),
        y_min: ay.min(by),
        y_max: ay.max(by),
    };
}
