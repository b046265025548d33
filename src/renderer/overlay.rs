// Streamline overlay: Bresenham polylines screen-blended over the colored field.

use super::PixelBuffer;
use crate::projection::{complex_to_sphere, project_sphere_to_canvas, rotate_3d, to_canvas, PlaneParams, SphereParams};
use crate::streamline::Streamline;

// Streamline palette: deep blue -> blue -> light cyan -> warm white
const STREAM_COLORS: [[f64; 3]; 4] = [
    [30.0, 50.0, 120.0],   // deep blue (slow)
    [80.0, 140.0, 255.0],  // blue
    [180.0, 220.0, 255.0], // light cyan
    [255.0, 240.0, 200.0], // warm white (fast)
];

const STREAM_ALPHA: f64 = 0.85;

// Segments reaching further than this many canvas sizes off screen are dropped.
const CLIP_FACTOR: f64 = 4.0;

/// Palette color for normalized speed `t` in [0, 1].
#[inline]
pub fn stream_color(t: f64) -> [f64; 3] {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let seg = t * (STREAM_COLORS.len() - 1) as f64;
    let i = (seg as usize).min(STREAM_COLORS.len() - 2);
    let f = seg - i as f64;
    let c0 = &STREAM_COLORS[i];
    let c1 = &STREAM_COLORS[i + 1];
    [
        c0[0] + f * (c1[0] - c0[0]),
        c0[1] + f * (c1[1] - c0[1]),
        c0[2] + f * (c1[2] - c0[2]),
    ]
}

// |v| in [0, inf) -> [0, 1)
#[inline]
fn speed_t(magnitude: f64) -> f64 {
    magnitude / (1.0 + magnitude)
}

// Screen blend: result = 1 - (1-bg)(1-fg*alpha); the pixel becomes opaque.
#[inline]
fn screen_blend(px: &mut [u8], color: [f64; 3], alpha: f64) {
    for c in 0..3 {
        let bg = px[c] as f64;
        let fg = (color[c] * alpha).min(255.0);
        px[c] = (bg + fg - bg * fg / 255.0).min(255.0) as u8;
    }
    px[3] = 255;
}

/// Bresenham line from (x0,y0) to (x1,y1), clipped per pixel to the buffer.
fn draw_line_blended(buf: &mut PixelBuffer, x0: isize, y0: isize, x1: isize, y1: isize, color: [f64; 3], alpha: f64) {
    let mut cx = x0;
    let mut cy = y0;
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx: isize = if x0 < x1 { 1 } else { -1 };
    let sy: isize = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if cx >= 0 && cy >= 0 {
            if let Some(px) = buf.pixel_mut(cx as usize, cy as usize) {
                screen_blend(px, color, alpha);
            }
        }
        if cx == x1 && cy == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            cx += sx;
        }
        if e2 <= dx {
            err += dx;
            cy += sy;
        }
    }
}

// Canvas point to integer pixel, None when unusable or far off screen.
fn to_pixel(buf: &PixelBuffer, x: f64, y: f64) -> Option<(isize, isize)> {
    let limit_x = CLIP_FACTOR * buf.width().max(1) as f64;
    let limit_y = CLIP_FACTOR * buf.height().max(1) as f64;
    if !(x.is_finite() && y.is_finite()) || x.abs() > limit_x || y.abs() > limit_y {
        return None;
    }
    Some((x.floor() as isize, y.floor() as isize))
}

fn draw_segments<I>(buf: &mut PixelBuffer, segments: I)
where
    I: IntoIterator<Item = ((f64, f64), (f64, f64), f64)>,
{
    for (a, b, magnitude) in segments {
        let (Some((x0, y0)), Some((x1, y1))) = (to_pixel(buf, a.0, a.1), to_pixel(buf, b.0, b.1)) else {
            continue;
        };
        draw_line_blended(buf, x0, y0, x1, y1, stream_color(speed_t(magnitude)), STREAM_ALPHA);
    }
}

/// Draw a world-space streamline on the plane view. Each segment takes the
/// color of its starting point's field magnitude.
pub fn draw_streamline_planar(buf: &mut PixelBuffer, plane: &PlaneParams, line: &Streamline) {
    let segments = line.points.windows(2).map(|w| {
        (
            to_canvas(w[0].x, w[0].y, plane),
            to_canvas(w[1].x, w[1].y, plane),
            w[0].magnitude,
        )
    });
    draw_segments(buf, segments);
}

/// Draw a world-space streamline lifted onto the sphere. Segments with an
/// endpoint on the far side are skipped.
pub fn draw_streamline_sphere(buf: &mut PixelBuffer, sphere: &SphereParams, line: &Streamline) {
    if sphere.is_degenerate() {
        return;
    }
    let projected: Vec<(f64, f64, bool)> = line
        .points
        .iter()
        .map(|p| {
            let q = rotate_3d(complex_to_sphere(p.x, p.y), sphere.rot_x, sphere.rot_y);
            project_sphere_to_canvas(q, sphere.center_x, sphere.center_y, sphere.radius)
        })
        .collect();

    let segments = projected
        .windows(2)
        .zip(line.points.iter())
        .filter(|(w, _)| w[0].2 && w[1].2)
        .map(|(w, p)| ((w[0].0, w[0].1), (w[1].0, w[1].1), p.magnitude));
    draw_segments(buf, segments);
}
