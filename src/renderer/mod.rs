mod color;
mod overlay;
mod planar;
mod spherical;

// Re-export public API
pub use color::{base_lightness, color_value, domain_color, hsl_to_rgb, phase_to_hue, shade_lightness, ColorParams};
pub use overlay::{draw_streamline_planar, draw_streamline_sphere, stream_color};
pub use planar::render_plane;
pub use spherical::{light_intensity, render_sphere, LightingModel, LIGHTING};

use serde::Deserialize;

/// Which domain the main view shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Plane,
    Sphere,
}

impl ViewMode {
    pub fn toggle(self) -> Self {
        match self {
            ViewMode::Plane => ViewMode::Sphere,
            ViewMode::Sphere => ViewMode::Plane,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Plane => "plane",
            ViewMode::Sphere => "sphere",
        }
    }
}

/// Row-major RGBA raster. A render pass clears it to transparent black and
/// writes opaque pixels only where a value was colored.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * 4],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Resize, reusing the allocation when possible. Contents are unspecified afterwards.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.data.resize(width * height * 4, 0);
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    #[inline]
    fn offset(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| (y * self.width + x) * 4)
    }

    /// Write one pixel; out-of-range coordinates are ignored.
    #[inline]
    pub fn put(&mut self, x: usize, y: usize, rgba: [u8; 4]) {
        if let Some(off) = self.offset(x, y) {
            self.data[off..off + 4].copy_from_slice(&rgba);
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        self.offset(x, y).map(|off| {
            let mut px = [0u8; 4];
            px.copy_from_slice(&self.data[off..off + 4]);
            px
        })
    }

    /// Fill a `size × size` block anchored at `(x0, y0)`, clipped to the buffer.
    pub fn fill_block(&mut self, x0: usize, y0: usize, size: usize, rgba: [u8; 4]) {
        let x1 = (x0 + size).min(self.width);
        let y1 = (y0 + size).min(self.height);
        for y in y0..y1 {
            for x in x0..x1 {
                let off = (y * self.width + x) * 4;
                self.data[off..off + 4].copy_from_slice(&rgba);
            }
        }
    }

    /// Mutable access to the pixel at `(x, y)` for blending.
    pub(crate) fn pixel_mut(&mut self, x: usize, y: usize) -> Option<&mut [u8]> {
        self.offset(x, y).map(move |off| &mut self.data[off..off + 4])
    }
}

/// Outcome of one render pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Samples that produced a color.
    pub colored: usize,
    /// Samples left untouched (undefined value or suppressed region).
    pub skipped: usize,
}

/// Convert an RGBA buffer to 0RGB for minifb.
pub fn rgba_to_argb(rgba: &[u8], out: &mut [u32]) {
    for (i, pixel) in rgba.chunks_exact(4).enumerate() {
        out[i] = (pixel[0] as u32) << 16 | (pixel[1] as u32) << 8 | pixel[2] as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_transparent() {
        let buf = PixelBuffer::new(3, 2);
        assert_eq!(buf.as_bytes().len(), 24);
        assert!(buf.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_put_get_row_major() {
        let mut buf = PixelBuffer::new(3, 2);
        buf.put(2, 1, [1, 2, 3, 255]);
        assert_eq!(buf.get(2, 1), Some([1, 2, 3, 255]));
        assert_eq!(&buf.as_bytes()[20..24], &[1, 2, 3, 255]);
        assert_eq!(buf.get(3, 0), None);
    }

    #[test]
    fn test_put_out_of_range_ignored() {
        let mut buf = PixelBuffer::new(2, 2);
        buf.put(5, 5, [9, 9, 9, 9]);
        assert!(buf.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_fill_block_clips() {
        let mut buf = PixelBuffer::new(3, 3);
        buf.fill_block(2, 2, 4, [7, 7, 7, 255]);
        assert_eq!(buf.get(2, 2), Some([7, 7, 7, 255]));
        assert_eq!(buf.get(1, 2), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_resize_and_clear() {
        let mut buf = PixelBuffer::new(2, 2);
        buf.fill_block(0, 0, 2, [1, 1, 1, 1]);
        buf.resize(4, 1);
        buf.clear();
        assert_eq!(buf.width(), 4);
        assert_eq!(buf.as_bytes().len(), 16);
        assert!(buf.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_rgba_to_argb() {
        let rgba = [0x12, 0x34, 0x56, 0xFF, 0, 0, 0, 0];
        let mut out = [0u32; 2];
        rgba_to_argb(&rgba, &mut out);
        assert_eq!(out, [0x0012_3456, 0]);
    }

    #[test]
    fn test_view_mode_toggle() {
        assert_eq!(ViewMode::Plane.toggle(), ViewMode::Sphere);
        assert_eq!(ViewMode::Sphere.label(), "sphere");
    }
}
