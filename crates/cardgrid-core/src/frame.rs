//! RGBA raster buffers shared by the canvas, the texture handles and media decoders.

use crate::Color;

/// An 8-bit straight-alpha RGBA pixel buffer (4 bytes per pixel, row-major).
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    /// Raw pixel data.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameBuffer {
    /// Bytes per pixel.
    pub const BPP: usize = 4;

    /// Create a new frame buffer filled with zeros (transparent black).
    pub fn new(width: u32, height: u32) -> Self {
        let size = (width as usize) * (height as usize) * Self::BPP;
        Self {
            data: vec![0u8; size],
            width,
            height,
        }
    }

    /// Wrap raw RGBA bytes. Returns `None` when the length doesn't match the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != (width as usize) * (height as usize) * Self::BPP {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
        })
    }

    /// Create a frame buffer filled with a solid color.
    pub fn solid(width: u32, height: u32, color: &Color) -> Self {
        let pixel = color.to_rgba8();
        let mut fb = Self::new(width, height);
        for px in fb.data.chunks_exact_mut(Self::BPP) {
            px.copy_from_slice(&pixel);
        }
        fb
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Total byte size of the pixel data.
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    /// True when every pixel is fully transparent.
    pub fn is_blank(&self) -> bool {
        self.data.chunks_exact(Self::BPP).all(|px| px[3] == 0)
    }

    /// Reset every pixel to transparent black.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * Self::BPP
    }

    /// Get the RGBA value at a pixel coordinate. Returns None if out of bounds.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let o = self.offset(x, y);
        Some([self.data[o], self.data[o + 1], self.data[o + 2], self.data[o + 3]])
    }

    /// Set the RGBA value at a pixel coordinate. No-op if out of bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let o = self.offset(x, y);
        self.data[o..o + 4].copy_from_slice(&rgba);
    }

    /// Source-over blend of `rgba` scaled by `coverage` (0.0..=1.0) onto one pixel.
    /// Out-of-bounds coordinates are ignored.
    pub fn blend_pixel(&mut self, x: i32, y: i32, rgba: [u8; 4], coverage: f32) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let sa = (rgba[3] as f32 / 255.0) * coverage.clamp(0.0, 1.0);
        if sa <= 0.0 {
            return;
        }
        let o = self.offset(x as u32, y as u32);
        let d = &mut self.data[o..o + 4];
        blend_over(d, [rgba[0], rgba[1], rgba[2]], sa);
    }

    /// Alpha-composite `src` on top of `self` at position (dx, dy).
    pub fn composite_over(&mut self, src: &FrameBuffer, dx: i32, dy: i32) {
        let dst_width = self.width as i32;
        let dst_height = self.height as i32;

        let start_y = (-dy).max(0);
        let end_y = (src.height as i32).min(dst_height - dy);
        let start_x = (-dx).max(0);
        let end_x = (src.width as i32).min(dst_width - dx);

        if start_x >= end_x || start_y >= end_y {
            return;
        }

        let src_stride = src.width as usize * Self::BPP;
        let dst_stride = self.width as usize * Self::BPP;
        let len = (end_x - start_x) as usize * Self::BPP;

        for sy in start_y..end_y {
            let src_row = sy as usize * src_stride + start_x as usize * Self::BPP;
            let dst_row = (dy + sy) as usize * dst_stride + (dx + start_x) as usize * Self::BPP;

            let src_slice = &src.data[src_row..src_row + len];
            let dst_slice = &mut self.data[dst_row..dst_row + len];

            for (s, d) in src_slice.chunks_exact(4).zip(dst_slice.chunks_exact_mut(4)) {
                match s[3] {
                    0 => {}
                    255 => d.copy_from_slice(s),
                    a => blend_over(d, [s[0], s[1], s[2]], a as f32 / 255.0),
                }
            }
        }
    }

    /// Bilinear sample at continuous pixel coordinates (pixel centers at +0.5).
    /// Coordinates are clamped to the edge.
    pub fn sample_bilinear(&self, x: f32, y: f32) -> [f32; 4] {
        if self.width == 0 || self.height == 0 {
            return [0.0; 4];
        }
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;
        let fx = (x - 0.5).clamp(0.0, max_x);
        let fy = (y - 0.5).clamp(0.0, max_y);
        let x0 = fx.floor() as u32;
        let y0 = fy.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let tx = fx - x0 as f32;
        let ty = fy - y0 as f32;

        let px = |x: u32, y: u32| {
            let o = self.offset(x, y);
            [
                self.data[o] as f32,
                self.data[o + 1] as f32,
                self.data[o + 2] as f32,
                self.data[o + 3] as f32,
            ]
        };
        let (c00, c10, c01, c11) = (px(x0, y0), px(x1, y0), px(x0, y1), px(x1, y1));
        let mut out = [0.0; 4];
        for i in 0..4 {
            let top = c00[i] + (c10[i] - c00[i]) * tx;
            let bottom = c01[i] + (c11[i] - c01[i]) * tx;
            out[i] = top + (bottom - top) * ty;
        }
        out
    }
}

/// Straight-alpha source-over of an RGB color with alpha `sa` onto pixel `d`.
fn blend_over(d: &mut [u8], rgb: [u8; 3], sa: f32) {
    let da = d[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return;
    }
    for i in 0..3 {
        let c = (rgb[i] as f32 * sa + d[i] as f32 * da * (1.0 - sa)) / out_a;
        d[i] = c.round().clamp(0.0, 255.0) as u8;
    }
    d[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}
