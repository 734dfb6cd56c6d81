//! Offscreen raster surface with the handful of 2D drawing operations card
//! compositing needs: rectangles, rounded pills, scaled images, text and blur.

use std::sync::Arc;

use cardgrid_core::{CardError, CardResult, Color, FrameBuffer, Rect};

use crate::effects;
use crate::text::{TextAlign, TextBaseline, Typeface};

/// Largest edge a surface may have.
pub const MAX_SURFACE_DIM: u32 = 16_384;

/// Text style for [`Canvas::fill_text`].
#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    pub size: f32,
    pub color: Color,
    pub align: TextAlign,
    pub baseline: TextBaseline,
}

impl TextStyle {
    pub fn new(size: f32, color: Color) -> Self {
        Self {
            size,
            color,
            align: TextAlign::Left,
            baseline: TextBaseline::Alphabetic,
        }
    }

    pub fn align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn baseline(mut self, baseline: TextBaseline) -> Self {
        self.baseline = baseline;
        self
    }
}

/// A drawing surface backed by an RGBA [`FrameBuffer`].
pub struct Canvas {
    fb: FrameBuffer,
    typeface: Arc<Typeface>,
}

impl Canvas {
    /// Allocate a transparent surface. Fails when the size is not drawable.
    pub fn new(width: u32, height: u32, typeface: Arc<Typeface>) -> CardResult<Self> {
        if width == 0 || height == 0 || width > MAX_SURFACE_DIM || height > MAX_SURFACE_DIM {
            return Err(CardError::surface(format!(
                "{}x{} is not a drawable surface size",
                width, height
            )));
        }
        Ok(Self {
            fb: FrameBuffer::new(width, height),
            typeface,
        })
    }

    pub fn width(&self) -> u32 {
        self.fb.width
    }

    pub fn height(&self) -> u32 {
        self.fb.height
    }

    pub fn typeface(&self) -> &Typeface {
        &self.typeface
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.fb
    }

    pub fn into_frame(self) -> FrameBuffer {
        self.fb
    }

    pub fn clear(&mut self) {
        self.fb.clear();
    }

    /// Fill an axis-aligned rectangle; fractional edges get partial coverage.
    pub fn fill_rect(&mut self, rect: Rect, color: &Color) {
        let rgba = color.to_rgba8();
        let x0 = rect.x.max(0.0);
        let y0 = rect.y.max(0.0);
        let x1 = rect.right().min(self.fb.width as f32);
        let y1 = rect.bottom().min(self.fb.height as f32);
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        for py in y0.floor() as i32..y1.ceil() as i32 {
            let cy = (y1.min(py as f32 + 1.0) - y0.max(py as f32)).clamp(0.0, 1.0);
            for px in x0.floor() as i32..x1.ceil() as i32 {
                let cx = (x1.min(px as f32 + 1.0) - x0.max(px as f32)).clamp(0.0, 1.0);
                self.fb.blend_pixel(px, py, rgba, cx * cy);
            }
        }
    }

    /// Fill the whole surface with `color` composited over the current content.
    pub fn fill(&mut self, color: &Color) {
        effects::overlay(&mut self.fb, color);
    }

    /// Stroke a rectangle outline centered on its edges.
    pub fn stroke_rect(&mut self, rect: Rect, line_width: f32, color: &Color) {
        let half = line_width / 2.0;
        let outer = Rect::new(rect.x - half, rect.y - half, rect.width + line_width, rect.height + line_width);
        // top, bottom, then sides between them so corners aren't blended twice
        self.fill_rect(Rect::new(outer.x, outer.y, outer.width, line_width), color);
        self.fill_rect(Rect::new(outer.x, rect.bottom() - half, outer.width, line_width), color);
        let side_y = rect.y + half;
        let side_h = (rect.height - line_width).max(0.0);
        self.fill_rect(Rect::new(outer.x, side_y, line_width, side_h), color);
        self.fill_rect(Rect::new(rect.right() - half, side_y, line_width, side_h), color);
    }

    /// Fill a rectangle with rounded corners of `radius`, anti-aliased.
    pub fn fill_rounded_rect(&mut self, rect: Rect, radius: f32, color: &Color) {
        let rgba = color.to_rgba8();
        let radius = radius.min(rect.width / 2.0).min(rect.height / 2.0).max(0.0);
        let (cx, cy) = rect.center();
        let half_w = rect.width / 2.0;
        let half_h = rect.height / 2.0;

        let y_start = (rect.y.floor() as i32).max(0);
        let y_end = (rect.bottom().ceil() as i32).min(self.fb.height as i32);
        let x_start = (rect.x.floor() as i32).max(0);
        let x_end = (rect.right().ceil() as i32).min(self.fb.width as i32);

        for py in y_start..y_end {
            for px in x_start..x_end {
                // signed distance from the pixel center to the rounded box
                let qx = (px as f32 + 0.5 - cx).abs() - (half_w - radius);
                let qy = (py as f32 + 0.5 - cy).abs() - (half_h - radius);
                let outside = (qx.max(0.0).powi(2) + qy.max(0.0).powi(2)).sqrt();
                let inside = qx.max(qy).min(0.0);
                let distance = outside + inside - radius;
                let coverage = (0.5 - distance).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.fb.blend_pixel(px, py, rgba, coverage);
                }
            }
        }
    }

    /// Draw `src` scaled into `dest` with bilinear filtering. Parts of `dest`
    /// outside the surface are clipped.
    pub fn draw_image(&mut self, src: &FrameBuffer, dest: Rect) {
        if src.width == 0 || src.height == 0 || dest.width <= 0.0 || dest.height <= 0.0 {
            return;
        }
        let scale_x = src.width as f32 / dest.width;
        let scale_y = src.height as f32 / dest.height;

        let y_start = (dest.y.floor() as i32).max(0);
        let y_end = (dest.bottom().ceil() as i32).min(self.fb.height as i32);
        let x_start = (dest.x.floor() as i32).max(0);
        let x_end = (dest.right().ceil() as i32).min(self.fb.width as i32);

        for py in y_start..y_end {
            let center_y = py as f32 + 0.5;
            if center_y < dest.y || center_y > dest.bottom() {
                continue;
            }
            let sy = (center_y - dest.y) * scale_y;
            for px in x_start..x_end {
                let center_x = px as f32 + 0.5;
                if center_x < dest.x || center_x > dest.right() {
                    continue;
                }
                let sx = (center_x - dest.x) * scale_x;
                let [r, g, b, a] = src.sample_bilinear(sx, sy);
                if a <= 0.0 {
                    continue;
                }
                let rgba = [r.round() as u8, g.round() as u8, b.round() as u8, 255];
                self.fb.blend_pixel(px, py, rgba, a / 255.0);
            }
        }
    }

    /// Draw a single line of text anchored at (x, y) per the style's align and baseline.
    pub fn fill_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle) {
        if text.is_empty() {
            return;
        }
        let left = self.typeface.left_x(text, x, style.size, style.align);
        let baseline = self.typeface.baseline_y(y, style.size, style.baseline);
        self.typeface
            .draw_line(&mut self.fb, text, left, baseline, style.size, &style.color);
    }

    /// Blur the surface and draw the blurred copy over it.
    pub fn blur(&mut self, sigma: f32) {
        effects::bake_blur(&mut self.fb, sigma);
    }
}
