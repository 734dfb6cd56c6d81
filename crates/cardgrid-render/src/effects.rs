//! CPU raster effects for background textures.

use rayon::prelude::*;
use cardgrid_core::{Color, FrameBuffer};

/// Normalized 1D gaussian kernel for standard deviation `sigma`, radius `ceil(3σ)`.
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as i32;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-(i * i) as f32 / two_sigma_sq).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Convolve every row of a premultiplied RGBA f32 image. Samples outside the
/// image are transparent.
fn blur_rows(src: &[f32], width: usize, kernel: &[f32]) -> Vec<f32> {
    let radius = (kernel.len() / 2) as isize;
    let mut out = vec![0.0f32; src.len()];
    out.par_chunks_mut(width * 4)
        .zip(src.par_chunks(width * 4))
        .for_each(|(dst_row, src_row)| {
            for x in 0..width as isize {
                let mut acc = [0.0f32; 4];
                for (k, w) in kernel.iter().enumerate() {
                    let sx = x + k as isize - radius;
                    if sx < 0 || sx >= width as isize {
                        continue;
                    }
                    let o = sx as usize * 4;
                    for c in 0..4 {
                        acc[c] += src_row[o + c] * w;
                    }
                }
                let o = x as usize * 4;
                dst_row[o..o + 4].copy_from_slice(&acc);
            }
        });
    out
}

fn transpose(src: &[f32], width: usize, height: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; src.len()];
    for y in 0..height {
        for x in 0..width {
            let s = (y * width + x) * 4;
            let d = (x * height + y) * 4;
            out[d..d + 4].copy_from_slice(&src[s..s + 4]);
        }
    }
    out
}

/// Gaussian blur with standard deviation `sigma` px, the raster equivalent of a
/// `blur(σpx)` filter. Alpha is blurred together with color (premultiplied).
pub fn gaussian_blur(src: &FrameBuffer, sigma: f32) -> FrameBuffer {
    if sigma <= 0.0 || src.width == 0 || src.height == 0 {
        return src.clone();
    }
    let (w, h) = (src.width as usize, src.height as usize);
    let kernel = gaussian_kernel(sigma);

    let premultiplied: Vec<f32> = src
        .data
        .par_chunks_exact(4)
        .flat_map_iter(|p| {
            let a = p[3] as f32 / 255.0;
            [p[0] as f32 * a, p[1] as f32 * a, p[2] as f32 * a, p[3] as f32]
        })
        .collect();

    let horizontal = blur_rows(&premultiplied, w, &kernel);
    let vertical = blur_rows(&transpose(&horizontal, w, h), h, &kernel);
    let blurred = transpose(&vertical, h, w);

    let mut out = FrameBuffer::new(src.width, src.height);
    out.data
        .par_chunks_exact_mut(4)
        .zip(blurred.par_chunks_exact(4))
        .for_each(|(d, p)| {
            let a = p[3];
            if a <= 0.0 {
                return;
            }
            let unpremultiply = 255.0 / a;
            for c in 0..3 {
                d[c] = (p[c] * unpremultiply).round().clamp(0.0, 255.0) as u8;
            }
            d[3] = a.round().clamp(0.0, 255.0) as u8;
        });
    out
}

/// Blur `fb` and draw the blurred copy back over itself, the way a canvas
/// redraws itself through a blur filter.
pub fn bake_blur(fb: &mut FrameBuffer, sigma: f32) {
    let blurred = gaussian_blur(fb, sigma);
    fb.composite_over(&blurred, 0, 0);
}

/// Composite a full-surface wash of `color` (e.g. a dark translucent overlay).
pub fn overlay(fb: &mut FrameBuffer, color: &Color) {
    let wash = FrameBuffer::solid(fb.width, fb.height, color);
    fb.composite_over(&wash, 0, 0);
}
