//! Text measurement and rasterization.
//! Uses fontdue for CPU glyph rasterization. When no font file is available a
//! metric-only fallback keeps layout deterministic and draws box glyphs.

use std::path::{Path, PathBuf};

use fontdue::{Font, FontSettings};
use cardgrid_core::{CardError, CardResult, Color, FrameBuffer};

/// Fonts probed, in order, when the config doesn't name one.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Advance of a fallback glyph, in ems.
const FALLBACK_ADVANCE_EM: f32 = 0.6;

/// Horizontal anchor of a text run, relative to the `x` it is drawn at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Vertical anchor of a text run, relative to the `y` it is drawn at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextBaseline {
    Top,
    Middle,
    Bottom,
    #[default]
    Alphabetic,
}

/// The face every card label is drawn with.
pub enum Typeface {
    Font(Box<Font>),
    /// Fixed-advance metrics with box glyphs.
    Fallback,
}

impl std::fmt::Debug for Typeface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Typeface::Font(font) => write!(f, "Typeface::Font({:?})", font.name()),
            Typeface::Fallback => write!(f, "Typeface::Fallback"),
        }
    }
}

impl Typeface {
    /// Parse a TrueType/OpenType font from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|e| e.to_string())?;
        Ok(Typeface::Font(Box::new(font)))
    }

    /// Load a font from a file path.
    pub fn load(path: &Path) -> CardResult<Self> {
        let data = std::fs::read(path)
            .map_err(|e| CardError::font(format!("failed to read font file: {}", e), path))?;
        Self::from_bytes(&data).map_err(|e| CardError::font(format!("failed to parse font: {}", e), path))
    }

    /// Resolve the card typeface.
    ///
    /// An explicitly configured font must load. Otherwise the first readable
    /// system font wins, and the fallback face is used when none is found.
    pub fn resolve(configured: Option<&Path>) -> CardResult<Self> {
        if let Some(path) = configured {
            tracing::info!("Loading card font from {}", path.display());
            return Self::load(path);
        }
        for candidate in SYSTEM_FONT_CANDIDATES {
            let path = PathBuf::from(candidate);
            if !path.exists() {
                continue;
            }
            match Self::load(&path) {
                Ok(face) => {
                    tracing::debug!("Using system font {}", path.display());
                    return Ok(face);
                }
                Err(e) => tracing::debug!("Skipping system font: {}", e),
            }
        }
        tracing::warn!("No font file found; card text uses fallback box glyphs");
        Ok(Typeface::Fallback)
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Typeface::Fallback)
    }

    /// Advance width of `text` at `size` px.
    pub fn measure(&self, text: &str, size: f32) -> f32 {
        match self {
            Typeface::Font(font) => text
                .chars()
                .map(|ch| font.metrics(ch, size).advance_width)
                .sum(),
            Typeface::Fallback => text.chars().count() as f32 * size * FALLBACK_ADVANCE_EM,
        }
    }

    /// (ascent, descent) above and below the baseline; descent is negative.
    pub fn line_metrics(&self, size: f32) -> (f32, f32) {
        match self {
            Typeface::Font(font) => font
                .horizontal_line_metrics(size)
                .map(|m| (m.ascent, m.descent))
                .unwrap_or((size * 0.8, -size * 0.2)),
            Typeface::Fallback => (size * 0.8, -size * 0.2),
        }
    }

    /// Baseline y for a run anchored at `y` with the given baseline mode.
    pub fn baseline_y(&self, y: f32, size: f32, baseline: TextBaseline) -> f32 {
        let (ascent, descent) = self.line_metrics(size);
        match baseline {
            TextBaseline::Top => y + ascent,
            TextBaseline::Middle => y + (ascent + descent) / 2.0,
            TextBaseline::Bottom => y + descent,
            TextBaseline::Alphabetic => y,
        }
    }

    /// Left x for a run anchored at `x` with the given alignment.
    pub fn left_x(&self, text: &str, x: f32, size: f32, align: TextAlign) -> f32 {
        match align {
            TextAlign::Left => x,
            TextAlign::Center => x - self.measure(text, size) / 2.0,
            TextAlign::Right => x - self.measure(text, size),
        }
    }

    /// Rasterize one line with its left edge at `x` and baseline at `baseline`.
    pub fn draw_line(&self, fb: &mut FrameBuffer, text: &str, x: f32, baseline: f32, size: f32, color: &Color) {
        let rgba = color.to_rgba8();
        let mut cursor_x = x;
        match self {
            Typeface::Font(font) => {
                for ch in text.chars() {
                    let (metrics, bitmap) = font.rasterize(ch, size);
                    let glyph_x = cursor_x.round() as i32 + metrics.xmin;
                    let glyph_y = baseline.round() as i32 - (metrics.height as i32 + metrics.ymin);

                    for gy in 0..metrics.height {
                        for gx in 0..metrics.width {
                            let coverage = bitmap[gy * metrics.width + gx];
                            if coverage == 0 {
                                continue;
                            }
                            fb.blend_pixel(
                                glyph_x + gx as i32,
                                glyph_y + gy as i32,
                                rgba,
                                coverage as f32 / 255.0,
                            );
                        }
                    }

                    cursor_x += metrics.advance_width;
                }
            }
            Typeface::Fallback => {
                let advance = size * FALLBACK_ADVANCE_EM;
                let glyph_h = (size * 0.7).round() as i32;
                let inset = (size * 0.05).round() as i32;
                let glyph_w = (advance - size * 0.1).round() as i32;
                let top = baseline.round() as i32 - glyph_h;
                for ch in text.chars() {
                    if !ch.is_whitespace() {
                        let left = cursor_x.round() as i32 + inset;
                        for py in top..top + glyph_h {
                            for px in left..left + glyph_w {
                                fb.blend_pixel(px, py, rgba, 1.0);
                            }
                        }
                    }
                    cursor_x += advance;
                }
            }
        }
    }
}
