//! Card compositing onto a [`Canvas`].
//!
//! The still-image and video paths draw the same chrome (border, title, tag
//! pills, date); only the media layer differs.

use cardgrid_core::{CardData, Color, FrameBuffer};

use crate::canvas::{Canvas, TextStyle};
use crate::layout::{truncate_title, CardLayout, TagPill};
use crate::text::{TextAlign, TextBaseline};

/// Label drawn in the media band when an image fails to load.
pub const IMAGE_ERROR_LABEL: &str = "Image Error";

/// What goes into the media band.
#[derive(Debug, Clone, Copy)]
pub enum MediaLayer<'a> {
    /// A decoded image or the current video frame.
    Frame(&'a FrameBuffer),
    /// The image failed to load.
    Error,
    /// Nothing to show yet (video without current data).
    Empty,
}

pub fn draw_border(canvas: &mut Canvas, layout: &CardLayout) {
    let s = &layout.style;
    canvas.stroke_rect(layout.bounds(), s.border_width, &s.border_color);
}

/// Draw the title at the top-left, truncated to the card width. Returns the
/// string actually drawn.
pub fn draw_title(canvas: &mut Canvas, layout: &CardLayout, title: &str) -> String {
    let s = &layout.style;
    let fitted = truncate_title(title, layout.title_max_width(), s.title_font_size, canvas.typeface());
    let (x, y) = layout.title_origin();
    let style = TextStyle::new(s.title_font_size, s.text_color).baseline(TextBaseline::Top);
    canvas.fill_text(&fitted, x, y, &style);
    fitted
}

pub fn draw_media(canvas: &mut Canvas, layout: &CardLayout, media: MediaLayer<'_>) {
    match media {
        MediaLayer::Frame(frame) => {
            match layout.media_rect(frame.width as f32, frame.height as f32) {
                Some(dest) => canvas.draw_image(frame, dest),
                None => tracing::debug!("skipping {}x{} media", frame.width, frame.height),
            }
        }
        MediaLayer::Error => {
            let s = &layout.style;
            let (x, y) = layout.error_anchor();
            let style = TextStyle::new(s.error_font_size, s.error_color)
                .align(TextAlign::Center)
                .baseline(TextBaseline::Middle);
            canvas.fill_text(IMAGE_ERROR_LABEL, x, y, &style);
        }
        MediaLayer::Empty => {}
    }
}

/// Draw `#TAG` pills left to right along the bottom edge.
pub fn draw_tags(canvas: &mut Canvas, layout: &CardLayout, tags: &[String]) -> Vec<TagPill> {
    let s = &layout.style;
    let pills = layout.tag_pills(tags, canvas.typeface());
    let label_style = TextStyle::new(s.tag_font_size, s.text_color)
        .align(TextAlign::Center)
        .baseline(TextBaseline::Middle);
    for pill in &pills {
        canvas.fill_rounded_rect(pill.rect, pill.radius, &s.tag_fill);
        let (cx, cy) = pill.rect.center();
        canvas.fill_text(&pill.label, cx, cy, &label_style);
    }
    pills
}

pub fn draw_date(canvas: &mut Canvas, layout: &CardLayout, date: &str) {
    let s = &layout.style;
    let (x, y) = layout.date_anchor();
    let style = TextStyle::new(s.date_font_size, s.text_color)
        .align(TextAlign::Right)
        .baseline(TextBaseline::Bottom);
    canvas.fill_text(date, x, y, &style);
}

/// Paint a complete foreground onto a cleared canvas.
pub fn paint_foreground(canvas: &mut Canvas, layout: &CardLayout, card: &CardData, media: MediaLayer<'_>) {
    canvas.clear();
    draw_border(canvas, layout);
    draw_media(canvas, layout, media);
    draw_title(canvas, layout, &card.title);
    draw_tags(canvas, layout, &card.tags);
    draw_date(canvas, layout, &card.date);
}

/// Paint a blurred, darkened background from `frame`, drawn oversized at
/// `(width, height) × background_scale` around the card center.
pub fn paint_background(canvas: &mut Canvas, layout: &CardLayout, frame: &FrameBuffer, width: f32, height: f32) {
    let s = &layout.style;
    canvas.clear();
    canvas.draw_image(frame, layout.background_rect(width, height));
    canvas.blur(s.blur_radius);
    canvas.fill(&s.background_overlay);
}

/// Background used when the source image can't be loaded.
pub fn paint_background_fallback(canvas: &mut Canvas, layout: &CardLayout) {
    canvas.clear();
    canvas.fill(&layout.style.background_fallback);
}

/// Mean color of a frame, used by tests and the CLI summary.
pub fn average_color(frame: &FrameBuffer) -> Color {
    if frame.pixel_count() == 0 {
        return Color::TRANSPARENT;
    }
    let mut sums = [0u64; 4];
    for px in frame.data.chunks_exact(FrameBuffer::BPP) {
        for (sum, v) in sums.iter_mut().zip(px) {
            *sum += *v as u64;
        }
    }
    let n = frame.pixel_count() as f32 * 255.0;
    Color::rgba(
        sums[0] as f32 / n,
        sums[1] as f32 / n,
        sums[2] as f32 / n,
        sums[3] as f32 / n,
    )
}
