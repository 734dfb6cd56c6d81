//! Card layout math: where the title, media band, tag pills and date go.
//!
//! Everything here is pure and measured through a [`Typeface`], so the
//! compositors for still images and for video frames share one layout.

use cardgrid_core::{CardStyle, Rect};

use crate::text::Typeface;

const ELLIPSIS: &str = "...";

/// One measured `#TAG` pill.
#[derive(Debug, Clone, PartialEq)]
pub struct TagPill {
    pub label: String,
    pub rect: Rect,
    pub radius: f32,
}

/// Resolved geometry of a card for one style.
#[derive(Debug, Clone)]
pub struct CardLayout {
    pub style: CardStyle,
}

impl CardLayout {
    pub fn new(style: CardStyle) -> Self {
        Self { style }
    }

    pub fn width(&self) -> f32 {
        self.style.width as f32
    }

    pub fn height(&self) -> f32 {
        self.style.height as f32
    }

    /// The whole card, used for the border.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width(), self.height())
    }

    /// Widest the title may be.
    pub fn title_max_width(&self) -> f32 {
        self.width() - self.style.padding * 2.0
    }

    /// Top-left anchor of the title.
    pub fn title_origin(&self) -> (f32, f32) {
        (self.style.padding, self.style.padding)
    }

    /// The band between the title and the tag row that media is fitted into.
    pub fn media_band(&self) -> Rect {
        let s = &self.style;
        let top = s.padding + s.title_font_size + s.title_gap;
        Rect::new(
            s.padding,
            top,
            self.width() - s.padding * 2.0,
            self.height() - top - s.bottom_reserved,
        )
    }

    /// Center anchor of the "Image Error" placeholder.
    pub fn error_anchor(&self) -> (f32, f32) {
        (self.width() / 2.0, self.height() / 2.0 - 50.0)
    }

    /// Bottom-right anchor of the date.
    pub fn date_anchor(&self) -> (f32, f32) {
        (self.width() - self.style.padding, self.height() - self.style.padding)
    }

    /// Top edge of the tag row.
    pub fn tags_y(&self) -> f32 {
        self.height() - self.style.padding - self.style.tag_font_size - self.style.tag_padding_y
    }

    /// Lay out `tags` left to right as `#TAG` pills.
    pub fn tag_pills(&self, tags: &[String], face: &Typeface) -> Vec<TagPill> {
        let s = &self.style;
        let y = self.tags_y();
        let height = s.tag_font_size + s.tag_padding_y;
        let mut x = s.padding;
        tags.iter()
            .map(|tag| {
                let label = tag_label(tag);
                let width = face.measure(&label, s.tag_font_size) + s.tag_padding_x;
                let pill = TagPill {
                    label,
                    rect: Rect::new(x, y, width, height),
                    radius: height / 2.0,
                };
                x += width + s.tag_gap;
                pill
            })
            .collect()
    }

    /// Scaled placement of media of `natural` size inside the media band.
    pub fn media_rect(&self, natural_width: f32, natural_height: f32) -> Option<Rect> {
        fit_centered(natural_width, natural_height, self.media_band())
    }

    /// Placement of background media: `scale` × the given size, centered on the card.
    pub fn background_rect(&self, width: f32, height: f32) -> Rect {
        let w = width * self.style.background_scale;
        let h = height * self.style.background_scale;
        Rect::new((self.width() - w) / 2.0, (self.height() - h) / 2.0, w, h)
    }
}

/// `#` followed by the upper-cased tag.
pub fn tag_label(tag: &str) -> String {
    format!("#{}", tag.to_uppercase())
}

/// Shorten `title` until it measures within `max_width`.
///
/// Each step drops the last four characters and appends "...", so the string
/// shrinks by one character per step; it stops once it fits or is three
/// characters or fewer.
pub fn truncate_title(title: &str, max_width: f32, size: f32, face: &Typeface) -> String {
    let mut chars: Vec<char> = title.chars().collect();
    let mut text = title.to_string();
    while face.measure(&text, size) > max_width && chars.len() > 3 {
        chars.truncate(chars.len().saturating_sub(4));
        chars.extend(ELLIPSIS.chars());
        text = chars.iter().collect();
    }
    text
}

/// Scale `width × height` down (never up) to fit `band`, preserving aspect
/// ratio, and center it. Width-constrained media fits by width, everything
/// else by height. `None` for degenerate sizes.
pub fn fit_centered(width: f32, height: f32, band: Rect) -> Option<Rect> {
    if width <= 0.0 || height <= 0.0 || !width.is_finite() || !height.is_finite() {
        return None;
    }
    let aspect = width / height;
    let (mut w, mut h) = (width, height);
    if w > band.width || h > band.height {
        if band.width / aspect <= band.height {
            w = band.width;
            h = band.width / aspect;
        } else {
            h = band.height;
            w = band.height * aspect;
        }
    }
    Some(Rect::new(
        band.x + (band.width - w) / 2.0,
        band.y + (band.height - h) / 2.0,
        w,
        h,
    ))
}
