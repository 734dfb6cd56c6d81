use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::card::CacheKeyPolicy;
use crate::color::{self, Color};
use crate::error::{CardError, CardResult};

/// Geometry and styling of a card texture. Defaults reproduce the grid's
/// 512×512 card layout.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CardStyle {
    pub width: u32,
    pub height: u32,
    pub padding: f32,
    pub title_font_size: f32,
    /// Vertical gap between the title line and the media band.
    pub title_gap: f32,
    /// Space kept free below the media band for tags and date.
    pub bottom_reserved: f32,
    pub tag_font_size: f32,
    pub tag_padding_x: f32,
    pub tag_padding_y: f32,
    pub tag_gap: f32,
    pub date_font_size: f32,
    pub error_font_size: f32,
    pub border_width: f32,
    #[serde(with = "color::hex")]
    pub border_color: Color,
    #[serde(with = "color::hex")]
    pub text_color: Color,
    #[serde(with = "color::hex")]
    pub tag_fill: Color,
    #[serde(with = "color::hex")]
    pub error_color: Color,
    /// Gaussian blur standard deviation of the background, in pixels.
    pub blur_radius: f32,
    /// Oversize factor applied to background media before blurring.
    pub background_scale: f32,
    #[serde(with = "color::hex")]
    pub background_overlay: Color,
    #[serde(with = "color::hex")]
    pub background_fallback: Color,
}

impl Default for CardStyle {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            padding: 30.0,
            title_font_size: 24.0,
            title_gap: 30.0,
            bottom_reserved: 100.0,
            tag_font_size: 16.0,
            tag_padding_x: 15.0,
            tag_padding_y: 8.0,
            tag_gap: 10.0,
            date_font_size: 20.0,
            error_font_size: 30.0,
            border_width: 1.0,
            border_color: Color::from_rgb8_alpha(60, 60, 60, 1.0),
            text_color: Color::WHITE,
            tag_fill: Color::from_rgb8_alpha(248, 250, 252, 0.15),
            error_color: Color::GRAY,
            blur_radius: 10.0,
            background_scale: 2.0,
            background_overlay: Color::BLACK.with_alpha(0.4),
            background_fallback: Color::BLACK.with_alpha(0.5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Image used when a card has neither image nor video.
    pub placeholder_image: String,
    /// Directory that relative and root-relative (`/photo.png`) paths resolve against.
    pub root: PathBuf,
    /// TrueType/OpenType font for every card label. System fonts are probed when unset.
    pub font: Option<PathBuf>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            placeholder_image: "/photo.png".to_string(),
            root: PathBuf::from("public"),
            font: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CacheConfig {
    pub key_policy: CacheKeyPolicy,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct CardgridConfig {
    #[serde(default)]
    pub card: CardStyle,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl CardgridConfig {
    pub fn load_from_file(path: &Path) -> CardResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> CardResult<Self> {
        let config: CardgridConfig =
            toml::from_str(contents).map_err(|e| CardError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> CardResult<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| CardError::Config(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject layouts that leave no room for the media band.
    pub fn validate(&self) -> CardResult<()> {
        let card = &self.card;
        if card.width == 0 || card.height == 0 {
            return Err(CardError::Config(format!(
                "card size {}x{} must be non-zero",
                card.width, card.height
            )));
        }
        let top = card.padding + card.title_font_size + card.title_gap;
        if top + card.bottom_reserved >= card.height as f32 || card.padding * 2.0 >= card.width as f32 {
            return Err(CardError::Config(
                "padding, title and reserved space exceed the card size".into(),
            ));
        }
        if card.blur_radius < 0.0 || card.background_scale <= 0.0 {
            return Err(CardError::Config(
                "blur_radius must be >= 0 and background_scale > 0".into(),
            ));
        }
        Ok(())
    }
}
