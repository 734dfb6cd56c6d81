//! The card data record and the cache keys derived from it.

use serde::{Deserialize, Serialize};

use crate::hash;

/// One visual tile of the grid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardData {
    /// Main title, drawn at the top and truncated to fit.
    pub title: String,
    /// Drawn as `#TAG` pills along the bottom edge.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Drawn in the bottom-right corner.
    #[serde(default)]
    pub date: String,
    /// Image URL or path. The configured placeholder is used when absent.
    #[serde(default)]
    pub image: Option<String>,
    /// Video URL or path. Takes precedence over `image`.
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub video_loop: Option<bool>,
    #[serde(default)]
    pub video_muted: Option<bool>,
    #[serde(default)]
    pub video_autoplay: Option<bool>,
    /// Accepted for compatibility with existing content; not rendered.
    #[serde(default)]
    pub badge: Option<String>,
    /// Accepted for compatibility with existing content; not rendered.
    #[serde(default)]
    pub description: Option<String>,
}

/// Playback options for a video element. Every flag defaults to `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoOptions {
    pub looping: bool,
    pub muted: bool,
    pub autoplay: bool,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            looping: true,
            muted: true,
            autoplay: true,
        }
    }
}

/// How still-image cache keys are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheKeyPolicy {
    /// `<title>-<tags>-image`. Cards that differ only by image or date share a
    /// texture; kept for parity with decks authored against that behavior.
    TitleAndTags,
    /// SHA-256 over every rendered field.
    #[default]
    Content,
}

/// Which texture of a card a key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    Foreground,
    Background,
}

impl CardData {
    pub fn new(title: impl Into<String>, tags: &[&str], date: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            date: date.into(),
            ..Default::default()
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_video(mut self, video: impl Into<String>) -> Self {
        self.video = Some(video.into());
        self
    }

    /// True when the card is backed by a video rather than a still image.
    pub fn has_video_content(&self) -> bool {
        self.video.as_deref().is_some_and(|v| !v.is_empty())
    }

    /// The image source, falling back to `placeholder`.
    pub fn image_source<'a>(&'a self, placeholder: &'a str) -> &'a str {
        match self.image.as_deref() {
            Some(image) if !image.is_empty() => image,
            _ => placeholder,
        }
    }

    pub fn video_options(&self) -> VideoOptions {
        VideoOptions {
            looping: self.video_loop.unwrap_or(true),
            muted: self.video_muted.unwrap_or(true),
            autoplay: self.video_autoplay.unwrap_or(true),
        }
    }

    fn joined_tags(&self) -> String {
        self.tags.join("-")
    }

    /// Cache key for a still-image texture.
    pub fn image_cache_key(&self, policy: CacheKeyPolicy, kind: TextureKind, placeholder: &str) -> String {
        let discriminator = match kind {
            TextureKind::Foreground => "image",
            TextureKind::Background => "image-bg",
        };
        match policy {
            CacheKeyPolicy::TitleAndTags => {
                format!("{}-{}-{}", self.title, self.joined_tags(), discriminator)
            }
            CacheKeyPolicy::Content => {
                let digest = hash::fingerprint([
                    discriminator,
                    self.title.as_str(),
                    self.joined_tags().as_str(),
                    self.date.as_str(),
                    self.image_source(placeholder),
                ]);
                format!("{}-{}", discriminator, digest)
            }
        }
    }

    /// Cache key for a video texture. `None` when the card has no video.
    pub fn video_cache_key(&self, kind: TextureKind) -> Option<String> {
        let video = self.video.as_deref().filter(|v| !v.is_empty())?;
        Some(match kind {
            TextureKind::Foreground => {
                format!("video-fg-{}-{}-{}", video, self.title, self.joined_tags())
            }
            TextureKind::Background => format!("video-bg-{}", video),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_camel_case_flags() {
        let json = r#"{
            "title": "Reel",
            "tags": ["web", "ogl"],
            "date": "2024",
            "video": "/reel.mp4",
            "videoLoop": false,
            "badge": "NEW"
        }"#;
        let card: CardData = serde_json::from_str(json).unwrap();
        assert!(card.has_video_content());
        let opts = card.video_options();
        assert!(!opts.looping);
        assert!(opts.muted);
        assert!(opts.autoplay);
        assert_eq!(card.badge.as_deref(), Some("NEW"));
    }

    #[test]
    fn test_image_source_falls_back() {
        let card = CardData::new("A", &[], "2024");
        assert_eq!(card.image_source("/photo.png"), "/photo.png");
        let card = card.with_image("/a.jpg");
        assert_eq!(card.image_source("/photo.png"), "/a.jpg");
    }

    #[test]
    fn test_title_and_tags_key_ignores_image_and_date() {
        let a = CardData::new("Project", &["web", "ogl"], "2024").with_image("/a.jpg");
        let b = CardData::new("Project", &["web", "ogl"], "2025").with_image("/b.jpg");
        let key = |c: &CardData| c.image_cache_key(CacheKeyPolicy::TitleAndTags, TextureKind::Foreground, "/photo.png");
        assert_eq!(key(&a), "Project-web-ogl-image");
        assert_eq!(key(&a), key(&b));
    }

    #[test]
    fn test_content_key_folds_every_rendered_field() {
        let a = CardData::new("Project", &["web", "ogl"], "2024").with_image("/a.jpg");
        let b = a.clone().with_image("/b.jpg");
        let mut c = a.clone();
        c.date = "2025".into();
        let key = |c: &CardData| c.image_cache_key(CacheKeyPolicy::Content, TextureKind::Foreground, "/photo.png");
        assert_ne!(key(&a), key(&b));
        assert_ne!(key(&a), key(&c));
        assert_eq!(key(&a), key(&a.clone()));
    }

    #[test]
    fn test_foreground_and_background_keys_differ() {
        let a = CardData::new("Project", &["web"], "2024");
        for policy in [CacheKeyPolicy::TitleAndTags, CacheKeyPolicy::Content] {
            assert_ne!(
                a.image_cache_key(policy, TextureKind::Foreground, "/p.png"),
                a.image_cache_key(policy, TextureKind::Background, "/p.png")
            );
        }
    }

    #[test]
    fn test_video_keys() {
        let card = CardData::new("Reel", &["web", "ogl"], "2024").with_video("/reel.mp4");
        assert_eq!(
            card.video_cache_key(TextureKind::Foreground).as_deref(),
            Some("video-fg-/reel.mp4-Reel-web-ogl")
        );
        assert_eq!(
            card.video_cache_key(TextureKind::Background).as_deref(),
            Some("video-bg-/reel.mp4")
        );
        assert!(CardData::new("A", &[], "").video_cache_key(TextureKind::Background).is_none());
    }
}
