//! The card texture factory: the entry point the grid talks to.
//!
//! Owns every cache (textures, decoded images, video elements, video
//! textures), so two factories never share state and dropping one frees
//! everything it produced.

use std::sync::Arc;

use cardgrid_core::{CardData, CardError, CardResult, CardgridConfig, TextureKind};

use crate::cache::TextureCache;
use crate::canvas::Canvas;
use crate::compositor::{self, MediaLayer};
use crate::image_loader::{AssetLoader, ImageStore, MediaLoader};
use crate::layout::CardLayout;
use crate::text::Typeface;
use crate::texture::{Texture, TextureOptions};
use crate::video::{
    DrawFrame, UpdateReport, VideoBackend, VideoDebugReport, VideoElement, VideoRegistry, VideoTextureEntry,
};
use crate::video_decoder::FfmpegVideoBackend;

/// Foreground and background texture of one card.
#[derive(Debug, Clone)]
pub struct CardTextures {
    pub foreground: Texture,
    pub background: Texture,
}

/// True when the card is backed by a video.
pub fn has_video_content(card: &CardData) -> bool {
    card.has_video_content()
}

pub struct CardTextureFactory {
    config: CardgridConfig,
    layout: CardLayout,
    typeface: Arc<Typeface>,
    loader: Arc<dyn MediaLoader>,
    video_backend: Arc<dyn VideoBackend>,
    textures: TextureCache,
    images: ImageStore,
    videos: VideoRegistry,
}

impl CardTextureFactory {
    /// Factory with the default loaders: files under `assets.root` or HTTP for
    /// images, FFmpeg for video.
    pub fn new(config: CardgridConfig) -> CardResult<Self> {
        let typeface = Typeface::resolve(config.assets.font.as_deref())?;
        let loader = Arc::new(AssetLoader::new(config.assets.root.clone()));
        let backend = Arc::new(FfmpegVideoBackend::new(config.assets.root.clone()));
        Self::with_parts(config, Arc::new(typeface), loader, backend)
    }

    /// Factory with explicit collaborators.
    pub fn with_parts(
        config: CardgridConfig,
        typeface: Arc<Typeface>,
        loader: Arc<dyn MediaLoader>,
        video_backend: Arc<dyn VideoBackend>,
    ) -> CardResult<Self> {
        config.validate()?;
        tracing::debug!(
            "Card texture factory: {}x{}, key policy {:?}, fallback font: {}",
            config.card.width,
            config.card.height,
            config.cache.key_policy,
            typeface.is_fallback()
        );
        Ok(Self {
            layout: CardLayout::new(config.card.clone()),
            config,
            typeface,
            loader,
            video_backend,
            textures: TextureCache::new(),
            images: ImageStore::new(),
            videos: VideoRegistry::new(),
        })
    }

    pub fn config(&self) -> &CardgridConfig {
        &self.config
    }

    pub fn layout(&self) -> &CardLayout {
        &self.layout
    }

    pub fn typeface(&self) -> &Arc<Typeface> {
        &self.typeface
    }

    pub fn texture_cache(&self) -> &TextureCache {
        &self.textures
    }

    pub fn image_store(&self) -> &ImageStore {
        &self.images
    }

    pub fn video_registry(&self) -> &VideoRegistry {
        &self.videos
    }

    fn new_canvas(&self) -> CardResult<Canvas> {
        Canvas::new(self.config.card.width, self.config.card.height, self.typeface.clone())
    }

    fn placeholder(&self) -> &str {
        &self.config.assets.placeholder_image
    }

    /// Foreground of a card: border, title, image, tags, date.
    ///
    /// Video cards are handed to
    /// [`generate_video_foreground_texture`](Self::generate_video_foreground_texture).
    /// An image that fails to load is replaced by an "Image Error" label; the
    /// texture is still produced.
    pub async fn generate_foreground_texture(&self, card: &CardData) -> CardResult<Texture> {
        if card.has_video_content() {
            return self.generate_video_foreground_texture(card).await;
        }
        let key = card.image_cache_key(self.config.cache.key_policy, TextureKind::Foreground, self.placeholder());
        self.textures
            .get_or_try_insert_with(&key, || async {
                let mut canvas = self.new_canvas()?;
                let source = card.image_source(self.placeholder());
                let image = self.images.load(source, self.loader.as_ref()).await;
                let media = match &image {
                    Ok(image) => MediaLayer::Frame(image),
                    Err(e) => {
                        tracing::warn!("Image failed for card '{}', drawing error label: {}", card.title, e);
                        MediaLayer::Error
                    }
                };
                compositor::paint_foreground(&mut canvas, &self.layout, card, media);
                Ok(Texture::new(canvas.into_frame(), TextureOptions::default()))
            })
            .await
    }

    /// Blurred, darkened background of a card. Video cards are handed to
    /// [`generate_video_background_texture`](Self::generate_video_background_texture).
    pub async fn generate_background_texture(&self, card: &CardData) -> CardResult<Texture> {
        if card.has_video_content() {
            return self.generate_video_background_texture(card).await;
        }
        let key = card.image_cache_key(self.config.cache.key_policy, TextureKind::Background, self.placeholder());
        self.textures
            .get_or_try_insert_with(&key, || async {
                let mut canvas = self.new_canvas()?;
                let source = card.image_source(self.placeholder());
                match self.images.load(source, self.loader.as_ref()).await {
                    Ok(image) => compositor::paint_background(
                        &mut canvas,
                        &self.layout,
                        &image,
                        image.width as f32,
                        image.height as f32,
                    ),
                    Err(e) => {
                        tracing::warn!("Background image failed for card '{}': {}", card.title, e);
                        compositor::paint_background_fallback(&mut canvas, &self.layout);
                    }
                }
                Ok(Texture::new(canvas.into_frame(), TextureOptions::default()))
            })
            .await
    }

    async fn video_element(&self, card: &CardData) -> CardResult<Arc<VideoElement>> {
        let url = card.video.as_deref().ok_or(CardError::MissingField("video"))?;
        self.videos
            .element(self.video_backend.as_ref(), url, card.video_options())
            .await
    }

    async fn video_texture(&self, card: &CardData, kind: TextureKind, draw: DrawFrame) -> CardResult<Texture> {
        let key = card.video_cache_key(kind).ok_or(CardError::MissingField("video"))?;
        self.videos
            .texture(&key, || async {
                let mut canvas = self.new_canvas()?;
                let video = self.video_element(card).await?;
                let first_video = video.clone();
                let (canvas, draw, drawn) = tokio::task::spawn_blocking(move || {
                    let drawn = draw(&mut canvas, &*first_video);
                    (canvas, draw, drawn)
                })
                .await
                .map_err(|e| CardError::Other(format!("initial draw task for {} failed: {}", key, e)))?;
                if let Err(e) = drawn {
                    tracing::warn!("Initial video frame for {} not drawn: {}", key, e);
                }
                let texture = Texture::new(canvas.frame().clone(), TextureOptions::default());
                tracing::info!("Created video texture {}", key);
                Ok(Arc::new(VideoTextureEntry::composited(texture, video, canvas, draw)))
            })
            .await
    }

    /// Foreground of a video card, redrawn from the current frame by every
    /// [`update_all_video_textures`](Self::update_all_video_textures).
    pub async fn generate_video_foreground_texture(&self, card: &CardData) -> CardResult<Texture> {
        let layout = self.layout.clone();
        let data = card.clone();
        let draw: DrawFrame = Box::new(move |canvas, video| {
            let frame = video.current_frame()?;
            let media = match &frame {
                Some(frame) => MediaLayer::Frame(frame),
                None => MediaLayer::Empty,
            };
            compositor::paint_foreground(canvas, &layout, &data, media);
            Ok(())
        });
        self.video_texture(card, TextureKind::Foreground, draw).await
    }

    /// Blurred background of a video card. Frames are drawn at twice the card
    /// size; nothing is drawn until the video has a frame.
    pub async fn generate_video_background_texture(&self, card: &CardData) -> CardResult<Texture> {
        let layout = self.layout.clone();
        let draw: DrawFrame = Box::new(move |canvas, video| {
            let Some(frame) = video.current_frame()? else {
                return Ok(());
            };
            compositor::paint_background(canvas, &layout, &frame, layout.width(), layout.height());
            Ok(())
        });
        self.video_texture(card, TextureKind::Background, draw).await
    }

    /// Both textures of a card, produced concurrently.
    pub async fn generate_card_textures(&self, card: &CardData) -> CardResult<CardTextures> {
        let (foreground, background) = tokio::try_join!(
            self.generate_foreground_texture(card),
            self.generate_background_texture(card)
        )?;
        Ok(CardTextures { foreground, background })
    }

    /// Per-frame tick for video textures. Must be driven by the host.
    pub fn update_all_video_textures(&self) -> UpdateReport {
        self.videos.update_all_video_textures()
    }

    pub fn all_videos(&self) -> Vec<Arc<VideoElement>> {
        self.videos.all_videos()
    }

    pub fn pause_all_videos(&self) {
        self.videos.pause_all_videos();
    }

    pub fn resume_all_videos(&self) -> usize {
        self.videos.resume_all_videos()
    }

    pub fn start_all_videos(&self) -> usize {
        self.videos.start_all_videos()
    }

    /// Texture showing the raw frames of `url`, kept current by the update tick.
    pub async fn register_direct_video_texture(&self, url: &str) -> CardResult<Texture> {
        self.videos
            .register_direct_video_texture(self.video_backend.as_ref(), url, Default::default())
            .await
    }

    pub fn debug_video_status(&self) -> VideoDebugReport {
        self.videos.debug_video_status()
    }

    /// Dispose every video element and clear every cache. Idempotent.
    pub fn dispose_video_resources(&self) {
        self.videos.dispose();
        self.textures.clear();
        self.images.clear();
        tracing::debug!("Card texture caches cleared");
    }
}
