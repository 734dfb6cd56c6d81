//! # cardgrid-render
//!
//! Produces the textures of the infinite grid's cards: a composited
//! foreground (title, image or video frame, tag pills, date) and a blurred
//! background, cached by content and, for video cards, kept current by a
//! per-frame update tick. Also carries the GLSL sources the grid renders with.

pub mod cache;
pub mod canvas;
pub mod compositor;
pub mod effects;
pub mod factory;
pub mod image_loader;
pub mod layout;
pub mod shaders;
pub mod text;
pub mod texture;
pub mod video;
pub mod video_decoder;

pub use cache::TextureCache;
pub use canvas::Canvas;
pub use factory::{has_video_content, CardTextureFactory, CardTextures};
pub use image_loader::{AssetLoader, ImageStore, MediaLoader};
pub use layout::CardLayout;
pub use shaders::ShaderProgram;
pub use text::Typeface;
pub use texture::{Texture, TextureOptions};
pub use video::{
    PlaybackState, ReadyState, UpdateReport, VideoBackend, VideoElement, VideoRegistry, VideoSource,
};
pub use video_decoder::FfmpegVideoBackend;
