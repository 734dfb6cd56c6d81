//! Image loading.
//! Resolves card image sources (asset paths or http(s) URLs), decodes PNG,
//! JPEG, WebP and the other formats the `image` crate knows into FrameBuffers,
//! and shares decoded images between the foreground and background passes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cardgrid_core::{CardError, CardResult, FrameBuffer};

use crate::cache::OnceMap;

/// Source of decoded still images.
#[async_trait]
pub trait MediaLoader: Send + Sync {
    /// Fetch and decode the image at `source`.
    async fn load_image(&self, source: &str) -> CardResult<FrameBuffer>;
}

/// Decode an in-memory image. `source` only labels errors.
pub fn decode_image(data: &[u8], source: &str) -> CardResult<FrameBuffer> {
    let img = image::load_from_memory(data)
        .map_err(|e| CardError::media(format!("failed to decode image: {}", e), source))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    FrameBuffer::from_raw(width, height, rgba.into_raw())
        .ok_or_else(|| CardError::media("decoded image has an inconsistent size", source))
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Map a card source onto the filesystem.
///
/// Root-relative paths (`/photo.png`) and relative paths resolve under
/// `root`; an absolute path outside it is used as-is when it exists.
pub fn resolve_asset_path(root: &Path, source: &str) -> PathBuf {
    let source = source.strip_prefix("file://").unwrap_or(source);
    let path = Path::new(source);
    if path.is_absolute() {
        let under_root = root.join(source.trim_start_matches(['/', '\\']));
        if under_root.exists() || !path.exists() {
            return under_root;
        }
        return path.to_path_buf();
    }
    root.join(path)
}

/// Loads images from an asset directory or over HTTP.
pub struct AssetLoader {
    root: PathBuf,
    client: reqwest::Client,
}

impl AssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn fetch(&self, url: &str) -> CardResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CardError::media(format!("request failed: {}", e), url))?;
        if !response.status().is_success() {
            return Err(CardError::media(
                format!("server responded {}", response.status()),
                url,
            ));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CardError::media(format!("failed to read body: {}", e), url))?;
        Ok(bytes.to_vec())
    }

    async fn read_file(&self, source: &str) -> CardResult<Vec<u8>> {
        let path = resolve_asset_path(&self.root, source);
        tokio::fs::read(&path).await.map_err(|e| {
            CardError::media(
                format!("failed to read '{}': {}", path.display(), e),
                source,
            )
        })
    }
}

#[async_trait]
impl MediaLoader for AssetLoader {
    async fn load_image(&self, source: &str) -> CardResult<FrameBuffer> {
        let bytes = if is_remote(source) {
            self.fetch(source).await?
        } else {
            self.read_file(source).await?
        };
        let label = source.to_string();
        tokio::task::spawn_blocking(move || decode_image(&bytes, &label))
            .await
            .map_err(|e| CardError::media(format!("decode task failed: {}", e), source))?
    }
}

/// Decoded images keyed by source, shared by every texture that draws them.
///
/// A failed load is not remembered; the next request retries.
#[derive(Default)]
pub struct ImageStore {
    images: OnceMap<String, Arc<FrameBuffer>>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The decoded image for `source`, loading it through `loader` on first use.
    pub async fn load(&self, source: &str, loader: &dyn MediaLoader) -> CardResult<Arc<FrameBuffer>> {
        let fetched = self
            .images
            .get_or_try_insert_with(source.to_string(), || async {
                let fb = loader.load_image(source).await?;
                tracing::debug!("decoded {} ({}x{})", source, fb.width, fb.height);
                Ok(Arc::new(fb))
            })
            .await?;
        if fetched.hit {
            tracing::trace!("image store hit: {}", source);
        }
        Ok(fetched.value)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn clear(&self) {
        self.images.clear();
    }
}
