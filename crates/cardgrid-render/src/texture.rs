//! Shareable texture handles handed to the rendering layer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use cardgrid_core::FrameBuffer;

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Upload options the consumer applies when it moves the image to the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextureOptions {
    pub generate_mipmaps: bool,
    pub flip_y: bool,
}

struct TextureInner {
    id: u64,
    options: TextureOptions,
    image: RwLock<FrameBuffer>,
    needs_update: AtomicBool,
    version: AtomicU64,
}

/// A texture handle. Clones share the same image; identity never changes,
/// content may (video textures are redrawn every frame).
#[derive(Clone)]
pub struct Texture {
    inner: Arc<TextureInner>,
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.inner.id)
            .field("options", &self.inner.options)
            .field("needs_update", &self.needs_update())
            .field("version", &self.version())
            .finish()
    }
}

impl Texture {
    /// Wrap a finished image. New textures start dirty so the first upload happens.
    pub fn new(image: FrameBuffer, options: TextureOptions) -> Self {
        Self {
            inner: Arc::new(TextureInner {
                id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
                options,
                image: RwLock::new(image),
                needs_update: AtomicBool::new(true),
                version: AtomicU64::new(1),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn options(&self) -> TextureOptions {
        self.inner.options
    }

    /// True when both handles refer to the same texture.
    pub fn ptr_eq(a: &Texture, b: &Texture) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    fn read(&self) -> RwLockReadGuard<'_, FrameBuffer> {
        self.inner.image.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, FrameBuffer> {
        self.inner.image.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn dimensions(&self) -> (u32, u32) {
        let image = self.read();
        (image.width, image.height)
    }

    /// Copy of the current image.
    pub fn snapshot(&self) -> FrameBuffer {
        self.read().clone()
    }

    /// Run `f` against the current image without copying it.
    pub fn with_image<R>(&self, f: impl FnOnce(&FrameBuffer) -> R) -> R {
        f(&self.read())
    }

    /// Replace the image and mark the texture dirty.
    pub fn replace_image(&self, image: FrameBuffer) {
        *self.write() = image;
        self.mark_needs_update();
    }

    /// Copy `src` into the image, reusing its allocation when the size matches.
    pub fn copy_from(&self, src: &FrameBuffer) {
        {
            let mut image = self.write();
            if image.width == src.width && image.height == src.height {
                image.data.copy_from_slice(&src.data);
            } else {
                *image = src.clone();
            }
        }
        self.mark_needs_update();
    }

    pub fn mark_needs_update(&self) {
        self.inner.version.fetch_add(1, Ordering::AcqRel);
        self.inner.needs_update.store(true, Ordering::Release);
    }

    pub fn needs_update(&self) -> bool {
        self.inner.needs_update.load(Ordering::Acquire)
    }

    /// Number of content changes so far, starting at 1.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Consumer side of the dirty flag: clear it and return the image to upload,
    /// or `None` when nothing changed since the last call.
    pub fn take_update(&self) -> Option<FrameBuffer> {
        if self.inner.needs_update.swap(false, Ordering::AcqRel) {
            Some(self.snapshot())
        } else {
            None
        }
    }
}
