//! Video-backed card textures.
//!
//! A [`VideoElement`] wraps one decoded video per URL. A
//! [`VideoTextureEntry`] ties a texture to an element and, optionally, to a
//! draw closure that recomposites the card around the current frame. Nothing
//! here schedules itself: the host calls
//! [`VideoRegistry::update_all_video_textures`] once per animation frame.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use cardgrid_core::{CardError, CardResult, FrameBuffer, VideoOptions};
use serde::Serialize;

use crate::cache::OnceMap;
use crate::canvas::Canvas;
use crate::texture::Texture;

/// How much of the media is buffered, mirroring the HTML media ready states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ReadyState {
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

/// Lifecycle of a [`VideoElement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Uninitialized,
    Loading,
    /// Decodable data is available; playback has not started.
    Ready,
    Playing,
    Paused,
    Disposed,
}

/// A decoder for one video, driven by its element.
pub trait VideoSource: Send {
    fn ready_state(&self) -> ReadyState;
    /// Natural (width, height) of the frames.
    fn dimensions(&self) -> (u32, u32);
    /// Paused, including after a non-looping video has ended.
    fn is_paused(&self) -> bool;
    fn is_ended(&self) -> bool;
    /// Start or resume playback. Restarts from the beginning when ended.
    fn play(&mut self) -> CardResult<()>;
    fn pause(&mut self);
    /// Playback position in seconds.
    fn current_time(&self) -> f64;
    /// Duration in seconds; 0 when unknown.
    fn duration(&self) -> f64;
    /// The frame at the current playback position.
    fn current_frame(&mut self) -> CardResult<FrameBuffer>;
    /// The URL being played, empty once unloaded.
    fn source(&self) -> &str;
    /// Drop the source and release decoder resources.
    fn unload(&mut self);
}

/// Opens video sources. Resolves once the first frame is decodable.
#[async_trait]
pub trait VideoBackend: Send + Sync {
    async fn open(&self, url: &str, options: VideoOptions) -> CardResult<Box<dyn VideoSource>>;
}

struct ElementInner {
    source: Box<dyn VideoSource>,
    state: PlaybackState,
    attached: bool,
}

/// One playing video, shared by every texture drawn from the same URL.
pub struct VideoElement {
    url: String,
    options: VideoOptions,
    inner: Mutex<ElementInner>,
}

impl fmt::Debug for VideoElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoElement")
            .field("url", &self.url)
            .field("state", &self.state())
            .finish()
    }
}

impl VideoElement {
    /// Open `url` through `backend` and attempt autoplay.
    ///
    /// Fails with [`CardError::Media`] when the video can't be loaded. A
    /// rejected autoplay is logged and the element is returned paused.
    pub async fn load(backend: &dyn VideoBackend, url: &str, options: VideoOptions) -> CardResult<Arc<Self>> {
        tracing::debug!("Loading video: {}", url);
        let source = backend.open(url, options).await.map_err(|e| match e {
            e @ CardError::Media { .. } => e,
            other => CardError::media(format!("failed to load video: {}", other), url),
        })?;
        let element = Arc::new(Self::from_source(url, options, source));
        if options.autoplay {
            if element.ensure_playing() {
                tracing::info!("Video started playing: {}", url);
            } else {
                tracing::warn!("Video autoplay failed, continuing paused: {}", url);
            }
        }
        Ok(element)
    }

    /// Wrap an already opened source. The element starts Ready and attached.
    pub fn from_source(url: &str, options: VideoOptions, source: Box<dyn VideoSource>) -> Self {
        Self {
            url: url.to_string(),
            options,
            inner: Mutex::new(ElementInner {
                source,
                state: PlaybackState::Ready,
                attached: true,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ElementInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn options(&self) -> VideoOptions {
        self.options
    }

    pub fn state(&self) -> PlaybackState {
        self.lock().state
    }

    pub fn is_disposed(&self) -> bool {
        self.state() == PlaybackState::Disposed
    }

    pub fn is_attached(&self) -> bool {
        self.lock().attached
    }

    /// Current source URL; empty after disposal.
    pub fn source(&self) -> String {
        self.lock().source.source().to_string()
    }

    pub fn ready_state(&self) -> ReadyState {
        self.lock().source.ready_state()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.lock().source.dimensions()
    }

    /// True when a frame can be drawn right now.
    pub fn has_current_data(&self) -> bool {
        let inner = self.lock();
        inner.state != PlaybackState::Disposed && inner.source.ready_state() >= ReadyState::HaveCurrentData
    }

    pub fn is_paused(&self) -> bool {
        self.lock().source.is_paused()
    }

    pub fn is_ended(&self) -> bool {
        self.lock().source.is_ended()
    }

    /// Advancing through frames: not paused and not ended.
    pub fn is_playing(&self) -> bool {
        let inner = self.lock();
        !inner.source.is_paused() && !inner.source.is_ended()
    }

    /// Start playback if it is paused. Idempotent; a rejected play is logged
    /// and reported as `false`, never as an error.
    pub fn ensure_playing(&self) -> bool {
        let mut inner = self.lock();
        if inner.state == PlaybackState::Disposed {
            return false;
        }
        if !inner.source.is_paused() {
            inner.state = PlaybackState::Playing;
            return true;
        }
        match inner.source.play() {
            Ok(()) => {
                inner.state = PlaybackState::Playing;
                tracing::debug!("Video is playing: {}", self.url);
                true
            }
            Err(e) => {
                inner.state = PlaybackState::Paused;
                tracing::debug!("Play rejected for {}: {}", self.url, e);
                false
            }
        }
    }

    pub fn pause(&self) {
        let mut inner = self.lock();
        if inner.state == PlaybackState::Disposed {
            return;
        }
        if !inner.source.is_paused() {
            inner.source.pause();
            tracing::debug!("Video paused: {}", self.url);
        }
        inner.state = PlaybackState::Paused;
    }

    /// Pause, clear the source and detach. Safe to call more than once.
    pub fn dispose(&self) {
        let mut inner = self.lock();
        if inner.state == PlaybackState::Disposed {
            return;
        }
        inner.source.pause();
        inner.source.unload();
        inner.attached = false;
        inner.state = PlaybackState::Disposed;
    }

    /// The frame at the current position, or `None` when nothing is buffered.
    pub fn current_frame(&self) -> CardResult<Option<FrameBuffer>> {
        let mut inner = self.lock();
        if inner.state == PlaybackState::Disposed || inner.source.ready_state() < ReadyState::HaveCurrentData {
            return Ok(None);
        }
        inner.source.current_frame().map(Some)
    }

    /// [`current_frame`](Self::current_frame) on the blocking pool, for async
    /// callers. Decoders may spawn processes while the element is locked.
    pub async fn current_frame_blocking(self: &Arc<Self>) -> CardResult<Option<FrameBuffer>> {
        let video = Arc::clone(self);
        tokio::task::spawn_blocking(move || video.current_frame())
            .await
            .map_err(|e| CardError::Other(format!("frame task for {} failed: {}", self.url, e)))?
    }

    /// Snapshot for diagnostics.
    pub fn status(&self) -> VideoStatus {
        let inner = self.lock();
        VideoStatus {
            url: self.url.clone(),
            source: inner.source.source().to_string(),
            state: inner.state,
            ready_state: inner.source.ready_state(),
            paused: inner.source.is_paused(),
            ended: inner.source.is_ended(),
            current_time: inner.source.current_time(),
            duration: inner.source.duration(),
            muted: self.options.muted,
            autoplay: self.options.autoplay,
            looping: self.options.looping,
            attached: inner.attached,
        }
    }
}

/// Redraws a video texture's surface from its element.
pub type DrawFrame = Box<dyn Fn(&mut Canvas, &VideoElement) -> CardResult<()> + Send + Sync>;

enum EntryKind {
    /// Recomposited on a private surface, then copied into the texture.
    Composited { surface: Mutex<Canvas>, draw: DrawFrame },
    /// The texture shows the raw video frame.
    Direct,
}

/// A texture kept in sync with a video element.
pub struct VideoTextureEntry {
    texture: Texture,
    video: Arc<VideoElement>,
    kind: EntryKind,
}

impl VideoTextureEntry {
    pub fn composited(texture: Texture, video: Arc<VideoElement>, surface: Canvas, draw: DrawFrame) -> Self {
        Self {
            texture,
            video,
            kind: EntryKind::Composited {
                surface: Mutex::new(surface),
                draw,
            },
        }
    }

    pub fn direct(texture: Texture, video: Arc<VideoElement>) -> Self {
        Self {
            texture,
            video,
            kind: EntryKind::Direct,
        }
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn video(&self) -> &Arc<VideoElement> {
        &self.video
    }

    pub fn has_draw_frame(&self) -> bool {
        matches!(self.kind, EntryKind::Composited { .. })
    }

    /// Redraw the texture from the video's current state and mark it dirty.
    pub fn refresh(&self) -> CardResult<()> {
        match &self.kind {
            EntryKind::Composited { surface, draw } => {
                let mut canvas = surface.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                draw(&mut canvas, &*self.video)?;
                self.texture.copy_from(canvas.frame());
            }
            EntryKind::Direct => {
                if let Some(frame) = self.video.current_frame()? {
                    self.texture.replace_image(frame);
                }
            }
        }
        Ok(())
    }
}

/// Per-element diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoStatus {
    pub url: String,
    pub source: String,
    pub state: PlaybackState,
    pub ready_state: ReadyState,
    pub paused: bool,
    pub ended: bool,
    pub current_time: f64,
    pub duration: f64,
    pub muted: bool,
    pub autoplay: bool,
    pub looping: bool,
    pub attached: bool,
}

/// Per-entry diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoTextureStatus {
    pub key: String,
    pub texture_id: u64,
    pub video_url: String,
    pub has_draw_frame: bool,
    pub needs_update: bool,
}

/// Serializes to the JSON the host's debug overlay shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VideoDebugReport {
    pub videos: Vec<VideoStatus>,
    pub textures: Vec<VideoTextureStatus>,
}

/// Outcome of one update tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub redrawn: usize,
    pub resumed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// The video cache (one element per URL) and the video texture cache.
#[derive(Default)]
pub struct VideoRegistry {
    videos: OnceMap<String, Arc<VideoElement>>,
    entries: OnceMap<String, Arc<VideoTextureEntry>>,
}

/// Key of the element for `url` in the video cache.
pub fn video_element_key(url: &str) -> String {
    format!("video-{}", url)
}

impl VideoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The element for `url`, loading it on first use. Concurrent callers share
    /// one load; a failed load is not cached.
    ///
    /// An element whose load outlived a [`dispose`](Self::dispose) stays
    /// tracked so the next dispose reaches it. If the URL was loaded again in
    /// the meantime, the stale element is disposed and the tracked one returned.
    pub async fn element(&self, backend: &dyn VideoBackend, url: &str, options: VideoOptions) -> CardResult<Arc<VideoElement>> {
        loop {
            let fetched = self
                .videos
                .get_or_try_insert_with(video_element_key(url), || VideoElement::load(backend, url, options))
                .await?;
            if fetched.tracked {
                return Ok(fetched.value);
            }
            tracing::debug!("Disposing untracked video element: {}", url);
            fetched.value.dispose();
        }
    }

    /// The texture of the entry under `key`, creating the entry with `init`
    /// when absent.
    pub async fn texture<F, Fut>(&self, key: &str, init: F) -> CardResult<Texture>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = CardResult<Arc<VideoTextureEntry>>>,
    {
        let fetched = self.entries.get_or_try_insert_with(key.to_string(), init).await?;
        if fetched.hit {
            tracing::debug!("video texture cache hit: {}", key);
        }
        Ok(fetched.value.texture().clone())
    }

    pub fn entry(&self, key: &str) -> Option<Arc<VideoTextureEntry>> {
        self.entries.get(&key.to_string())
    }

    pub fn video_count(&self) -> usize {
        self.videos.len()
    }

    pub fn texture_count(&self) -> usize {
        self.entries.len()
    }

    /// Redraw every playing video texture and nudge paused ones back to play.
    ///
    /// Draw failures are logged per entry and never stop the tick.
    pub fn update_all_video_textures(&self) -> UpdateReport {
        let mut report = UpdateReport::default();
        for (key, entry) in self.entries.entries() {
            let video = entry.video();
            if video.is_disposed() {
                report.skipped += 1;
                continue;
            }
            if video.has_current_data() && video.is_playing() {
                match entry.refresh() {
                    Ok(()) => report.redrawn += 1,
                    Err(e) => {
                        report.failed += 1;
                        tracing::error!("Error drawing video frame for {}: {}", key, e);
                    }
                }
            } else if video.is_paused() {
                if video.ensure_playing() {
                    report.resumed += 1;
                }
            } else {
                report.skipped += 1;
            }
        }
        report
    }

    /// Every tracked element.
    pub fn all_videos(&self) -> Vec<Arc<VideoElement>> {
        self.videos.values()
    }

    pub fn pause_all_videos(&self) {
        for video in self.all_videos() {
            video.pause();
        }
    }

    /// Resume paused elements. Returns how many are playing afterwards.
    pub fn resume_all_videos(&self) -> usize {
        self.all_videos().iter().filter(|v| v.ensure_playing()).count()
    }

    /// Like [`resume_all_videos`](Self::resume_all_videos), for user-gesture
    /// handlers; each element is tried independently and logged.
    pub fn start_all_videos(&self) -> usize {
        let mut started = 0;
        for video in self.all_videos() {
            if video.ensure_playing() {
                started += 1;
                tracing::info!("Started video: {}", video.url());
            } else {
                tracing::warn!("Could not start video: {}", video.url());
            }
        }
        started
    }

    /// Dispose every element and forget every entry. Idempotent.
    pub fn dispose(&self) {
        let videos = self.all_videos();
        for video in &videos {
            video.dispose();
        }
        if !videos.is_empty() {
            tracing::info!("Disposed {} video element(s)", videos.len());
        }
        self.videos.clear();
        self.entries.clear();
    }

    /// Register a texture showing the raw frames of `url`.
    pub async fn register_direct_video_texture(&self, backend: &dyn VideoBackend, url: &str, options: VideoOptions) -> CardResult<Texture> {
        let key = format!("video-direct-{}", url);
        self.texture(&key, || async {
            let video = self.element(backend, url, options).await?;
            let first = video.current_frame_blocking().await?;
            let (w, h) = video.dimensions();
            let image = first.unwrap_or_else(|| FrameBuffer::new(w.max(1), h.max(1)));
            let texture = Texture::new(image, Default::default());
            Ok(Arc::new(VideoTextureEntry::direct(texture, video)))
        })
        .await
    }

    /// Snapshot of every element and entry, also logged at debug level.
    pub fn debug_video_status(&self) -> VideoDebugReport {
        let mut videos: Vec<VideoStatus> = self.all_videos().iter().map(|v| v.status()).collect();
        videos.sort_by(|a, b| a.url.cmp(&b.url));
        let mut textures: Vec<VideoTextureStatus> = self
            .entries
            .entries()
            .into_iter()
            .map(|(key, entry)| VideoTextureStatus {
                key,
                texture_id: entry.texture().id(),
                video_url: entry.video().url().to_string(),
                has_draw_frame: entry.has_draw_frame(),
                needs_update: entry.texture().needs_update(),
            })
            .collect();
        textures.sort_by(|a, b| a.key.cmp(&b.key));

        tracing::debug!("=== Video cache: {} element(s) ===", videos.len());
        for v in &videos {
            tracing::debug!(
                url = %v.url,
                state = ?v.state,
                ready = ?v.ready_state,
                paused = v.paused,
                ended = v.ended,
                time = v.current_time,
                duration = v.duration,
                "video"
            );
        }
        tracing::debug!("=== Video textures: {} entry(ies) ===", textures.len());
        for t in &textures {
            tracing::debug!(key = %t.key, draw = t.has_draw_frame, dirty = t.needs_update, "video texture");
        }

        VideoDebugReport { videos, textures }
    }
}
