//! Mock media for integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cardgrid_core::{CardError, CardResult, CardgridConfig, Color, FrameBuffer, VideoOptions};
use cardgrid_render::{CardTextureFactory, MediaLoader, ReadyState, Typeface, VideoBackend, VideoSource};

/// Serves solid images and counts how often it is asked.
#[derive(Default)]
pub struct CountingLoader {
    pub calls: AtomicUsize,
    failing: Mutex<HashSet<String>>,
}

impl CountingLoader {
    pub fn fail(&self, source: &str) {
        self.failing.lock().unwrap().insert(source.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaLoader for CountingLoader {
    async fn load_image(&self, source: &str) -> CardResult<FrameBuffer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        if self.failing.lock().unwrap().contains(source) {
            return Err(CardError::media("404", source));
        }
        let color = if source.contains("blue") { Color::BLUE } else { Color::GREEN };
        Ok(FrameBuffer::solid(200, 100, &color))
    }
}

/// Shared, test-controlled state of one mock video.
#[derive(Debug)]
pub struct MockVideoState {
    pub url: String,
    pub ready: ReadyState,
    pub paused: bool,
    pub reject_play: bool,
    /// `current_frame` errs while set.
    pub fail_frames: bool,
    pub color: Color,
    pub play_calls: usize,
    pub frame_calls: usize,
}

pub struct MockVideoSource {
    state: Arc<Mutex<MockVideoState>>,
    url: String,
}

impl VideoSource for MockVideoSource {
    fn ready_state(&self) -> ReadyState {
        self.state.lock().unwrap().ready
    }
    fn dimensions(&self) -> (u32, u32) {
        (64, 36)
    }
    fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }
    fn is_ended(&self) -> bool {
        false
    }
    fn play(&mut self) -> CardResult<()> {
        let mut s = self.state.lock().unwrap();
        s.play_calls += 1;
        if s.reject_play {
            return Err(CardError::Playback("autoplay blocked".into()));
        }
        s.paused = false;
        Ok(())
    }
    fn pause(&mut self) {
        self.state.lock().unwrap().paused = true;
    }
    fn current_time(&self) -> f64 {
        0.0
    }
    fn duration(&self) -> f64 {
        2.0
    }
    fn current_frame(&mut self) -> CardResult<FrameBuffer> {
        let mut s = self.state.lock().unwrap();
        s.frame_calls += 1;
        if s.fail_frames {
            return Err(CardError::Playback("decoder stalled".into()));
        }
        Ok(FrameBuffer::solid(64, 36, &s.color))
    }
    fn source(&self) -> &str {
        &self.url
    }
    fn unload(&mut self) {
        self.url.clear();
        let mut s = self.state.lock().unwrap();
        s.url.clear();
        s.ready = ReadyState::HaveNothing;
    }
}

/// Opens mock videos; every opened video's state is kept for inspection.
#[derive(Default)]
pub struct MockVideoBackend {
    pub opened: Mutex<Vec<Arc<Mutex<MockVideoState>>>>,
    pub open_calls: AtomicUsize,
    pub reject_play: bool,
    failing: Mutex<HashSet<String>>,
}

impl MockVideoBackend {
    pub fn rejecting_autoplay() -> Self {
        Self {
            reject_play: true,
            ..Default::default()
        }
    }

    pub fn fail(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    pub fn state(&self, index: usize) -> Arc<Mutex<MockVideoState>> {
        self.opened.lock().unwrap()[index].clone()
    }

    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoBackend for MockVideoBackend {
    async fn open(&self, url: &str, _options: VideoOptions) -> CardResult<Box<dyn VideoSource>> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        if self.failing.lock().unwrap().contains(url) {
            return Err(CardError::media(format!("Failed to load video: {}", url), url));
        }
        let state = Arc::new(Mutex::new(MockVideoState {
            url: url.to_string(),
            ready: ReadyState::HaveEnoughData,
            paused: true,
            reject_play: self.reject_play,
            fail_frames: false,
            color: Color::RED,
            play_calls: 0,
            frame_calls: 0,
        }));
        self.opened.lock().unwrap().push(state.clone());
        Ok(Box::new(MockVideoSource {
            state,
            url: url.to_string(),
        }))
    }
}

pub fn factory_with(
    config: CardgridConfig,
    loader: Arc<CountingLoader>,
    backend: Arc<MockVideoBackend>,
) -> CardTextureFactory {
    CardTextureFactory::with_parts(config, Arc::new(Typeface::Fallback), loader, backend).unwrap()
}

pub fn factory() -> (CardTextureFactory, Arc<CountingLoader>, Arc<MockVideoBackend>) {
    let loader = Arc::new(CountingLoader::default());
    let backend = Arc::new(MockVideoBackend::default());
    let factory = factory_with(CardgridConfig::default(), loader.clone(), backend.clone());
    (factory, loader, backend)
}
