//! Video decoding module.
//! Uses FFmpeg subprocesses: `ffprobe` reads stream metadata and `ffmpeg`
//! extracts the frame at the element's playback clock as raw RGBA.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

use async_trait::async_trait;
use cardgrid_core::{CardError, CardResult, FrameBuffer, VideoOptions};

use crate::image_loader::resolve_asset_path;
use crate::video::{ReadyState, VideoBackend, VideoSource};

/// Longest edge frames are decoded at.
const DEFAULT_MAX_DECODE_EDGE: u32 = 1024;

/// Metadata about a video file.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Duration in seconds.
    pub duration_secs: f64,
    pub fps: f64,
}

/// Check if FFmpeg is available on the system.
pub fn is_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Parse a frame rate string like "30/1" or "24000/1001" into a float.
fn parse_frame_rate(rate_str: &str) -> f64 {
    if let Some((num_str, den_str)) = rate_str.split_once('/') {
        let num: f64 = num_str.parse().unwrap_or(30.0);
        let den: f64 = den_str.parse().unwrap_or(1.0);
        if den > 0.0 {
            num / den
        } else {
            30.0
        }
    } else {
        rate_str.parse::<f64>().unwrap_or(30.0)
    }
}

/// Read [`VideoInfo`] out of `ffprobe -print_format json` output.
fn parse_probe_output(json_str: &str, input: &str) -> CardResult<VideoInfo> {
    let json: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| CardError::media(format!("failed to parse ffprobe output: {}", e), input))?;

    let video_stream = json["streams"]
        .as_array()
        .and_then(|streams| streams.iter().find(|s| s["codec_type"].as_str() == Some("video")))
        .ok_or_else(|| CardError::media("no video stream found", input))?;

    let width = video_stream["width"]
        .as_u64()
        .ok_or_else(|| CardError::media("missing width in video stream", input))? as u32;
    let height = video_stream["height"]
        .as_u64()
        .ok_or_else(|| CardError::media("missing height in video stream", input))? as u32;
    let fps = parse_frame_rate(video_stream["r_frame_rate"].as_str().unwrap_or("30/1"));

    let duration_secs = json["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| video_stream["duration"].as_str().and_then(|s| s.parse::<f64>().ok()))
        .unwrap_or(0.0);

    Ok(VideoInfo {
        width,
        height,
        duration_secs,
        fps,
    })
}

/// Probe `input` (a path or URL ffmpeg understands).
pub async fn probe(input: &str) -> CardResult<VideoInfo> {
    let output = tokio::process::Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_streams", "-show_format"])
        .arg(input)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| CardError::media(format!("failed to run ffprobe: {}", e), input))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CardError::media(format!("ffprobe failed: {}", stderr.trim()), input));
    }
    parse_probe_output(&String::from_utf8_lossy(&output.stdout), input)
}

/// Extract one RGBA frame of `width × height` at `timestamp_secs`.
pub fn extract_frame(input: &str, timestamp_secs: f64, width: u32, height: u32) -> CardResult<FrameBuffer> {
    let ts_str = format!("{:.3}", timestamp_secs);
    let output = Command::new("ffmpeg")
        // seek before -i for fast seeking
        .args(["-ss", &ts_str, "-i", input])
        .args(["-vframes", "1", "-f", "rawvideo", "-pix_fmt", "rgba", "-s"])
        .arg(format!("{}x{}", width, height))
        .arg("-")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| CardError::Playback(format!("failed to run ffmpeg: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CardError::Playback(format!(
            "frame extraction at {}s failed: {}",
            ts_str,
            stderr.trim()
        )));
    }

    let expected_size = width as usize * height as usize * FrameBuffer::BPP;
    if output.stdout.len() < expected_size {
        return Err(CardError::Playback(format!(
            "ffmpeg output size mismatch: expected {} bytes, got {}",
            expected_size,
            output.stdout.len()
        )));
    }
    let mut data = output.stdout;
    data.truncate(expected_size);
    FrameBuffer::from_raw(width, height, data)
        .ok_or_else(|| CardError::Playback("ffmpeg returned a malformed frame".into()))
}

/// Size to decode at: natural size scaled down so the longest edge is at most `max_edge`.
fn decode_size(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_edge || longest == 0 {
        return (width.max(1), height.max(1));
    }
    let scale = max_edge as f64 / longest as f64;
    (
        ((width as f64 * scale).round() as u32).max(1),
        ((height as f64 * scale).round() as u32).max(1),
    )
}

/// Wall-clock playback position.
#[derive(Debug, Clone, Default)]
struct PlaybackClock {
    started: Option<Instant>,
    offset: f64,
}

impl PlaybackClock {
    fn elapsed(&self) -> f64 {
        self.offset + self.started.map(|t| t.elapsed().as_secs_f64()).unwrap_or(0.0)
    }

    fn running(&self) -> bool {
        self.started.is_some()
    }

    fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    fn stop(&mut self) {
        self.offset = self.elapsed();
        self.started = None;
    }

    fn reset(&mut self) {
        self.offset = 0.0;
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
    }
}

/// Map a raw clock reading onto the timeline.
fn timeline_position(elapsed: f64, duration: f64, looping: bool) -> f64 {
    if duration <= 0.0 {
        elapsed
    } else if looping {
        elapsed.rem_euclid(duration)
    } else {
        elapsed.min(duration)
    }
}

/// A video played by sampling ffmpeg at the playback clock.
pub struct FfmpegVideo {
    url: String,
    input: String,
    info: VideoInfo,
    size: (u32, u32),
    looping: bool,
    clock: PlaybackClock,
    last_frame: Option<(u64, FrameBuffer)>,
    ready: ReadyState,
}

impl FfmpegVideo {
    fn ended(&self) -> bool {
        !self.looping && self.info.duration_secs > 0.0 && self.clock.elapsed() >= self.info.duration_secs
    }

    fn frame_index(&self, position: f64) -> u64 {
        (position * self.info.fps.max(1.0)).floor() as u64
    }
}

impl VideoSource for FfmpegVideo {
    fn ready_state(&self) -> ReadyState {
        self.ready
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn is_paused(&self) -> bool {
        !self.clock.running() || self.ended()
    }

    fn is_ended(&self) -> bool {
        self.ended()
    }

    fn play(&mut self) -> CardResult<()> {
        if self.ready == ReadyState::HaveNothing {
            return Err(CardError::Playback(format!("no source loaded for {}", self.url)));
        }
        if self.ended() {
            self.clock.reset();
        }
        self.clock.start();
        Ok(())
    }

    fn pause(&mut self) {
        self.clock.stop();
    }

    fn current_time(&self) -> f64 {
        timeline_position(self.clock.elapsed(), self.info.duration_secs, self.looping)
    }

    fn duration(&self) -> f64 {
        self.info.duration_secs
    }

    fn current_frame(&mut self) -> CardResult<FrameBuffer> {
        let position = self.current_time();
        let index = self.frame_index(position);
        if let Some((cached, frame)) = &self.last_frame {
            if *cached == index {
                return Ok(frame.clone());
            }
        }
        let (w, h) = self.size;
        match extract_frame(&self.input, position, w, h) {
            Ok(frame) => {
                self.last_frame = Some((index, frame.clone()));
                Ok(frame)
            }
            Err(e) => match &self.last_frame {
                Some((_, previous)) => {
                    tracing::warn!("Keeping previous frame of {}: {}", self.url, e);
                    Ok(previous.clone())
                }
                None => Err(e),
            },
        }
    }

    fn source(&self) -> &str {
        &self.url
    }

    fn unload(&mut self) {
        self.clock = PlaybackClock::default();
        self.last_frame = None;
        self.url.clear();
        self.ready = ReadyState::HaveNothing;
    }
}

/// Opens videos from the asset root or over HTTP through FFmpeg.
pub struct FfmpegVideoBackend {
    root: PathBuf,
    max_decode_edge: u32,
}

impl FfmpegVideoBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_decode_edge: DEFAULT_MAX_DECODE_EDGE,
        }
    }

    pub fn with_max_decode_edge(mut self, max_edge: u32) -> Self {
        self.max_decode_edge = max_edge.max(1);
        self
    }

    fn input_for(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            resolve_asset_path(&self.root, url).to_string_lossy().into_owned()
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl VideoBackend for FfmpegVideoBackend {
    async fn open(&self, url: &str, options: VideoOptions) -> CardResult<Box<dyn VideoSource>> {
        let input = self.input_for(url);
        let info = probe(&input).await?;
        let size = decode_size(info.width, info.height, self.max_decode_edge);
        tracing::debug!(
            "Probed {}: {}x{} @ {:.2}fps, {:.2}s",
            url,
            info.width,
            info.height,
            info.fps,
            info.duration_secs
        );

        // Decoding the first frame is what makes the video "loaded".
        let first_input = input.clone();
        let first = tokio::task::spawn_blocking(move || extract_frame(&first_input, 0.0, size.0, size.1))
            .await
            .map_err(|e| CardError::media(format!("decode task failed: {}", e), url))?
            .map_err(|e| CardError::media(e.to_string(), url))?;

        Ok(Box::new(FfmpegVideo {
            url: url.to_string(),
            input,
            info,
            size,
            looping: options.looping,
            clock: PlaybackClock::default(),
            last_frame: Some((0, first)),
            ready: ReadyState::HaveEnoughData,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(looping: bool, duration: f64) -> FfmpegVideo {
        FfmpegVideo {
            url: "clip.mp4".into(),
            input: "/nonexistent/clip.mp4".into(),
            info: VideoInfo {
                width: 8,
                height: 8,
                duration_secs: duration,
                fps: 30.0,
            },
            size: (8, 8),
            looping,
            clock: PlaybackClock::default(),
            last_frame: Some((0, FrameBuffer::new(8, 8))),
            ready: ReadyState::HaveEnoughData,
        }
    }

    #[test]
    fn test_parse_frame_rate_fraction() {
        assert!((parse_frame_rate("30/1") - 30.0).abs() < 0.001);
        assert!((parse_frame_rate("24000/1001") - 23.976).abs() < 0.01);
    }

    #[test]
    fn test_parse_frame_rate_invalid() {
        assert!((parse_frame_rate("invalid") - 30.0).abs() < 0.001);
        assert!((parse_frame_rate("30/0") - 30.0).abs() < 0.001);
    }

    #[test]
    fn test_parse_probe_output() {
        let json = r#"{
            "streams": [
                {"codec_type": "audio"},
                {"codec_type": "video", "width": 1920, "height": 1080, "r_frame_rate": "25/1"}
            ],
            "format": {"duration": "12.5"}
        }"#;
        let info = parse_probe_output(json, "clip.mp4").unwrap();
        assert_eq!((info.width, info.height), (1920, 1080));
        assert!((info.fps - 25.0).abs() < 1e-9);
        assert!((info.duration_secs - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_probe_output_without_video_stream() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {}}"#;
        let err = parse_probe_output(json, "song.mp3").unwrap_err();
        assert!(matches!(err, CardError::Media { .. }));
    }

    #[test]
    fn test_decode_size_caps_longest_edge() {
        assert_eq!(decode_size(1920, 1080, 1024), (1024, 576));
        assert_eq!(decode_size(640, 480, 1024), (640, 480));
    }

    #[test]
    fn test_backend_decode_edge_is_clamped() {
        let backend = FfmpegVideoBackend::new("public").with_max_decode_edge(0);
        assert_eq!(backend.max_decode_edge, 1);
        assert_eq!(backend.root(), Path::new("public"));
        assert_eq!(backend.input_for("https://cdn.example/clip.mp4"), "https://cdn.example/clip.mp4");
    }

    #[test]
    fn test_timeline_position_loops_or_clamps() {
        assert!((timeline_position(12.5, 10.0, true) - 2.5).abs() < 1e-9);
        assert!((timeline_position(12.5, 10.0, false) - 10.0).abs() < 1e-9);
        assert!((timeline_position(3.0, 0.0, true) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_play_pause_and_unload() {
        let mut v = video(true, 10.0);
        assert!(v.is_paused());
        v.play().unwrap();
        assert!(!v.is_paused());
        v.pause();
        assert!(v.is_paused());
        v.unload();
        assert_eq!(v.source(), "");
        assert_eq!(v.ready_state(), ReadyState::HaveNothing);
        assert!(v.play().is_err());
    }

    #[test]
    fn test_first_frame_served_from_cache() {
        let mut v = video(true, 10.0);
        let frame = v.current_frame().unwrap();
        assert_eq!((frame.width, frame.height), (8, 8));
    }

    #[tokio::test]
    async fn test_open_missing_file_is_media_error() {
        let backend = FfmpegVideoBackend::new("/nonexistent-root");
        let err = backend
            .open("/missing.mp4", VideoOptions::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, CardError::Media { .. }));
    }
}
