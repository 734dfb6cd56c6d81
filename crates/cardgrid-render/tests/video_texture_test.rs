mod common;

use std::sync::Arc;
use std::time::Duration;

use cardgrid_core::{CardData, CardError, CardgridConfig, Color};
use cardgrid_render::{PlaybackState, ReadyState, Texture, UpdateReport};

use common::{factory, factory_with, CountingLoader, MockVideoBackend};

fn video_card() -> CardData {
    CardData::new("Reel", &["motion"], "2024").with_video("/videos/reel.mp4")
}

fn band_center(factory: &cardgrid_render::CardTextureFactory) -> (u32, u32) {
    let (x, y) = factory.layout().media_band().center();
    (x as u32, y as u32)
}

#[tokio::test]
async fn test_video_textures_share_one_element() {
    let (factory, _, backend) = factory();
    let textures = factory.generate_card_textures(&video_card()).await.unwrap();
    assert_eq!(backend.open_calls(), 1);
    assert_eq!(factory.all_videos().len(), 1);
    assert_eq!(factory.video_registry().texture_count(), 2);
    assert!(!Texture::ptr_eq(&textures.foreground, &textures.background));

    // autoplay started the element and the first frame is composited
    let video = &factory.all_videos()[0];
    assert_eq!(video.state(), PlaybackState::Playing);
    let (x, y) = band_center(&factory);
    assert_eq!(textures.foreground.snapshot().get_pixel(x, y), Some([255, 0, 0, 255]));
}

#[tokio::test]
async fn test_repeat_request_returns_cached_video_texture() {
    let (factory, _, backend) = factory();
    let a = factory.generate_video_foreground_texture(&video_card()).await.unwrap();
    let b = factory.generate_video_foreground_texture(&video_card()).await.unwrap();
    assert!(Texture::ptr_eq(&a, &b));
    assert_eq!(backend.open_calls(), 1);
}

#[tokio::test]
async fn test_update_redraws_playing_videos() {
    let (factory, _, backend) = factory();
    let fg = factory.generate_video_foreground_texture(&video_card()).await.unwrap();
    fg.take_update();
    let before = fg.version();

    backend.state(0).lock().unwrap().color = Color::BLUE;
    let report = factory.update_all_video_textures();
    assert_eq!(report.redrawn, 1);
    assert!(fg.needs_update());
    assert!(fg.version() > before);
    let (x, y) = band_center(&factory);
    assert_eq!(fg.snapshot().get_pixel(x, y), Some([0, 0, 255, 255]));
}

#[tokio::test]
async fn test_update_resumes_paused_videos() {
    let (factory, _, backend) = factory();
    factory.generate_video_foreground_texture(&video_card()).await.unwrap();
    factory.pause_all_videos();
    let state = backend.state(0);
    assert!(state.lock().unwrap().paused);
    let plays = state.lock().unwrap().play_calls;

    let report = factory.update_all_video_textures();
    assert_eq!(report.resumed, 1);
    assert_eq!(report.redrawn, 0);
    assert_eq!(state.lock().unwrap().play_calls, plays + 1);
    assert!(!state.lock().unwrap().paused);
}

#[tokio::test]
async fn test_update_skips_draw_without_current_data() {
    let (factory, _, backend) = factory();
    let fg = factory.generate_video_foreground_texture(&video_card()).await.unwrap();
    let bg = factory.generate_video_background_texture(&video_card()).await.unwrap();
    let state = backend.state(0);
    {
        let mut s = state.lock().unwrap();
        s.ready = ReadyState::HaveMetadata;
        s.frame_calls = 0;
    }
    let (fg_version, bg_version) = (fg.version(), bg.version());
    let fg_before = fg.snapshot();

    factory.update_all_video_textures();
    assert_eq!(state.lock().unwrap().frame_calls, 0);
    assert_eq!(fg.version(), fg_version);
    assert_eq!(bg.version(), bg_version);
    assert_eq!(fg.snapshot(), fg_before);
}

#[tokio::test]
async fn test_autoplay_rejection_is_tolerated() {
    let loader = Arc::new(CountingLoader::default());
    let backend = Arc::new(MockVideoBackend::rejecting_autoplay());
    let factory = factory_with(CardgridConfig::default(), loader, backend.clone());

    let fg = factory.generate_video_foreground_texture(&video_card()).await.unwrap();
    assert_eq!(fg.dimensions(), (512, 512));
    let video = factory.all_videos()[0].clone();
    assert_eq!(video.state(), PlaybackState::Paused);

    // every tick and start-all retries
    let report = factory.update_all_video_textures();
    assert_eq!(report.resumed, 0);
    assert_eq!(factory.start_all_videos(), 0);
    assert_eq!(factory.resume_all_videos(), 0);
    assert_eq!(backend.state(0).lock().unwrap().play_calls, 4);

    backend.state(0).lock().unwrap().reject_play = false;
    assert_eq!(factory.start_all_videos(), 1);
    assert_eq!(video.state(), PlaybackState::Playing);
}

#[tokio::test]
async fn test_video_load_failure_rejects() {
    let (factory, _, backend) = factory();
    backend.fail("/videos/broken.mp4");
    let card = CardData::new("Broken", &[], "").with_video("/videos/broken.mp4");
    let err = factory.generate_video_foreground_texture(&card).await.unwrap_err();
    assert!(matches!(err, CardError::Media { ref source_url, .. } if source_url == "/videos/broken.mp4"));
    assert_eq!(factory.video_registry().texture_count(), 0);
    assert!(factory.all_videos().is_empty());
}

#[tokio::test]
async fn test_video_generators_require_video() {
    let (factory, _, _) = factory();
    let card = CardData::new("Still", &[], "");
    let err = factory.generate_video_foreground_texture(&card).await.unwrap_err();
    assert!(matches!(err, CardError::MissingField("video")));
    let err = factory.generate_video_background_texture(&card).await.unwrap_err();
    assert!(matches!(err, CardError::MissingField("video")));
}

#[tokio::test]
async fn test_dispose_clears_everything() {
    let (factory, _, backend) = factory();
    let textures = factory.generate_card_textures(&video_card()).await.unwrap();
    factory.generate_foreground_texture(&CardData::new("Still", &[], "")).await.unwrap();
    let videos = factory.all_videos();
    assert_eq!(videos.len(), 1);

    factory.dispose_video_resources();
    factory.dispose_video_resources();

    for video in &videos {
        assert_eq!(video.source(), "");
        assert_eq!(video.state(), PlaybackState::Disposed);
        assert!(!video.is_attached());
    }
    assert_eq!(backend.state(0).lock().unwrap().url, "");
    assert!(factory.all_videos().is_empty());
    assert_eq!(factory.video_registry().video_count(), 0);
    assert_eq!(factory.video_registry().texture_count(), 0);
    assert!(factory.texture_cache().is_empty());

    let version = textures.foreground.version();
    assert_eq!(factory.update_all_video_textures(), UpdateReport::default());
    assert_eq!(textures.foreground.version(), version);
}

#[tokio::test]
async fn test_direct_video_texture_tracks_frames() {
    let (factory, _, backend) = factory();
    let tex = factory.register_direct_video_texture("/videos/raw.mp4").await.unwrap();
    assert_eq!(tex.dimensions(), (64, 36));

    backend.state(0).lock().unwrap().color = Color::GREEN;
    tex.take_update();
    factory.update_all_video_textures();
    assert!(tex.needs_update());
    assert_eq!(tex.snapshot().get_pixel(10, 10), Some([0, 255, 0, 255]));
}

#[tokio::test]
async fn test_debug_status_reports_elements_and_entries() {
    let (factory, _, _) = factory();
    factory.generate_card_textures(&video_card()).await.unwrap();
    let report = factory.debug_video_status();
    assert_eq!(report.videos.len(), 1);
    assert_eq!(report.videos[0].url, "/videos/reel.mp4");
    assert!(report.videos[0].looping && report.videos[0].muted && report.videos[0].autoplay);
    assert_eq!(report.textures.len(), 2);
    assert!(report.textures.iter().all(|t| t.has_draw_frame));
    assert!(report.textures[0].key.starts_with("video-bg-"));
    assert!(report.textures[1].key.starts_with("video-fg-"));
}

#[tokio::test]
async fn test_still_entry_points_route_video_cards() {
    let (factory, loader, backend) = factory();
    let fg = factory.generate_foreground_texture(&video_card()).await.unwrap();
    let bg = factory.generate_background_texture(&video_card()).await.unwrap();
    assert_eq!(backend.open_calls(), 1);
    assert_eq!(loader.calls(), 0);

    let (x, y) = band_center(&factory);
    assert_eq!(fg.snapshot().get_pixel(x, y), Some([255, 0, 0, 255]));
    let video_fg = factory.generate_video_foreground_texture(&video_card()).await.unwrap();
    let video_bg = factory.generate_video_background_texture(&video_card()).await.unwrap();
    assert!(Texture::ptr_eq(&fg, &video_fg));
    assert!(Texture::ptr_eq(&bg, &video_bg));
}

#[tokio::test]
async fn test_video_loading_during_dispose_is_still_released() {
    let (factory, _, backend) = factory();
    let factory = Arc::new(factory);
    let pending = {
        let factory = factory.clone();
        tokio::spawn(async move { factory.generate_video_foreground_texture(&video_card()).await })
    };
    // the mock open takes 5ms
    tokio::time::sleep(Duration::from_millis(1)).await;
    factory.dispose_video_resources();
    pending.await.unwrap().unwrap();

    let videos = factory.all_videos();
    assert_eq!(videos.len(), 1);
    factory.dispose_video_resources();
    assert!(factory.all_videos().is_empty());
    assert_eq!(videos[0].state(), PlaybackState::Disposed);
    let state = backend.state(0);
    assert_eq!(state.lock().unwrap().url, "");
    assert!(state.lock().unwrap().paused);
}

#[tokio::test]
async fn test_update_reports_failures_and_skips_disposed_elements() {
    let (factory, _, backend) = factory();
    let cards = [
        CardData::new("Broken", &[], "").with_video("/videos/a.mp4"),
        CardData::new("Fine", &[], "").with_video("/videos/b.mp4"),
        CardData::new("Gone", &[], "").with_video("/videos/c.mp4"),
    ];
    let mut textures = Vec::new();
    for card in &cards {
        textures.push(factory.generate_video_foreground_texture(card).await.unwrap());
    }
    backend.state(0).lock().unwrap().fail_frames = true;
    backend.state(1).lock().unwrap().color = Color::BLUE;
    let gone = factory
        .all_videos()
        .into_iter()
        .find(|v| v.url() == "/videos/c.mp4")
        .unwrap();
    gone.dispose();
    let gone_version = textures[2].version();

    let report = factory.update_all_video_textures();
    assert_eq!(report.failed, 1);
    assert_eq!(report.redrawn, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.resumed, 0);

    let (x, y) = band_center(&factory);
    assert_eq!(textures[1].snapshot().get_pixel(x, y), Some([0, 0, 255, 255]));
    assert_eq!(textures[2].version(), gone_version);
}
