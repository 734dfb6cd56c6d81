mod common;

use std::sync::Arc;

use cardgrid_core::{CacheKeyPolicy, CardData, CardgridConfig};
use cardgrid_render::compositor::average_color;
use cardgrid_render::Texture;

use common::{factory, factory_with, CountingLoader, MockVideoBackend};

fn card() -> CardData {
    CardData::new("Amazing Project", &["web", "ogl"], "2024").with_image("/images/project.jpg")
}

#[tokio::test]
async fn test_long_title_stays_inside_padding() {
    let (factory, _, _) = factory();
    let long = CardData::new("A".repeat(120), &[], "");
    let tex = factory.generate_foreground_texture(&long).await.unwrap();
    let image = tex.snapshot();
    // title row: nothing between the right padding edge and the border
    for y in 31..60 {
        for x in 483..510 {
            assert_eq!(image.get_pixel(x, y).unwrap()[3], 0, "pixel at {},{}", x, y);
        }
    }
    assert!(image.get_pixel(40, 40).unwrap()[3] > 0);
}

#[tokio::test]
async fn test_failed_image_still_produces_texture() {
    let (factory, loader, _) = factory();
    loader.fail("/broken.png");
    let card = CardData::new("Broken", &["x"], "2023").with_image("/broken.png");
    let tex = factory.generate_foreground_texture(&card).await.unwrap();
    assert_eq!(tex.dimensions(), (512, 512));
    // "Image Error" label in gray around the error anchor
    let image = tex.snapshot();
    let (x, y) = factory.layout().error_anchor();
    assert_eq!(image.get_pixel(x as u32 - 20, y as u32), Some([128, 128, 128, 255]));

    let bg = factory.generate_background_texture(&card).await.unwrap();
    assert_eq!(bg.snapshot().get_pixel(100, 100), Some([0, 0, 0, 128]));
}

#[tokio::test]
async fn test_identical_requests_hit_the_cache() {
    let (factory, loader, _) = factory();
    let first = factory.generate_foreground_texture(&card()).await.unwrap();
    let second = factory.generate_foreground_texture(&card()).await.unwrap();
    assert!(Texture::ptr_eq(&first, &second));
    assert_eq!(loader.calls(), 1);
    assert_eq!(factory.texture_cache().len(), 1);
}

#[tokio::test]
async fn test_foreground_and_background_share_one_decode() {
    let (factory, loader, _) = factory();
    let textures = factory.generate_card_textures(&card()).await.unwrap();
    assert!(!Texture::ptr_eq(&textures.foreground, &textures.background));
    assert_eq!(loader.calls(), 1);
    assert_eq!(factory.texture_cache().len(), 2);
}

#[tokio::test]
async fn test_concurrent_requests_draw_once() {
    let (factory, loader, _) = factory();
    let factory = Arc::new(factory);
    let mut handles = Vec::new();
    for _ in 0..6 {
        let factory = factory.clone();
        handles.push(tokio::spawn(async move { factory.generate_card_textures(&card()).await }));
    }
    let mut foregrounds = Vec::new();
    for handle in handles {
        foregrounds.push(handle.await.unwrap().unwrap().foreground);
    }
    assert!(foregrounds.windows(2).all(|w| Texture::ptr_eq(&w[0], &w[1])));
    assert_eq!(loader.calls(), 1);
}

/// Known limitation of the legacy key: it ignores the image, so a second card
/// with the same title and tags gets the first card's texture.
#[tokio::test]
async fn test_title_and_tags_policy_collides_on_different_image() {
    let mut config = CardgridConfig::default();
    config.cache.key_policy = CacheKeyPolicy::TitleAndTags;
    let loader = Arc::new(CountingLoader::default());
    let factory = factory_with(config, loader.clone(), Arc::new(MockVideoBackend::default()));

    let a = card().with_image("/green.png");
    let b = card().with_image("/blue.png");
    let ta = factory.generate_foreground_texture(&a).await.unwrap();
    let tb = factory.generate_foreground_texture(&b).await.unwrap();
    assert!(Texture::ptr_eq(&ta, &tb));
    assert_eq!(loader.calls(), 1);
}

#[tokio::test]
async fn test_content_policy_separates_different_images() {
    let (factory, loader, _) = factory();
    let a = card().with_image("/green.png");
    let b = card().with_image("/blue.png");
    let ta = factory.generate_foreground_texture(&a).await.unwrap();
    let tb = factory.generate_foreground_texture(&b).await.unwrap();
    assert!(!Texture::ptr_eq(&ta, &tb));
    assert_eq!(loader.calls(), 2);
    let (cx, cy) = factory.layout().media_band().center();
    assert_eq!(tb.snapshot().get_pixel(cx as u32, cy as u32), Some([0, 0, 255, 255]));

    let dated = card().with_image("/green.png");
    let mut later = dated.clone();
    later.date = "2025".into();
    let t1 = factory.generate_foreground_texture(&dated).await.unwrap();
    let t2 = factory.generate_foreground_texture(&later).await.unwrap();
    assert!(!Texture::ptr_eq(&t1, &t2));
}

#[tokio::test]
async fn test_tags_are_laid_out_left_to_right() {
    let (factory, _, _) = factory();
    let tags = vec!["web".to_string(), "ogl".to_string()];
    let pills = factory.layout().tag_pills(&tags, factory.typeface());
    assert_eq!(pills[0].label, "#WEB");
    assert_eq!(pills[1].label, "#OGL");
    assert!(pills[1].rect.x >= pills[0].rect.right());

    let tex = factory.generate_foreground_texture(&card()).await.unwrap();
    let image = tex.snapshot();
    for pill in &pills {
        // left end cap, inside the pill but clear of the label
        let x = pill.rect.x as u32 + 3;
        let y = pill.rect.center().1 as u32;
        assert!(image.get_pixel(x, y).unwrap()[3] > 0);
    }
}

#[tokio::test]
async fn test_missing_image_uses_placeholder() {
    let (factory, loader, _) = factory();
    loader.fail("/photo.png");
    let plain = CardData::new("No image", &[], "");
    factory.generate_foreground_texture(&plain).await.unwrap();
    assert_eq!(loader.calls(), 1);
}

#[tokio::test]
async fn test_background_is_blurred_and_darkened() {
    let (factory, _, _) = factory();
    let bg = factory.generate_background_texture(&card()).await.unwrap();
    let image = bg.snapshot();
    // green source at 2x under a 40% black wash
    let [r, g, b, a] = image.get_pixel(256, 256).unwrap();
    assert_eq!((r, b, a), (0, 0, 255));
    assert!((150..=156).contains(&g), "center green {}", g);
    // corners only carry the wash
    assert_eq!(image.get_pixel(0, 0), Some([0, 0, 0, 102]));
    assert!(average_color(&image).a < 1.0);
}

#[tokio::test]
async fn test_dispose_clears_still_textures() {
    let (factory, loader, _) = factory();
    let first = factory.generate_foreground_texture(&card()).await.unwrap();
    factory.dispose_video_resources();
    assert!(factory.texture_cache().is_empty());
    assert!(factory.image_store().is_empty());
    let second = factory.generate_foreground_texture(&card()).await.unwrap();
    assert!(!Texture::ptr_eq(&first, &second));
    assert_eq!(loader.calls(), 2);
}
