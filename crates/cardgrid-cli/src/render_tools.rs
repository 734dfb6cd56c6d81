use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use cardgrid_core::{CardData, CardgridConfig, FrameBuffer};
use cardgrid_render::CardTextureFactory;
use image::{ImageBuffer, Rgba};
use serde::Deserialize;

/// A deck file is either a bare array of cards or `{ "cards": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum DeckFile {
    Cards(Vec<CardData>),
    Wrapped { cards: Vec<CardData> },
}

pub(crate) fn parse_deck(contents: &str) -> Result<Vec<CardData>> {
    let deck: DeckFile = serde_json::from_str(contents).context("invalid card deck JSON")?;
    Ok(match deck {
        DeckFile::Cards(cards) => cards,
        DeckFile::Wrapped { cards } => cards,
    })
}

/// Lowercase ASCII slug of a card title, `card` when nothing survives.
pub(crate) fn slug(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "card".to_string()
    } else {
        trimmed.chars().take(48).collect::<String>().trim_end_matches('-').to_string()
    }
}

pub(crate) fn output_stem(index: usize, card: &CardData) -> String {
    format!("{:02}-{}", index + 1, slug(&card.title))
}

pub(crate) fn save_frame_as_png(frame: &FrameBuffer, path: &Path) -> Result<()> {
    let img = ImageBuffer::<Rgba<u8>, _>::from_raw(frame.width, frame.height, frame.data.clone())
        .ok_or_else(|| anyhow::anyhow!("Failed to convert frame to image buffer (size mismatch)"))?;
    img.save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Render every card of the deck to `<stem>-fg.png` / `<stem>-bg.png`.
pub(crate) async fn render_deck(config: CardgridConfig, deck: &Path, output: &Path) -> Result<Vec<PathBuf>> {
    let contents = std::fs::read_to_string(deck)
        .with_context(|| format!("failed to read card deck: {}", deck.display()))?;
    let cards = parse_deck(&contents)?;
    if cards.is_empty() {
        anyhow::bail!("Card deck '{}' contains no cards", deck.display());
    }
    std::fs::create_dir_all(output)
        .with_context(|| format!("failed to create output directory: {}", output.display()))?;

    let factory = CardTextureFactory::new(config).context("failed to create card texture factory")?;
    let start = Instant::now();

    let rendered = futures::future::try_join_all(cards.iter().enumerate().map(|(i, card)| {
        let factory = &factory;
        async move {
            let textures = factory
                .generate_card_textures(card)
                .await
                .with_context(|| format!("failed to render card '{}'", card.title))?;
            Ok::<_, anyhow::Error>((i, card, textures))
        }
    }))
    .await;
    let rendered = match rendered {
        Ok(rendered) => rendered,
        Err(e) => {
            factory.dispose_video_resources();
            return Err(e);
        }
    };

    let mut written = Vec::with_capacity(rendered.len() * 2);
    for (i, card, textures) in rendered {
        let stem = output_stem(i, card);
        for (suffix, texture) in [("fg", &textures.foreground), ("bg", &textures.background)] {
            let path = output.join(format!("{}-{}.png", stem, suffix));
            save_frame_as_png(&texture.snapshot(), &path)?;
            tracing::debug!("Wrote {}", path.display());
            written.push(path);
        }
    }

    factory.dispose_video_resources();
    tracing::info!(
        "Rendered {} cards in {:.2}s",
        cards.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(written)
}
