/// Core error types for card texture production.
use std::path::PathBuf;

/// A specialized Result type for cardgrid operations.
pub type CardResult<T> = Result<T, CardError>;

/// Top-level error type encompassing every cardgrid subsystem.
#[derive(Debug, thiserror::Error)]
pub enum CardError {
    /// An image or video could not be loaded or decoded.
    #[error("media error: {message} ({source_url})")]
    Media { message: String, source_url: String },

    /// A field the requested operation depends on is absent from the card.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Playback could not be started (autoplay policy, decoder failure).
    #[error("playback error: {0}")]
    Playback(String),

    /// A raster surface could not be created.
    #[error("surface error: {0}")]
    Surface(String),

    #[error("font error: {message} ({path:?})")]
    Font { message: String, path: PathBuf },

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl CardError {
    /// Create a media error for the given source.
    pub fn media(message: impl Into<String>, source_url: impl Into<String>) -> Self {
        CardError::Media {
            message: message.into(),
            source_url: source_url.into(),
        }
    }

    /// Create a font error.
    pub fn font(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        CardError::Font {
            message: message.into(),
            path: path.into(),
        }
    }

    pub fn surface(message: impl Into<String>) -> Self {
        CardError::Surface(message.into())
    }
}
