//! # cardgrid-core
//!
//! Core types and primitives for cardgrid.
//! This crate contains the foundational types shared by the renderer and the CLI:
//! the card data record, raster buffers, colors, geometry, configuration,
//! content hashing, and error types.

pub mod card;
pub mod color;
pub mod config;
pub mod error;
pub mod frame;
pub mod hash;
pub mod math;

pub use config::*;

pub use card::{CacheKeyPolicy, CardData, TextureKind, VideoOptions};
pub use color::Color;
pub use error::{CardError, CardResult};
pub use frame::FrameBuffer;
pub use math::Rect;
