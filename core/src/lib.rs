//! # dEQP Core
//!
//! Data model for the reference rasterizer: texture formats and levels,
//! mipmapped textures, sampler state, texel sampling and 8-bit surfaces.
//!
//! ## Overview
//!
//! - [`texture`]: [`TextureFormat`](texture::TextureFormat),
//!   [`TextureLevel`](texture::TextureLevel), 2D / cube / 2D array / 3D
//!   textures and their views
//! - [`sampler`]: [`Sampler`](sampler::Sampler) with wrap, filter and
//!   compare state
//! - [`surface`]: [`Surface`](surface::Surface), the RGBA8 image buffer
//! - [`access`]: [`PixelSource`](access::PixelSource), read access shared
//!   by levels and surfaces
//! - [`math`]: vector aliases and scalar helpers

pub mod access;
pub mod error;
pub mod math;
pub mod sampler;
pub mod surface;
pub mod texture;

pub use error::{CoreError, CoreResult};

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version.
pub fn init() {
    log::info!("dEQP Core v{} initialized", VERSION);
}
