//! # dEQP Reference
//!
//! Reference rendering and verification for conformance tests: what a
//! correct implementation should have drawn, and whether a rendered image
//! or a buffer read-back is close enough to it.
//!
//! ## Overview
//!
//! - [`interpolate`]: barycentric and perspective-correct interpolation over
//!   the two triangles of a quad
//! - [`lod`]: level-of-detail estimation from texture coordinate derivatives
//! - [`sampling`]: sampler-type dispatch on top of the core texture views
//! - [`render`]: per-pixel reference rendering of a textured quad
//! - [`compare`]: tolerance-based image comparison with error masks
//! - [`buffer`]: buffer write pathways, read-back verifiers and the byte
//!   comparison they share
//! - [`backend`]: the [`RenderContext`](backend::RenderContext) seam and its
//!   software implementation
//! - [`test_case`]: the init / iterate / deinit lifecycle
//!
//! ## Example
//!
//! ```
//! use deqp_core::texture::{Texture2D, TextureFormat};
//! use deqp_core::surface::Surface;
//! use deqp_reference::interpolate::compute_quad_tex_coord_2d;
//! use deqp_reference::params::{ReferenceParams, TextureType};
//! use deqp_reference::render::{render_reference, SurfaceAccess, TextureBinding};
//!
//! let texture = Texture2D::new(TextureFormat::RGBA8, 2, 2).unwrap();
//! let mut dst = Surface::new(2, 2).unwrap();
//! let coords = compute_quad_tex_coord_2d([0.0, 0.0], [1.0, 1.0]);
//! render_reference(
//!     &mut SurfaceAccess::full(&mut dst),
//!     &TextureBinding::Texture2D(texture.view()),
//!     &coords,
//!     &ReferenceParams::new(TextureType::Texture2D),
//! )
//! .unwrap();
//! ```

pub mod backend;
pub mod buffer;
pub mod compare;
pub mod error;
pub mod interpolate;
pub mod lod;
pub mod params;
pub mod raster;
pub mod render;
pub mod sampling;
pub mod test_case;

pub use backend::{RenderContext, SoftwareContext};
pub use error::{Error, ErrorKind, Result};
pub use lod::LodMode;
pub use params::{ReferenceParams, RenderParams, TextureType};
pub use test_case::{run_test_case, IterateResult, TestCase, TestStatus};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version.
pub fn init() {
    log::info!("dEQP Reference v{} initialized", VERSION);
}
