//! Shared fixtures for the reference integration tests.

#![allow(dead_code)]

use deqp_core::math::Vec4;
use deqp_core::texture::{Texture2D, TextureFormat};
use deqp_reference::buffer::fill_with_random_bytes;
use deqp_reference::SoftwareContext;

pub fn white() -> Vec4 {
    Vec4::new(1.0, 1.0, 1.0, 1.0)
}

pub fn black() -> Vec4 {
    Vec4::new(0.0, 0.0, 0.0, 1.0)
}

/// Install `env_logger` once per test binary. `RUST_LOG` controls the level.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// RGBA8 texture with a one-texel checkerboard on every level, white at
/// the origin.
pub fn checkerboard_texture(size: u32) -> Texture2D {
    let mut texture = Texture2D::new(TextureFormat::RGBA8, size, size).expect("texture");
    for level in 0..texture.num_levels() {
        texture
            .level_mut(level)
            .expect("level")
            .fill_with(|x, y, _| if (x + y) % 2 == 0 { white() } else { black() });
    }
    texture
}

/// RGBA8 texture whose base level encodes texel coordinates in red and green.
pub fn gradient_texture(size: u32) -> Texture2D {
    let mut texture = Texture2D::new(TextureFormat::RGBA8, size, size).expect("texture");
    let scale = 1.0 / size as f32;
    texture
        .level_mut(0)
        .expect("level")
        .fill_with(|x, y, _| Vec4::new(x as f32 * scale, y as f32 * scale, 0.0, 1.0));
    texture
}

pub fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    fill_with_random_bytes(&mut bytes, seed);
    bytes
}

pub fn software_context(width: u32, height: u32) -> SoftwareContext {
    init_logging();
    SoftwareContext::new(width, height).expect("software context")
}
