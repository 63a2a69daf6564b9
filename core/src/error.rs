//! Core error types.

use thiserror::Error;

use crate::texture::TextureFormat;

/// Errors raised while constructing or accessing texture data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("invalid dimensions {width}x{height}x{depth}")]
    InvalidDimensions {
        width: u32,
        height: u32,
        depth: u32,
    },
    #[error("data size mismatch: expected {expected} bytes, got {actual}")]
    DataSizeMismatch { expected: usize, actual: usize },
    #[error("level {level} out of range (texture has {count} levels)")]
    LevelOutOfRange { level: usize, count: usize },
    #[error("format {format:?} is not supported by {operation}")]
    UnsupportedFormat {
        format: TextureFormat,
        operation: &'static str,
    },
}

pub type CoreResult<T> = Result<T, CoreError>;
