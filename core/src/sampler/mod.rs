//! Sampler types.
//!
//! Provides [`Sampler`] for describing texture sampling parameters,
//! along with [`FilterMode`], [`WrapMode`], and [`CompareFunction`].

mod types;

pub use types::{CompareFunction, FilterMode, Sampler, WrapMode};
