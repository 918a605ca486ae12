//! Parameter types for image operations.
//!
//! These structs describe *what* to render, not *how*. They are the interface
//! between the [`operations`](super::operations) module (which turns resolved
//! variant specs into render calls) and the [`backend`](super::backend)
//! (which does the pixel work), so a mock backend can stand in during tests.

use super::format::ImageFormat;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Parameters for a single render: decode `source`, resize to `width`
/// (the backend derives height from the aspect ratio), encode as `format`
/// into `output`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub format: ImageFormat,
    pub quality: Quality,
}
