//! Image rendering backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the process stage
//! needs: identify (intrinsic dimensions of a raster source) and render
//! (resize + encode one variant).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate with `resvg` for vector sources.

use super::params::RenderParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image rendering backends.
///
/// `Sync` so renders of independent variants can run on the rayon pool.
pub trait ImageBackend: Sync {
    /// Get the pixel dimensions of a raster image.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Render one variant.
    fn render(&self, params: &RenderParams) -> Result<(), BackendError>;
}
