//! Image rendering in pure Rust, with no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions`, `usvg` document size |
//! | **Rasterize SVG** | `resvg` |
//! | **Resize → encode** | Lanczos3 + per-format encoders |
//!
//! The module is split into:
//! - **Format**: [`ImageFormat`] and the config-level [`OutputFormat`]
//! - **Calculations**: Pure width policy functions (unit testable)
//! - **Parameters**: Data structures describing a render
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Parallel fan-out of planned renders

pub mod backend;
mod calculations;
pub mod format;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{WidthResolution, apply_small_source_policy, clamp_width, is_small_source};
pub use format::{ImageFormat, OutputFormat};
pub use operations::{get_dimensions, plan_render, render_all};
pub use params::{Quality, RenderParams};
pub use rust_backend::RustBackend;
