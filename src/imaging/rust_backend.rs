//! Pure Rust rendering backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP, GIF) | `image` crate (pure Rust decoders) |
//! | Decode (SVG) | `resvg` / `usvg` rasterized straight at the target width |
//! | Resize | `image::DynamicImage::resize` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` with quality |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless) |
//! | Encode → PNG, GIF | `image::DynamicImage::save_with_format` |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::format::ImageFormat;
use super::params::RenderParams;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, RgbaImage};
use resvg::{tiny_skia, usvg};
use std::io::BufWriter;
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn is_svg(path: &Path) -> bool {
    ImageFormat::from_path(path).is_some_and(ImageFormat::is_vector)
}

/// Load and decode a raster image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

fn load_svg_tree(path: &Path) -> Result<usvg::Tree, BackendError> {
    let data = std::fs::read(path).map_err(BackendError::Io)?;
    usvg::Tree::from_data(&data, &usvg::Options::default()).map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to parse SVG {}: {}", path.display(), e))
    })
}

/// Rasterize an SVG at `width` pixels, height following the document aspect.
fn rasterize_svg(path: &Path, width: u32) -> Result<DynamicImage, BackendError> {
    let tree = load_svg_tree(path)?;
    let size = tree.size();
    if size.width() <= 0.0 || size.height() <= 0.0 {
        return Err(BackendError::ProcessingFailed(format!(
            "SVG has an empty canvas: {}",
            path.display()
        )));
    }

    let scale = width as f32 / size.width();
    let height = ((size.height() * scale).round() as u32).max(1);
    let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
        BackendError::ProcessingFailed(format!("Cannot allocate {width}x{height} canvas"))
    })?;
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    // tiny-skia stores premultiplied alpha
    let rgba: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();
    let buffer = RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
        BackendError::ProcessingFailed("Rasterized buffer size mismatch".to_string())
    })?;
    Ok(DynamicImage::ImageRgba8(buffer))
}

/// Encode `img` as `format` into `path`.
fn save_image(
    img: &DynamicImage,
    path: &Path,
    format: ImageFormat,
    quality: u32,
) -> Result<(), BackendError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let encode_err =
        |e: image::ImageError| BackendError::ProcessingFailed(format!("{format} encode failed: {e}"));

    match format {
        ImageFormat::Jpeg => {
            let writer = BufWriter::new(std::fs::File::create(path)?);
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(writer, quality as u8);
            // JPEG has no alpha channel
            DynamicImage::ImageRgb8(img.to_rgb8())
                .write_with_encoder(encoder)
                .map_err(encode_err)
        }
        ImageFormat::Avif => {
            let writer = BufWriter::new(std::fs::File::create(path)?);
            let encoder =
                image::codecs::avif::AvifEncoder::new_with_speed_quality(writer, 6, quality as u8);
            img.write_with_encoder(encoder).map_err(encode_err)
        }
        ImageFormat::Webp => {
            let writer = BufWriter::new(std::fs::File::create(path)?);
            let encoder = image::codecs::webp::WebPEncoder::new_lossless(writer);
            DynamicImage::ImageRgba8(img.to_rgba8())
                .write_with_encoder(encoder)
                .map_err(encode_err)
        }
        ImageFormat::Png => img
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(encode_err),
        ImageFormat::Gif => DynamicImage::ImageRgba8(img.to_rgba8())
            .save_with_format(path, image::ImageFormat::Gif)
            .map_err(encode_err),
        ImageFormat::Svg => Err(BackendError::ProcessingFailed(format!(
            "Unsupported output format: {format}"
        ))),
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        if is_svg(path) {
            let size = load_svg_tree(path)?.size();
            return Ok(Dimensions {
                width: size.width().round() as u32,
                height: size.height().round() as u32,
            });
        }
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn render(&self, params: &RenderParams) -> Result<(), BackendError> {
        let resized = if is_svg(&params.source) {
            rasterize_svg(&params.source, params.width)?
        } else {
            let img = load_image(&params.source)?;
            if img.width() == params.width {
                img
            } else {
                img.resize(params.width, u32::MAX, FilterType::Lanczos3)
            }
        };
        save_image(
            &resized,
            &params.output,
            params.format,
            params.quality.value(),
        )
    }
}
