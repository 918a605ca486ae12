//! Responsive image variant resolution.
//!
//! Given a source image and the site's variant configuration, the resolver
//! decides which `(width, format, naming)` variants to generate and where
//! each one lives. It never touches pixels: the process stage hands the
//! resulting [`GeneratedImageSpec`]s to an
//! [`ImageBackend`](crate::imaging::ImageBackend).
//!
//! ## Variant set
//!
//! For every post image the resolver produces, in order:
//!
//! 1. **Responsive variants**: each configured width (after the small-source
//!    policy) in each configured output format, full naming.
//! 2. **Full-fidelity variant**: the natural width in the source's own
//!    format (rasterized for SVG), full naming. This doubles as the fallback
//!    served to browsers without support for the advanced formats.
//! 3. **Cover variant** (only with `cover_responsive`): 800px wide, short
//!    naming, rasterized for SVG sources.
//!
//! ## Naming
//!
//! ```text
//! full:   {basename}-{width}-{digest}.{ext}    cover-1600-3fa01c2e.webp
//! short:  {basename}-{width}.{ext}             cover-800.jpg
//! ```
//!
//! The digest is the first 8 hex characters of SHA-256 over the source path,
//! width and format. It keeps same-basename sources from colliding in one
//! post directory and keeps full names disjoint from the short cover name.
//! Only the cover variant uses short naming.
//!
//! ## Layout
//!
//! ```text
//! generated/assets/posts/{slug}/{name}
//! ```

use crate::config::SiteConfig;
use crate::imaging::{
    ImageFormat, OutputFormat, WidthResolution, apply_small_source_policy, clamp_width,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fixed width of the cover variant.
pub const COVER_WIDTH: u32 = 800;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Cannot determine the natural width of raster image {0}")]
    MissingWidth(PathBuf),
    #[error("Unsupported image format {format} for {path}")]
    UnsupportedFormat { format: String, path: PathBuf },
}

/// An original image asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    /// Path relative to the site root.
    pub path: PathBuf,
    /// Intrinsic pixel width. Always `None` for vector sources.
    pub width: Option<u32>,
    pub format: ImageFormat,
}

impl SourceImage {
    /// Describe a source found at `path` (site-relative).
    ///
    /// The format comes from the extension. `intrinsic_width` is ignored for
    /// vector sources: an SVG's document size is not a pixel budget.
    pub fn new(path: impl Into<PathBuf>, intrinsic_width: Option<u32>) -> Result<Self, ResolveError> {
        let path = path.into();
        let format = ImageFormat::from_path(&path).ok_or_else(|| ResolveError::UnsupportedFormat {
            format: path
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_else(|| "(none)".to_string()),
            path: path.clone(),
        })?;
        if !format.is_decodable() {
            return Err(ResolveError::UnsupportedFormat {
                format: format.to_string(),
                path,
            });
        }
        let width = if format.is_vector() {
            None
        } else {
            intrinsic_width
        };
        Ok(Self {
            path,
            width,
            format,
        })
    }

    /// File stem used as the base of every generated name.
    pub fn basename(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string())
    }

    pub fn is_vector(&self) -> bool {
        self.format.is_vector()
    }
}

/// Which filename convention a spec uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingMode {
    Full,
    Short,
}

/// A derived image to generate.
///
/// Equal specs always produce equal names and paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeneratedImageSpec {
    /// Source path relative to the site root.
    pub source: PathBuf,
    pub basename: String,
    pub width: u32,
    pub format: ImageFormat,
    pub naming: NamingMode,
}

/// Emitted when a requested width was clamped to the source width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Degradation {
    /// Widest width that was asked for.
    pub requested: u32,
    /// Source width it was clamped to.
    pub intrinsic: u32,
}

/// Everything the resolver decided for one page image.
#[derive(Debug, Clone)]
pub struct VariantPlan {
    /// All specs to render, in order, without duplicates.
    pub targets: Vec<GeneratedImageSpec>,
    /// The fallback spec (also present in `targets`).
    pub fallback: GeneratedImageSpec,
    /// The cover spec when requested (also present in `targets`).
    pub cover: Option<GeneratedImageSpec>,
    /// Set when the small-source policy fired.
    pub degraded: Option<Degradation>,
}

/// Decides variant sets and their deterministic names and paths.
#[derive(Debug, Clone)]
pub struct VariantResolver {
    widths: Vec<u32>,
    formats: Vec<OutputFormat>,
    vector_width: u32,
    generated_dir: String,
}

impl VariantResolver {
    pub fn new(
        widths: Vec<u32>,
        formats: Vec<OutputFormat>,
        vector_width: u32,
        generated_dir: impl Into<String>,
    ) -> Self {
        Self {
            widths,
            formats,
            vector_width,
            generated_dir: generated_dir.into().trim_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &SiteConfig) -> Self {
        Self::new(
            config.images.widths.clone(),
            config.images.formats.clone(),
            config.images.vector_width,
            config.output.generated_dir.clone(),
        )
    }

    /// Configured responsive widths.
    pub fn widths(&self) -> &[u32] {
        &self.widths
    }

    /// Effective width for a request against `source`.
    ///
    /// - unset: the natural width (intrinsic for raster, `vector_width` for SVG)
    /// - set and within the source: unchanged
    /// - set and wider than a raster source: clamped, `degraded` set
    pub fn resolve_width(
        &self,
        requested: Option<u32>,
        source: &SourceImage,
    ) -> Result<WidthResolution, ResolveError> {
        if source.is_vector() {
            return Ok(WidthResolution {
                width: requested.unwrap_or(self.vector_width),
                degraded: false,
            });
        }
        let intrinsic = source
            .width
            .ok_or_else(|| ResolveError::MissingWidth(source.path.clone()))?;
        Ok(clamp_width(requested, intrinsic))
    }

    /// Build the ordered, deduplicated spec list for `source`.
    ///
    /// Always contains the full-fidelity variant; contains the cover variant
    /// when `cover_requested`. Never empty.
    pub fn build_targets(
        &self,
        base_targets: &[u32],
        cover_requested: bool,
        source: &SourceImage,
    ) -> Result<Vec<GeneratedImageSpec>, ResolveError> {
        let natural = self.resolve_width(None, source)?.width;
        let widths = if source.is_vector() {
            base_targets.to_vec()
        } else {
            apply_small_source_policy(base_targets, natural)
        };

        let mut targets: Vec<GeneratedImageSpec> = Vec::new();
        let mut push = |spec: GeneratedImageSpec| {
            if !targets.contains(&spec) {
                targets.push(spec);
            }
        };

        for &width in &widths {
            for output in &self.formats {
                let format = self.output_format(*output, source)?;
                push(self.spec(source, width, format, NamingMode::Full));
            }
        }

        push(self.fallback_target(source)?);

        if cover_requested {
            push(self.cover_target(source)?);
        }

        Ok(targets)
    }

    /// The fallback image: natural width, source format (PNG for SVG).
    pub fn fallback_target(&self, source: &SourceImage) -> Result<GeneratedImageSpec, ResolveError> {
        let natural = self.resolve_width(None, source)?.width;
        Ok(self.spec(
            source,
            natural,
            source.format.rasterized(),
            NamingMode::Full,
        ))
    }

    /// The 800px cover variant, short-named.
    ///
    /// Raster sources narrower than 800px get a cover at their own width.
    pub fn cover_target(&self, source: &SourceImage) -> Result<GeneratedImageSpec, ResolveError> {
        let width = self.resolve_width(Some(COVER_WIDTH), source)?.width;
        Ok(self.spec(
            source,
            width,
            source.format.rasterized(),
            NamingMode::Short,
        ))
    }

    /// Resolve everything for one page image.
    pub fn plan(
        &self,
        source: &SourceImage,
        cover_requested: bool,
    ) -> Result<VariantPlan, ResolveError> {
        let targets = self.build_targets(&self.widths, cover_requested, source)?;
        let fallback = self.fallback_target(source)?;
        let cover = if cover_requested {
            Some(self.cover_target(source)?)
        } else {
            None
        };

        let degraded = match source.width {
            Some(intrinsic) if !source.is_vector() => {
                let widest = self
                    .widths
                    .iter()
                    .copied()
                    .chain(cover_requested.then_some(COVER_WIDTH))
                    .max()
                    .unwrap_or(0);
                (widest > intrinsic).then_some(Degradation {
                    requested: widest,
                    intrinsic,
                })
            }
            _ => None,
        };

        Ok(VariantPlan {
            targets,
            fallback,
            cover,
            degraded,
        })
    }

    /// Path of a spec relative to the generated directory.
    pub fn asset_path(&self, spec: &GeneratedImageSpec, slug: &str) -> PathBuf {
        Path::new("assets/posts").join(slug).join(compute_name(spec))
    }

    /// Site-relative output path of a spec.
    pub fn output_path(&self, spec: &GeneratedImageSpec, slug: &str) -> PathBuf {
        Path::new(&self.generated_dir).join(self.asset_path(spec, slug))
    }

    /// Public URL of a spec, rooted at `/`.
    pub fn public_url(&self, spec: &GeneratedImageSpec, slug: &str) -> String {
        format!(
            "/{}/assets/posts/{}/{}",
            self.generated_dir,
            slug,
            compute_name(spec)
        )
    }

    fn output_format(
        &self,
        output: OutputFormat,
        source: &SourceImage,
    ) -> Result<ImageFormat, ResolveError> {
        let format = output.resolve(source.format);
        if !format.is_encodable() {
            return Err(ResolveError::UnsupportedFormat {
                format: format.to_string(),
                path: source.path.clone(),
            });
        }
        Ok(format)
    }

    fn spec(
        &self,
        source: &SourceImage,
        width: u32,
        format: ImageFormat,
        naming: NamingMode,
    ) -> GeneratedImageSpec {
        GeneratedImageSpec {
            source: source.path.clone(),
            basename: source.basename(),
            width,
            format,
            naming,
        }
    }
}

/// Deterministic file name of a spec.
pub fn compute_name(spec: &GeneratedImageSpec) -> String {
    match spec.naming {
        NamingMode::Short => format!(
            "{}-{}.{}",
            spec.basename,
            spec.width,
            spec.format.extension()
        ),
        NamingMode::Full => format!(
            "{}-{}-{}.{}",
            spec.basename,
            spec.width,
            name_digest(spec),
            spec.format.extension()
        ),
    }
}

/// First 8 hex characters of SHA-256 over (source path, width, format).
fn name_digest(spec: &GeneratedImageSpec) -> String {
    let source = spec.source.to_string_lossy().replace('\\', "/");
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"\0");
    hasher.update(spec.width.to_le_bytes());
    hasher.update(spec.format.extension().as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..8].to_string()
}
