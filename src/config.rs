//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. User values are
//! merged on top of the stock defaults, so a config file only needs the keys
//! it wants to change.
//!
//! ## Config File Location
//!
//! ```text
//! site/
//! ├── config.toml              # Optional, overrides stock defaults
//! ├── _posts/
//! │   └── 2024-03-01-hello.md
//! └── assets/posts/2024-03-01-hello/cover.jpg
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! posts_dir = "_posts"          # Where posts live, relative to the site root
//!
//! [images]
//! widths = [400, 800, 1600]     # Responsive widths to generate
//! formats = ["webp", "original"] # Output formats ("original" = source format)
//! quality = 85                  # Lossy encoding quality (1-100)
//! vector_width = 1200           # Natural width used for SVG sources
//!
//! [cover]
//! hide_style = "<style>...</style>"  # Prepended to posts with cover_hide
//!
//! [output]
//! generated_dir = "generated"   # Root of generated variants
//!
//! [fortune]
//! file = "assets/data/computers.txt"
//! exclude = ["NORTH AMERICAN MALES"]
//!
//! [processing]
//! max_processes = 4             # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{ImageFormat, OutputFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Posts directory, relative to the site root.
    #[serde(default = "default_posts_dir")]
    pub posts_dir: String,
    /// Responsive variant settings.
    pub images: ImagesConfig,
    /// Cover image settings.
    pub cover: CoverConfig,
    /// Output locations.
    pub output: OutputConfig,
    /// Fortune quote settings.
    pub fortune: FortuneConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

fn default_posts_dir() -> String {
    "_posts".to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            posts_dir: default_posts_dir(),
            images: ImagesConfig::default(),
            cover: CoverConfig::default(),
            output: OutputConfig::default(),
            fortune: FortuneConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images.quality == 0 || self.images.quality > 100 {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if self.images.widths.contains(&0) {
            return Err(ConfigError::Validation(
                "images.widths values must be non-zero".into(),
            ));
        }
        if self.images.vector_width == 0 {
            return Err(ConfigError::Validation(
                "images.vector_width must be non-zero".into(),
            ));
        }
        if self.images.formats.is_empty() {
            return Err(ConfigError::Validation(
                "images.formats must not be empty".into(),
            ));
        }
        if let Some(OutputFormat::Format(f)) = self
            .images
            .formats
            .iter()
            .find(|f| matches!(f, OutputFormat::Format(f) if !f.is_encodable()))
        {
            return Err(ConfigError::Validation(format!(
                "images.formats: cannot generate {f} variants"
            )));
        }
        if self.output.generated_dir.trim_matches('/').is_empty() {
            return Err(ConfigError::Validation(
                "output.generated_dir must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Responsive variant settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Pixel widths to generate for every post image.
    pub widths: Vec<u32>,
    /// Output formats; `original` keeps the source format.
    pub formats: Vec<OutputFormat>,
    /// Lossy encoding quality (1 = worst, 100 = best).
    pub quality: u32,
    /// Natural width for vector sources, which have no intrinsic pixel width.
    pub vector_width: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            widths: vec![400, 800, 1600],
            formats: vec![
                OutputFormat::Format(ImageFormat::Webp),
                OutputFormat::Original,
            ],
            quality: 85,
            vector_width: 1200,
        }
    }
}

/// Cover image settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoverConfig {
    /// Style block prepended verbatim to the body of `cover_hide` posts.
    pub hide_style: String,
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            hide_style: "<style>\n  .post-meta .preview-img { display: none; }\n</style>\n"
                .to_string(),
        }
    }
}

/// Output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Root directory of generated variants, relative to the site root.
    /// Variants land in `{generated_dir}/assets/posts/{slug}/`.
    pub generated_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            generated_dir: "generated".to_string(),
        }
    }
}

/// Fortune quote settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FortuneConfig {
    /// Fortune database (`%`-separated entries), relative to the site root.
    pub file: String,
    /// Entries containing any of these phrases are never picked.
    pub exclude: Vec<String>,
}

impl Default for FortuneConfig {
    fn default() -> Self {
        Self {
            file: "assets/data/computers.txt".to_string(),
            exclude: vec!["NORTH AMERICAN MALES".to_string()],
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel render workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(SiteConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the site root.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# postpress configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Posts directory, relative to the site root.
posts_dir = "_posts"

# ---------------------------------------------------------------------------
# Responsive variants
# ---------------------------------------------------------------------------
[images]
# Pixel widths generated for every post image. Widths larger than the
# source are replaced by a single variant at the source width.
widths = [400, 800, 1600]

# Output formats. "original" keeps the source format (SVG sources become PNG).
# Available: original, jpeg, png, webp, gif, avif
formats = ["webp", "original"]

# Lossy encoding quality (1 = worst, 100 = best).
quality = 85

# Natural width used for SVG sources, which have no pixel width.
vector_width = 1200

# ---------------------------------------------------------------------------
# Cover images
# ---------------------------------------------------------------------------
[cover]
# Prepended verbatim to the body of posts with `cover_hide: true`.
hide_style = """
<style>
  .post-meta .preview-img { display: none; }
</style>
"""

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Variants are written to {generated_dir}/assets/posts/{slug}/.
generated_dir = "generated"

# ---------------------------------------------------------------------------
# Fortune quotes
# ---------------------------------------------------------------------------
[fortune]
file = "assets/data/computers.txt"
exclude = ["NORTH AMERICAN MALES"]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel render workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
