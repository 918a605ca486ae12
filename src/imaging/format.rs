//! Image formats known to the resolver and the rendering backend.
//!
//! Sources may be any of the formats below. Outputs are restricted to the
//! raster formats the backend can encode: SVG is read (rasterized through
//! resvg) but never written.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A concrete file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
    Gif,
    Avif,
    Svg,
}

impl ImageFormat {
    /// Raster format used wherever a vector image needs a pixel stand-in
    /// (cover variants, fallbacks, SEO images).
    pub const WEB_RASTER: ImageFormat = ImageFormat::Png;

    /// Detect a format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            "gif" => Some(Self::Gif),
            "avif" => Some(Self::Avif),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }

    /// Detect a format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Canonical file extension for generated files.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Gif => "gif",
            Self::Avif => "avif",
            Self::Svg => "svg",
        }
    }

    pub fn is_vector(self) -> bool {
        matches!(self, Self::Svg)
    }

    /// Whether the backend can read this format. The `image` crate's AVIF
    /// support is encode-only.
    pub fn is_decodable(self) -> bool {
        !matches!(self, Self::Avif)
    }

    /// Whether the backend can write this format.
    pub fn is_encodable(self) -> bool {
        !self.is_vector()
    }

    /// The format a derived image of this source format is written in.
    pub fn rasterized(self) -> Self {
        if self.is_vector() {
            Self::WEB_RASTER
        } else {
            self
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Output format as written in `config.toml`: either a concrete format or
/// `"original"`, meaning "whatever the source is".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OutputFormat {
    Original,
    Format(ImageFormat),
}

impl OutputFormat {
    /// Resolve against a source format. `Original` on a vector source
    /// becomes [`ImageFormat::WEB_RASTER`].
    pub fn resolve(self, source: ImageFormat) -> ImageFormat {
        match self {
            Self::Original => source.rasterized(),
            Self::Format(f) => f,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("original") {
            return Ok(Self::Original);
        }
        ImageFormat::from_extension(s)
            .map(Self::Format)
            .ok_or_else(|| format!("unknown image format '{s}'"))
    }
}

impl TryFrom<String> for OutputFormat {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OutputFormat> for String {
    fn from(value: OutputFormat) -> Self {
        match value {
            OutputFormat::Original => "original".to_string(),
            OutputFormat::Format(f) => f.extension().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_detection_is_case_insensitive() {
        assert_eq!(ImageFormat::from_extension("JPG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("Svg"), Some(ImageFormat::Svg));
        assert_eq!(ImageFormat::from_extension("bmp"), None);
    }

    #[test]
    fn from_path_uses_extension() {
        assert_eq!(
            ImageFormat::from_path(Path::new("/assets/posts/a/cover.webp")),
            Some(ImageFormat::Webp)
        );
        assert_eq!(ImageFormat::from_path(Path::new("README")), None);
    }

    #[test]
    fn vector_rasterizes_to_png() {
        assert_eq!(ImageFormat::Svg.rasterized(), ImageFormat::Png);
        assert_eq!(ImageFormat::Jpeg.rasterized(), ImageFormat::Jpeg);
        assert!(!ImageFormat::Svg.is_encodable());
        assert!(ImageFormat::Avif.is_encodable());
        assert!(!ImageFormat::Avif.is_decodable());
        assert!(ImageFormat::Svg.is_decodable());
    }

    #[test]
    fn original_output_follows_source() {
        assert_eq!(
            OutputFormat::Original.resolve(ImageFormat::Gif),
            ImageFormat::Gif
        );
        assert_eq!(
            OutputFormat::Original.resolve(ImageFormat::Svg),
            ImageFormat::Png
        );
        assert_eq!(
            OutputFormat::Format(ImageFormat::Webp).resolve(ImageFormat::Jpeg),
            ImageFormat::Webp
        );
    }

    #[test]
    fn output_format_parses_from_config_strings() {
        assert_eq!("original".parse::<OutputFormat>(), Ok(OutputFormat::Original));
        assert_eq!(
            "webp".parse::<OutputFormat>(),
            Ok(OutputFormat::Format(ImageFormat::Webp))
        );
        assert!("tiff".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn output_format_serializes_as_string() {
        let json = serde_json::to_string(&OutputFormat::Format(ImageFormat::Avif)).unwrap();
        assert_eq!(json, "\"avif\"");
        let back: OutputFormat = serde_json::from_str("\"original\"").unwrap();
        assert_eq!(back, OutputFormat::Original);
    }
}
