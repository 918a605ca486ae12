//! Shared types used across pipeline stages.
//!
//! These types are serialized to JSON between stages (enrich → process →
//! generate) and must be identical across all three modules.

use serde::{Deserialize, Serialize};

/// The `image` front matter key: either a bare path or a mapping.
///
/// ```yaml
/// image: cover.jpg
/// # or
/// image:
///   path: cover.jpg
///   alt: A lighthouse at dusk
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    Path(String),
    Detailed {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
    },
}

impl ImageRef {
    pub fn path(&self) -> &str {
        match self {
            Self::Path(p) => p,
            Self::Detailed { path, .. } => path,
        }
    }

    pub fn alt(&self) -> Option<&str> {
        match self {
            Self::Path(_) => None,
            Self::Detailed { alt, .. } => alt.as_deref(),
        }
    }
}

/// A post after metadata enrichment (stage 1 output).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    /// Post file path relative to the site root.
    pub source_path: String,
    /// File stem, date prefix kept. Keys media and generated directories.
    pub slug: String,
    /// Slug without the `YYYY-MM-DD-` prefix.
    pub name: String,
    /// Title from front matter, or the date-free slug.
    pub title: String,
    /// Directory media paths are relative to, e.g. `/assets/posts/{slug}/`.
    pub media_subpath: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    #[serde(default)]
    pub cover_responsive: bool,
    #[serde(default)]
    pub cover_hide: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<String>,
    /// Complete front matter as read, passed through to the generate stage.
    pub front_matter: serde_yaml::Mapping,
    /// Body, with the cover-hide style block prepended when requested.
    pub body: String,
}

/// Per-page image state consumed by templates and filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImageContext {
    pub slug: String,
    pub media_subpath: String,
    pub cover_responsive: bool,
    /// URL of the image the page displays (the cover variant when
    /// `cover_responsive`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_image: Option<String>,
    /// URL crawlers should index. Differs from the display image for vector
    /// sources, which get a rasterized stand-in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_image: Option<String>,
}

impl PageImageContext {
    /// Whether crawlers get a different image than readers.
    pub fn seo_differs(&self) -> bool {
        self.seo_image.is_some() && self.seo_image != self.display_image
    }
}
