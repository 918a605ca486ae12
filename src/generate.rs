//! Enriched post generation.
//!
//! Stage 3 of the postpress pipeline. Takes the processed manifest and writes
//! every post back out as Markdown, with front matter rewritten for the site
//! generator that renders it:
//!
//! | Key | Value |
//! |-----|-------|
//! | `media_subpath` | resolved media directory (`img_path` is folded into it) |
//! | `last_modified_at` | from front matter or git history, when known |
//! | `image` | cover variant URL when `cover_responsive`, otherwise unchanged |
//! | `seo_image` | the display image passed through the `seo_image` filter |
//!
//! All other keys pass through untouched. Bodies are written as enriched in
//! stage 1 (including any prepended cover-hide style block).
//!
//! ## Output Structure
//!
//! ```text
//! out/
//! └── _posts/
//!     ├── 2024-03-01-hello.md
//!     └── notes/2024-04-02-nested.markdown
//! ```

use crate::filters::{FilterError, FilterRegistry};
use crate::front_matter::{self, FrontMatterError};
use crate::process::{ProcessedManifest, ProcessedPost};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Front matter error: {0}")]
    FrontMatter(#[from] FrontMatterError),
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),
}

/// A post written by the generate stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPost {
    pub slug: String,
    /// Path relative to the output directory.
    pub path: PathBuf,
    /// Rewritten `image` path, if the post has one.
    pub image: Option<String>,
    pub seo_image: Option<String>,
}

pub fn generate(
    manifest_path: &Path,
    output_dir: &Path,
    registry: &FilterRegistry,
) -> Result<Vec<GeneratedPost>, GenerateError> {
    let content = fs::read_to_string(manifest_path)?;
    let manifest: ProcessedManifest = serde_json::from_str(&content)?;

    let posts_out = Path::new("_posts");
    let mut written = Vec::with_capacity(manifest.posts.len());

    for processed in &manifest.posts {
        let front = rewrite_front_matter(processed, registry)?;
        let document = front_matter::render(&front, &processed.post.body)?;

        let rel = posts_out.join(relative_post_path(
            &processed.post.source_path,
            &manifest.config.posts_dir,
        ));
        let dest = output_dir.join(&rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, document)?;

        written.push(GeneratedPost {
            slug: processed.post.slug.clone(),
            path: rel,
            image: front.get("image").and_then(image_path),
            seo_image: front
                .get("seo_image")
                .and_then(Value::as_str)
                .map(str::to_string),
        });
    }

    Ok(written)
}

/// Front matter for the generated post.
pub fn rewrite_front_matter(
    processed: &ProcessedPost,
    registry: &FilterRegistry,
) -> Result<Mapping, GenerateError> {
    let post = &processed.post;
    let context = &processed.context;
    let mut front = post.front_matter.clone();

    front.remove("img_path");
    front.insert(
        "media_subpath".into(),
        Value::String(context.media_subpath.clone()),
    );

    if let Some(date) = &post.last_modified_at {
        front.insert("last_modified_at".into(), Value::String(date.clone()));
    }

    if let (Some(_), Some(display)) = (&post.image, &context.display_image) {
        if context.cover_responsive
            && processed.cover.is_some()
            && let Some(image) = front.get_mut("image")
        {
            set_image_path(image, display);
        }
        let seo = registry.apply("seo_image", display, context)?;
        front.insert("seo_image".into(), Value::String(seo));
    }

    Ok(front)
}

/// Post path relative to the posts directory.
fn relative_post_path(source_path: &str, posts_dir: &str) -> PathBuf {
    let source = Path::new(source_path);
    match source.strip_prefix(posts_dir.trim_matches('/')) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => source
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| source.to_path_buf()),
    }
}

/// Point an `image` value at `path`. The mapping form keeps every other key.
fn set_image_path(image: &mut Value, path: &str) {
    match image {
        Value::Mapping(m) => {
            m.insert("path".into(), Value::String(path.to_string()));
        }
        other => *other = Value::String(path.to_string()),
    }
}

fn image_path(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Mapping(m) => m.get("path").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::imaging::ImageFormat;
    use crate::process::GeneratedVariant;
    use crate::resolver::NamingMode;
    use crate::types::{ImageRef, PageImageContext, PostRecord};
    use tempfile::TempDir;

    fn record(front: &str, image: Option<ImageRef>, cover_responsive: bool) -> PostRecord {
        PostRecord {
            source_path: "_posts/2024-01-01-a.md".into(),
            slug: "2024-01-01-a".into(),
            name: "a".into(),
            title: "A".into(),
            media_subpath: "/assets/posts/2024-01-01-a/".into(),
            image,
            cover_responsive,
            cover_hide: false,
            last_modified_at: None,
            front_matter: serde_yaml::from_str(front).unwrap(),
            body: "Body\n".into(),
        }
    }

    fn cover_variant() -> GeneratedVariant {
        GeneratedVariant {
            url: "/generated/assets/posts/2024-01-01-a/cover-800.jpg".into(),
            path: "assets/posts/2024-01-01-a/cover-800.jpg".into(),
            width: 800,
            format: ImageFormat::Jpeg,
            naming: NamingMode::Short,
        }
    }

    fn processed(post: PostRecord, display: Option<&str>, seo: Option<&str>) -> ProcessedPost {
        let cover = post.cover_responsive.then(cover_variant);
        ProcessedPost {
            context: PageImageContext {
                slug: post.slug.clone(),
                media_subpath: post.media_subpath.clone(),
                cover_responsive: post.cover_responsive,
                display_image: display.map(str::to_string),
                seo_image: seo.map(str::to_string),
            },
            post,
            variants: Vec::new(),
            fallback: None,
            cover,
        }
    }

    #[test]
    fn media_subpath_replaces_legacy_key() {
        let p = processed(record("img_path: /old/\ntitle: A\n", None, false), None, None);
        let front = rewrite_front_matter(&p, &FilterRegistry::with_defaults()).unwrap();
        assert!(!front.contains_key("img_path"));
        assert_eq!(
            front.get("media_subpath").and_then(Value::as_str),
            Some("/assets/posts/2024-01-01-a/")
        );
        assert_eq!(front.get("title").and_then(Value::as_str), Some("A"));
        assert!(!front.contains_key("seo_image"));
    }

    #[test]
    fn responsive_cover_rewrites_image_keeping_alt() {
        let image = ImageRef::Detailed {
            path: "cover.jpg".into(),
            alt: Some("Dusk".into()),
        };
        let url = "/generated/assets/posts/2024-01-01-a/cover-800.jpg";
        let p = processed(
            record("image:\n  path: cover.jpg\n  alt: Dusk\n", Some(image), true),
            Some(url),
            Some(url),
        );

        let front = rewrite_front_matter(&p, &FilterRegistry::with_defaults()).unwrap();
        let image = front.get("image").unwrap();
        assert_eq!(image_path(image).as_deref(), Some(url));
        assert_eq!(image.get("alt").and_then(Value::as_str), Some("Dusk"));
        assert_eq!(front.get("seo_image").and_then(Value::as_str), Some(url));
    }

    #[test]
    fn responsive_cover_keeps_extra_image_keys() {
        let image = ImageRef::Detailed {
            path: "cover.jpg".into(),
            alt: Some("Dusk".into()),
        };
        let url = "/generated/assets/posts/2024-01-01-a/cover-800.jpg";
        let p = processed(
            record(
                "image:\n  path: cover.jpg\n  alt: Dusk\n  lqip: data:image/webp;base64,AAAA\n  caption: Harbour\n",
                Some(image),
                true,
            ),
            Some(url),
            Some(url),
        );

        let front = rewrite_front_matter(&p, &FilterRegistry::with_defaults()).unwrap();
        let image = front.get("image").unwrap();
        assert_eq!(image.get("path").and_then(Value::as_str), Some(url));
        assert_eq!(image.get("alt").and_then(Value::as_str), Some("Dusk"));
        assert_eq!(
            image.get("lqip").and_then(Value::as_str),
            Some("data:image/webp;base64,AAAA")
        );
        assert_eq!(image.get("caption").and_then(Value::as_str), Some("Harbour"));
    }

    #[test]
    fn plain_image_is_left_alone() {
        let p = processed(
            record("image: cover.jpg\n", Some(ImageRef::Path("cover.jpg".into())), false),
            Some("/assets/posts/2024-01-01-a/cover.jpg"),
            Some("/assets/posts/2024-01-01-a/cover.jpg"),
        );
        let front = rewrite_front_matter(&p, &FilterRegistry::with_defaults()).unwrap();
        assert_eq!(front.get("image").and_then(Value::as_str), Some("cover.jpg"));
        assert_eq!(
            front.get("seo_image").and_then(Value::as_str),
            Some("/assets/posts/2024-01-01-a/cover.jpg")
        );
    }

    #[test]
    fn vector_image_gets_raster_seo_image() {
        let stand_in = "/generated/assets/posts/2024-01-01-a/d-1200-12345678.png";
        let p = processed(
            record("image: d.svg\n", Some(ImageRef::Path("d.svg".into())), false),
            Some("/assets/posts/2024-01-01-a/d.svg"),
            Some(stand_in),
        );
        let front = rewrite_front_matter(&p, &FilterRegistry::with_defaults()).unwrap();
        assert_eq!(front.get("seo_image").and_then(Value::as_str), Some(stand_in));
    }

    #[test]
    fn missing_seo_filter_is_an_error() {
        let p = processed(
            record("image: c.jpg\n", Some(ImageRef::Path("c.jpg".into())), false),
            Some("/c.jpg"),
            None,
        );
        let err = rewrite_front_matter(&p, &FilterRegistry::new()).unwrap_err();
        assert!(matches!(err, GenerateError::Filter(FilterError::Unknown(_))));
    }

    #[test]
    fn last_modified_is_written() {
        let mut post = record("{}", None, false);
        post.last_modified_at = Some("2024-02-02 10:00:00 +0000".into());
        let front =
            rewrite_front_matter(&processed(post, None, None), &FilterRegistry::new()).unwrap();
        assert_eq!(
            front.get("last_modified_at").and_then(Value::as_str),
            Some("2024-02-02 10:00:00 +0000")
        );
    }

    #[test]
    fn relative_post_paths() {
        assert_eq!(
            relative_post_path("_posts/notes/x.md", "_posts"),
            PathBuf::from("notes/x.md")
        );
        assert_eq!(
            relative_post_path("elsewhere/x.md", "_posts"),
            PathBuf::from("x.md")
        );
    }

    #[test]
    fn generate_writes_posts_under_output() {
        let tmp = TempDir::new().unwrap();
        let manifest = ProcessedManifest {
            posts: vec![processed(record("title: A\n", None, false), None, None)],
            config: SiteConfig::default(),
        };
        let manifest_path = tmp.path().join("processed.json");
        fs::write(&manifest_path, serde_json::to_string(&manifest).unwrap()).unwrap();
        let out = tmp.path().join("out");

        let written = generate(&manifest_path, &out, &FilterRegistry::with_defaults()).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].path, PathBuf::from("_posts/2024-01-01-a.md"));

        let text = fs::read_to_string(out.join("_posts/2024-01-01-a.md")).unwrap();
        let doc = front_matter::parse(&text).unwrap();
        assert_eq!(doc.body, "Body\n");
        assert!(doc.front_matter.contains_key("media_subpath"));
    }
}
