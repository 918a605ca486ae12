//! Shared test utilities for the postpress test suite.
//!
//! Builds throwaway sites inside a [`TempDir`]: posts with front matter,
//! `config.toml`, and small real images the `RustBackend` can decode.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_post(tmp.path(), "2024-03-01-hello.md", "image: cover.jpg\n", "Body");
//! write_jpeg(&tmp.path().join("assets/posts/2024-03-01-hello/cover.jpg"), 1600, 900);
//!
//! let manifest = enrich_with_history(tmp.path(), &NoHistory).unwrap();
//! let post = find_post(&manifest, "2024-03-01-hello");
//! ```

use std::fs;
use std::path::Path;

use crate::posts::PostsManifest;
use crate::types::PostRecord;

// =========================================================================
// Site builders
// =========================================================================

/// Write `_posts/{name}` with the given YAML front matter and body.
pub fn write_post(root: &Path, name: &str, front_matter: &str, body: &str) {
    let path = root.join("_posts").join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, format!("---\n{}---\n{}", front_matter, body)).unwrap();
}

/// Write `config.toml` at the site root.
pub fn write_config(root: &Path, toml: &str) {
    fs::write(root.join("config.toml"), toml).unwrap();
}

/// Write a real JPEG of the given size.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    img.save(path).unwrap();
}

/// Write a minimal SVG document with the given size.
pub fn write_svg(path: &Path, width: u32, height: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let svg = format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><rect width="{w}" height="{h}" fill="#336699"/></svg>"##,
        w = width,
        h = height
    );
    fs::write(path, svg).unwrap();
}

// =========================================================================
// Lookups
// =========================================================================

/// Find a post by slug. Panics with the available slugs if missing.
pub fn find_post<'a>(manifest: &'a PostsManifest, slug: &str) -> &'a PostRecord {
    manifest
        .posts
        .iter()
        .find(|p| p.slug == slug)
        .unwrap_or_else(|| {
            let slugs: Vec<&str> = manifest.posts.iter().map(|p| p.slug.as_str()).collect();
            panic!("post '{}' not found, have {:?}", slug, slugs)
        })
}
