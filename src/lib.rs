//! # Postpress
//!
//! Build-time helpers for a Markdown blog: enrich posts with media paths and
//! last-modified dates, render responsive variants of each post's cover
//! image, and write the posts back out with rewritten front matter for the
//! site generator that renders them.
//!
//! # Architecture: Three-Stage Pipeline
//!
//! Each stage produces a JSON manifest that the next stage consumes:
//!
//! ```text
//! 1. Enrich    _posts/        →  posts.json       (front matter + git history)
//! 2. Process   posts.json     →  processed.json   (responsive image variants)
//! 3. Generate  processed.json →  out/_posts/      (rewritten posts)
//! ```
//!
//! Manifests are plain JSON, so any stage can be inspected or rerun on its
//! own. Stages are functions from manifest to manifest; tests exercise them
//! without a git checkout or a real image encoder.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`posts`] | Stage 1: walks the posts directory and produces the posts manifest |
//! | [`process`] | Stage 2: renders image variants and builds each page's image context |
//! | [`generate`] | Stage 3: writes posts with rewritten front matter |
//! | [`config`] | `config.toml` loading, validation and merging over stock defaults |
//! | [`front_matter`] | YAML front matter split, parse and render |
//! | [`history`] | Last-modified dates from git history |
//! | [`naming`] | Post filename convention and media path helpers |
//! | [`resolver`] | Source classification, variant planning and output naming |
//! | [`imaging`] | Image backend: identify, resize, encode, rasterize vectors |
//! | [`cache`] | Per-run dedup and the content-addressed cache across runs |
//! | [`filters`] | Named template filters (`media_url`, `seo_image`) |
//! | [`fortune`] | Random fortune quotes reflowed for a display width |
//! | [`types`] | Types serialized between stages |
//! | [`output`] | CLI output formatting for every stage |
//!
//! # Design Decisions
//!
//! ## Front Matter Survives Intact
//!
//! Posts keep their full front matter as a YAML mapping through every stage.
//! Only the keys postpress owns (`media_subpath`, `last_modified_at`, `image`,
//! `seo_image`) are rewritten; everything else passes through as written.
//!
//! ## Deterministic Variant Names
//!
//! Variant filenames are a function of source path, width and format, so the
//! same build produces the same files and pages can reference them before
//! they exist. The cover variant uses a short, hash-free name so templates
//! can predict it.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate for raster work and `resvg`
//! for SVG rasterization. No ImageMagick, no system libraries.

pub mod cache;
pub mod config;
pub mod filters;
pub mod fortune;
pub mod front_matter;
pub mod generate;
pub mod history;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod posts;
pub mod process;
pub mod resolver;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
