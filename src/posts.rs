//! Post discovery and front matter enrichment.
//!
//! Stage 1 of the postpress pipeline. Walks the posts directory, splits each
//! post into YAML front matter and body, and fills in what the later stages
//! need:
//!
//! | Field | Source (first available wins) |
//! |-------|-------------------------------|
//! | `media_subpath` | `media_subpath` → legacy `img_path` → `/assets/posts/{slug}/` |
//! | `last_modified_at` | front matter → latest git commit (only if the file has >1 commit) |
//! | `title` | front matter → date-free slug |
//! | `body` | body, with `cover.hide_style` prepended when `cover_hide: true` |
//!
//! ## Directory Structure
//!
//! ```text
//! site/
//! ├── config.toml
//! ├── _posts/
//! │   ├── 2024-03-01-hello.md
//! │   └── notes/2024-04-02-nested.markdown   # subdirectories are walked
//! └── assets/posts/2024-03-01-hello/
//!     └── cover.jpg                           # default media location
//! ```
//!
//! Files other than `.md` / `.markdown` are ignored. Posts are returned in
//! file-name order so the manifest is stable between runs.

use crate::config::{self, SiteConfig};
use crate::front_matter::{self, FrontMatterError, PostFrontMatter};
use crate::history::{GitHistory, RevisionHistory};
use crate::naming::{default_media_subpath, is_remote, join_media_path, parse_post_name};
use crate::types::PostRecord;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Posts directory not found: {0}")]
    MissingPostsDir(PathBuf),
    #[error("Invalid front matter in {path}: {source}")]
    FrontMatter {
        path: PathBuf,
        source: FrontMatterError,
    },
}

/// Manifest output from the enrich stage.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostsManifest {
    pub posts: Vec<PostRecord>,
    pub config: SiteConfig,
}

const POST_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Enrich every post under `root`, reading history from git.
pub fn enrich(root: &Path) -> Result<PostsManifest, EnrichError> {
    enrich_with_history(root, &GitHistory::new(root))
}

/// Enrich every post using a specific history source (allows testing with a fake).
pub fn enrich_with_history(
    root: &Path,
    history: &dyn RevisionHistory,
) -> Result<PostsManifest, EnrichError> {
    let config = config::load_config(root)?;
    let posts_dir = root.join(&config.posts_dir);
    if !posts_dir.is_dir() {
        return Err(EnrichError::MissingPostsDir(posts_dir));
    }

    let posts = collect_posts(&posts_dir)?
        .iter()
        .map(|path| enrich_post(root, path, &config, history))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PostsManifest { posts, config })
}

fn collect_posts(posts_dir: &Path) -> Result<Vec<PathBuf>, EnrichError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(posts_dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && is_post(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn is_post(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| POST_EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Build the record for a single post file.
pub fn enrich_post(
    root: &Path,
    path: &Path,
    config: &SiteConfig,
    history: &dyn RevisionHistory,
) -> Result<PostRecord, EnrichError> {
    let content = fs::read_to_string(path)?;
    let rel_path = path.strip_prefix(root).unwrap_or(path);
    let with_path = |source| EnrichError::FrontMatter {
        path: rel_path.to_path_buf(),
        source,
    };

    let doc = front_matter::parse(&content).map_err(with_path)?;
    let fm = PostFrontMatter::from_mapping(&doc.front_matter).map_err(with_path)?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let parsed = parse_post_name(&stem);

    let media_subpath = fm
        .media_subpath
        .or(fm.img_path)
        .unwrap_or_else(|| default_media_subpath(&parsed.slug));

    let last_modified_at = fm
        .last_modified_at
        .or_else(|| history.last_modified(rel_path));

    let body = if fm.cover_hide {
        format!("{}{}", config.cover.hide_style, doc.body)
    } else {
        doc.body
    };

    Ok(PostRecord {
        source_path: rel_path.to_string_lossy().replace('\\', "/"),
        title: fm.title.unwrap_or_else(|| parsed.name.clone()),
        slug: parsed.slug,
        name: parsed.name,
        media_subpath,
        image: fm.image,
        cover_responsive: fm.cover_responsive,
        cover_hide: fm.cover_hide,
        last_modified_at,
        front_matter: doc.front_matter,
        body,
    })
}

/// Local images referenced by posts that do not exist under `root`.
///
/// Returns `(slug, site-relative path)` pairs. Remote images are not checked.
pub fn missing_images(root: &Path, manifest: &PostsManifest) -> Vec<(String, PathBuf)> {
    manifest
        .posts
        .iter()
        .filter_map(|post| {
            let image = post.image.as_ref()?;
            let url = join_media_path(&post.media_subpath, image.path());
            if is_remote(&url) {
                return None;
            }
            let rel = PathBuf::from(url.trim_start_matches('/'));
            (!root.join(&rel).is_file()).then(|| (post.slug.clone(), rel))
        })
        .collect()
}
