//! Variant rendering caches.
//!
//! Two layers keep the process stage from encoding the same image twice:
//!
//! - [`RunCache`]: per invocation. Maps a [`GeneratedImageSpec`] to the path
//!   it was written to, so a spec shared by several pages (or repeated in one
//!   page's target list) is rendered at most once per run.
//! - [`CacheManifest`]: on disk, across runs. Content-addressed by the
//!   SHA-256 of the source bytes plus a hash of the encoding parameters.
//!
//! ## Cache keys
//!
//! - **`source_hash`**: SHA-256 of the source file contents. Survives
//!   `git checkout` (which resets modification times).
//! - **`params_hash`**: SHA-256 of (width, format, quality). Any config change
//!   that affects the encoded bytes changes the hash.
//!
//! A hit requires a matching entry **and** the stored output file still on
//! disk. When the content matches but lives under another path (a renamed
//! post, for instance), the file is copied instead of re-encoded.
//!
//! The manifest lives at `<generated_dir>/.cache-manifest.json`. Pass
//! `--no-cache` to start from an empty one.

use crate::imaging::ImageFormat;
use crate::resolver::GeneratedImageSpec;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the cache manifest file within the generated directory.
const MANIFEST_FILENAME: &str = ".cache-manifest.json";

/// Bump to invalidate every existing cache when key computation changes.
const MANIFEST_VERSION: u32 = 1;

/// Specs already rendered during this invocation.
#[derive(Debug, Default)]
pub struct RunCache {
    rendered: HashMap<GeneratedImageSpec, PathBuf>,
}

impl RunCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Where `spec` was written this run, if it was.
    pub fn get(&self, spec: &GeneratedImageSpec) -> Option<&Path> {
        self.rendered.get(spec).map(PathBuf::as_path)
    }

    pub fn contains(&self, spec: &GeneratedImageSpec) -> bool {
        self.rendered.contains_key(spec)
    }

    pub fn insert(&mut self, spec: GeneratedImageSpec, output: PathBuf) {
        self.rendered.insert(spec, output);
    }

    pub fn len(&self) -> usize {
        self.rendered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rendered.is_empty()
    }
}

/// A single cached output file.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
}

/// On-disk cache manifest mapping output paths to their cache entries.
///
/// Output paths are relative to the generated directory. Several outputs can
/// hold the same content (a narrow cover under both its full and short
/// name), so the runtime `content_index` keyed by
/// `"{source_hash}:{params_hash}"` lists every path for a key.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: HashMap<String, CacheEntry>,
    /// Content key → output paths, sorted. Never serialized.
    #[serde(skip)]
    content_index: HashMap<String, Vec<String>>,
}

impl CacheManifest {
    /// An empty manifest (first build or `--no-cache`).
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
            content_index: HashMap::new(),
        }
    }

    /// Load from the generated directory. Missing, corrupt or outdated
    /// manifests load as empty.
    pub fn load(generated_dir: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(manifest_path(generated_dir)) else {
            return Self::empty();
        };
        let Ok(mut manifest) = serde_json::from_str::<Self>(&content) else {
            return Self::empty();
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest.content_index = build_content_index(&manifest.entries);
        manifest
    }

    /// Write the manifest. Entries whose output file is gone are dropped.
    pub fn save(&self, generated_dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(generated_dir)?;
        let live = Self {
            version: self.version,
            entries: self
                .entries
                .iter()
                .filter(|(path, _)| generated_dir.join(path).exists())
                .map(|(path, entry)| (path.clone(), entry.clone()))
                .collect(),
            content_index: HashMap::new(),
        };
        let json = serde_json::to_string_pretty(&live)?;
        std::fs::write(manifest_path(generated_dir), json)
    }

    /// Stored output for matching content, if its file still exists.
    ///
    /// `output_path` itself wins when it holds the content. Otherwise the
    /// first other path that does is returned; copying it into place is up to
    /// the caller.
    pub fn find_cached(
        &self,
        output_path: &str,
        source_hash: &str,
        params_hash: &str,
        generated_dir: &Path,
    ) -> Option<String> {
        let stored = self
            .content_index
            .get(&content_key(source_hash, params_hash))?;
        let exists = |path: &&String| generated_dir.join(path.as_str()).exists();
        stored
            .iter()
            .find(|p| *p == output_path)
            .filter(exists)
            .or_else(|| stored.iter().find(exists))
            .cloned()
    }

    /// Record an output file. A path that held other content before is
    /// unlinked from its old content key.
    pub fn insert(&mut self, output_path: String, source_hash: String, params_hash: String) {
        let key = content_key(&source_hash, &params_hash);

        if let Some(old) = self.entries.get(&output_path) {
            let old_key = content_key(&old.source_hash, &old.params_hash);
            if old_key != key
                && let Some(paths) = self.content_index.get_mut(&old_key)
            {
                paths.retain(|p| *p != output_path);
            }
        }

        let paths = self.content_index.entry(key).or_default();
        if !paths.contains(&output_path) {
            paths.push(output_path.clone());
            paths.sort();
        }
        self.entries.insert(
            output_path,
            CacheEntry {
                source_hash,
                params_hash,
            },
        );
    }
}

fn content_key(source_hash: &str, params_hash: &str) -> String {
    format!("{}:{}", source_hash, params_hash)
}

fn build_content_index(entries: &HashMap<String, CacheEntry>) -> HashMap<String, Vec<String>> {
    let mut index: HashMap<String, Vec<String>> = HashMap::new();
    for (output_path, entry) in entries {
        index
            .entry(content_key(&entry.source_hash, &entry.params_hash))
            .or_default()
            .push(output_path.clone());
    }
    for paths in index.values_mut() {
        paths.sort();
    }
    index
}

/// SHA-256 of a file's contents, hex encoded.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// SHA-256 of the parameters that determine a variant's encoded bytes.
pub fn hash_variant_params(width: u32, format: ImageFormat, quality: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"variant\0");
    hasher.update(width.to_le_bytes());
    hasher.update(format.extension().as_bytes());
    hasher.update(b"\0");
    hasher.update(quality.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// Cache performance for one process run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub copies: u32,
    pub misses: u32,
    /// Specs served from the run cache (shared between pages).
    pub reused: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn copy(&mut self) {
        self.copies += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn reuse(&mut self) {
        self.reused += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.copies + self.misses + self.reused
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total() == self.misses {
            return write!(f, "{} encoded", self.misses);
        }
        let mut parts = Vec::new();
        if self.hits > 0 {
            parts.push(format!("{} cached", self.hits));
        }
        if self.copies > 0 {
            parts.push(format!("{} copied", self.copies));
        }
        if self.reused > 0 {
            parts.push(format!("{} reused", self.reused));
        }
        parts.push(format!("{} encoded", self.misses));
        write!(f, "{} ({} total)", parts.join(", "), self.total())
    }
}

/// Path of the cache manifest inside a generated directory.
pub fn manifest_path(generated_dir: &Path) -> PathBuf {
    generated_dir.join(MANIFEST_FILENAME)
}
