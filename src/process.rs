//! Cover image variant generation.
//!
//! Stage 2 of the postpress pipeline. Reads the posts manifest, resolves the
//! variant set for every post's cover image, renders what is missing, and
//! writes a processed manifest carrying the generated URLs.
//!
//! ## Per-post flow
//!
//! ```text
//! image: cover.jpg
//!   → join under media_subpath          /assets/posts/{slug}/cover.jpg
//!   → identify (raster only)            1600 x 900
//!   → VariantResolver::plan             responsive + fallback (+ cover)
//!   → run cache / disk cache / render   generated/assets/posts/{slug}/…
//!   → PageImageContext                  display_image, seo_image
//! ```
//!
//! Remote images (`https://…`, `//cdn/…`) are left alone. A local image that
//! does not exist is an error: a post pointing at a missing cover is a broken
//! build, not a warning.
//!
//! ## Parallelism
//!
//! Posts are processed one at a time. Within a post, every variant that is
//! not already available is rendered in parallel on the rayon pool.
//!
//! ## Progress
//!
//! Progress is reported as [`ProcessEvent`]s over an optional channel, so the
//! CLI can print while rendering runs. Degraded fits are also logged through
//! `tracing`.

use crate::cache::{self, CacheManifest, CacheStats, RunCache};
use crate::config::SiteConfig;
use crate::imaging::{
    BackendError, ImageBackend, ImageFormat, Quality, RenderParams, RustBackend, get_dimensions,
    plan_render, render_all,
};
use crate::naming::{is_remote, join_media_path};
use crate::posts::PostsManifest;
use crate::resolver::{
    GeneratedImageSpec, NamingMode, ResolveError, SourceImage, VariantPlan, VariantResolver,
    compute_name,
};
use crate::types::{PageImageContext, PostRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Image processing failed: {0}")]
    Backend(#[from] BackendError),
    #[error("Variant resolution failed: {0}")]
    Resolve(#[from] ResolveError),
    #[error("Source image not found: {0}")]
    SourceNotFound(PathBuf),
}

/// Progress events emitted while processing.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    /// A post is about to be processed.
    PostStarted {
        slug: String,
        index: usize,
        total: usize,
    },
    /// A variant is available on disk.
    VariantReady {
        slug: String,
        name: String,
        status: VariantStatus,
    },
    /// A requested width exceeded the source and was clamped.
    Degraded {
        slug: String,
        source: String,
        requested: u32,
        intrinsic: u32,
    },
    /// The post's image was not processed.
    Skipped { slug: String, reason: String },
}

/// How a variant became available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantStatus {
    /// Rendered this run.
    Encoded,
    /// Already on disk from a previous run.
    Cached,
    /// Copied from a previous run's output under another path.
    Copied,
    /// Rendered earlier in this run for another post.
    Reused,
}

/// One generated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedVariant {
    /// Public URL, rooted at `/`.
    pub url: String,
    /// Path relative to the generated directory.
    pub path: String,
    pub width: u32,
    pub format: ImageFormat,
    pub naming: NamingMode,
}

/// A post after image processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedPost {
    pub post: PostRecord,
    pub context: PageImageContext,
    /// Every generated file, in resolver order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<GeneratedVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<GeneratedVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<GeneratedVariant>,
}

/// Manifest output from the process stage.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessedManifest {
    pub posts: Vec<ProcessedPost>,
    pub config: SiteConfig,
}

/// Result of a process run: the manifest plus cache statistics.
#[derive(Debug)]
pub struct ProcessResult {
    pub manifest: ProcessedManifest,
    pub cache_stats: CacheStats,
}

pub fn process(
    manifest_path: &Path,
    site_root: &Path,
    generated_root: &Path,
    use_cache: bool,
    events: Option<Sender<ProcessEvent>>,
) -> Result<ProcessResult, ProcessError> {
    let backend = RustBackend::new();
    process_with_backend(
        &backend,
        manifest_path,
        site_root,
        generated_root,
        use_cache,
        events,
    )
}

/// Process images using a specific backend (allows testing with mock).
pub fn process_with_backend(
    backend: &impl ImageBackend,
    manifest_path: &Path,
    site_root: &Path,
    generated_root: &Path,
    use_cache: bool,
    events: Option<Sender<ProcessEvent>>,
) -> Result<ProcessResult, ProcessError> {
    let content = std::fs::read_to_string(manifest_path)?;
    let input: PostsManifest = serde_json::from_str(&content)?;

    std::fs::create_dir_all(generated_root)?;

    let mut stage = Stage {
        backend,
        resolver: VariantResolver::from_config(&input.config),
        quality: Quality::new(input.config.images.quality),
        site_root,
        generated_root,
        disk: if use_cache {
            CacheManifest::load(generated_root)
        } else {
            CacheManifest::empty()
        },
        run: RunCache::new(),
        sources: HashMap::new(),
        source_hashes: HashMap::new(),
        stats: CacheStats::default(),
        events,
    };

    let total = input.posts.len();
    let mut posts = Vec::with_capacity(total);
    for (index, post) in input.posts.into_iter().enumerate() {
        stage.emit(ProcessEvent::PostStarted {
            slug: post.slug.clone(),
            index,
            total,
        });
        posts.push(stage.process_post(post)?);
    }

    stage.disk.save(generated_root)?;

    Ok(ProcessResult {
        manifest: ProcessedManifest {
            posts,
            config: input.config,
        },
        cache_stats: stage.stats,
    })
}

/// State shared across the posts of one run.
struct Stage<'a, B: ImageBackend> {
    backend: &'a B,
    resolver: VariantResolver,
    quality: Quality,
    site_root: &'a Path,
    generated_root: &'a Path,
    disk: CacheManifest,
    run: RunCache,
    /// Identified sources, keyed by site-relative path.
    sources: HashMap<PathBuf, SourceImage>,
    source_hashes: HashMap<PathBuf, String>,
    stats: CacheStats,
    events: Option<Sender<ProcessEvent>>,
}

impl<B: ImageBackend> Stage<'_, B> {
    fn emit(&self, event: ProcessEvent) {
        if let Some(tx) = &self.events {
            tx.send(event).ok();
        }
    }

    fn process_post(&mut self, post: PostRecord) -> Result<ProcessedPost, ProcessError> {
        let mut context = PageImageContext {
            slug: post.slug.clone(),
            media_subpath: post.media_subpath.clone(),
            cover_responsive: post.cover_responsive,
            display_image: None,
            seo_image: None,
        };

        let Some(image_path) = post.image.as_ref().map(|i| i.path().to_string()) else {
            return Ok(unprocessed(post, context));
        };

        let url = join_media_path(&post.media_subpath, &image_path);
        if is_remote(&url) {
            self.emit(ProcessEvent::Skipped {
                slug: post.slug.clone(),
                reason: format!("remote image {url}"),
            });
            context.display_image = Some(url.clone());
            context.seo_image = Some(url);
            return Ok(unprocessed(post, context));
        }

        let rel = PathBuf::from(url.trim_start_matches('/'));
        let source = self.source(&rel)?;
        let plan = self.resolver.plan(&source, post.cover_responsive)?;

        if let Some(d) = plan.degraded {
            warn!(
                post = %post.slug,
                source = %url,
                requested = d.requested,
                intrinsic = d.intrinsic,
                "source narrower than requested width, clamping"
            );
            self.emit(ProcessEvent::Degraded {
                slug: post.slug.clone(),
                source: url.clone(),
                requested: d.requested,
                intrinsic: d.intrinsic,
            });
        }

        self.materialize(&plan, &source, &post.slug)?;

        let variant = |spec: &GeneratedImageSpec| self.variant(spec, &post.slug);
        let variants: Vec<GeneratedVariant> = plan.targets.iter().map(variant).collect();
        let fallback = variant(&plan.fallback);
        let cover = plan.cover.as_ref().map(variant);

        context.display_image = Some(match &cover {
            Some(c) => c.url.clone(),
            None => url,
        });
        context.seo_image = if source.is_vector() {
            Some(fallback.url.clone())
        } else {
            context.display_image.clone()
        };

        Ok(ProcessedPost {
            post,
            context,
            variants,
            fallback: Some(fallback),
            cover,
        })
    }

    /// Describe a source, identifying raster images once per run.
    fn source(&mut self, rel: &Path) -> Result<SourceImage, ProcessError> {
        if let Some(source) = self.sources.get(rel) {
            return Ok(source.clone());
        }
        let abs = self.site_root.join(rel);
        if !abs.is_file() {
            return Err(ProcessError::SourceNotFound(abs));
        }
        let mut source = SourceImage::new(rel, None)?;
        if !source.is_vector() {
            let (width, _) = get_dimensions(self.backend, &abs)?;
            source.width = Some(width);
        }
        self.sources.insert(rel.to_path_buf(), source.clone());
        Ok(source)
    }

    fn source_hash(&mut self, rel: &Path) -> Result<String, ProcessError> {
        if let Some(hash) = self.source_hashes.get(rel) {
            return Ok(hash.clone());
        }
        let hash = cache::hash_file(&self.site_root.join(rel))?;
        self.source_hashes.insert(rel.to_path_buf(), hash.clone());
        Ok(hash)
    }

    /// Make every target of `plan` exist on disk.
    fn materialize(
        &mut self,
        plan: &VariantPlan,
        source: &SourceImage,
        slug: &str,
    ) -> Result<(), ProcessError> {
        let source_hash = self.source_hash(&source.path)?;
        let source_abs = self.site_root.join(&source.path);

        let mut pending: Vec<(&GeneratedImageSpec, String, String)> = Vec::new();
        let mut jobs: Vec<RenderParams> = Vec::new();

        for spec in &plan.targets {
            let rel_out = self.asset_key(spec, slug);
            let out = self.generated_root.join(&rel_out);
            let name = compute_name(spec);

            if let Some(previous) = self.run.get(spec) {
                if previous != out {
                    copy_into_place(previous, &out)?;
                }
                debug!(%name, "reused from this run");
                self.stats.reuse();
                self.ready(slug, name, VariantStatus::Reused);
                continue;
            }

            let params_hash =
                cache::hash_variant_params(spec.width, spec.format, self.quality.value());

            if let Some(stored) = self
                .disk
                .find_cached(&rel_out, &source_hash, &params_hash, self.generated_root)
            {
                let status = if stored == rel_out {
                    self.stats.hit();
                    VariantStatus::Cached
                } else {
                    copy_into_place(&self.generated_root.join(&stored), &out)?;
                    self.stats.copy();
                    VariantStatus::Copied
                };
                debug!(%name, ?status, "cache hit");
                self.disk
                    .insert(rel_out, source_hash.clone(), params_hash);
                self.run.insert(spec.clone(), out);
                self.ready(slug, name, status);
                continue;
            }

            jobs.push(plan_render(
                &source_abs,
                out,
                spec.width,
                spec.format,
                self.quality,
            ));
            pending.push((spec, rel_out, params_hash));
        }

        for (result, (spec, rel_out, params_hash)) in
            render_all(self.backend, &jobs).into_iter().zip(pending)
        {
            result?;
            self.stats.miss();
            self.disk
                .insert(rel_out.clone(), source_hash.clone(), params_hash);
            self.run
                .insert(spec.clone(), self.generated_root.join(&rel_out));
            self.ready(slug, compute_name(spec), VariantStatus::Encoded);
        }

        Ok(())
    }

    fn ready(&self, slug: &str, name: String, status: VariantStatus) {
        self.emit(ProcessEvent::VariantReady {
            slug: slug.to_string(),
            name,
            status,
        });
    }

    /// Generated-directory-relative path as stored in the cache manifest.
    fn asset_key(&self, spec: &GeneratedImageSpec, slug: &str) -> String {
        self.resolver
            .asset_path(spec, slug)
            .to_string_lossy()
            .replace('\\', "/")
    }

    fn variant(&self, spec: &GeneratedImageSpec, slug: &str) -> GeneratedVariant {
        GeneratedVariant {
            url: self.resolver.public_url(spec, slug),
            path: self.asset_key(spec, slug),
            width: spec.width,
            format: spec.format,
            naming: spec.naming,
        }
    }
}

fn unprocessed(post: PostRecord, context: PageImageContext) -> ProcessedPost {
    ProcessedPost {
        post,
        context,
        variants: Vec::new(),
        fallback: None,
        cover: None,
    }
}

fn copy_into_place(from: &Path, to: &Path) -> Result<(), ProcessError> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(from, to)?;
    Ok(())
}
