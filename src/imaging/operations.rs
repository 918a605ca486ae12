//! High-level image operations.
//!
//! These functions sit between the process stage and the backend: they
//! build render parameters and fan independent renders out over rayon.

use super::backend::{BackendError, ImageBackend};
use super::format::ImageFormat;
use super::params::{Quality, RenderParams};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<(u32, u32)> {
    let dims = backend.identify(path)?;
    Ok((dims.width, dims.height))
}

/// Plan a render without executing it.
pub fn plan_render(
    source: &Path,
    output: PathBuf,
    width: u32,
    format: ImageFormat,
    quality: Quality,
) -> RenderParams {
    RenderParams {
        source: source.to_path_buf(),
        output,
        width,
        format,
        quality,
    }
}

/// Render a batch of independent variants in parallel.
///
/// Results come back in input order. Every job runs even if an earlier one
/// fails; the caller decides whether a failure aborts the build.
pub fn render_all(backend: &impl ImageBackend, jobs: &[RenderParams]) -> Vec<Result<()>> {
    jobs.par_iter().map(|job| backend.render(job)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};

    #[test]
    fn get_dimensions_calls_backend() {
        let backend = MockBackend::with_dimensions(&[("test.jpg", 1920, 1080)]);

        let dims = get_dimensions(&backend, Path::new("/test.jpg")).unwrap();
        assert_eq!(dims, (1920, 1080));
    }

    #[test]
    fn plan_render_copies_inputs() {
        let params = plan_render(
            Path::new("/src/cover.jpg"),
            PathBuf::from("/out/cover-800.jpg"),
            800,
            ImageFormat::Jpeg,
            Quality::new(70),
        );
        assert_eq!(params.source, PathBuf::from("/src/cover.jpg"));
        assert_eq!(params.output, PathBuf::from("/out/cover-800.jpg"));
        assert_eq!(params.width, 800);
        assert_eq!(params.quality.value(), 70);
    }

    #[test]
    fn render_all_runs_every_job_in_order() {
        let backend = MockBackend::new();
        let jobs: Vec<RenderParams> = [400, 800, 1600]
            .iter()
            .map(|&w| {
                plan_render(
                    Path::new("/src/a.png"),
                    PathBuf::from(format!("/out/a-{w}.webp")),
                    w,
                    ImageFormat::Webp,
                    Quality::default(),
                )
            })
            .collect();

        let results = render_all(&backend, &jobs);
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.is_ok()));

        let widths: Vec<u32> = backend
            .renders()
            .iter()
            .map(|op| match op {
                RecordedOp::Render { width, .. } => *width,
                _ => unreachable!(),
            })
            .collect();
        let mut sorted = widths.clone();
        sorted.sort();
        assert_eq!(sorted, vec![400, 800, 1600]);
    }
}
