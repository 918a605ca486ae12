//! Pure width arithmetic for responsive variants.
//!
//! All functions here are pure and testable without any I/O or images.

/// Outcome of resolving a requested width against a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidthResolution {
    /// Width to generate.
    pub width: u32,
    /// True when the request exceeded the source and was clamped down.
    pub degraded: bool,
}

impl WidthResolution {
    fn exact(width: u32) -> Self {
        Self {
            width,
            degraded: false,
        }
    }
}

/// Clamp a requested width to the intrinsic width of a raster source.
///
/// `None` means "natural size": the intrinsic width itself. A request wider
/// than the source is degraded to the source width, never upscaled.
///
/// ```
/// # use postpress::imaging::clamp_width;
/// assert_eq!(clamp_width(Some(800), 1600).width, 800);
/// assert_eq!(clamp_width(Some(2000), 1600).width, 1600);
/// assert!(clamp_width(Some(2000), 1600).degraded);
/// assert_eq!(clamp_width(None, 1600).width, 1600);
/// ```
pub fn clamp_width(requested: Option<u32>, intrinsic: u32) -> WidthResolution {
    match requested {
        None => WidthResolution::exact(intrinsic),
        Some(w) if w <= intrinsic => WidthResolution::exact(w),
        Some(_) => WidthResolution {
            width: intrinsic,
            degraded: true,
        },
    }
}

/// True when any requested target is wider than the source.
pub fn is_small_source(targets: &[u32], source_width: u32) -> bool {
    targets.iter().any(|&w| w > source_width)
}

/// Apply the small-source policy to a list of target widths.
///
/// When the source is narrower than some target, every target at or above
/// the source width is dropped and a single target at exactly the source
/// width takes their place. Surviving targets keep their order and the
/// result is never empty.
///
/// ```
/// # use postpress::imaging::apply_small_source_policy;
/// assert_eq!(apply_small_source_policy(&[400, 800, 2000], 1600), vec![400, 800, 1600]);
/// assert_eq!(apply_small_source_policy(&[400, 800], 1600), vec![400, 800]);
/// ```
pub fn apply_small_source_policy(targets: &[u32], source_width: u32) -> Vec<u32> {
    let mut result: Vec<u32> = Vec::with_capacity(targets.len());

    if !is_small_source(targets, source_width) {
        for &w in targets {
            if !result.contains(&w) {
                result.push(w);
            }
        }
    } else {
        for &w in targets.iter().filter(|&&w| w < source_width) {
            if !result.contains(&w) {
                result.push(w);
            }
        }
        result.push(source_width);
    }

    if result.is_empty() {
        result.push(source_width);
    }

    result
}
