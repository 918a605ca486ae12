//! Template filters over page image context.
//!
//! Filters are looked up by name in a [`FilterRegistry`] built once at
//! startup and handed to whatever renders templates (here, the generate
//! stage). Nothing registers itself globally.
//!
//! | Filter | Input | Output |
//! |--------|-------|--------|
//! | `media_url` | `cover.jpg` | `/assets/posts/{slug}/cover.jpg` |
//! | `seo_image` | `diagram.svg` | rasterized stand-in for vector images, else `media_url` |

use crate::imaging::ImageFormat;
use crate::naming::join_media_path;
use crate::types::PageImageContext;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterError {
    #[error("Unknown filter: {0}")]
    Unknown(String),
}

type FilterFn = Box<dyn Fn(&str, &PageImageContext) -> String + Send + Sync>;

/// Named filters available to templates.
#[derive(Default)]
pub struct FilterRegistry {
    filters: BTreeMap<String, FilterFn>,
}

impl FilterRegistry {
    /// A registry with no filters.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with `media_url` and `seo_image`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("media_url", media_url);
        registry.register("seo_image", seo_image);
        registry
    }

    /// Add or replace a filter.
    pub fn register<F>(&mut self, name: impl Into<String>, filter: F)
    where
        F: Fn(&str, &PageImageContext) -> String + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Box::new(filter));
    }

    pub fn apply(
        &self,
        name: &str,
        input: &str,
        context: &PageImageContext,
    ) -> Result<String, FilterError> {
        let filter = self
            .filters
            .get(name)
            .ok_or_else(|| FilterError::Unknown(name.to_string()))?;
        Ok(filter(input, context))
    }

    /// Registered filter names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }
}

/// Resolve a media reference against the page's media directory.
pub fn media_url(input: &str, context: &PageImageContext) -> String {
    join_media_path(&context.media_subpath, input)
}

/// The image crawlers should see for `input`.
pub fn seo_image(input: &str, context: &PageImageContext) -> String {
    let is_vector = ImageFormat::from_path(Path::new(input)).is_some_and(ImageFormat::is_vector);
    match (&context.seo_image, is_vector) {
        (Some(stand_in), true) => stand_in.clone(),
        _ => media_url(input, context),
    }
}
