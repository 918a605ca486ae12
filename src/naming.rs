//! Centralized filename parsing for posts and media paths.
//!
//! Posts follow the `YYYY-MM-DD-title.md` convention. The **slug** of a post
//! is its file stem with leading/trailing slashes trimmed, date included:
//! it keys the post's media directory (`/assets/posts/{slug}/`) and its
//! generated variant directory. The date-free form is only used for display.
//!
//! - `2024-03-01-hello-world.md` → slug `2024-03-01-hello-world`, title part `hello-world`
//! - `draft.md` → slug `draft`, no date

/// Result of parsing a post filename stem like `2024-03-01-hello-world`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPostName {
    /// Full slug (stem, date included).
    pub slug: String,
    /// `YYYY-MM-DD` prefix if present.
    pub date: Option<String>,
    /// Slug with the date prefix removed.
    pub name: String,
}

/// Clean a post's stem into its slug: strip leading and trailing `/`.
pub fn clean_slug(stem: &str) -> String {
    stem.trim_matches('/').to_string()
}

/// Parse a post stem following the `YYYY-MM-DD-name` convention.
///
/// - `"2024-03-01-hello-world"` → date=Some("2024-03-01"), name="hello-world"
/// - `"2024-03-01"` → date=None, name="2024-03-01" (no title part)
/// - `"hello"` → date=None, name="hello"
pub fn parse_post_name(stem: &str) -> ParsedPostName {
    let slug = clean_slug(stem);
    if let Some((date, rest)) = split_date_prefix(&slug) {
        return ParsedPostName {
            date: Some(date.to_string()),
            name: rest.to_string(),
            slug,
        };
    }
    ParsedPostName {
        date: None,
        name: slug.clone(),
        slug,
    }
}

/// Split a `YYYY-MM-DD-` prefix off `s`. The remainder must be non-empty.
fn split_date_prefix(s: &str) -> Option<(&str, &str)> {
    let bytes = s.as_bytes();
    if bytes.len() <= 11 || bytes[10] != b'-' {
        return None;
    }
    let shape_ok = bytes[..10].iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    shape_ok.then(|| (&s[..10], &s[11..]))
}

/// Default media directory for a post slug.
pub fn default_media_subpath(slug: &str) -> String {
    format!("/assets/posts/{}/", slug)
}

/// Join a media-relative path under a media subpath.
///
/// Absolute (`/…`) and remote (`scheme://…`) paths are returned unchanged.
pub fn join_media_path(media_subpath: &str, path: &str) -> String {
    if is_absolute_ref(path) {
        return path.to_string();
    }
    let base = media_subpath.trim_end_matches('/');
    let rel = path.trim_start_matches("./");
    if base.is_empty() {
        format!("/{}", rel)
    } else {
        format!("{}/{}", base, rel)
    }
}

/// True for site-absolute paths and remote URLs.
pub fn is_absolute_ref(path: &str) -> bool {
    path.starts_with('/') || is_remote(path)
}

/// True for `scheme://` URLs and protocol-relative `//host` references.
pub fn is_remote(path: &str) -> bool {
    path.starts_with("//") || path.contains("://")
}
