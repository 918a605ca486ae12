//! CLI output formatting for all pipeline stages.
//!
//! Every post is displayed the same way in every stage: a header line with
//! its 1-based position and slug, then indented context lines (source file,
//! image, variant status).
//!
//! # Output Format
//!
//! ## Enrich
//!
//! ```text
//! Posts
//! 001 2024-03-01-hello
//!     Source: _posts/2024-03-01-hello.md
//!     Image: cover.jpg (responsive cover)
//!     Media: /assets/posts/2024-03-01-hello/
//!     Modified: 2024-04-01 09:12:44 +0200
//!
//! Config
//!     config.toml
//! ```
//!
//! ## Process
//!
//! ```text
//! 001 2024-03-01-hello
//!     warning: /assets/posts/2024-03-01-hello/cover.jpg is 1600px wide, 2000px requested
//!     cover-400-1c0ffee5.webp: encoded
//!     cover-800.jpg: cached
//! ```
//!
//! ## Generate
//!
//! ```text
//! 001 2024-03-01-hello → _posts/2024-03-01-hello.md
//!     Image: /generated/assets/posts/2024-03-01-hello/cover-800.jpg
//!
//! Generated 1 post
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::generate::GeneratedPost;
use crate::posts::PostsManifest;
use crate::process::{ProcessEvent, VariantStatus};
use crate::types::PostRecord;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Header line for a post.
fn post_header(index: usize, slug: &str) -> String {
    format!("{} {}", format_index(index), slug)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

// ============================================================================
// Stage 1: Enrich output
// ============================================================================

fn post_context(post: &PostRecord) -> Vec<String> {
    let mut lines = vec![format!("    Source: {}", post.source_path)];
    if let Some(image) = &post.image {
        let detail = if post.cover_responsive {
            " (responsive cover)"
        } else {
            ""
        };
        lines.push(format!("    Image: {}{}", image.path(), detail));
    }
    lines.push(format!("    Media: {}", post.media_subpath));
    if let Some(date) = &post.last_modified_at {
        lines.push(format!("    Modified: {}", date));
    }
    if post.cover_hide {
        lines.push("    Cover hidden".to_string());
    }
    lines
}

/// Format enrich stage output. `has_config_file` tells whether a
/// `config.toml` was found at the site root.
pub fn format_enrich_output(manifest: &PostsManifest, has_config_file: bool) -> Vec<String> {
    let mut lines = vec!["Posts".to_string()];
    if manifest.posts.is_empty() {
        lines.push(format!("    (none in {}/)", manifest.config.posts_dir));
    }
    for (i, post) in manifest.posts.iter().enumerate() {
        lines.push(post_header(i + 1, &post.slug));
        lines.extend(post_context(post));
    }

    lines.push(String::new());
    lines.push("Config".to_string());
    lines.push(if has_config_file {
        "    config.toml".to_string()
    } else {
        "    (stock defaults)".to_string()
    });
    lines
}

pub fn print_enrich_output(manifest: &PostsManifest, has_config_file: bool) {
    for line in format_enrich_output(manifest, has_config_file) {
        println!("{}", line);
    }
}

// ============================================================================
// Stage 2: Process output
// ============================================================================

fn status_label(status: VariantStatus) -> &'static str {
    match status {
        VariantStatus::Encoded => "encoded",
        VariantStatus::Cached => "cached",
        VariantStatus::Copied => "copied",
        VariantStatus::Reused => "reused",
    }
}

/// Format a single process event.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::PostStarted { slug, index, .. } => vec![post_header(index + 1, slug)],
        ProcessEvent::VariantReady { name, status, .. } => {
            vec![format!("    {}: {}", name, status_label(*status))]
        }
        ProcessEvent::Degraded {
            source,
            requested,
            intrinsic,
            ..
        } => vec![format!(
            "    warning: {} is {}px wide, {}px requested",
            source, intrinsic, requested
        )],
        ProcessEvent::Skipped { reason, .. } => vec![format!("    skipped: {}", reason)],
    }
}

// ============================================================================
// Stage 3: Generate output
// ============================================================================

/// Format generate stage output.
pub fn format_generate_output(posts: &[GeneratedPost]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, post) in posts.iter().enumerate() {
        lines.push(format!(
            "{} → {}",
            post_header(i + 1, &post.slug),
            post.path.display()
        ));
        if let Some(image) = &post.image {
            lines.push(format!("    Image: {}", image));
        }
        if let Some(seo) = post.seo_image.as_ref().filter(|s| post.image.as_ref() != Some(*s)) {
            lines.push(format!("    SEO image: {}", seo));
        }
    }
    lines.push(String::new());
    lines.push(format!("Generated {}", plural(posts.len(), "post")));
    lines
}

pub fn print_generate_output(posts: &[GeneratedPost]) {
    for line in format_generate_output(posts) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::types::ImageRef;
    use std::path::PathBuf;

    fn post(slug: &str) -> PostRecord {
        PostRecord {
            source_path: format!("_posts/{slug}.md"),
            slug: slug.into(),
            name: slug.into(),
            title: slug.into(),
            media_subpath: format!("/assets/posts/{slug}/"),
            image: None,
            cover_responsive: false,
            cover_hide: false,
            last_modified_at: None,
            front_matter: Default::default(),
            body: String::new(),
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "post"), "1 post");
        assert_eq!(plural(0, "post"), "0 posts");
        assert_eq!(plural(3, "post"), "3 posts");
    }

    // =========================================================================
    // Enrich
    // =========================================================================

    #[test]
    fn enrich_lists_posts_with_context() {
        let mut p = post("2024-03-01-hello");
        p.image = Some(ImageRef::Path("cover.jpg".into()));
        p.cover_responsive = true;
        p.last_modified_at = Some("2024-04-01".into());
        let manifest = PostsManifest {
            posts: vec![p, post("2024-03-02-second")],
            config: SiteConfig::default(),
        };

        let lines = format_enrich_output(&manifest, true);
        assert_eq!(
            lines,
            vec![
                "Posts",
                "001 2024-03-01-hello",
                "    Source: _posts/2024-03-01-hello.md",
                "    Image: cover.jpg (responsive cover)",
                "    Media: /assets/posts/2024-03-01-hello/",
                "    Modified: 2024-04-01",
                "002 2024-03-02-second",
                "    Source: _posts/2024-03-02-second.md",
                "    Media: /assets/posts/2024-03-02-second/",
                "",
                "Config",
                "    config.toml",
            ]
        );
    }

    #[test]
    fn enrich_without_posts_or_config() {
        let manifest = PostsManifest {
            posts: vec![],
            config: SiteConfig::default(),
        };
        let lines = format_enrich_output(&manifest, false);
        assert_eq!(lines[1], "    (none in _posts/)");
        assert_eq!(lines.last().unwrap(), "    (stock defaults)");
    }

    #[test]
    fn enrich_marks_hidden_cover() {
        let mut p = post("a");
        p.cover_hide = true;
        let manifest = PostsManifest {
            posts: vec![p],
            config: SiteConfig::default(),
        };
        assert!(
            format_enrich_output(&manifest, false)
                .contains(&"    Cover hidden".to_string())
        );
    }

    // =========================================================================
    // Process
    // =========================================================================

    #[test]
    fn process_events_format() {
        assert_eq!(
            format_process_event(&ProcessEvent::PostStarted {
                slug: "2024-01-01-a".into(),
                index: 0,
                total: 3,
            }),
            vec!["001 2024-01-01-a"]
        );
        assert_eq!(
            format_process_event(&ProcessEvent::VariantReady {
                slug: "a".into(),
                name: "cover-800.jpg".into(),
                status: VariantStatus::Cached,
            }),
            vec!["    cover-800.jpg: cached"]
        );
        assert_eq!(
            format_process_event(&ProcessEvent::Degraded {
                slug: "a".into(),
                source: "/a/cover.jpg".into(),
                requested: 2000,
                intrinsic: 1600,
            }),
            vec!["    warning: /a/cover.jpg is 1600px wide, 2000px requested"]
        );
        assert_eq!(
            format_process_event(&ProcessEvent::Skipped {
                slug: "a".into(),
                reason: "remote image https://x/y.png".into(),
            }),
            vec!["    skipped: remote image https://x/y.png"]
        );
    }

    #[test]
    fn every_status_has_a_label() {
        for (status, label) in [
            (VariantStatus::Encoded, "encoded"),
            (VariantStatus::Cached, "cached"),
            (VariantStatus::Copied, "copied"),
            (VariantStatus::Reused, "reused"),
        ] {
            assert_eq!(status_label(status), label);
        }
    }

    // =========================================================================
    // Generate
    // =========================================================================

    #[test]
    fn generate_output_lists_posts() {
        let posts = vec![
            GeneratedPost {
                slug: "2024-01-01-a".into(),
                path: PathBuf::from("_posts/2024-01-01-a.md"),
                image: Some("/g/a-800.jpg".into()),
                seo_image: Some("/g/a-800.jpg".into()),
            },
            GeneratedPost {
                slug: "2024-01-02-v".into(),
                path: PathBuf::from("_posts/2024-01-02-v.md"),
                image: Some("d.svg".into()),
                seo_image: Some("/g/d-1200-abcdef01.png".into()),
            },
        ];
        assert_eq!(
            format_generate_output(&posts),
            vec![
                "001 2024-01-01-a → _posts/2024-01-01-a.md",
                "    Image: /g/a-800.jpg",
                "002 2024-01-02-v → _posts/2024-01-02-v.md",
                "    Image: d.svg",
                "    SEO image: /g/d-1200-abcdef01.png",
                "",
                "Generated 2 posts",
            ]
        );
    }

    #[test]
    fn generate_output_empty() {
        assert_eq!(format_generate_output(&[]), vec!["", "Generated 0 posts"]);
    }
}
