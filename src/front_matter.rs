//! YAML front matter: splitting, typed reading, and writing back.
//!
//! A post starts with a `---` line, YAML, and a closing `---` (or `...`)
//! line. Everything after the closing fence is the body, kept byte-for-byte.

use crate::types::ImageRef;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Front matter is not closed")]
    Unterminated,
    #[error("Front matter must be a mapping")]
    NotAMapping,
}

/// A Markdown document split into front matter and body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub front_matter: Mapping,
    pub body: String,
}

/// The front matter keys this tool reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostFrontMatter {
    pub title: Option<String>,
    pub image: Option<ImageRef>,
    pub cover_responsive: bool,
    pub cover_hide: bool,
    pub media_subpath: Option<String>,
    /// Legacy spelling of `media_subpath`.
    pub img_path: Option<String>,
    pub last_modified_at: Option<String>,
}

impl PostFrontMatter {
    pub fn from_mapping(mapping: &Mapping) -> Result<Self, FrontMatterError> {
        Ok(serde_yaml::from_value(Value::Mapping(mapping.clone()))?)
    }
}

fn is_fence(line: &str, closing: bool) -> bool {
    let line = line.trim_end_matches(['\r', '\n']).trim_end();
    line == "---" || (closing && line == "...")
}

/// Split raw content into (front matter text, body).
///
/// Documents without an opening fence have no front matter.
pub fn split(content: &str) -> Result<(Option<&str>, &str), FrontMatterError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return Ok((None, content));
    };
    if !is_fence(first, false) {
        return Ok((None, content));
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if is_fence(line, true) {
            let yaml = &content[yaml_start..offset];
            let body = &content[offset + line.len()..];
            return Ok((Some(yaml), body));
        }
        offset += line.len();
    }
    Err(FrontMatterError::Unterminated)
}

/// Parse a document. Empty front matter yields an empty mapping.
pub fn parse(content: &str) -> Result<Document, FrontMatterError> {
    let (yaml, body) = split(content)?;
    let front_matter = match yaml {
        None => Mapping::new(),
        Some(text) if text.trim().is_empty() => Mapping::new(),
        Some(text) => match serde_yaml::from_str::<Value>(text)? {
            Value::Mapping(m) => m,
            Value::Null => Mapping::new(),
            _ => return Err(FrontMatterError::NotAMapping),
        },
    };
    Ok(Document {
        front_matter,
        body: body.to_string(),
    })
}

/// Render front matter and body back into a Markdown document.
pub fn render(front_matter: &Mapping, body: &str) -> Result<String, FrontMatterError> {
    let yaml = if front_matter.is_empty() {
        String::new()
    } else {
        serde_yaml::to_string(front_matter)?
    };
    Ok(format!("---\n{}---\n{}", yaml, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST: &str = "---\ntitle: Hello\nimage: cover.jpg\ncover_responsive: true\n---\n\nBody text.\n";

    #[test]
    fn split_finds_fences() {
        let (yaml, body) = split(POST).unwrap();
        assert_eq!(
            yaml,
            Some("title: Hello\nimage: cover.jpg\ncover_responsive: true\n")
        );
        assert_eq!(body, "\nBody text.\n");
    }

    #[test]
    fn split_without_front_matter() {
        let (yaml, body) = split("# Just markdown\n").unwrap();
        assert_eq!(yaml, None);
        assert_eq!(body, "# Just markdown\n");
    }

    #[test]
    fn split_handles_crlf_and_dots() {
        let (yaml, body) = split("---\r\na: 1\r\n...\r\nbody").unwrap();
        assert_eq!(yaml, Some("a: 1\r\n"));
        assert_eq!(body, "body");
    }

    #[test]
    fn split_unterminated_is_error() {
        assert!(matches!(
            split("---\ntitle: x\n"),
            Err(FrontMatterError::Unterminated)
        ));
    }

    #[test]
    fn parse_reads_typed_fields() {
        let doc = parse(POST).unwrap();
        let fm = PostFrontMatter::from_mapping(&doc.front_matter).unwrap();
        assert_eq!(fm.title.as_deref(), Some("Hello"));
        assert_eq!(fm.image, Some(ImageRef::Path("cover.jpg".into())));
        assert!(fm.cover_responsive);
        assert!(!fm.cover_hide);
        assert_eq!(fm.media_subpath, None);
    }

    #[test]
    fn parse_empty_front_matter() {
        let doc = parse("---\n---\nbody").unwrap();
        assert!(doc.front_matter.is_empty());
        assert_eq!(doc.body, "body");
    }

    #[test]
    fn parse_rejects_scalar_front_matter() {
        assert!(matches!(
            parse("---\njust a string\n---\n"),
            Err(FrontMatterError::NotAMapping)
        ));
    }

    #[test]
    fn parse_keeps_unknown_keys() {
        let doc = parse("---\ntags: [a, b]\nlayout: post\n---\n").unwrap();
        assert_eq!(doc.front_matter.len(), 2);
        assert!(doc.front_matter.contains_key("layout"));
    }

    #[test]
    fn render_then_parse_preserves_body() {
        let doc = parse(POST).unwrap();
        let text = render(&doc.front_matter, &doc.body).unwrap();
        assert!(text.starts_with("---\n"));
        let again = parse(&text).unwrap();
        assert_eq!(again.front_matter, doc.front_matter);
        assert_eq!(again.body, doc.body);
    }
}
