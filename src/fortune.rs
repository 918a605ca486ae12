//! Random fortune quotes.
//!
//! Fortunes come from a classic `fortune(6)` data file: entries separated by
//! lines holding a single `%`. The file's last segment (after the final
//! separator) is dropped, as are entries containing an excluded phrase.
//!
//! Entries are hard-wrapped for an 80-column terminal. [`reflow`] joins the
//! wrapped lines back into paragraphs and wraps them again for the display
//! width, keeping indented blocks (code, attributions) intact.

use rand::Rng;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FortuneError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("No fortunes left after filtering")]
    Empty,
}

/// Widest text block, in columns, before the speech-bubble border.
const MAX_COLUMNS: usize = 70;

/// One column of slack plus the 4-column speech-bubble border.
const BORDER_COLUMNS: usize = 5;

/// Stand-in for indentation while text is re-wrapped. No-break spaces are
/// one column each and never a break point, so the indent is measured and
/// stays glued to the word after it.
const FAKE_TAB: &str = "\u{a0}\u{a0}\u{a0}\u{a0}";

/// A newline inside a sentence: not after `.`, `*`, `)` or a blank line
/// (but after `..`), and followed by a word or a quote.
static SOFT_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([^.*\n)]|\.\.)\n[ \t]*([\w"])"#).expect("valid regex"));

static INDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"    |\t").expect("valid regex"));

static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").expect("valid regex"));

/// Split raw fortune file content into entries.
pub fn parse_fortunes(raw: &str, exclude: &[String]) -> Vec<String> {
    let raw = raw.replace('\r', "");
    let mut segments: Vec<&str> = raw.split("\n%\n").collect();
    segments.pop();
    segments
        .into_iter()
        .filter(|entry| !exclude.iter().any(|phrase| entry.contains(phrase.as_str())))
        .map(str::to_string)
        .collect()
}

/// Read and parse a fortune file.
pub fn load_fortunes(path: &Path, exclude: &[String]) -> Result<Vec<String>, FortuneError> {
    let raw = std::fs::read_to_string(path).map_err(|source| FortuneError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_fortunes(&raw, exclude))
}

/// Text width available in a display `columns` wide.
pub fn column_budget(columns: usize) -> usize {
    columns.min(MAX_COLUMNS).saturating_sub(BORDER_COLUMNS)
}

/// Re-wrap a hard-wrapped fortune to `width` columns.
pub fn reflow(text: &str, width: usize) -> String {
    let joined = SOFT_BREAK.replace_all(text, "$1 $2");
    let protected = INDENT.replace_all(&joined, FAKE_TAB);
    let collapsed = SPACES.replace_all(&protected, " ");
    let wrapped = textwrap::fill(&collapsed, width.max(1));
    wrapped.replace(FAKE_TAB, "    ")
}

/// Pick one fortune uniformly at random.
pub fn pick<'a, R: Rng + ?Sized>(
    fortunes: &'a [String],
    rng: &mut R,
) -> Result<&'a str, FortuneError> {
    if fortunes.is_empty() {
        return Err(FortuneError::Empty);
    }
    Ok(&fortunes[rng.random_range(0..fortunes.len())])
}
