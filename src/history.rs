//! Last-modified dates from version control.
//!
//! A post whose file has been committed more than once gets the date of its
//! latest commit as `last_modified_at`. The first commit is the publication
//! itself, so a single commit means "never modified".
//!
//! Git is optional: a missing binary, a site outside a repository, or an
//! untracked file all read as "no history".

use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Source of per-file revision history.
pub trait RevisionHistory: Sync {
    /// ISO date of the latest change to `path`, if it was modified after
    /// being added.
    fn last_modified(&self, path: &Path) -> Option<String>;
}

/// History read from the `git` command line, run in `repo_root`.
#[derive(Debug, Clone)]
pub struct GitHistory {
    repo_root: PathBuf,
}

impl GitHistory {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    fn git(&self, args: &[&str], path: &Path) -> Option<String> {
        let output = match Command::new("git")
            .current_dir(&self.repo_root)
            .args(args)
            .arg(path)
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                debug!(error = %e, "git not available");
                return None;
            }
        };
        if !output.status.success() {
            debug!(
                path = %path.display(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "git {} failed",
                args.first().copied().unwrap_or_default()
            );
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl RevisionHistory for GitHistory {
    fn last_modified(&self, path: &Path) -> Option<String> {
        let count = self.git(&["rev-list", "--count", "HEAD", "--"], path)?;
        if parse_commit_count(&count) <= 1 {
            return None;
        }
        let date = self.git(&["log", "-1", "--pretty=%ad", "--date=iso", "--"], path)?;
        (!date.is_empty()).then_some(date)
    }
}

/// History that knows nothing. Used when git lookups are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHistory;

impl RevisionHistory for NoHistory {
    fn last_modified(&self, _path: &Path) -> Option<String> {
        None
    }
}

/// `git rev-list --count` output as a number. Garbage reads as zero.
fn parse_commit_count(raw: &str) -> u32 {
    raw.trim().parse().unwrap_or(0)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Fixed history keyed by file name.
    #[derive(Default)]
    pub struct FakeHistory {
        dates: HashMap<String, String>,
    }

    impl FakeHistory {
        pub fn with(entries: &[(&str, &str)]) -> Self {
            Self {
                dates: entries
                    .iter()
                    .map(|(name, date)| (name.to_string(), date.to_string()))
                    .collect(),
            }
        }
    }

    impl RevisionHistory for FakeHistory {
        fn last_modified(&self, path: &Path) -> Option<String> {
            let name = path.file_name()?.to_str()?;
            self.dates.get(name).cloned()
        }
    }

    #[test]
    fn commit_count_parsing() {
        assert_eq!(parse_commit_count("3\n"), 3);
        assert_eq!(parse_commit_count(""), 0);
        assert_eq!(parse_commit_count("fatal: not a git repository"), 0);
    }

    #[test]
    fn no_history_is_empty() {
        assert_eq!(NoHistory.last_modified(Path::new("_posts/a.md")), None);
    }

    #[test]
    fn git_outside_repository_yields_none() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.md"), "x").unwrap();
        let history = GitHistory::new(tmp.path());
        assert_eq!(history.last_modified(Path::new("a.md")), None);
    }

    /// Run git in `dir` with a fixed identity and commit date.
    fn git(dir: &Path, args: &[&str], date: &str) {
        let status = Command::new("git")
            .current_dir(dir)
            .args([
                "-c",
                "user.name=Postpress Test",
                "-c",
                "user.email=test@example.com",
                "-c",
                "commit.gpgsign=false",
            ])
            .args(args)
            .env("GIT_AUTHOR_DATE", date)
            .env("GIT_COMMITTER_DATE", date)
            .status()
            .unwrap();
        assert!(status.success(), "git {:?} failed", args);
    }

    #[test]
    fn git_dates_only_files_modified_after_first_commit() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path();
        let post = Path::new("_posts/2024-01-01-a.md");
        std::fs::create_dir_all(root.join("_posts")).unwrap();
        std::fs::write(root.join(post), "first\n").unwrap();

        git(root, &["init", "-q"], "2024-01-01T09:00:00+0000");
        git(root, &["add", "."], "2024-01-01T09:00:00+0000");
        git(
            root,
            &["commit", "-q", "-m", "publish"],
            "2024-01-01T09:00:00+0000",
        );

        let history = GitHistory::new(root);
        assert_eq!(history.last_modified(post), None);

        std::fs::write(root.join(post), "second\n").unwrap();
        git(
            root,
            &["commit", "-q", "-a", "-m", "edit"],
            "2024-02-02T10:00:00+0000",
        );
        assert_eq!(
            history.last_modified(post).as_deref(),
            Some("2024-02-02 10:00:00 +0000")
        );

        std::fs::write(root.join("_posts/untracked.md"), "x").unwrap();
        assert_eq!(
            history.last_modified(Path::new("_posts/untracked.md")),
            None
        );
    }

    #[test]
    fn fake_history_matches_by_file_name() {
        let h = FakeHistory::with(&[("2024-01-01-a.md", "2024-02-02 10:00:00 +0000")]);
        assert_eq!(
            h.last_modified(Path::new("/site/_posts/2024-01-01-a.md")).as_deref(),
            Some("2024-02-02 10:00:00 +0000")
        );
        assert_eq!(h.last_modified(Path::new("other.md")), None);
    }
}
