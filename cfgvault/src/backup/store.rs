//! Versioned storage for backup artifacts.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use log::{debug, trace};
use tokio::process::Command;

use crate::error::StoreError;

/// Commit-on-change storage for backup artifacts.
///
/// The consumer decides whether to commit; implementations decide how
/// staging and committing work.
pub trait VersionedStore: Send + Sync + 'static {
    /// Handle to an opened repository.
    type Repo: Send + Sync;

    /// Open the repository at `dir`, creating it if needed.
    fn open_or_init(&self, dir: &Path) -> impl Future<Output = Result<Self::Repo, StoreError>> + Send;

    /// Stage `file` for the next commit.
    fn stage(
        &self,
        repo: &Self::Repo,
        file: &Path,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Report staged and unstaged changes.
    fn status(&self, repo: &Self::Repo) -> impl Future<Output = Result<StoreStatus, StoreError>> + Send;

    /// Commit everything staged.
    fn commit(
        &self,
        repo: &Self::Repo,
        message: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Working-tree state of a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStatus {
    /// Modified or untracked, not staged.
    pub unstaged: Vec<String>,

    pub staged: StagedChanges,
}

impl StoreStatus {
    /// Whether a commit would record anything.
    pub fn has_changes(&self) -> bool {
        !self.staged.is_empty()
    }
}

/// Changes staged for the next commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedChanges {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
}

impl StagedChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Parse `git status --porcelain` (v1) output.
pub fn parse_porcelain(text: &str) -> StoreStatus {
    let mut status = StoreStatus::default();

    for line in text.lines() {
        let bytes = line.as_bytes();
        if bytes.len() < 4 {
            continue;
        }
        let (index, worktree) = (bytes[0], bytes[1]);
        let path = &line[3..];
        // Renames are reported as `old -> new`
        let path = path.rsplit(" -> ").next().unwrap_or(path).to_string();

        match index {
            b'A' => status.staged.added.push(path.clone()),
            b'D' => status.staged.removed.push(path.clone()),
            b'M' | b'R' | b'C' | b'T' => status.staged.modified.push(path.clone()),
            _ => {}
        }
        if worktree != b' ' {
            status.unstaged.push(path);
        }
    }

    status
}

/// Git-backed store: one repository per device directory, driven through
/// the `git` executable.
#[derive(Debug, Clone)]
pub struct GitStore {
    author_name: String,
    author_email: String,
}

impl GitStore {
    pub fn new(author_name: impl Into<String>, author_email: impl Into<String>) -> Self {
        Self {
            author_name: author_name.into(),
            author_email: author_email.into(),
        }
    }

    async fn git(&self, dir: &Path, args: &[&str]) -> Result<String, StoreError> {
        trace!("git -C {} {}", dir.display(), args.join(" "));

        let output = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(args)
            .env("GIT_AUTHOR_NAME", &self.author_name)
            .env("GIT_AUTHOR_EMAIL", &self.author_email)
            .env("GIT_COMMITTER_NAME", &self.author_name)
            .env("GIT_COMMITTER_EMAIL", &self.author_email)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| StoreError::Spawn {
                program: "git",
                source,
            })?;

        if !output.status.success() {
            return Err(StoreError::CommandFailed {
                command: format!("git {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl VersionedStore for GitStore {
    type Repo = PathBuf;

    async fn open_or_init(&self, dir: &Path) -> Result<PathBuf, StoreError> {
        if !tokio::fs::try_exists(dir.join(".git")).await? {
            debug!("initialising repository in {}", dir.display());
            self.git(dir, &["init", "--quiet"]).await?;
        }
        Ok(dir.to_path_buf())
    }

    async fn stage(&self, repo: &PathBuf, file: &Path) -> Result<(), StoreError> {
        let relative = file.strip_prefix(repo).unwrap_or(file);
        let relative = relative.to_string_lossy().into_owned();
        self.git(repo, &["add", "--", relative.as_str()]).await?;
        Ok(())
    }

    async fn status(&self, repo: &PathBuf) -> Result<StoreStatus, StoreError> {
        let text = self.git(repo, &["status", "--porcelain"]).await?;
        Ok(parse_porcelain(&text))
    }

    async fn commit(&self, repo: &PathBuf, message: &str) -> Result<(), StoreError> {
        self.git(
            repo,
            &["-c", "commit.gpgsign=false", "commit", "--quiet", "-m", message],
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clean_tree() {
        let status = parse_porcelain("");
        assert!(!status.has_changes());
        assert!(status.unstaged.is_empty());
    }

    #[test]
    fn test_parse_staged_changes() {
        let text = "A  10.0.0.1_conf.txt\nM  old_conf.txt\nD  gone.txt\nR  a.txt -> b.txt\n";
        let status = parse_porcelain(text);

        assert!(status.has_changes());
        assert_eq!(status.staged.added, vec!["10.0.0.1_conf.txt"]);
        assert_eq!(status.staged.modified, vec!["old_conf.txt", "b.txt"]);
        assert_eq!(status.staged.removed, vec!["gone.txt"]);
        assert!(status.unstaged.is_empty());
    }

    #[test]
    fn test_parse_unstaged_only() {
        let status = parse_porcelain(" M 10.0.0.1_conf.txt\n?? notes.txt\n");
        assert!(!status.has_changes());
        assert_eq!(status.unstaged, vec!["10.0.0.1_conf.txt", "notes.txt"]);
    }

    #[test]
    fn test_parse_staged_then_edited() {
        let status = parse_porcelain("MM 10.0.0.1_conf.txt\n");
        assert_eq!(status.staged.modified, vec!["10.0.0.1_conf.txt"]);
        assert_eq!(status.unstaged, vec!["10.0.0.1_conf.txt"]);
    }

    fn git_available() -> bool {
        std::process::Command::new("git")
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    #[tokio::test]
    async fn test_git_store_commits_only_changes() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let store = GitStore::new("cfgvault", "cfgvault@localhost");
        let file = dir.path().join("10.0.0.1_conf.txt");

        let repo = store.open_or_init(dir.path()).await.unwrap();
        assert!(dir.path().join(".git").exists());

        tokio::fs::write(&file, "hostname r1\n").await.unwrap();
        store.stage(&repo, &file).await.unwrap();
        let status = store.status(&repo).await.unwrap();
        assert_eq!(status.staged.added, vec!["10.0.0.1_conf.txt"]);
        store.commit(&repo, "Commit 10.0.0.1").await.unwrap();

        // Same content again: nothing to commit
        tokio::fs::write(&file, "hostname r1\n").await.unwrap();
        store.stage(&repo, &file).await.unwrap();
        assert!(!store.status(&repo).await.unwrap().has_changes());

        tokio::fs::write(&file, "hostname r2\n").await.unwrap();
        store.stage(&repo, &file).await.unwrap();
        let status = store.status(&repo).await.unwrap();
        assert_eq!(status.staged.modified, vec!["10.0.0.1_conf.txt"]);
    }
}
