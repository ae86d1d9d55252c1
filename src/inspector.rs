use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use tokio::process::Command;
use tracing::{debug, warn};

use crate::registry::Entry;
use crate::repo_status::{RepoProblem, RepoStatus, UpstreamMarker};

/// Shown when neither a branch name nor a commit id can be read.
pub const UNKNOWN_BRANCH: &str = "(unknown)";

/// Produces a status snapshot for one repository.
///
/// Implementations must never fail: anything that goes wrong is folded into
/// the returned `RepoStatus`.
pub trait Inspect: Send + Sync + 'static {
    fn inspect(&self, entry: &Entry) -> impl Future<Output = RepoStatus> + Send;
}

/// Inspects a checkout by running read-only `git` child processes.
#[derive(Debug, Clone)]
pub struct GitInspector {
    git: PathBuf,
}

impl Default for GitInspector {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitInspector {
    pub fn new(git: impl Into<PathBuf>) -> Self {
        Self { git: git.into() }
    }

    async fn run(&self, dir: &Path, args: &[&str]) -> Option<Output> {
        debug!(dir = %dir.display(), ?args, "running git");
        let output = Command::new(&self.git)
            .args(args)
            .current_dir(dir)
            // read-only queries must not take the index lock
            .env("GIT_OPTIONAL_LOCKS", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) => Some(output),
            Err(e) => {
                warn!(dir = %dir.display(), ?args, error = %e, "failed to run git");
                None
            }
        }
    }

    /// Trimmed stdout of a successful run.
    async fn read(&self, dir: &Path, args: &[&str]) -> Option<String> {
        let output = self.run(dir, args).await?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Falls back to a short commit id on a detached head.
    async fn branch(&self, dir: &Path) -> String {
        if let Some(name) = self
            .read(dir, &["symbolic-ref", "--quiet", "--short", "HEAD"])
            .await
            .filter(|s| !s.is_empty())
        {
            return name;
        }

        self.read(dir, &["rev-parse", "--short", "HEAD"])
            .await
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_BRANCH.to_string())
    }

    /// `git diff --quiet` exits 1 when there are differences.
    async fn differs(&self, dir: &Path, cached: bool) -> bool {
        let args: &[&str] = if cached {
            &["diff", "--cached", "--quiet"]
        } else {
            &["diff", "--quiet"]
        };

        match self.run(dir, args).await.and_then(|o| o.status.code()) {
            Some(0) => false,
            Some(1) => true,
            code => {
                warn!(dir = %dir.display(), ?code, cached, "dirty check failed");
                false
            }
        }
    }

    async fn has_untracked(&self, dir: &Path) -> bool {
        self.read(dir, &["ls-files", "--others", "--exclude-standard"])
            .await
            .map(|s| !s.is_empty())
            .unwrap_or(false)
    }

    async fn upstream(&self, dir: &Path) -> UpstreamMarker {
        self.read(
            dir,
            &["rev-list", "--left-right", "--count", "@{upstream}...HEAD"],
        )
        .await
        .and_then(|counts| parse_left_right(&counts))
        .map(|(behind, ahead)| UpstreamMarker::from_counts(behind, ahead))
        .unwrap_or_default()
    }

    /// Empty when there are no commits yet.
    async fn last_commit_message(&self, dir: &Path) -> String {
        self.read(dir, &["log", "-1", "--format=%s"])
            .await
            .unwrap_or_default()
    }
}

impl Inspect for GitInspector {
    fn inspect(&self, entry: &Entry) -> impl Future<Output = RepoStatus> + Send {
        async move {
            let dir = entry.path.as_path();
            if !dir.is_dir() {
                return RepoStatus::unavailable(&entry.name, dir, RepoProblem::Missing);
            }
            // git that won't start says nothing about the checkout itself
            match self.run(dir, &["rev-parse", "--git-dir"]).await {
                None => {
                    return RepoStatus::unavailable(&entry.name, dir, RepoProblem::InspectionFailed)
                }
                Some(output) if !output.status.success() => {
                    return RepoStatus::unavailable(&entry.name, dir, RepoProblem::NotARepository)
                }
                Some(_) => {}
            }

            let (branch, unstaged, staged, has_untracked, upstream, last_commit_message) = tokio::join!(
                self.branch(dir),
                self.differs(dir, false),
                self.differs(dir, true),
                self.has_untracked(dir),
                self.upstream(dir),
                self.last_commit_message(dir),
            );

            RepoStatus {
                name: entry.name.clone(),
                path: entry.path.clone(),
                branch,
                has_local_changes: unstaged || staged,
                has_staged: staged,
                has_untracked,
                upstream,
                last_commit_message,
                problem: None,
            }
        }
    }
}

/// Parses `git rev-list --left-right --count` output into `(behind, ahead)`.
fn parse_left_right(counts: &str) -> Option<(u64, u64)> {
    let mut parts = counts.split_whitespace();
    let behind = parts.next()?.parse().ok()?;
    let ahead = parts.next()?.parse().ok()?;
    Some((behind, ahead))
}
