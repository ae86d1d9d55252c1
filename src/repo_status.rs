// src/repo_status.rs
use std::fmt;
use std::path::PathBuf;

/// Why a repository could not be inspected at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoProblem {
    Missing,
    NotARepository,
    InspectionFailed,
}

impl fmt::Display for RepoProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoProblem::Missing => write!(f, "path not found"),
            RepoProblem::NotARepository => write!(f, "not a git repository"),
            RepoProblem::InspectionFailed => write!(f, "inspection failed"),
        }
    }
}

/// Where the checked-out branch stands relative to its upstream.
///
/// `None` covers both "in sync" and "no upstream configured".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpstreamMarker {
    #[default]
    None,
    Ahead,
    Behind,
    Diverged,
}

impl UpstreamMarker {
    pub fn from_counts(behind: u64, ahead: u64) -> Self {
        match (behind > 0, ahead > 0) {
            (true, true) => UpstreamMarker::Diverged,
            (false, true) => UpstreamMarker::Ahead,
            (true, false) => UpstreamMarker::Behind,
            (false, false) => UpstreamMarker::None,
        }
    }
}

/// Point-in-time snapshot of one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoStatus {
    pub name: String,
    pub path: PathBuf,
    pub branch: String,
    /// Any tracked file differs from the last commit, staged or not.
    pub has_local_changes: bool,
    pub has_staged: bool,
    pub has_untracked: bool,
    pub upstream: UpstreamMarker,
    /// Empty when the repository has no commits yet.
    pub last_commit_message: String,
    pub problem: Option<RepoProblem>,
}

impl RepoStatus {
    pub fn unavailable(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        problem: RepoProblem,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            branch: String::new(),
            has_local_changes: false,
            has_staged: false,
            has_untracked: false,
            upstream: UpstreamMarker::None,
            last_commit_message: String::new(),
            problem: Some(problem),
        }
    }

    pub fn is_available(&self) -> bool {
        self.problem.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diverged_is_its_own_state() {
        assert_eq!(UpstreamMarker::from_counts(2, 3), UpstreamMarker::Diverged);
        assert_eq!(UpstreamMarker::from_counts(0, 3), UpstreamMarker::Ahead);
        assert_eq!(UpstreamMarker::from_counts(1, 0), UpstreamMarker::Behind);
        assert_eq!(UpstreamMarker::from_counts(0, 0), UpstreamMarker::None);
    }
}
