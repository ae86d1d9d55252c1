use std::env;

use console::Style;

use crate::repo_status::{RepoStatus, UpstreamMarker};

/// Styles used to color the branch column.
#[derive(Debug, Clone)]
pub struct Palette {
    pub dirty: Style,
    pub clean: Style,
    pub error: Style,
}

impl Palette {
    fn styled(enabled: bool) -> Self {
        Palette {
            dirty: Style::new().red().force_styling(enabled),
            clean: Style::new().green().force_styling(enabled),
            error: Style::new().yellow().force_styling(enabled),
        }
    }

    pub fn fancy() -> Self {
        Self::styled(true)
    }

    pub fn plain() -> Self {
        Self::styled(false)
    }

    pub fn detect() -> Self {
        // Explicit overrides first
        if env::var_os("GITA_PLAIN_TEXT").is_some() {
            return Self::plain();
        }
        if env::var_os("GITA_FANCY").is_some() {
            return Self::fancy();
        }

        if env::var_os("NO_COLOR").is_some() {
            return Self::plain();
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return Self::plain();
        }
        if env::var("TERM").is_ok_and(|v| v.eq_ignore_ascii_case("dumb")) {
            return Self::plain();
        }

        // Pipes, redirects and terminals without color support
        Self::styled(console::Term::stdout().features().colors_supported())
    }
}

/// Fixed four-column status marker: dirty, staged, untracked, upstream.
pub fn glyph(status: &RepoStatus) -> String {
    if status.problem.is_some() {
        return "!   ".to_string();
    }

    let upstream = match status.upstream {
        UpstreamMarker::None => ' ',
        UpstreamMarker::Ahead => '↑',
        UpstreamMarker::Behind => '↓',
        UpstreamMarker::Diverged => '⇕',
    };

    [
        if status.has_local_changes { '*' } else { ' ' },
        if status.has_staged { '+' } else { ' ' },
        if status.has_untracked { '_' } else { ' ' },
        upstream,
    ]
    .iter()
    .collect()
}

/// The branch column. Unavailable repositories show what went wrong.
fn branch_column(status: &RepoStatus) -> String {
    match status.problem {
        Some(problem) => problem.to_string(),
        None => status.branch.clone(),
    }
}

/// One line per snapshot, in the order given. Name and branch columns are
/// padded to the widest value in this batch.
pub fn render(statuses: &[RepoStatus], palette: &Palette) -> Vec<String> {
    let branches: Vec<String> = statuses.iter().map(branch_column).collect();
    let name_width = statuses
        .iter()
        .map(|s| s.name.chars().count())
        .max()
        .unwrap_or(0);
    let branch_width = branches.iter().map(|b| b.chars().count()).max().unwrap_or(0);

    statuses
        .iter()
        .zip(&branches)
        .map(|(status, branch)| {
            let (style, message) = match status.problem {
                Some(_) => (&palette.error, status.path.display().to_string()),
                None if status.has_local_changes => {
                    (&palette.dirty, status.last_commit_message.clone())
                }
                None => (&palette.clean, status.last_commit_message.clone()),
            };

            let segment = style.apply_to(format!("{branch:<branch_width$} {}", glyph(status)));
            let line = format!("{name:<name_width$} {segment} {message}", name = status.name);
            line.trim_end().to_string()
        })
        .collect()
}
