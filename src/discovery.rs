use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

/// Every directory under `root` (itself included) that holds a `.git`
/// entry, sorted. Checkouts nested inside another checkout are not
/// reported, and symlinks are not followed.
pub fn discover(root: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut walker = WalkDir::new(root)
        .max_depth(max_depth)
        .follow_links(false)
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }
        if entry.file_name() == ".git" {
            walker.skip_current_dir();
            continue;
        }
        if entry.path().join(".git").exists() {
            found.push(entry.path().to_path_buf());
            walker.skip_current_dir();
        }
    }

    found.sort();
    found
}
