use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use git2::Repository;
use tracing::{debug, info};

use crate::config;
use crate::error::{Error, Result};
use crate::repo_status::RepoProblem;

/// Separator used between paths in the persisted list, same as in `$PATH`.
pub const LIST_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub path: PathBuf,
    /// Set at load time when the path is gone or no longer a checkout. Such
    /// entries are kept so the summary can show them.
    pub problem: Option<RepoProblem>,
}

/// Ordered name -> path mapping of registered repositories.
///
/// Loaded once per invocation and passed around explicitly. Only `add` and
/// `remove` mutate it, and both rewrite the persisted list in full.
#[derive(Debug)]
pub struct Registry {
    file: PathBuf,
    entries: Vec<Entry>,
}

impl Registry {
    /// Load the registry from the default location, see [`config::repo_path_file`].
    pub fn load() -> Result<Self> {
        Self::load_file(config::repo_path_file()?)
    }

    /// A missing file is an empty registry.
    pub fn load_file(file: impl Into<PathBuf>) -> Result<Self> {
        let file = file.into();
        let paths = match fs::read_to_string(&file) {
            Ok(contents) => parse_path_list(&contents),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(file = %file.display(), "no registry file yet");
                vec![]
            }
            Err(e) => return Err(Error::io(file, e)),
        };
        Ok(Self::from_paths(file, paths))
    }

    fn from_paths(file: PathBuf, paths: Vec<PathBuf>) -> Self {
        let mut seen = HashSet::new();
        let paths: Vec<PathBuf> = paths
            .into_iter()
            .filter(|path| seen.insert(path.clone()))
            .collect();

        let entries = assign_names(&paths)
            .into_iter()
            .zip(paths)
            .map(|(name, path)| {
                let problem = check_repo(&path);
                Entry {
                    name,
                    path,
                    problem,
                }
            })
            .collect();

        Self { file, entries }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register checkouts. Every path has to be an existing git checkout,
    /// otherwise nothing is added. Paths already registered are skipped.
    /// Returns the entries that were actually added.
    pub fn add<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<Vec<Entry>> {
        let mut known: HashSet<PathBuf> = self.entries.iter().map(|e| e.path.clone()).collect();
        let mut fresh = Vec::new();

        for path in paths {
            let path = normalize(path.as_ref())?;
            if known.insert(path.clone()) {
                fresh.push(path);
            } else {
                debug!(path = %path.display(), "already registered");
            }
        }

        if fresh.is_empty() {
            return Ok(vec![]);
        }

        let mut all = self.paths();
        all.extend(fresh.iter().cloned());
        let updated = Self::from_paths(self.file.clone(), all);
        updated.save()?;
        *self = updated;

        info!(count = fresh.len(), "registered repositories");
        Ok(self
            .entries
            .iter()
            .filter(|e| fresh.contains(&e.path))
            .cloned()
            .collect())
    }

    /// Unregister a repository by name. The persisted list is left alone
    /// when the name is unknown.
    pub fn remove(&mut self, name: &str) -> Result<Entry> {
        let index = self
            .entries
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| Error::UnknownRepo(name.to_string()))?;

        let mut paths = self.paths();
        let path = paths.remove(index);
        let updated = Self::from_paths(self.file.clone(), paths);
        updated.save()?;

        let removed = self.entries.remove(index);
        *self = updated;
        info!(name = %removed.name, path = %path.display(), "unregistered repository");
        Ok(removed)
    }

    /// Pick the repositories a command runs against. No names means all of
    /// them, but only for commands that allow it.
    pub fn select(&self, names: &[String], allow_all: bool, command: &str) -> Result<Vec<Entry>> {
        if names.is_empty() {
            return if allow_all {
                Ok(self.entries.clone())
            } else {
                Err(Error::NoRepoSelected(command.to_string()))
            };
        }

        let mut selected: Vec<Entry> = Vec::with_capacity(names.len());
        for name in names {
            let entry = self
                .get(name)
                .ok_or_else(|| Error::UnknownRepo(name.clone()))?;
            if !selected.iter().any(|e| e.name == entry.name) {
                selected.push(entry.clone());
            }
        }
        Ok(selected)
    }

    fn paths(&self) -> Vec<PathBuf> {
        self.entries.iter().map(|e| e.path.clone()).collect()
    }

    /// Write to a sibling temp file, then rename over the real one. On failure
    /// the real file is untouched and the temp file is cleaned up.
    fn save(&self) -> Result<()> {
        if let Some(dir) = self.file.parent() {
            fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }

        let contents = render_path_list(&self.paths());
        let tmp = self.file.with_extension("tmp");
        if let Err(e) = fs::write(&tmp, contents) {
            let _ = fs::remove_file(&tmp);
            return Err(Error::io(&tmp, e));
        }
        if let Err(e) = fs::rename(&tmp, &self.file) {
            let _ = fs::remove_file(&tmp);
            return Err(Error::io(&self.file, e));
        }

        debug!(file = %self.file.display(), count = self.entries.len(), "wrote registry");
        Ok(())
    }
}

pub fn parse_path_list(contents: &str) -> Vec<PathBuf> {
    contents
        .split(|c| c == LIST_SEPARATOR || c == '\n' || c == '\r')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn render_path_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.to_string_lossy())
        .collect::<Vec<_>>()
        .join(&LIST_SEPARATOR.to_string())
}

/// Absolute, symlink-free and unicode, or an error.
fn normalize(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        return Err(Error::NotARepository(path.to_path_buf()));
    }
    let abs = fs::canonicalize(path).map_err(|e| Error::io(path, e))?;
    if abs.to_str().is_none() {
        return Err(Error::NonUnicodePath(abs));
    }
    if Repository::open(&abs).is_err() {
        return Err(Error::NotARepository(abs));
    }
    Ok(abs)
}

fn check_repo(path: &Path) -> Option<RepoProblem> {
    if !path.is_dir() {
        Some(RepoProblem::Missing)
    } else if Repository::open(path).is_err() {
        Some(RepoProblem::NotARepository)
    } else {
        None
    }
}

/// Names are the last path segment. A later path whose segment is already
/// taken walks up its parents until a `/`-joined suffix is free; the first
/// path to claim a name keeps it.
fn assign_names(paths: &[PathBuf]) -> Vec<String> {
    let mut taken = HashSet::new();
    let mut names = Vec::with_capacity(paths.len());

    for path in paths {
        let segments: Vec<String> = path
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        let name = (1..=segments.len())
            .map(|n| segments[segments.len() - n..].join("/"))
            .find(|candidate| !taken.contains(candidate))
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        taken.insert(name.clone());
        names.push(name);
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(raw: &[&str]) -> Vec<PathBuf> {
        raw.iter().map(|s| PathBuf::from(*s)).collect()
    }

    #[test]
    fn parses_separated_list() {
        let list = format!("/a/bcd/repo1{0}/e/fgh/repo2{0}\n", LIST_SEPARATOR);
        assert_eq!(parse_path_list(&list), paths(&["/a/bcd/repo1", "/e/fgh/repo2"]));
        assert!(parse_path_list("").is_empty());
        assert!(parse_path_list("  \n").is_empty());
    }

    #[test]
    fn names_are_last_segment() {
        let names = assign_names(&paths(&["/a/bcd/repo1", "/e/fgh/repo2"]));
        assert_eq!(names, vec!["repo1", "repo2"]);
    }

    #[test]
    fn clashing_names_take_parent_dirs() {
        let names = assign_names(&paths(&["/a/bcd/repo1", "/e/fgh/repo2", "/root/x/repo1"]));
        assert_eq!(names, vec!["repo1", "repo2", "x/repo1"]);

        let names = assign_names(&paths(&["/a/x/r", "/b/x/r", "/c/x/r"]));
        assert_eq!(names, vec!["r", "x/r", "c/x/r"]);
    }

    #[test]
    fn duplicate_paths_collapse() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::from_paths(
            dir.path().join("repo_path"),
            paths(&["/nowhere/a", "/nowhere/b", "/nowhere/a"]),
        );
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn missing_paths_are_flagged_not_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain");
        fs::create_dir(&plain).unwrap();

        let registry = Registry::from_paths(
            dir.path().join("repo_path"),
            vec![dir.path().join("gone"), plain],
        );
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.entries()[0].problem, Some(RepoProblem::Missing));
        assert_eq!(registry.entries()[1].problem, Some(RepoProblem::NotARepository));
    }

    #[test]
    fn select_filters_in_given_order() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::from_paths(
            dir.path().join("repo_path"),
            paths(&["/n/a", "/n/b", "/n/c"]),
        );

        let all = registry.select(&[], true, "fetch").unwrap();
        assert_eq!(all.len(), 3);

        let picked = registry
            .select(&["c".to_string(), "a".to_string(), "c".to_string()], false, "push")
            .unwrap();
        let names: Vec<_> = picked.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a"]);

        assert!(matches!(
            registry.select(&[], false, "push"),
            Err(Error::NoRepoSelected(_))
        ));
        assert!(matches!(
            registry.select(&["zzz".to_string()], true, "fetch"),
            Err(Error::UnknownRepo(_))
        ));
    }
}
