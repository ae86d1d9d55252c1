#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use git2::{Commit, Oid, Repository, RepositoryInitOptions, Signature};

/// A throwaway checkout on branch `main`.
pub struct GitRepo {
    pub repo: Repository,
    pub dir: PathBuf,
}

impl GitRepo {
    pub fn init(dir: &Path) -> Self {
        fs::create_dir_all(dir).unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(dir, &opts).unwrap();
        Self {
            repo,
            dir: fs::canonicalize(dir).unwrap(),
        }
    }

    pub fn write_file(&self, name: &str, contents: &str) {
        fs::write(self.dir.join(name), contents).unwrap();
    }

    pub fn stage(&self, name: &str) {
        let mut index = self.repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
    }

    /// Write, stage and commit `name` on the checked-out branch.
    pub fn commit_file(&self, name: &str, contents: &str, message: &str) -> Oid {
        self.write_file(name, contents);
        self.stage(name);
        self.commit_index("HEAD", message)
    }

    /// Commit the current index onto `reference`, whose tip is the parent.
    pub fn commit_index(&self, reference: &str, message: &str) -> Oid {
        let mut index = self.repo.index().unwrap();
        let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();

        let parent = self
            .repo
            .find_reference(reference)
            .ok()
            .and_then(|r| r.peel_to_commit().ok());
        let parents: Vec<&Commit> = parent.iter().collect();

        self.repo
            .commit(Some(reference), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }
}
