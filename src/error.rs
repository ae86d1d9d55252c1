use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a whole invocation.
///
/// Problems with a single repository during a summary never show up here;
/// the inspector turns them into a degraded `RepoStatus` instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error(
        "could not find your config directory; set GITA_CONFIG_HOME to choose one explicitly"
    )]
    NoConfigDir,

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a git repository", .0.display())]
    NotARepository(PathBuf),

    #[error("{0:?} is not valid unicode")]
    NonUnicodePath(PathBuf),

    #[error("unknown repository: {0}")]
    UnknownRepo(String),

    #[error("no command given")]
    EmptyCommand,

    #[error("`{0}` needs at least one repository name")]
    NoRepoSelected(String),

    #[error("malformed command table {}: {source}", path.display())]
    CommandTable {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
