use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Sub-commands the binary defines itself. A command table entry can't shadow them.
pub const RESERVED_COMMANDS: [&str; 5] = ["add", "rm", "ls", "super", "help"];

/// Location of all config. By default
///
/// Linux   :   $XDG_CONFIG_HOME/gita or $HOME/.config/gita
/// macOS   :   $HOME/Library/Application Support/gita
/// Windows :   %AppData%\Roaming\gita
///
/// This can be overridden by setting the GITA_CONFIG_HOME environment variable.
pub fn config_home() -> Result<PathBuf> {
    // Tests point this at a temp dir so they never touch the real registry.
    if let Ok(env_var) = env::var("GITA_CONFIG_HOME") {
        if !env_var.is_empty() {
            return Ok(env_var.into());
        }
    }

    dirs::config_dir()
        .map(|dir| dir.join("gita"))
        .ok_or(Error::NoConfigDir)
}

/// The persisted registry: a path-list-separator joined list of repository paths.
pub fn repo_path_file() -> Result<PathBuf> {
    Ok(config_home()?.join("repo_path"))
}

pub fn commands_file() -> Result<PathBuf> {
    Ok(config_home()?.join("cmds.toml"))
}

/// One row of the delegation table: a sub-command name maps onto a git
/// argument vector.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
pub struct CommandSpec {
    /// Defaults to the sub-command name itself when absent.
    #[serde(default)]
    pub cmd: Option<String>,
    #[serde(default)]
    pub help: String,
    /// Whether the command may run without naming repositories, meaning all of them.
    #[serde(default)]
    pub allow_all: bool,
}

impl CommandSpec {
    fn new(cmd: Option<&str>, help: &str, allow_all: bool) -> Self {
        Self {
            cmd: cmd.map(str::to_string),
            help: help.to_string(),
            allow_all,
        }
    }

    /// The arguments passed to git when this spec is invoked as `name`.
    pub fn git_args(&self, name: &str) -> Vec<String> {
        self.cmd
            .as_deref()
            .unwrap_or(name)
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

/// Declarative table of delegated git commands. Built once at startup and
/// read-only afterwards.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CommandTable {
    commands: BTreeMap<String, CommandSpec>,
}

impl CommandTable {
    pub fn builtin() -> Self {
        let rows = [
            ("branch", CommandSpec::new(Some("branch -vv"), "show local branches", true)),
            ("diff", CommandSpec::new(None, "show differences", true)),
            ("fetch", CommandSpec::new(None, "fetch remote updates", true)),
            ("log", CommandSpec::new(Some("log --oneline -10"), "show recent commits", false)),
            ("pull", CommandSpec::new(None, "pull remote updates", false)),
            ("push", CommandSpec::new(None, "push local updates", false)),
            ("remote", CommandSpec::new(Some("remote -v"), "show remote settings", true)),
            ("st", CommandSpec::new(Some("status"), "show working tree status", true)),
            ("stat", CommandSpec::new(Some("diff --stat"), "show edit statistics", true)),
        ];

        Self {
            commands: rows
                .into_iter()
                .map(|(name, spec)| (name.to_string(), spec))
                .collect(),
        }
    }

    /// Load the built-in table merged with the user's `cmds.toml`.
    pub fn load() -> Result<Self> {
        Self::load_file(&commands_file()?)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let mut table = Self::builtin();

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no user command table");
                return Ok(table);
            }
            Err(e) => return Err(Error::io(path, e)),
        };

        let user: BTreeMap<String, CommandSpec> =
            toml::from_str(&contents).map_err(|source| Error::CommandTable {
                path: path.to_path_buf(),
                source,
            })?;
        table.merge(user);
        Ok(table)
    }

    fn merge(&mut self, user: BTreeMap<String, CommandSpec>) {
        for (name, spec) in user {
            if RESERVED_COMMANDS.contains(&name.as_str()) {
                warn!(command = %name, "ignoring command table entry that shadows a built-in sub-command");
                continue;
            }
            self.commands.insert(name, spec);
        }
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CommandSpec)> {
        self.commands.iter().map(|(name, spec)| (name.as_str(), spec))
    }
}
