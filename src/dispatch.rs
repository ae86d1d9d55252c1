use std::io;
use std::process::ExitStatus;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::registry::Entry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Start every process, then wait for all of them. Output interleaves.
    Concurrent,
    /// One repository at a time, so the command may prompt on the terminal.
    Sequential,
}

/// What happened to one repository's run. Outcomes are reported per
/// repository and never folded into a single verdict.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub name: String,
    pub result: io::Result<ExitStatus>,
}

impl DispatchOutcome {
    pub fn success(&self) -> bool {
        matches!(&self.result, Ok(status) if status.success())
    }
}

/// Run `argv` once in each entry's directory. stdout and stderr are
/// inherited, not captured. A failing run never stops its siblings.
pub async fn dispatch(entries: &[Entry], argv: &[String], mode: Mode) -> Result<Vec<DispatchOutcome>> {
    let (program, args) = argv.split_first().ok_or(Error::EmptyCommand)?;

    let mut outcomes = Vec::with_capacity(entries.len());
    match mode {
        Mode::Sequential => {
            for entry in entries {
                let result = command(program, args, entry).status().await;
                outcomes.push(outcome(entry, result));
            }
        }
        Mode::Concurrent => {
            let children: Vec<_> = entries
                .iter()
                .map(|entry| (entry, command(program, args, entry).spawn()))
                .collect();

            for (entry, child) in children {
                let result = match child {
                    Ok(mut child) => child.wait().await,
                    Err(e) => Err(e),
                };
                outcomes.push(outcome(entry, result));
            }
        }
    }

    Ok(outcomes)
}

fn command(program: &str, args: &[String], entry: &Entry) -> Command {
    debug!(repo = %entry.name, dir = %entry.path.display(), program, ?args, "dispatching");
    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(&entry.path);
    cmd
}

fn outcome(entry: &Entry, result: io::Result<ExitStatus>) -> DispatchOutcome {
    match &result {
        Ok(status) if !status.success() => {
            warn!(repo = %entry.name, %status, "command failed")
        }
        Err(e) => warn!(repo = %entry.name, error = %e, "could not run command"),
        Ok(_) => {}
    }
    DispatchOutcome {
        name: entry.name.clone(),
        result,
    }
}

/// Split `super` arguments: leading words that name registered repositories
/// select them, everything from the first other word on is the git command.
pub fn split_leading_names<'a>(
    words: &'a [String],
    is_name: impl Fn(&str) -> bool,
) -> (&'a [String], &'a [String]) {
    let split = words
        .iter()
        .position(|w| !is_name(w))
        .unwrap_or(words.len());
    words.split_at(split)
}
