use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{crate_version, value_parser, Arg, ArgAction, ArgMatches, Command};

use gita::config::{CommandTable, RESERVED_COMMANDS};
use gita::discovery::discover;
use gita::dispatch::{dispatch, split_leading_names, DispatchOutcome, Mode};
use gita::error::Error;
use gita::inspector::GitInspector;
use gita::logger;
use gita::registry::{Entry, Registry};
use gita::render::{render, Palette};
use gita::summary::{summarize, SummaryOptions};

/// How deep `add -r` looks below each given directory.
const DISCOVERY_DEPTH: usize = 8;

#[tokio::main]
async fn main() {
    logger::init();

    if let Err(e) = run().await {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let commands = CommandTable::load().context("could not load the command table")?;
    let mut registry = Registry::load().context("could not load the repository list")?;

    let matches = cli(&commands).get_matches();
    match matches.subcommand() {
        Some(("add", arg_matches)) => add(&mut registry, arg_matches),
        Some(("rm", arg_matches)) => {
            let name = arg_matches
                .get_one::<String>("repo")
                .context("missing repository name")?;
            let removed = registry.remove(name)?;
            println!("Removed {} ({})", removed.name, removed.path.display());
            Ok(())
        }
        Some(("ls", arg_matches)) => ls(&registry, arg_matches).await,
        Some(("super", arg_matches)) => {
            let words = values(arg_matches, "words");
            let (names, git_args) = split_leading_names(&words, |w| registry.get(w).is_some());
            if git_args.is_empty() {
                return Err(Error::EmptyCommand.into());
            }
            let entries = registry.select(names, true, "super")?;
            delegate(&entries, git_args).await
        }
        Some((name, arg_matches)) => {
            let spec = commands
                .get(name)
                .with_context(|| format!("unknown sub-command `{name}`"))?;
            let entries = registry.select(&values(arg_matches, "repos"), spec.allow_all, name)?;
            delegate(&entries, &spec.git_args(name)).await
        }
        None => unreachable!("clap requires a sub-command"),
    }
}

fn cli(commands: &CommandTable) -> Command {
    let mut cli = Command::new("gita")
        .about("Manage many git repositories side by side.")
        .version(crate_version!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("add")
                .about("Register repositories")
                .arg(
                    Arg::new("paths")
                        .required(true)
                        .num_args(1..)
                        .value_parser(value_parser!(PathBuf))
                        .help("Repository directories"),
                )
                .arg(
                    Arg::new("recursive")
                        .short('r')
                        .long("recursive")
                        .action(ArgAction::SetTrue)
                        .help("Register every repository found below the given directories"),
                ),
        )
        .subcommand(
            Command::new("rm")
                .about("Unregister a repository")
                .arg(Arg::new("repo").required(true).help("Repository name")),
        )
        .subcommand(
            Command::new("ls")
                .about("Show the status of all repositories, or the path of one")
                .arg(Arg::new("repo").help("Print this repository's path instead"))
                .arg(
                    Arg::new("jobs")
                        .short('j')
                        .long("jobs")
                        .value_parser(value_parser!(usize))
                        .help("Inspect at most this many repositories at once"),
                ),
        )
        .subcommand(
            Command::new("super")
                .about("Run any git command in the named repositories, or in all of them")
                .long_about(
                    "Run any git command in the named repositories, or in all of them.\n\n\
                     Examples:\n    gita super myrepo1 commit -am 'fix a bug'\n    gita super checkout main",
                )
                .arg(
                    Arg::new("words")
                        .required(true)
                        .num_args(1..)
                        .trailing_var_arg(true)
                        .allow_hyphen_values(true)
                        .value_name("REPO... GIT_ARGS"),
                ),
        );

    for (name, spec) in commands.iter() {
        if RESERVED_COMMANDS.contains(&name) {
            continue;
        }
        let repos = Arg::new("repos").value_name("REPO");
        let (repos, help) = if spec.allow_all {
            (repos.num_args(0..), format!("{} for all repos or the chosen ones", spec.help))
        } else {
            (
                repos.num_args(1..).required(true),
                format!("{} for the chosen repos", spec.help),
            )
        };
        cli = cli.subcommand(Command::new(name.to_string()).about(help).arg(repos));
    }

    cli
}

fn values(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|vals| vals.cloned().collect())
        .unwrap_or_default()
}

fn add(registry: &mut Registry, matches: &ArgMatches) -> Result<()> {
    let given: Vec<PathBuf> = matches
        .get_many::<PathBuf>("paths")
        .map(|vals| vals.cloned().collect())
        .unwrap_or_default();

    let paths = if matches.get_flag("recursive") {
        let found: Vec<PathBuf> = given
            .iter()
            .flat_map(|root| discover(root, DISCOVERY_DEPTH))
            .collect();
        if found.is_empty() {
            bail!("no repositories found");
        }
        found
    } else {
        given
    };

    let added = registry.add(&paths)?;
    if added.is_empty() {
        println!("Nothing new to add");
    }
    for entry in added {
        println!("Added {} ({})", entry.name, entry.path.display());
    }
    Ok(())
}

async fn ls(registry: &Registry, matches: &ArgMatches) -> Result<()> {
    if let Some(name) = matches.get_one::<String>("repo") {
        let entry = registry
            .get(name)
            .ok_or_else(|| Error::UnknownRepo(name.clone()))?;
        println!("{}", entry.path.display());
        return Ok(());
    }

    let options = SummaryOptions {
        max_concurrency: matches.get_one::<usize>("jobs").copied(),
    };
    let statuses = summarize(registry.entries(), Arc::new(GitInspector::default()), &options).await;
    for line in render(&statuses, &Palette::detect()) {
        println!("{line}");
    }
    Ok(())
}

/// A single repository runs in the foreground so git can prompt.
async fn delegate(entries: &[Entry], git_args: &[String]) -> Result<()> {
    let argv: Vec<String> = std::iter::once("git".to_string())
        .chain(git_args.iter().cloned())
        .collect();
    let mode = if entries.len() == 1 {
        Mode::Sequential
    } else {
        Mode::Concurrent
    };

    let outcomes = dispatch(entries, &argv, mode).await?;
    report_failures(&outcomes);
    Ok(())
}

fn report_failures(outcomes: &[DispatchOutcome]) {
    for outcome in outcomes.iter().filter(|o| !o.success()) {
        match &outcome.result {
            Ok(status) => eprintln!("{}: {status}", outcome.name),
            Err(e) => eprintln!("{}: {e}", outcome.name),
        }
    }
}
