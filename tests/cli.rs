//! End-to-end tests that drive the `gita` binary.

mod util;

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

use util::GitRepo;

fn gita(config_home: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("gita");
    cmd.env("GITA_CONFIG_HOME", config_home)
        .env("GITA_PLAIN_TEXT", "1")
        .env_remove("GITA_LOG");
    cmd
}

#[test]
fn add_ls_rm() {
    let temp = assert_fs::TempDir::new().unwrap();
    let home = temp.child("config");
    let web = GitRepo::init(temp.child("web").path());
    web.commit_file("index.html", "<p>hi</p>", "landing page");
    let api = GitRepo::init(temp.child("api").path());

    gita(home.path())
        .arg("add")
        .arg(&web.dir)
        .arg(&api.dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Added web"));

    let assert = gita(home.path()).arg("ls").assert().success();
    let report = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    let lines: Vec<_> = report.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("web "));
    assert!(lines[0].ends_with("landing page"));
    assert!(lines[1].starts_with("api "));
    assert!(lines[1].contains("main"));

    gita(home.path())
        .args(["ls", "api"])
        .assert()
        .success()
        .stdout(predicate::str::diff(api.dir.display().to_string()).trim());

    gita(home.path()).args(["rm", "web"]).assert().success();

    gita(home.path())
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("api ").and(predicate::str::contains("web").not()));
}

#[test]
fn recursive_add_finds_nested_checkouts() {
    let temp = assert_fs::TempDir::new().unwrap();
    let home = temp.child("config");
    GitRepo::init(temp.child("src/one").path());
    GitRepo::init(temp.child("src/group/two").path());

    gita(home.path())
        .arg("add")
        .arg("-r")
        .arg(temp.child("src").path())
        .assert()
        .success();

    home.child("repo_path")
        .assert(predicate::str::contains("one").and(predicate::str::contains("two")));
}

#[test]
fn errors_are_loud() {
    let temp = assert_fs::TempDir::new().unwrap();
    let home = temp.child("config");
    let plain = temp.child("plain");
    plain.create_dir_all().unwrap();

    gita(home.path())
        .arg("add")
        .arg(plain.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a git repository"));

    gita(home.path())
        .args(["rm", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown repository: ghost"));

    home.child("repo_path").assert(predicate::path::missing());
}

#[test]
fn table_commands_need_repos_unless_allow_all() {
    let temp = assert_fs::TempDir::new().unwrap();
    let home = temp.child("config");
    let repo = GitRepo::init(temp.child("solo").path());
    repo.commit_file("a.txt", "a", "first");
    gita(home.path()).arg("add").arg(&repo.dir).assert().success();

    // `push` may not run against everything implicitly
    gita(home.path()).arg("push").assert().failure();

    gita(home.path())
        .args(["log", "solo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("first"));
}

#[test]
fn user_commands_and_super() {
    let temp = assert_fs::TempDir::new().unwrap();
    let home = temp.child("config");
    home.child("cmds.toml")
        .write_str("[subjects]\ncmd = \"log --format=%s\"\nhelp = \"list subjects\"\nallow_all = true\n")
        .unwrap();

    let repo = GitRepo::init(temp.child("solo").path());
    repo.commit_file("a.txt", "a", "from the table");
    gita(home.path()).arg("add").arg(&repo.dir).assert().success();

    gita(home.path())
        .arg("subjects")
        .assert()
        .success()
        .stdout(predicate::str::contains("from the table"));

    gita(home.path())
        .args(["super", "solo", "log", "--format=%s"])
        .assert()
        .success()
        .stdout(predicate::str::contains("from the table"));
}

#[test]
fn plain_text_output_has_no_color() {
    let temp = assert_fs::TempDir::new().unwrap();
    let home = temp.child("config");
    let repo = GitRepo::init(temp.child("solo").path());
    repo.commit_file("a.txt", "a", "first");
    gita(home.path()).arg("add").arg(&repo.dir).assert().success();

    gita(home.path())
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("solo").and(predicate::str::contains("\x1b[").not()));
}
