#![allow(dead_code)]

pub mod pack;
pub mod repo;

use assert_cmd::Command;
use std::path::Path;

/// Build a `gitread` invocation pointed at `repository`, with colors off and
/// any inherited repository location cleared.
pub fn run_gitread(repository: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("gitread").expect("gitread binary is built");
    cmd.env_remove("CLIENT_WORKDIR")
        .env_remove("WORKDIR")
        .env("NO_COLOR", "1")
        .arg("--repo")
        .arg(repository)
        .args(args);
    cmd
}

/// The three-commit history used across the query tests:
/// C0 adds `README.md`, C1 adds `a.txt` = "hello\n", C2 appends "world\n".
pub struct HelloWorld {
    pub repo: repo::TestRepo,
    pub c0: gitread::artifacts::objects::object_id::ObjectId,
    pub c1: gitread::artifacts::objects::object_id::ObjectId,
    pub c2: gitread::artifacts::objects::object_id::ObjectId,
}

pub fn hello_world() -> HelloWorld {
    let mut repo = repo::TestRepo::new();
    let c0 = repo.commit(&[("README.md", "# demo\n")], "Initial commit");
    let c1 = repo.commit(
        &[("README.md", "# demo\n"), ("a.txt", "hello\n")],
        "Add a.txt",
    );
    let c2 = repo.commit(
        &[("README.md", "# demo\n"), ("a.txt", "hello\nworld\n")],
        "Say world",
    );

    HelloWorld { repo, c0, c1, c2 }
}
