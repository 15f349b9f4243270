//! End-to-end tests for the `completions` command.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_bash_completions() {
    let mut cmd = cargo_bin_cmd!("uniconf");

    cmd.args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_uniconf"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_unknown_shell_is_rejected() {
    let mut cmd = cargo_bin_cmd!("uniconf");

    cmd.args(["completions", "tcsh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
