use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("apixlab")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("connectors"))
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("refresh"))
        .stdout(predicate::str::contains("logout"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_login_help_shows_options() {
    cargo_bin_cmd!("apixlab")
        .args(["login", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--connector"))
        .stdout(predicate::str::contains("--invite-code"))
        .stdout(predicate::str::contains("--yes"));
}

#[test]
fn test_unknown_command_fails() {
    cargo_bin_cmd!("apixlab")
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}
