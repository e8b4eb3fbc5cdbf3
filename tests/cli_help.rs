use assert_cmd::Command;

#[test]
fn cli_help_smoke() {
    let mut cmd = Command::cargo_bin("rf-tools").unwrap();
    cmd.arg("--help");
    cmd.assert().success();
}

#[test]
fn subcommand_help_smoke() {
    for subcommand in ["norm", "peakcall", "combine"] {
        let mut cmd = Command::cargo_bin("rf-tools").unwrap();
        cmd.args([subcommand, "--help"]);
        cmd.assert().success();
    }
}

#[test]
fn missing_required_arguments_fail() {
    let mut cmd = Command::cargo_bin("rf-tools").unwrap();
    cmd.arg("norm");
    cmd.assert().failure();

    // combine needs at least two inputs
    let mut cmd = Command::cargo_bin("rf-tools").unwrap();
    cmd.args(["combine", "only-one.xml"]);
    cmd.assert().failure();
}

#[test]
fn unreadable_store_is_a_fatal_error() {
    let mut cmd = Command::cargo_bin("rf-tools").unwrap();
    cmd.args(["norm", "--treated", "does-not-exist.rc", "--scoring-method", "2"]);
    cmd.assert().failure();
}
