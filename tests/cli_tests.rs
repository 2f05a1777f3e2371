//! End-to-end smoke tests against the built binary.
//!
//! Everything runs with `--mock --offline --state-dir <tmp>` so no model,
//! no network and no real home directory are touched.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn helix(state_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("helix").expect("binary");
    cmd.args(["--mock", "--offline", "--state-dir"])
        .arg(state_dir.path())
        .env("HELIX_MODEL_DIR", state_dir.path().join("models"));
    cmd
}

#[test]
fn starts_in_mock_mode_and_exits_cleanly() {
    let tmp = TempDir::new().expect("tmp");
    helix(&tmp)
        .write_stdin("/exit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("mock mode"))
        .stdout(predicate::str::contains("Goodbye"));
}

#[test]
fn eof_is_a_clean_exit() {
    let tmp = TempDir::new().expect("tmp");
    helix(&tmp).write_stdin("").assert().success();
}

#[test]
fn help_lists_the_command_table() {
    let tmp = TempDir::new().expect("tmp");
    helix(&tmp)
        .write_stdin("/help\n/exit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("/cmd <request>"))
        .stdout(predicate::str::contains("/sandbox <mode>"))
        .stdout(predicate::str::contains("/rag-status"));
}

#[test]
fn mock_cmd_pipeline_answers_with_a_command() {
    let tmp = TempDir::new().expect("tmp");
    // Mock mode forces dry-run and auto-answers come from the rule table;
    // declining execution keeps the run deterministic.
    helix(&tmp)
        .write_stdin("/cmd list all files\nn\nn\n/exit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("ls -la"));
}

#[test]
fn mock_ask_returns_a_stock_response() {
    let tmp = TempDir::new().expect("tmp");
    helix(&tmp)
        .write_stdin("/ask hello there\n/exit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Helix"));
}

#[test]
fn bare_exit_prints_a_hint_instead_of_quitting() {
    let tmp = TempDir::new().expect("tmp");
    helix(&tmp)
        .write_stdin("exit\n/exit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Use '/exit' to quit."));
}

#[test]
fn sandbox_command_reports_status_and_switches_modes() {
    let tmp = TempDir::new().expect("tmp");
    helix(&tmp)
        .write_stdin("/sandbox\n/sandbox strict\n/sandbox off\n/exit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sandbox status:"))
        .stdout(predicate::str::contains("Strict (current dir + subdirs only)"))
        .stdout(predicate::str::contains("Disabled (no restrictions)"));
}

#[test]
fn dry_run_toggles() {
    let tmp = TempDir::new().expect("tmp");
    helix(&tmp)
        .write_stdin("/dry-run\n/exit\n")
        .assert()
        .success()
        // Mock mode starts with dry-run on, so the first toggle disables it.
        .stdout(predicate::str::contains("Dry-run mode disabled"));
}

#[test]
fn debug_shows_environment_and_state_dir() {
    let tmp = TempDir::new().expect("tmp");
    helix(&tmp)
        .write_stdin("/debug\n/exit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Mock mode:  true"))
        .stdout(predicate::str::contains(tmp.path().to_str().expect("utf8 path")));
}

#[test]
fn rag_admin_commands_degrade_gracefully_in_mock_mode() {
    let tmp = TempDir::new().expect("tmp");
    helix(&tmp)
        .write_stdin("/rag-status\n/rag-reindex\n/rag-reset\n/exit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("not available in this mode"));
}

#[test]
fn unknown_input_gets_a_tip() {
    let tmp = TempDir::new().expect("tmp");
    helix(&tmp)
        .write_stdin("what is this\n/exit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tip: start with '/ask'"));
}
