//! E2E tests for the `weft` binary.
//!
//! Advice trace lines and command results go to stdout; logs and errors
//! go to stderr.

mod common;

use common::{project_with_config, weft_cmd, LOGGING_ASPECT};
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

const FIND_ACCOUNTS: &str = "demo.dao.AccountDao.findAccounts(bool)";

// ─── check ─────────────────────────────────────────────────────────

#[test]
fn check_reports_counts() {
    let project = project_with_config(LOGGING_ASPECT);
    weft_cmd(project.path())
        .arg("check")
        .assert()
        .success()
        .stdout(contains(
            "OK: 4 pointcut(s), 5 advice binding(s), 1 disabled",
        ));
}

#[test]
fn check_without_config_uses_defaults() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    weft_cmd(tmp.path())
        .arg("check")
        .assert()
        .success()
        .stdout(contains("OK: 0 pointcut(s), 0 advice binding(s)"));
}

#[test]
fn check_lists_every_invalid_definition() {
    let project = project_with_config(
        r#"
[[advices]]
id = "bad-kind"
kind = "sideways"
pointcut = "*.*(..)"
handler = "log-call"

[[advices]]
id = "bad-deadline"
kind = "around"
pointcut = "*.*(..)"
handler = "deadline"
"#,
    );
    weft_cmd(project.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(contains("advice 'bad-kind'"))
        .stderr(contains("advice 'bad-deadline'"))
        .stderr(contains("2 invalid definition(s)"));
}

#[test]
fn check_rejects_unresolved_reference() {
    let project = project_with_config(
        r#"
[[advices]]
kind = "before"
pointcut = "nowhere && *.*(..)"
handler = "log-call"
"#,
    );
    weft_cmd(project.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(contains("unresolved pointcut reference: nowhere"));
}

// ─── config layering ───────────────────────────────────────────────

#[test]
fn explicit_config_path() {
    let project = project_with_config("");
    let aspect = project.path().join("logging.toml");
    std::fs::write(&aspect, LOGGING_ASPECT).expect("write aspect");

    weft_cmd(project.path())
        .args(["--config", aspect.to_str().expect("valid utf8"), "check"])
        .assert()
        .success()
        .stdout(contains("5 advice binding(s)"));
}

#[test]
fn missing_explicit_config_fails() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    weft_cmd(tmp.path())
        .args(["--config", "absent.toml", "check"])
        .assert()
        .failure()
        .stderr(contains("Config error: failed to read config file"));
}

#[test]
fn malformed_config_fails() {
    let project = project_with_config("[[advices]\n");
    weft_cmd(project.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(contains("failed to parse config file"));
}

#[test]
fn invalid_env_var_fails() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    weft_cmd(tmp.path())
        .env("WEFT_CACHE_RESOLUTIONS", "maybe")
        .arg("check")
        .assert()
        .failure()
        .stderr(contains("WEFT_CACHE_RESOLUTIONS"));
}

#[test]
fn debug_flag_enables_logs() {
    let project = project_with_config(LOGGING_ASPECT);
    weft_cmd(project.path())
        .args(["-d", "check"])
        .assert()
        .success()
        .stderr(contains("Registry sealed"));
}

#[test]
fn quiet_by_default() {
    let project = project_with_config(LOGGING_ASPECT);
    weft_cmd(project.path())
        .arg("check")
        .assert()
        .success()
        .stderr(contains("Registry sealed").not());
}

// ─── resolve ───────────────────────────────────────────────────────

#[test]
fn resolve_lists_advice_outermost_first() {
    let project = project_with_config(LOGGING_ASPECT);
    let output = weft_cmd(project.path())
        .args(["resolve", FIND_ACCOUNTS])
        .output()
        .expect("run weft");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let ids: Vec<&str> = stdout
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(1))
        .collect();
    assert_eq!(
        ids,
        vec!["log-dao-calls", "find-result", "find-error", "find-finally"]
    );
}

#[test]
fn resolve_skips_getters() {
    let project = project_with_config(LOGGING_ASPECT);
    weft_cmd(project.path())
        .args(["resolve", "demo.dao.AccountDao.getName()"])
        .assert()
        .success()
        .stdout(contains("no advice applies to demo.dao.AccountDao.getName()"));
}

#[test]
fn resolve_rejects_malformed_call_site() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    weft_cmd(tmp.path())
        .args(["resolve", "findAccounts"])
        .assert()
        .failure()
        .stderr(contains("invalid call site 'findAccounts'"));
}

// ─── invoke ────────────────────────────────────────────────────────

#[test]
fn invoke_success_runs_returning_and_after() {
    let project = project_with_config(LOGGING_ASPECT);
    weft_cmd(project.path())
        .args(["invoke", FIND_ACCOUNTS, "--arg", "false"])
        .assert()
        .success()
        .stdout(contains(
            "[before] AccountDao.findAccounts(..): calling with (false)",
        ))
        .stdout(contains("finally (returned)"))
        .stdout(contains("[after_returning] AccountDao.findAccounts(..): returned false"))
        .stdout(contains("raised").not());
}

#[test]
fn invoke_failure_exits_nonzero() {
    let project = project_with_config(LOGGING_ASPECT);
    weft_cmd(project.path())
        .args([
            "invoke",
            FIND_ACCOUNTS,
            "--arg",
            "true",
            "--fail",
            "No soup for you!!!",
        ])
        .assert()
        .code(1)
        .stdout(contains("raised TARGET_FAILED: No soup for you!!!"))
        .stdout(contains("finally (raised)"))
        .stdout(contains("returned").not())
        .stderr(contains("TARGET_FAILED: No soup for you!!!"));
}

#[test]
fn invoke_times_around_advice() {
    let project = project_with_config(LOGGING_ASPECT);
    weft_cmd(project.path())
        .args([
            "invoke",
            "demo.service.TrafficFortuneService.getFortune()",
            "--delay-ms",
            "20",
        ])
        .assert()
        .success()
        .stdout(contains("[around] TrafficFortuneService.getFortune(): duration"))
        .stdout(contains("returned ()"));
}

#[test]
fn invoke_without_advice_returns_argument() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    weft_cmd(tmp.path())
        .args(["--no-cache", "invoke", "demo.Calc.echo(i64)", "--arg", "42"])
        .assert()
        .success()
        .stdout(contains("returned 42"));
}

#[test]
fn trace_to_log_moves_lines_off_stdout() {
    let project = project_with_config(LOGGING_ASPECT);
    weft_cmd(project.path())
        .args(["-v", "--trace-to-log", "invoke", FIND_ACCOUNTS, "--arg", "false"])
        .assert()
        .success()
        .stdout(contains("calling with").not())
        .stdout(contains("returned false"))
        .stderr(contains("calling with (false)"));
}
