//! Shared E2E test helpers for `weft` binary tests.

use assert_cmd::cargo::cargo_bin_cmd;
use std::path::Path;
use std::time::Duration;

/// Default timeout for CLI tests.
pub const TIMEOUT_BASIC: Duration = Duration::from_secs(10);

/// Variables that would leak the developer's environment into a test.
const ISOLATED_VARS: &[&str] = &["WEFT_CACHE_RESOLUTIONS", "WEFT_LOG_LEVEL", "RUST_LOG"];

/// The logging aspect used across E2E tests.
pub const LOGGING_ASPECT: &str = r#"
[logging]
level = "warn"

[[pointcuts]]
name = "forDaoPackage"
expr = "execution(* demo.dao.*.*(..))"

[[pointcuts]]
name = "getter"
expr = "execution(* demo.dao.*.get*(..))"

[[pointcuts]]
name = "setter"
expr = "execution(* demo.dao.*.set*(..))"

[[pointcuts]]
name = "forDaoPackageNoGetterSetter"
expr = "forDaoPackage && !(getter || setter)"

[[advices]]
id = "log-dao-calls"
kind = "before"
pointcut = "forDaoPackageNoGetterSetter"
handler = "log-call"
order = 2

[[advices]]
id = "time-fortune"
kind = "around"
pointcut = "execution(* demo.service.*.getFortune(..))"
handler = "time"
order = 2

[[advices]]
id = "find-result"
kind = "after-returning"
pointcut = "execution(* demo.dao.AccountDao.findAccounts(..))"
handler = "log-result"
order = 2

[[advices]]
id = "find-error"
kind = "after-throwing"
pointcut = "execution(* demo.dao.AccountDao.findAccounts(..))"
handler = "log-error"
order = 2

[[advices]]
id = "find-finally"
kind = "after"
pointcut = "execution(* demo.dao.AccountDao.findAccounts(..))"
handler = "log-exit"
order = 2

[[advices]]
id = "dao-deadline"
kind = "around"
pointcut = "forDaoPackage"
handler = "deadline"
deadline_ms = 50
enabled = false
"#;

/// Build a Command for the `weft` binary running inside `dir`.
///
/// `dir` becomes the working directory, so `./weft.toml` lookups only see
/// what the test wrote there.
pub fn weft_cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd: assert_cmd::Command = cargo_bin_cmd!("weft");
    cmd.timeout(TIMEOUT_BASIC);
    cmd.current_dir(dir);
    for var in ISOLATED_VARS {
        cmd.env_remove(var);
    }
    cmd
}

/// Creates a temp dir holding `weft.toml` with the given contents.
pub fn project_with_config(contents: &str) -> tempfile::TempDir {
    let tmp = tempfile::tempdir().expect("create temp dir for project");
    std::fs::write(tmp.path().join("weft.toml"), contents).expect("write weft.toml");
    tmp
}
