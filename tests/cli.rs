#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Recipes that log each step to `log.txt` instead of calling cargo
const LOGGING_RECIPES: &str = r#"
[settings]
shell_mode = true

[recipes.default]
depends = ["build"]

[recipes.build]
run = ["echo build >> log.txt"]

[recipes.test]
run = ["echo test >> log.txt"]

[recipes.fmt]
run = ["echo fmt >> log.txt"]

[recipes.lint]
run = ["echo lint >> log.txt"]

[recipes.verify]
depends = ["build", "test", "fmt", "lint"]
"#;

fn project(recipes: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("chore.toml"), recipes).unwrap();
    dir
}

fn chore(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("chore").unwrap();
    cmd.current_dir(dir).arg("--no-color");
    cmd
}

fn log(dir: &Path) -> String {
    fs::read_to_string(dir.join("log.txt")).unwrap_or_default()
}

#[test]
fn verify_runs_steps_in_order() {
    let dir = project(LOGGING_RECIPES);

    chore(dir.path()).arg("verify").assert().success();

    assert_eq!(log(dir.path()), "build\ntest\nfmt\nlint\n");
}

#[test]
fn no_arguments_runs_build() {
    let implicit = project(LOGGING_RECIPES);
    let explicit = project(LOGGING_RECIPES);

    chore(implicit.path()).assert().success();
    chore(explicit.path()).arg("build").assert().success();

    assert_eq!(log(implicit.path()), "build\n");
    assert_eq!(log(implicit.path()), log(explicit.path()));
}

#[test]
fn failing_build_stops_verify() {
    let recipes = LOGGING_RECIPES.replace(
        r#"run = ["echo build >> log.txt"]"#,
        r#"run = ["echo build >> log.txt", "exit 7", "echo unreachable >> log.txt"]"#,
    );
    let dir = project(&recipes);

    chore(dir.path())
        .arg("verify")
        .assert()
        .code(7)
        .stderr(predicate::str::contains("exited with code 7"));

    assert_eq!(log(dir.path()), "build\n");
}

#[test]
fn failing_middle_step_skips_the_rest() {
    let recipes = LOGGING_RECIPES.replace(
        r#"run = ["echo fmt >> log.txt"]"#,
        r#"run = ["echo fmt >> log.txt && exit 1"]"#,
    );
    let dir = project(&recipes);

    chore(dir.path()).arg("verify").assert().code(1);

    assert_eq!(log(dir.path()), "build\ntest\nfmt\n");
}

#[test]
fn unknown_recipe_fails() {
    let dir = project(LOGGING_RECIPES);

    chore(dir.path())
        .arg("deploy")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Recipe 'deploy' not found"));

    assert_eq!(log(dir.path()), "");
}

#[test]
fn lint_fails_on_warnings_despite_zero_exit() {
    let dir = project(
        r#"
        [recipes.lint]
        run = ["echo 'warning: x'"]
        shell = true
        deny_warnings = true
        "#,
    );

    chore(dir.path())
        .arg("lint")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("warning: x"))
        .stderr(predicate::str::contains("reported 1 warning(s)"));
}

#[test]
fn lint_fails_on_colored_warnings() {
    let dir = project(
        r#"
        [recipes.lint]
        run = ["printf '\\033[33mwarning\\033[0m: x\\n'"]
        shell = true
        deny_warnings = true
        "#,
    );

    chore(dir.path())
        .arg("lint")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("warning(s)"));
}

#[test]
fn lint_exit_code_wins_over_warnings() {
    let dir = project(
        r#"
        [recipes.lint]
        run = ["echo 'warning: x'; exit 3"]
        shell = true
        deny_warnings = true
        "#,
    );

    chore(dir.path())
        .arg("lint")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("code 3"));
}

#[test]
fn lint_passes_without_warnings() {
    let dir = project(
        r#"
        [recipes.lint]
        run = ["echo 'all clean'"]
        shell = true
        deny_warnings = true
        "#,
    );

    chore(dir.path())
        .arg("lint")
        .assert()
        .success()
        .stdout(predicate::str::contains("all clean"));
}

#[test]
fn builtin_fmt_is_check_only() {
    let dir = TempDir::new().unwrap();

    let output = chore(dir.path())
        .args(["list", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let recipes: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let fmt = recipes["fmt"]["run"][0].as_str().unwrap();
    assert!(fmt.contains("--check"));
}

#[test]
fn fmt_twice_gives_same_result() {
    let dir = project(
        r#"
        [recipes.fmt]
        run = ["test ! -e unformatted.rs"]
        shell = true
        "#,
    );

    chore(dir.path()).arg("fmt").assert().success();
    chore(dir.path()).arg("fmt").assert().success();

    fs::write(dir.path().join("unformatted.rs"), "fn main(){}").unwrap();
    chore(dir.path()).arg("fmt").assert().code(1);
    chore(dir.path()).arg("fmt").assert().code(1);
    assert_eq!(
        fs::read_to_string(dir.path().join("unformatted.rs")).unwrap(),
        "fn main(){}"
    );
}

#[test]
fn dry_run_executes_nothing() {
    let dir = project(LOGGING_RECIPES);

    chore(dir.path())
        .args(["run", "verify", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. build"))
        .stdout(predicate::str::contains("5. verify"));

    assert!(!dir.path().join("log.txt").exists());
}

#[test]
fn direct_mode_missing_program() {
    let dir = project(
        r#"
        [recipes.build]
        run = ["chore-test-no-such-program --flag"]
        "#,
    );

    chore(dir.path())
        .arg("build")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Command not found"));
}

#[test]
fn timeout_kills_slow_command() {
    let dir = project(
        r#"
        [recipes.slow]
        run = ["sleep 5"]
        timeout = 1
        "#,
    );

    chore(dir.path())
        .arg("slow")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("timed out"));
}

#[test]
fn timeout_covers_background_children() {
    let dir = project(
        r#"
        [recipes.lint]
        run = ["(sleep 3 && touch late.txt) & echo started"]
        shell = true
        deny_warnings = true
        timeout = 1
        "#,
    );

    let start = Instant::now();
    chore(dir.path())
        .arg("lint")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("timed out"));
    assert!(start.elapsed() < Duration::from_secs(3));

    std::thread::sleep(Duration::from_secs(4));
    assert!(!dir.path().join("late.txt").exists());
}

#[test]
fn aggregate_recipe_prints_no_status_line() {
    let dir = project(LOGGING_RECIPES);

    chore(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("build"))
        .stderr(predicate::str::contains("default").not())
        .stderr(predicate::str::contains("recipes (").not());
}

#[test]
fn init_then_check() {
    let dir = TempDir::new().unwrap();

    chore(dir.path()).arg("init").assert().success();
    assert!(dir.path().join("chore.toml").exists());

    chore(dir.path()).arg("init").assert().failure();
    chore(dir.path()).args(["init", "--force"]).assert().success();

    chore(dir.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("6 recipes"));
}

#[test]
fn cyclic_recipes_rejected() {
    let dir = project(
        r#"
        [recipes.a]
        depends = ["b"]

        [recipes.b]
        depends = ["a"]
        "#,
    );

    chore(dir.path())
        .arg("check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Circular dependency"));
}
