// `tt import` argument errors surface before any database connection.

use assert_cmd::prelude::*;
use predicates::prelude::*;

fn tt() -> anyhow::Result<std::process::Command> {
    let mut cmd = std::process::Command::cargo_bin("tt")?;
    // an unset url env var would fail the run if it ever got that far
    cmd.env_remove("TT_DATABASE_URL");
    Ok(cmd)
}

#[test]
fn import_without_feed_dir_fails() -> anyhow::Result<()> {
    let mut cmd = tt()?;
    cmd.args(["import", "--region-id", "1", "--feed-id", "1"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("feed directory not set"));
    Ok(())
}

#[test]
fn import_with_unknown_update_mode_fails() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut cmd = tt()?;
    cmd.args(["import", "--region-id", "1", "--feed-id", "1", "--update-mode", "partial"])
        .arg("--feed-dir")
        .arg(dir.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("import.update_mode"));
    Ok(())
}

#[test]
fn import_without_region_fails() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut cmd = tt()?;
    cmd.args(["import", "--feed-name", "acme"])
        .arg("--feed-dir")
        .arg(dir.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("incomplete import target"));
    Ok(())
}

#[test]
fn dry_run_flag_accepts_an_explicit_value() -> anyhow::Result<()> {
    let mut cmd = tt()?;
    cmd.args(["import", "--region-id", "1", "--feed-id", "1", "--dry-run=false"]);

    // parsing succeeded; the run stops at the next guard
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("feed directory not set"));

    let mut cmd = tt()?;
    cmd.args(["import", "--dry-run=maybe"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
    Ok(())
}
