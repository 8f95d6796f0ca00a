use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;

#[test]
fn images_subcommands_are_documented() {
    let mut cmd = cargo_bin_cmd!("storefrontctl");
    let out = cmd
        .arg("images")
        .arg("--help")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&out);
    assert!(text.contains("audit"), "images help missing audit");
    assert!(text.contains("repair"), "images help missing repair");
    assert!(text.contains("summary"), "images help missing summary");
}

#[test]
fn repair_help_mentions_options() {
    let mut cmd = cargo_bin_cmd!("storefrontctl");
    let out = cmd
        .args(["images", "repair", "--help"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&out);
    assert!(text.contains("--product"), "repair help missing --product");
    assert!(text.contains("--parallelism"), "repair help missing --parallelism");
    assert!(text.contains("--json"), "repair help missing --json");
    assert!(text.contains("--config"), "global --config not shown");
}

#[test]
fn db_subcommands_present() {
    let mut cmd = cargo_bin_cmd!("storefrontctl");
    let out = cmd
        .arg("db")
        .arg("--help")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&out);
    assert!(text.contains("migrate"), "db help missing migrate");
    assert!(
        text.contains("consolidate-order-columns"),
        "db help missing consolidate-order-columns"
    );
}

#[test]
fn missing_database_url_fails_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = cargo_bin_cmd!("storefrontctl");
    cmd.current_dir(dir.path())
        .env_clear()
        .args(["images", "audit"])
        .assert()
        .failure()
        .stderr(contains("no database URL configured"));
}

#[test]
fn explicit_missing_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = cargo_bin_cmd!("storefrontctl");
    cmd.current_dir(dir.path())
        .env_clear()
        .args(["--config", "absent.toml", "images", "summary"])
        .assert()
        .failure()
        .stderr(contains("failed to load configuration"));
}
