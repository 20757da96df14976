#![allow(missing_docs, clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("commercetxt").unwrap();
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn missing_file_exits_1_with_stderr_message() {
    cmd()
        .arg("/nonexistent/path/commerce.txt")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("File not found:"));
}

#[test]
fn valid_document_reports_status_valid() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("widget.txt");
    fs::write(
        &file,
        "# @IDENTITY\nName: Acme\nCurrency: USD\n# @PRODUCT\nName: Widget\n# @OFFER\nPrice: 19.99\nAvailability: InStock\n",
    )
    .unwrap();

    cmd()
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Status: VALID"));
}

#[test]
fn json_output_has_exactly_the_expected_top_level_fields() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("widget.txt");
    fs::write(&file, "# @IDENTITY\nName: Acme\n").unwrap();

    let output = cmd().arg(&file).arg("--json").assert().success();
    let stdout = output.get_output().stdout.clone();
    let value: serde_json::Value = serde_json::from_slice(&stdout).unwrap();
    let object = value.as_object().unwrap();
    let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec!["directives", "errors", "trust_flags", "version", "warnings"]
    );
}

#[test]
fn prompt_flag_emits_generated_prompt_header() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("widget.txt");
    fs::write(
        &file,
        "# @IDENTITY\nName: Acme\n# @OFFER\nPrice: 9.99\nAvailability: InStock\n",
    )
    .unwrap();

    cmd()
        .arg(&file)
        .arg("--prompt")
        .assert()
        .success()
        .stdout(predicate::str::contains("=== GENERATED AI PROMPT ==="))
        .stdout(predicate::str::contains("STORE: Acme"));
}

#[test]
fn strict_mode_exits_1_when_identity_is_missing() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("widget.txt");
    fs::write(&file, "# @PRODUCT\nName: Widget\n").unwrap();

    cmd().arg(&file).arg("--strict").assert().failure().code(1);
}

#[test]
fn strict_mode_exits_1_on_warning_only_document() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("widget.txt");
    fs::write(&file, "# @IDENTITY\nName: T\nCurrency: EURO\n").unwrap();

    cmd().arg(&file).arg("--strict").assert().failure().code(1);
}

#[test]
fn ancestor_commerce_txt_is_merged_automatically() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("products");
    fs::create_dir_all(&sub).unwrap();
    fs::write(dir.path().join("commerce.txt"), "# @IDENTITY\nName: Acme\nCurrency: USD\n").unwrap();
    let file = sub.join("widget.txt");
    fs::write(
        &file,
        "# @PRODUCT\nName: Widget\n# @OFFER\nPrice: 19.99\nAvailability: InStock\n",
    )
    .unwrap();

    cmd()
        .arg(&file)
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Acme\""));
}

#[test]
fn closer_ancestor_overrides_a_further_ancestor_for_the_same_key() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("store");
    let products = store.join("products");
    fs::create_dir_all(&products).unwrap();
    fs::write(dir.path().join("commerce.txt"), "# @IDENTITY\nName: Acme\nCurrency: USD\n").unwrap();
    fs::write(store.join("commerce.txt"), "# @IDENTITY\nCurrency: EUR\n").unwrap();
    let file = products.join("widget.txt");
    fs::write(
        &file,
        "# @PRODUCT\nName: Widget\n# @OFFER\nPrice: 19.99\nAvailability: InStock\n",
    )
    .unwrap();

    cmd()
        .arg(&file)
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Currency\": \"EUR\""));
}

#[test]
fn configured_trusted_review_domain_is_honored() {
    let xdg = tempdir().unwrap();
    let config_dir = xdg.path().join("commercetxt");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.toml"),
        "[limits]\ntrusted_review_domains = [\"myblog.example\"]\n",
    )
    .unwrap();

    let dir = tempdir().unwrap();
    let file = dir.path().join("widget.txt");
    fs::write(
        &file,
        "# @IDENTITY\nName: Acme\n# @REVIEWS\nSource: myblog.example\nRatingScale: 5\n",
    )
    .unwrap();

    cmd()
        .env("XDG_CONFIG_HOME", xdg.path())
        .arg(&file)
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("reviews_unverified").not());
}

#[test]
fn no_ancestor_flag_skips_ancestor_merge() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("products");
    fs::create_dir_all(&sub).unwrap();
    fs::write(dir.path().join("commerce.txt"), "# @IDENTITY\nName: Acme\n").unwrap();
    let file = sub.join("widget.txt");
    fs::write(&file, "# @PRODUCT\nName: Widget\n").unwrap();

    cmd()
        .arg(&file)
        .arg("--no-ancestor")
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Acme\"").not());
}
