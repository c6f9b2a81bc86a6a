use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn pipeline_prints_paragraph_blocks() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("post.html");
    fs::write(&input, "<p>Hello world</p>").unwrap();

    let mut cmd = cargo_bin_cmd!("blockshift");
    cmd.current_dir(dir.path()).arg("pipeline").arg(&input);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "<!-- wp:paragraph -->\n<p>Hello world</p>\n<!-- /wp:paragraph -->",
        ));
}

#[test]
fn pipeline_leaves_existing_blocks_alone() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("mixed.html");
    let existing = "<!-- wp:heading -->\n<h2>Kept   as is</h2>\n<!-- /wp:heading -->";
    fs::write(&input, format!("<p>Intro</p>\n{existing}")).unwrap();

    let mut cmd = cargo_bin_cmd!("blockshift");
    cmd.current_dir(dir.path()).arg("pipeline").arg(&input);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(existing))
        .stdout(predicate::str::contains("blockshift:encoded-block").not());
}

#[test]
fn pipeline_reports_unbalanced_shortcode() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("broken.html");
    fs::write(&input, "<p>[gallery ids=1</p>").unwrap();

    let mut cmd = cargo_bin_cmd!("blockshift");
    cmd.current_dir(dir.path())
        .arg("pipeline")
        .arg(&input)
        .arg("--id")
        .arg("42");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Conversion error"))
        .stderr(predicate::str::contains("42"));
}

#[test]
fn pipeline_missing_file_fails() {
    let dir = tempdir().unwrap();

    let mut cmd = cargo_bin_cmd!("blockshift");
    cmd.current_dir(dir.path())
        .arg("pipeline")
        .arg("does-not-exist.html");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error reading file"));
}

#[test]
fn pipeline_respects_chain_from_config() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("post.html");
    fs::write(&input, "<p>Hi</p>").unwrap();

    let config = dir.path().join("custom.toml");
    fs::write(&config, "[chain]\npre = []\npost = [\"no-such-patcher\"]\n").unwrap();

    let mut cmd = cargo_bin_cmd!("blockshift");
    cmd.current_dir(dir.path())
        .arg("pipeline")
        .arg(&input)
        .arg("--config")
        .arg(&config);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid patch chain"));
}

#[test]
fn missing_config_file_fails() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("post.html");
    fs::write(&input, "<p>Hi</p>").unwrap();

    let mut cmd = cargo_bin_cmd!("blockshift");
    cmd.current_dir(dir.path())
        .arg("pipeline")
        .arg(&input)
        .arg("--config")
        .arg(dir.path().join("absent.toml"));

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}
