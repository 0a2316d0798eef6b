//! Tests for the command-line interface
//!
//! This module tests:
//! - Bundle listing
//! - Catalog generation without prompts
//! - Configuration validation and parse failures

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

use common::TestWorkspace;

#[allow(deprecated)]
fn bundlestore_cmd(workspace: &TestWorkspace) -> Command {
    let mut cmd = Command::cargo_bin("bundlestore").unwrap();
    cmd.current_dir(workspace.temp.path())
        .env_remove("BUNDLESTORE_DOMAIN")
        .env_remove("BUNDLESTORE_AUTHORS_DIR")
        .env_remove("BUNDLESTORE_GIT_URL_DIR")
        .env_remove("BUNDLESTORE_STATIC_DIR")
        .arg("--no-progress")
        .arg("-i")
        .arg(&workspace.input)
        .arg("-o")
        .arg(&workspace.output);
    cmd
}

#[test]
fn test_list_shows_bundles() {
    let workspace = TestWorkspace::new();
    workspace.add_built_source("Pippy.activity", "Pippy", "org.laptop.Pippy", "5");
    workspace.add_archive("Chat", "org.laptop.Chat", "12");

    bundlestore_cmd(&workspace)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("org.laptop.Pippy"))
        .stdout(predicate::str::contains("org.laptop.Chat"));
}

#[test]
fn test_generate_with_noconfirm() {
    let workspace = TestWorkspace::new();
    workspace.add_built_source("Pippy.activity", "Pippy", "org.laptop.Pippy", "5");
    std::fs::create_dir_all(workspace.output_file("app")).unwrap();
    std::fs::write(workspace.output_file("app/stale.html"), "old").unwrap();

    bundlestore_cmd(&workspace)
        .args(["-y", "generate", "--unique-icons", "--sitemap", "https://a.org"])
        .assert()
        .success();

    assert!(!workspace.output_file("app/stale.html").exists());
    assert!(workspace.output_file("app/org.laptop.Pippy.html").is_file());
    assert!(workspace.output_file("icons/org.laptop.Pippy.svg").is_file());
    assert!(
        workspace
            .read_output("sitemap.xml")
            .contains("https://a.org/app/org.laptop.Pippy.html")
    );
}

#[test]
fn test_generate_fails_without_bundles() {
    let workspace = TestWorkspace::new();

    bundlestore_cmd(&workspace)
        .args(["-y", "generate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NoBundlesFound"));
}

#[test]
fn test_validate_rejects_bad_domain() {
    let workspace = TestWorkspace::new();
    let config = workspace.temp.path().join("bundlestore.toml");
    std::fs::write(&config, "[feed]\ndomain = \"not a url\"\n").unwrap();

    bundlestore_cmd(&workspace)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("feed.domain"));
}

#[test]
fn test_generate_rejects_malformed_config() {
    let workspace = TestWorkspace::new();
    workspace.add_built_source("Pippy.activity", "Pippy", "org.laptop.Pippy", "5");
    let config = workspace.temp.path().join("bundlestore.toml");
    std::fs::write(&config, "[feed\ndomain = \"https://a.org\"\n").unwrap();

    bundlestore_cmd(&workspace)
        .args(["-y", "generate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Toml"));

    assert!(!workspace.output_file("index.json").exists());
}
