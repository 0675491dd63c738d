//! Integration tests for the trail-post CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Create a temp config and database location for one test
fn setup_test_env() -> (TempDir, String, String) {
    let temp_dir = TempDir::new().unwrap();

    let config_path = temp_dir.path().join("config.toml");
    let db_path = temp_dir.path().join("trailcast.db");

    let config_content = format!(
        r#"
[database]
path = "{}"
"#,
        db_path.to_string_lossy().replace('\\', "\\\\")
    );
    fs::write(&config_path, config_content).unwrap();

    (
        temp_dir,
        config_path.to_string_lossy().to_string(),
        db_path.to_string_lossy().to_string(),
    )
}

fn trail_post(config: &str, db: &str) -> Command {
    let mut cmd = Command::cargo_bin("trail-post").unwrap();
    cmd.env("TRAILCAST_CONFIG", config)
        .env("TRAILCAST_DB_PATH", db);
    cmd
}

fn create_item(config: &str, db: &str) -> String {
    let output = trail_post(config, db)
        .args([
            "create",
            "Murchison Falls: What to Expect",
            "--summary",
            "The roar of the falls.",
            "--tags",
            "#MurchisonFalls,#Travel",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

#[test]
fn create_prints_content_id() {
    let (_tmp, config, db) = setup_test_env();

    let content_id = create_item(&config, &db);
    assert!(
        uuid::Uuid::parse_str(&content_id).is_ok(),
        "Expected a UUID, got '{}'",
        content_id
    );
}

#[test]
fn create_rejects_empty_title() {
    let (_tmp, config, db) = setup_test_env();

    trail_post(&config, &db)
        .args(["create", "   ", "--summary", "whatever"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Title cannot be empty"));
}

#[test]
fn trends_lists_both_suggestions() {
    let (_tmp, config, db) = setup_test_env();

    trail_post(&config, &db)
        .arg("trends")
        .assert()
        .success()
        .stdout(predicate::str::contains("Queen Elizabeth NP"))
        .stdout(predicate::str::contains("Murchison Falls"));
}

#[test]
fn seed_creates_items_from_trends() {
    let (_tmp, config, db) = setup_test_env();

    let output = trail_post(&config, &db).arg("seed").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 2);
    assert!(stdout.contains("Murchison Falls: What to Expect"));
}

#[test]
fn caption_falls_back_to_template() {
    let (_tmp, config, db) = setup_test_env();
    let content_id = create_item(&config, &db);

    // No caption API key configured: the deterministic template is used,
    // always with the configured default hashtags
    trail_post(&config, &db)
        .args(["caption", &content_id])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Murchison Falls: What to Expect — The roar of the falls. #Travel #Wildlife #Uganda",
        ));
}

#[test]
fn caption_set_stores_exact_text() {
    let (_tmp, config, db) = setup_test_env();
    let content_id = create_item(&config, &db);

    trail_post(&config, &db)
        .args(["caption", &content_id, "--set", "Hand-written caption"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Hand-written caption"));
}

#[test]
fn caption_unknown_content_id_fails() {
    let (_tmp, config, db) = setup_test_env();

    trail_post(&config, &db)
        .args(["caption", "no-such-id"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn schedule_prints_entry_id() {
    let (_tmp, config, db) = setup_test_env();
    let content_id = create_item(&config, &db);

    let output = trail_post(&config, &db)
        .args(["schedule", &content_id, "--at", "2h", "--platforms", "instagram"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let entry_id = String::from_utf8(output.stdout).unwrap().trim().to_string();
    assert!(uuid::Uuid::parse_str(&entry_id).is_ok());

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("facebook_instagram"));
}

#[test]
fn schedule_rejects_bad_fire_time() {
    let (_tmp, config, db) = setup_test_env();
    let content_id = create_item(&config, &db);

    trail_post(&config, &db)
        .args(["schedule", &content_id, "--at", "not a time"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Could not parse fire time"));
}

#[test]
fn schedule_rejects_unknown_platform() {
    let (_tmp, config, db) = setup_test_env();
    let content_id = create_item(&config, &db);

    trail_post(&config, &db)
        .args(["schedule", &content_id, "--platforms", "myspace"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Unknown platform"));
}

#[test]
fn schedule_uses_config_default_platforms() {
    let (_tmp, config, db) = setup_test_env();
    let content_id = create_item(&config, &db);

    // No --platforms: falls back to the default (facebook_instagram)
    trail_post(&config, &db)
        .args(["schedule", &content_id])
        .assert()
        .success()
        .stderr(predicate::str::contains("facebook_instagram"));
}

#[test]
fn now_without_publishers_reports_failure() {
    let (_tmp, config, db) = setup_test_env();
    let content_id = create_item(&config, &db);

    // No platform credentials configured: every target fails, exit 1
    trail_post(&config, &db)
        .args(["now", &content_id, "--platforms", "tiktok"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("tiktok: failed"))
        .stdout(predicate::str::contains("platform not configured"));
}
