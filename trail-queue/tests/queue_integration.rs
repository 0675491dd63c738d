//! Integration tests for the trail-queue CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

use libtrailcast::types::{ContentItem, PlatformId};
use libtrailcast::ScheduleStore;

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

fn trail_queue(config: &str, db: &str) -> Command {
    let mut cmd = Command::cargo_bin("trail-queue").unwrap();
    cmd.env("TRAILCAST_CONFIG", config)
        .env("TRAILCAST_DB_PATH", db);
    cmd
}

/// Seed one pending entry directly through the library
async fn seed_entry(db: &str, fire_at: i64) -> String {
    let store = ScheduleStore::new(db).await.unwrap();
    let item = ContentItem::new(
        "Top Safari Lodges in Queen Elizabeth NP".to_string(),
        "Sunrise views over the Kazinga Channel.".to_string(),
        vec!["#Safari".to_string()],
    );
    store.create_content_item(&item).await.unwrap();
    let entry = store
        .create_entry(&item.id, vec![PlatformId::FacebookInstagram], fire_at)
        .await
        .unwrap();
    entry.id
}

#[tokio::test]
async fn list_empty_queue() {
    let (_tmp, config, db) = setup_test_env();

    trail_queue(&config, &db)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No schedule entries"));
}

#[tokio::test]
async fn list_shows_pending_entry() {
    let (_tmp, config, db) = setup_test_env();
    let entry_id = seed_entry(&db, 2_000_000_000).await;

    trail_queue(&config, &db)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains(&entry_id))
        .stdout(predicate::str::contains("pending"))
        .stdout(predicate::str::contains("facebook_instagram"));
}

#[tokio::test]
async fn list_json_is_parseable() {
    let (_tmp, config, db) = setup_test_env();
    seed_entry(&db, 2_000_000_000).await;

    let output = trail_queue(&config, &db)
        .args(["list", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON");
    assert_eq!(parsed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn list_rejects_bad_format() {
    let (_tmp, config, db) = setup_test_env();

    trail_queue(&config, &db)
        .args(["list", "--format", "yaml"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Invalid format"));
}

#[tokio::test]
async fn list_rejects_unknown_status() {
    let (_tmp, config, db) = setup_test_env();

    trail_queue(&config, &db)
        .args(["list", "--status", "bogus"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Unknown status"));
}

#[tokio::test]
async fn cancel_pending_entry() {
    let (_tmp, config, db) = setup_test_env();
    let entry_id = seed_entry(&db, 2_000_000_000).await;

    trail_queue(&config, &db)
        .args(["cancel", &entry_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled"));

    // And it no longer shows as pending
    trail_queue(&config, &db)
        .args(["list", "--status", "cancelled"])
        .assert()
        .success()
        .stdout(predicate::str::contains(&entry_id));
}

#[tokio::test]
async fn cancel_unknown_entry_fails() {
    let (_tmp, config, db) = setup_test_env();

    trail_queue(&config, &db)
        .args(["cancel", "no-such-entry"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[tokio::test]
async fn cancel_cancelled_entry_is_rejected() {
    let (_tmp, config, db) = setup_test_env();
    let entry_id = seed_entry(&db, 2_000_000_000).await;

    trail_queue(&config, &db)
        .args(["cancel", &entry_id])
        .assert()
        .success();

    trail_queue(&config, &db)
        .args(["cancel", &entry_id])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Cannot cancel"));
}

#[tokio::test]
async fn reschedule_moves_fire_time() {
    let (_tmp, config, db) = setup_test_env();
    let entry_id = seed_entry(&db, 2_000_000_000).await;

    trail_queue(&config, &db)
        .args(["reschedule", &entry_id, "--at", "2h"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rescheduled"));

    let store = ScheduleStore::new(&db).await.unwrap();
    let entry = store.get_entry(&entry_id).await.unwrap();
    let now = chrono::Utc::now().timestamp();
    assert!(entry.fire_at > now + 3600 && entry.fire_at <= now + 2 * 3600 + 60);
}

#[tokio::test]
async fn reschedule_rejected_after_cancel() {
    let (_tmp, config, db) = setup_test_env();
    let entry_id = seed_entry(&db, 2_000_000_000).await;

    trail_queue(&config, &db)
        .args(["cancel", &entry_id])
        .assert()
        .success();

    trail_queue(&config, &db)
        .args(["reschedule", &entry_id, "--at", "now"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Cannot reschedule"));
}

#[tokio::test]
async fn now_dispatches_pending_entry() {
    let (_tmp, config, db) = setup_test_env();
    // Fire time far in the future: 'now' ignores it
    let entry_id = seed_entry(&db, 2_000_000_000).await;

    // No publishers configured, so the attempt records a failure but the
    // entry still settles
    trail_queue(&config, &db)
        .args(["now", &entry_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("platform not configured"));

    trail_queue(&config, &db)
        .args(["list", "--status", "failed"])
        .assert()
        .success()
        .stdout(predicate::str::contains(&entry_id));
}

#[tokio::test]
async fn now_rejects_cancelled_entry() {
    let (_tmp, config, db) = setup_test_env();
    let entry_id = seed_entry(&db, 2_000_000_000).await;

    trail_queue(&config, &db)
        .args(["cancel", &entry_id])
        .assert()
        .success();

    trail_queue(&config, &db)
        .args(["now", &entry_id])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("cannot be dispatched"));
}

#[tokio::test]
async fn results_shows_recorded_attempts() {
    let (_tmp, config, db) = setup_test_env();
    let entry_id = seed_entry(&db, 2_000_000_000).await;

    trail_queue(&config, &db)
        .args(["results", &entry_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("No results yet"));

    trail_queue(&config, &db)
        .args(["now", &entry_id])
        .assert()
        .success();

    trail_queue(&config, &db)
        .args(["results", &entry_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("facebook_instagram"))
        .stdout(predicate::str::contains("failed"));
}

#[tokio::test]
async fn stats_counts_by_status() {
    let (_tmp, config, db) = setup_test_env();
    seed_entry(&db, 2_000_000_000).await;
    let cancelled = seed_entry(&db, 2_000_000_000).await;

    trail_queue(&config, &db)
        .args(["cancel", &cancelled])
        .assert()
        .success();

    let output = trail_queue(&config, &db)
        .args(["stats", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["pending"], 1);
    assert_eq!(parsed["cancelled"], 1);
    assert_eq!(parsed["total"], 2);
}
