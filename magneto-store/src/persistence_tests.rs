//! Persistence round-trip and edge case tests.
//!
//! Covers the credential record merge, the selection file and the
//! never-raise save contract.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use magneto_core::{AuthStatus, CredentialRecord, DEFAULT_API_BASE_URL};
use serde_json::json;
use tempfile::TempDir;

use crate::credential_store::CredentialStore;
use crate::persistence::{ensure_dir, load_json, save_json};
use crate::selection_store::SelectionStore;

fn write(path: &PathBuf, content: &str) {
    std::fs::write(path, content).unwrap();
}

/// A path whose parent is a regular file, so every write fails.
fn unwritable_path(temp_dir: &TempDir, name: &str) -> PathBuf {
    let blocker = temp_dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    blocker.join(name)
}

// ============================================================================
// JSON Helpers
// ============================================================================

#[tokio::test]
async fn test_save_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let nested_path = temp_dir.path().join("a").join("b").join("test.json");

    save_json(&nested_path, &json!({"key": "value"})).await.unwrap();

    let loaded: serde_json::Value = load_json(&nested_path).await.unwrap();
    assert_eq!(loaded["key"], "value");
}

#[tokio::test]
async fn test_ensure_dir_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let dir_path = temp_dir.path().join("data");

    ensure_dir(&dir_path).await.unwrap();
    ensure_dir(&dir_path).await.unwrap();

    assert!(dir_path.is_dir());
}

// ============================================================================
// Credential Store
// ============================================================================

#[tokio::test]
async fn test_missing_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let store = CredentialStore::new(temp_dir.path().join("freebox.json"));

    let record = store.load().await;
    assert_eq!(record, CredentialRecord::default());
    assert_eq!(record.api_base_url, DEFAULT_API_BASE_URL);
}

#[tokio::test]
async fn test_partial_file_is_backfilled() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("freebox.json");
    write(&path, r#"{"app_token": "tok", "track_id": 12}"#);

    let record = CredentialStore::new(&path).load().await;
    assert_eq!(record.app_token.as_deref(), Some("tok"));
    assert_eq!(record.track_id, Some(12));
    assert_eq!(record.api_base_url, DEFAULT_API_BASE_URL);
    assert_eq!(record.auth_status, AuthStatus::NotStarted);
    assert!(record.session_token.is_none());
}

#[tokio::test]
async fn test_nulls_and_bad_fields_fall_back_per_field() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("freebox.json");
    write(
        &path,
        r#"{"api_base_url": null, "track_id": "not-a-number", "app_token": "tok", "auth_status": "waiting_approval"}"#,
    );

    let record = CredentialStore::new(&path).load().await;
    assert_eq!(record.api_base_url, DEFAULT_API_BASE_URL);
    assert_eq!(record.track_id, None);
    assert_eq!(record.app_token.as_deref(), Some("tok"));
    assert_eq!(record.auth_status, AuthStatus::WaitingApproval);
}

#[tokio::test]
async fn test_corrupt_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("freebox.json");
    write(&path, "{ this is not json");

    assert_eq!(CredentialStore::new(&path).load().await, CredentialRecord::default());

    write(&path, "[1, 2, 3]");
    assert_eq!(CredentialStore::new(&path).load().await, CredentialRecord::default());
}

#[tokio::test]
async fn test_inconsistent_status_is_downgraded() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("freebox.json");
    write(
        &path,
        r#"{"auth_status": "session_created", "app_token": "tok", "challenge": "c"}"#,
    );

    let record = CredentialStore::new(&path).load().await;
    assert_eq!(record.auth_status, AuthStatus::Authorized);
    assert!(record.validate().is_ok());
}

#[tokio::test]
async fn test_configured_default_base_url() {
    let temp_dir = TempDir::new().unwrap();
    let store = CredentialStore::new(temp_dir.path().join("freebox.json"))
        .with_default_api_base_url("http://10.0.0.1/api/v4/");

    assert_eq!(store.load().await.api_base_url, "http://10.0.0.1/api/v4/");
}

#[tokio::test]
async fn test_save_and_load_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let store = CredentialStore::new(temp_dir.path().join("freebox.json"));

    let mut record = CredentialRecord::default();
    record.app_token = Some("tok".to_string());
    record.session_token = Some("sess".to_string());
    record.challenge = Some("c".to_string());
    record.track_id = Some(7);
    record.auth_status = AuthStatus::SessionCreated;
    record.last_auth_attempt = Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
    record.extra.insert("legacy_flag".to_string(), json!(true));

    assert!(store.save(&record).await);
    assert_eq!(store.load().await, record);
}

#[tokio::test]
async fn test_save_failure_returns_false() {
    let temp_dir = TempDir::new().unwrap();
    let store = CredentialStore::new(unwritable_path(&temp_dir, "freebox.json"));

    assert!(!store.save(&CredentialRecord::default()).await);
    assert!(!store.ensure_initialized().await);
}

#[tokio::test]
async fn test_ensure_initialized_keeps_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("freebox.json");
    let store = CredentialStore::new(&path);

    assert!(store.ensure_initialized().await);
    assert!(path.exists());

    write(&path, r#"{"app_token": "kept"}"#);
    assert!(store.ensure_initialized().await);
    assert_eq!(store.load().await.app_token.as_deref(), Some("kept"));
}

// ============================================================================
// Selection Store
// ============================================================================

#[tokio::test]
async fn test_selection_missing_or_corrupt_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("selected_channels.json");
    let store = SelectionStore::new(&path);

    assert!(store.load().await.is_empty());

    write(&path, "garbage");
    assert!(store.load().await.is_empty());
}

#[tokio::test]
async fn test_selection_file_format() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("selected_channels.json");
    let store = SelectionStore::new(&path);

    let selected: BTreeSet<String> = ["b", "a"].iter().map(|s| (*s).to_string()).collect();
    assert!(store.save(&selected).await);

    let raw: serde_json::Value = load_json(&path).await.unwrap();
    assert_eq!(raw, json!({"selected": ["a", "b"]}));
    assert!(store.contains("a").await);
    assert!(!store.contains("c").await);
}

#[tokio::test]
async fn test_toggle_twice_restores_selection() {
    let temp_dir = TempDir::new().unwrap();
    let store = SelectionStore::new(temp_dir.path().join("selected_channels.json"));

    let original: BTreeSet<String> = ["A"].iter().map(|s| (*s).to_string()).collect();
    store.save(&original).await;

    let once = store.toggle("X").await.unwrap();
    assert!(once.contains("X"));

    let twice = store.toggle("X").await.unwrap();
    assert_eq!(twice, original);
    assert_eq!(store.load().await, original);
}

#[tokio::test]
async fn test_toggle_reports_save_failure() {
    let temp_dir = TempDir::new().unwrap();
    let store = SelectionStore::new(unwritable_path(&temp_dir, "selected_channels.json"));

    assert!(store.toggle("X").await.is_err());
    assert!(store.load().await.is_empty());
}
