//! Integration tests for the file-backed settings store.

use fabomatic_core::{CardUid, UserLevel};
use fabomatic_storage::{CachedCard, FileSettingsStore, SavedSettings, SettingsStore};
use tempfile::TempDir;

fn sample() -> SavedSettings {
    let mut settings = SavedSettings::new("broker.local", "board", "secret", "laser1", 3);
    settings.card_cache.push(CachedCard {
        uid: CardUid::new(0xAABBCCD1),
        level: UserLevel::User,
        name: "Ada".into(),
    });
    settings.message_buffer = Some(r#"{"magic":17767,"messages":[]}"#.into());
    settings
}

#[tokio::test]
async fn test_save_then_load_roundtrip() {
    let dir = TempDir::new().unwrap();
    let store = FileSettingsStore::new(dir.path().join("settings.json"));

    assert_eq!(store.load().await.unwrap(), None);

    let settings = sample();
    store.save(&settings).await.unwrap();
    let loaded = store.load().await.unwrap().expect("settings present");
    assert_eq!(loaded, settings);
}

#[tokio::test]
async fn test_corrupt_file_reads_as_absent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    tokio::fs::write(&path, "{ not json").await.unwrap();

    let store = FileSettingsStore::new(&path);
    assert_eq!(store.load().await.unwrap(), None);

    // The next save replaces the corrupt blob.
    store.save(&sample()).await.unwrap();
    assert!(store.load().await.unwrap().is_some());
}

#[tokio::test]
async fn test_version_mismatch_reads_as_absent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    let store = FileSettingsStore::new(&path);
    store.save(&sample()).await.unwrap();

    // Rewrite the blob with a different version stamp.
    let contents = tokio::fs::read_to_string(&path).await.unwrap();
    let mut v: serde_json::Value = serde_json::from_str(&contents).unwrap();
    v["magic"] = serde_json::json!(1);
    tokio::fs::write(&path, v.to_string()).await.unwrap();

    assert_eq!(store.load().await.unwrap(), None);
}

#[tokio::test]
async fn test_clear_removes_blob() {
    let dir = TempDir::new().unwrap();
    let store = FileSettingsStore::new(dir.path().join("settings.json"));
    store.save(&sample()).await.unwrap();
    store.clear().await.unwrap();
    assert_eq!(store.load().await.unwrap(), None);
    // Clearing an absent blob is fine.
    store.clear().await.unwrap();
}

#[tokio::test]
async fn test_save_overwrites_previous() {
    let dir = TempDir::new().unwrap();
    let store = FileSettingsStore::new(dir.path().join("settings.json"));
    store.save(&sample()).await.unwrap();

    let mut updated = sample();
    updated.machine_name = "printer2".into();
    updated.touch();
    store.save(&updated).await.unwrap();

    let loaded = store.load().await.unwrap().expect("settings present");
    assert_eq!(loaded.machine_name, "printer2");
}
