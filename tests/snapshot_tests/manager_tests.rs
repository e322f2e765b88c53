//! Snapshot Manager Tests
//!
//! Tests verify:
//! - Missing file is reported as `None`
//! - Save then load through the file system
//! - Atomic replacement leaves no temp files behind
//! - Quarantine of unreadable files
//! - File and store updated together by install / save_store / reload_into

use std::fs;

use beingkv::model::{HumanBeing, RecordDraft};
use beingkv::snapshot::{self, SnapshotManager};
use beingkv::store::RecordStore;
use tempfile::TempDir;

fn record(id: u32) -> HumanBeing {
    let draft = RecordDraft::from_tokens(&[
        format!("name=Being{}", id),
        "x=1".to_string(),
        "impact_speed=4".to_string(),
        "soundtrack_name=Theme".to_string(),
        "weapon_type=axe".to_string(),
        "car=Volvo".to_string(),
    ])
    .unwrap();
    HumanBeing::create(id, draft).unwrap()
}

#[test]
fn test_load_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let manager = SnapshotManager::new(temp_dir.path().join("absent.xml"));

    assert!(manager.load().unwrap().is_none());
}

#[test]
fn test_load_empty_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("empty.xml");
    fs::write(&path, "  \n").unwrap();

    let report = SnapshotManager::new(&path).load().unwrap().unwrap();
    assert!(report.records.is_empty());
}

#[test]
fn test_save_then_load() {
    let temp_dir = TempDir::new().unwrap();
    let manager = SnapshotManager::new(temp_dir.path().join("beings.xml"));
    let records = vec![record(1), record(2), record(3)];

    manager.save(&records).unwrap();
    let report = manager.load().unwrap().unwrap();

    assert_eq!(report.records, records);
    assert!(report.skipped.is_empty());
}

#[test]
fn test_save_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("dir").join("beings.xml");

    SnapshotManager::new(&path).save(&[record(1)]).unwrap();
    assert!(path.exists());
}

#[test]
fn test_save_overwrites_without_leftovers() {
    let temp_dir = TempDir::new().unwrap();
    let manager = SnapshotManager::new(temp_dir.path().join("beings.xml"));

    manager.save(&[record(1), record(2)]).unwrap();
    manager.save(&[record(9)]).unwrap();

    let report = manager.load().unwrap().unwrap();
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].id(), 9);

    let entries = fs::read_dir(temp_dir.path()).unwrap().count();
    assert_eq!(entries, 1);
}

#[test]
fn test_load_malformed_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("beings.xml");
    fs::write(&path, "<humanBeings><oops>").unwrap();

    assert!(SnapshotManager::new(&path).load().is_err());
}

#[test]
fn test_quarantine_moves_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("beings.xml");
    fs::write(&path, "garbage").unwrap();

    let moved = SnapshotManager::new(&path).quarantine().unwrap();

    assert!(!path.exists());
    assert_eq!(moved, temp_dir.path().join("beings.xml.corrupt"));
    assert_eq!(fs::read_to_string(moved).unwrap(), "garbage");
}

#[test]
fn test_install_writes_file_then_store() {
    let temp_dir = TempDir::new().unwrap();
    let manager = SnapshotManager::new(temp_dir.path().join("beings.xml"));
    let store = RecordStore::new();
    store.insert(record(9)).unwrap();

    assert_eq!(manager.install(&store, vec![record(1), record(2)]).unwrap(), 2);

    let on_disk = snapshot::decode(&fs::read_to_string(manager.path()).unwrap()).unwrap();
    assert_eq!(on_disk, store.values().unwrap());
    assert!(!store.contains(9).unwrap());
}

#[test]
fn test_install_rejects_duplicate_keys_before_writing() {
    let temp_dir = TempDir::new().unwrap();
    let manager = SnapshotManager::new(temp_dir.path().join("beings.xml"));
    let store = RecordStore::new();
    store.insert(record(9)).unwrap();

    assert!(manager.install(&store, vec![record(1), record(1)]).is_err());
    assert!(!manager.path().exists());
    assert!(store.contains(9).unwrap());
}

#[test]
fn test_save_store_and_reload_into() {
    let temp_dir = TempDir::new().unwrap();
    let manager = SnapshotManager::new(temp_dir.path().join("beings.xml"));
    let store = RecordStore::new();

    assert!(manager.reload_into(&store).unwrap().is_none());

    store.insert(record(1)).unwrap();
    store.insert(record(2)).unwrap();
    assert_eq!(manager.save_store(&store).unwrap(), 2);

    let other = RecordStore::new();
    let reloaded = manager.reload_into(&other).unwrap().unwrap();
    assert_eq!(reloaded.loaded, 2);
    assert!(reloaded.skipped.is_empty());
    assert_eq!(other.values().unwrap(), store.values().unwrap());
}
