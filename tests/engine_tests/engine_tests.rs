//! Tests for Engine
//!
//! These tests verify:
//! - Startup with missing, valid, partially invalid and corrupt snapshots
//! - Request routing (registry commands, get_dump, save_dump)
//! - Persistence on close
//! - Concurrent request execution
//! - Snapshot writes serialized with store swaps

use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use beingkv::commands::Caller;
use beingkv::config::Config;
use beingkv::engine::Engine;
use beingkv::protocol::{Request, GET_DUMP, SAVE_DUMP};
use beingkv::snapshot;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn config_in(temp_dir: &TempDir) -> Config {
    Config::builder()
        .snapshot_path(temp_dir.path().join("beings.xml"))
        .build()
}

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(config_in(&temp_dir)).unwrap();
    (temp_dir, engine)
}

fn client() -> SocketAddr {
    "127.0.0.1:50000".parse().unwrap()
}

fn request(line: &str) -> Request {
    Request::parse_line(line, client()).unwrap()
}

fn insert_line(key: u32, name: &str) -> String {
    format!(
        "insert {} name={} x=1 impact_speed=3 soundtrack_name=Theme weapon_type=axe",
        key, name
    )
}

const TWO_RECORDS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<humanBeings>
  <humanBeing id="1">
    <name>Ann</name>
    <coordinates><x>1</x><y></y></coordinates>
    <creationDate>2024-01-01</creationDate>
    <realHero>true</realHero>
    <hasToothpick></hasToothpick>
    <impactSpeed>3</impactSpeed>
    <soundtrackName>Theme</soundtrackName>
    <minutesOfWaiting></minutesOfWaiting>
    <weaponType>AXE</weaponType>
    <car><name>Audi</name></car>
  </humanBeing>
  <humanBeing id="2">
    <name>Bob</name>
    <coordinates><x>2</x><y>1.5</y></coordinates>
    <creationDate>2024-01-02</creationDate>
    <realHero></realHero>
    <hasToothpick></hasToothpick>
    <impactSpeed>9</impactSpeed>
    <soundtrackName>Other</soundtrackName>
    <minutesOfWaiting>2</minutesOfWaiting>
    <weaponType>KNIFE</weaponType>
    <car><name></name></car>
  </humanBeing>
</humanBeings>
"#;

// =============================================================================
// Startup Tests
// =============================================================================

#[test]
fn test_open_without_snapshot_starts_empty() {
    let (_temp, engine) = setup_temp_engine();
    assert!(engine.store().is_empty().unwrap());
}

#[test]
fn test_open_without_snapshot_when_required() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .snapshot_path(temp_dir.path().join("absent.xml"))
        .require_snapshot(true)
        .build();

    assert!(Engine::open(config).is_err());
}

#[test]
fn test_open_loads_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("beings.xml"), TWO_RECORDS).unwrap();

    let engine = Engine::open(config_in(&temp_dir)).unwrap();
    assert_eq!(engine.store().len().unwrap(), 2);
}

#[test]
fn test_open_skips_invalid_records() {
    let temp_dir = TempDir::new().unwrap();
    let partly_bad = TWO_RECORDS.replace("<impactSpeed>9</impactSpeed>", "<impactSpeed>0</impactSpeed>");
    fs::write(temp_dir.path().join("beings.xml"), partly_bad).unwrap();

    let engine = Engine::open(config_in(&temp_dir)).unwrap();
    let ids: Vec<u32> = engine.store().values().unwrap().iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec![1]);
}

#[test]
fn test_open_quarantines_corrupt_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("beings.xml");
    fs::write(&path, "<humanBeings><humanBeing").unwrap();

    let engine = Engine::open(config_in(&temp_dir)).unwrap();

    assert!(engine.store().is_empty().unwrap());
    assert!(!path.exists());
    assert!(temp_dir.path().join("beings.xml.corrupt").exists());
}

#[test]
fn test_open_rejects_bad_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .snapshot_path(temp_dir.path().join("beings.xml"))
        .read_workers(0)
        .build();

    assert!(Engine::open(config).is_err());
}

// =============================================================================
// Request Routing Tests
// =============================================================================

#[test]
fn test_execute_registry_command() {
    let (_temp, engine) = setup_temp_engine();

    let response = engine.execute(&request(&insert_line(1, "Ann")));
    assert!(response.success, "{}", response.message);
    assert_eq!(response.destination, client());

    let response = engine.execute(&request("remove_key 42"));
    assert!(!response.success);
}

#[test]
fn test_response_echoes_request_id() {
    let (_temp, engine) = setup_temp_engine();

    let response = engine.execute(&request("info").with_id(77));
    assert_eq!(response.request_id, 77);

    let response = engine.execute(&Request::new(GET_DUMP, vec![], client()).with_id(78));
    assert_eq!(response.request_id, 78);

    let response = engine.execute(&request("no_such_command").with_id(79));
    assert!(!response.success);
    assert_eq!(response.request_id, 79);
}

#[test]
fn test_remote_exit_does_not_stop_anything() {
    let (_temp, engine) = setup_temp_engine();
    let response = engine.execute(&request("exit"));
    assert!(response.success);
    assert_eq!(response.message, "Goodbye");
}

#[test]
fn test_get_dump_encodes_store() {
    let (_temp, engine) = setup_temp_engine();
    engine.execute(&request(&insert_line(1, "Ann")));
    engine.execute(&request(&insert_line(2, "Bob")));

    let response = engine.execute(&Request::new(GET_DUMP, vec![], client()));

    assert!(response.success);
    let records = snapshot::decode(response.payload.as_deref().unwrap()).unwrap();
    assert_eq!(records, engine.store().values().unwrap());
}

#[test]
fn test_dump_scenario() {
    let (temp_dir, engine) = setup_temp_engine();

    let dump = engine.execute(&Request::new(GET_DUMP, vec![], client()));
    assert!(dump.success);

    let save = Request::new(SAVE_DUMP, vec![], client()).with_payload(TWO_RECORDS);
    let response = engine.execute(&save);
    assert!(response.success, "{}", response.message);

    // Store and file both hold the uploaded records
    assert_eq!(engine.store().len().unwrap(), 2);
    let on_disk = fs::read_to_string(temp_dir.path().join("beings.xml")).unwrap();
    assert_eq!(snapshot::decode(&on_disk).unwrap().len(), 2);

    let again = engine.execute(&Request::new(GET_DUMP, vec![], client()));
    let records = snapshot::decode(again.payload.as_deref().unwrap()).unwrap();
    assert_eq!(records, snapshot::decode(TWO_RECORDS).unwrap());
}

#[test]
fn test_save_dump_rejects_invalid_document() {
    let (temp_dir, engine) = setup_temp_engine();
    engine.execute(&request(&insert_line(5, "Keep")));

    let bad = TWO_RECORDS.replace("<name>Bob</name>", "<name></name>");
    let response = engine.execute(&Request::new(SAVE_DUMP, vec![], client()).with_payload(bad));

    assert!(!response.success);
    assert!(engine.store().contains(5).unwrap());
    assert!(!temp_dir.path().join("beings.xml").exists());
}

#[test]
fn test_save_dump_without_payload() {
    let (_temp, engine) = setup_temp_engine();
    let response = engine.execute(&Request::new(SAVE_DUMP, vec![], client()));
    assert!(!response.success);
}

#[test]
fn test_console_commands() {
    let (_temp, engine) = setup_temp_engine();
    engine.execute(&request(&insert_line(1, "Ann")));

    let outcome = engine.run_command(Caller::Console, "save", &[]);
    assert!(outcome.success);
    assert!(engine.snapshot_path().exists());
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_close_persists_and_reopens() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = Engine::open(config_in(&temp_dir)).unwrap();
        engine.execute(&request(&insert_line(1, "Ann")));
        engine.execute(&request(&insert_line(2, "Bob")));
        engine.close().unwrap();
    }

    let engine = Engine::open(config_in(&temp_dir)).unwrap();
    assert_eq!(engine.store().len().unwrap(), 2);
    assert_eq!(engine.store().get(2).unwrap().unwrap().name(), "Bob");
}

#[test]
fn test_concurrent_requests() {
    let (_temp, engine) = setup_temp_engine();
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..25 {
                    let key = t * 25 + i + 1;
                    let response = engine.execute(&request(&insert_line(key, "Ann")));
                    assert!(response.success, "{}", response.message);
                    engine.execute(&request("show"));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.store().len().unwrap(), 100);
}

#[test]
fn test_concurrent_save_and_save_dump_keep_file_in_step() {
    let (temp_dir, engine) = setup_temp_engine();
    let engine = Arc::new(engine);
    let path = temp_dir.path().join("beings.xml");

    for round in 0..20 {
        engine.store().clear().unwrap();
        engine.execute(&request(&insert_line(round + 10, "Old")));

        let dumper = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let save = Request::new(SAVE_DUMP, vec![], client()).with_payload(TWO_RECORDS);
                assert!(engine.execute(&save).success);
            })
        };
        let saver = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                assert!(engine.run_command(Caller::Console, "save", &[]).success);
            })
        };
        dumper.join().unwrap();
        saver.join().unwrap();

        let on_disk = snapshot::decode(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, engine.store().values().unwrap(), "round {}", round);
    }
}
