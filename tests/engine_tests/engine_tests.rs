//! Tests for Engine
//!
//! These tests verify:
//! - Opening from config
//! - Command execution and replies
//! - Transaction state shared through the engine
//! - Serialized access from many threads

use std::sync::Arc;
use std::thread;

use quillkv::config::{CommitMode, Config};
use quillkv::engine::{Engine, Reply};
use quillkv::protocol::{Command, Response, Status};
use quillkv::txn::CommitOutcome;
use quillkv::{ErrorKind, Value};
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .db_path(temp_dir.path().join("data").join("kv_store.db"))
        .build();
    let engine = Engine::open(config).unwrap();
    (temp_dir, engine)
}

fn set(key: &str, value: Value) -> Command {
    Command::Set {
        key: key.to_string(),
        value,
    }
}

fn get(key: &str) -> Command {
    Command::Get {
        key: key.to_string(),
    }
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_engine_open_creates_database() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("mydb").join("kv.db");

    let engine = Engine::open_path(&path).unwrap();

    assert!(path.exists());
    assert_eq!(engine.config().db_path, path);
    assert!(!engine.in_transaction());
}

#[test]
fn test_engine_execute_set_get() {
    let (_temp, engine) = setup_temp_engine();

    let reply = engine.execute(set("key", Value::from("value"))).unwrap();
    assert!(matches!(reply, Reply::Done));

    match engine.execute(get("key")).unwrap() {
        Reply::Value { key, value } => {
            assert_eq!(key, "key");
            assert_eq!(value, Some(Value::from("value")));
        }
        other => panic!("unexpected reply {:?}", other),
    }
}

#[test]
fn test_engine_execute_get_missing() {
    let (_temp, engine) = setup_temp_engine();

    let result = engine.execute(get("missing"));
    assert!(matches!(
        result,
        Ok(Reply::Value { value: None, .. })
    ));

    let response = Response::from_result(&result);
    assert_eq!(response.status, Status::NotFound);
    assert_eq!(response.body["message"], json!("key 'missing' not found"));
}

#[test]
fn test_engine_execute_update_delete() {
    let (_temp, engine) = setup_temp_engine();
    engine.execute(set("key", Value::Int(1))).unwrap();

    engine
        .execute(Command::Update {
            key: "key".to_string(),
            value: Value::Int(2),
        })
        .unwrap();
    engine
        .with_session(|s| assert_eq!(s.get("key").unwrap(), Some(Value::Int(2))));

    engine
        .execute(Command::Delete {
            key: "key".to_string(),
        })
        .unwrap();
    engine.with_session(|s| assert_eq!(s.get("key").unwrap(), None));
}

#[test]
fn test_engine_execute_errors() {
    let (_temp, engine) = setup_temp_engine();
    engine.execute(set("key", Value::Int(1))).unwrap();

    let err = engine.execute(set("key", Value::Int(2))).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::KeyAlreadyExists));

    let err = engine.execute(get("")).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::InvalidKey));
}

#[test]
fn test_engine_execute_health() {
    let (_temp, engine) = setup_temp_engine();

    let response = Response::from_result(&engine.execute(Command::Health));
    assert_eq!(
        response.body,
        json!({"response": "success", "version": quillkv::VERSION})
    );
}

// =============================================================================
// Transaction Tests
// =============================================================================

#[test]
fn test_engine_transaction_flow() {
    let (_temp, engine) = setup_temp_engine();

    engine.execute(Command::Begin).unwrap();
    assert!(engine.in_transaction());

    engine.execute(set("a", Value::Int(1))).unwrap();
    assert!(matches!(
        engine.execute(get("a")).unwrap(),
        Reply::Value { value: None, .. }
    ));

    let reply = engine.execute(Command::Commit).unwrap();
    assert!(matches!(
        reply,
        Reply::Commit(CommitOutcome::Committed { applied: 1 })
    ));
    assert!(!engine.in_transaction());

    let response = Response::from_reply(&reply);
    assert_eq!(response.body, json!({"response": "success", "applied": 1}));
}

#[test]
fn test_engine_rolled_back_commit_response() {
    let (_temp, engine) = setup_temp_engine();

    engine.execute(Command::Begin).unwrap();
    engine
        .execute(Command::Delete {
            key: "ghost".to_string(),
        })
        .unwrap();

    let reply = engine.execute(Command::Commit).unwrap();
    let response = Response::from_reply(&reply);

    assert_eq!(response.status, Status::Conflict);
    assert_eq!(response.body["response"], json!("error"));
    assert_eq!(response.body["applied"], json!(0));
    assert_eq!(response.body["discarded"], json!(1));
    assert!(response.body["message"]
        .as_str()
        .unwrap()
        .contains("Key does not exist"));
}

#[test]
fn test_engine_rollback() {
    let (_temp, engine) = setup_temp_engine();

    engine.execute(Command::Begin).unwrap();
    engine.execute(set("a", Value::Int(1))).unwrap();
    engine.execute(Command::Rollback).unwrap();

    assert!(!engine.in_transaction());
    engine.with_session(|s| {
        assert!(s.pending().is_empty());
        assert_eq!(s.get("a").unwrap(), None);
    });
}

#[test]
fn test_engine_uses_configured_commit_mode() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .db_path(temp_dir.path().join("kv.db"))
        .commit_mode(CommitMode::Atomic)
        .build();
    let engine = Engine::open(config).unwrap();

    engine.with_session(|s| assert_eq!(s.commit_mode(), CommitMode::Atomic));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_engine_concurrent_commands() {
    let (_temp, engine) = setup_temp_engine();
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..25 {
                    engine
                        .execute(set(&format!("t{}_{}", t, i), Value::Int(i)))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    engine.with_session(|s| assert_eq!(s.store().len().unwrap(), 100));
}
