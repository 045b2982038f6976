//! Tests for Store
//!
//! These tests verify:
//! - Opening/creating the database and table
//! - get/put/update/delete semantics and failure kinds
//! - Empty-key rejection before any I/O
//! - Corruption and size-limit handling
//! - Persistence across reopen
//! - Batch application

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use quillkv::config::Config;
use quillkv::storage::Store;
use quillkv::txn::PendingOps;
use quillkv::{ErrorKind, Op, Value};
use rusqlite::{params, Connection};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store() -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let store = Store::open_path(&temp_dir.path().join("kv_store.db")).unwrap();
    (temp_dir, store)
}

fn db_path(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("kv_store.db")
}

fn sample_map() -> Value {
    let mut map = BTreeMap::new();
    map.insert("name".to_string(), Value::from("John"));
    map.insert("age".to_string(), Value::Int(30));
    Value::Map(map)
}

// =============================================================================
// Open/Create Tests
// =============================================================================

#[test]
fn test_open_creates_parent_directory_and_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("dir").join("kv.db");

    let store = Store::open_path(&path).unwrap();

    assert!(path.exists());
    assert_eq!(store.path(), path.as_path());
    assert_eq!(store.len().unwrap(), 0);
}

#[test]
fn test_open_is_idempotent_and_keeps_data() {
    let temp_dir = TempDir::new().unwrap();
    let path = db_path(&temp_dir);

    {
        let store = Store::open_path(&path).unwrap();
        store.put("key", &Value::from("value")).unwrap();
    }

    // Second open runs CREATE TABLE IF NOT EXISTS again
    let store = Store::open_path(&path).unwrap();
    assert_eq!(store.get("key").unwrap(), Some(Value::from("value")));
    assert_eq!(store.len().unwrap(), 1);
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_put_get() {
    let (_temp, store) = setup_temp_store();

    store.put("test_key", &Value::from("hello world")).unwrap();

    assert_eq!(
        store.get("test_key").unwrap(),
        Some(Value::from("hello world"))
    );
}

#[test]
fn test_put_number_and_object() {
    let (_temp, store) = setup_temp_store();

    store.put("number", &Value::Int(42)).unwrap();
    store.put("user", &sample_map()).unwrap();

    assert_eq!(store.get("number").unwrap(), Some(Value::Int(42)));
    assert_eq!(store.get("user").unwrap(), Some(sample_map()));
}

#[test]
fn test_get_nonexistent_key_is_none() {
    let (_temp, store) = setup_temp_store();

    assert_eq!(store.get("nonexistent").unwrap(), None);
}

#[test]
fn test_stored_null_is_distinct_from_absent() {
    let (_temp, store) = setup_temp_store();

    store.put("nothing", &Value::Null).unwrap();

    assert_eq!(store.get("nothing").unwrap(), Some(Value::Null));
    assert!(store.contains("nothing").unwrap());
    assert!(!store.contains("missing").unwrap());
}

#[test]
fn test_put_existing_key_fails_and_keeps_first_value() {
    let (_temp, store) = setup_temp_store();

    store.put("key", &Value::Int(1)).unwrap();
    let err = store.put("key", &Value::Int(2)).unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::KeyAlreadyExists));
    assert_eq!(err.operation(), Some(Op::Put));
    assert_eq!(err.key(), Some("key"));
    assert_eq!(store.get("key").unwrap(), Some(Value::Int(1)));
}

#[test]
fn test_update_existing_key() {
    let (_temp, store) = setup_temp_store();

    store.put("key", &Value::from("v1")).unwrap();
    store.update("key", &Value::from("v2")).unwrap();

    assert_eq!(store.get("key").unwrap(), Some(Value::from("v2")));
    assert_eq!(store.len().unwrap(), 1);
}

#[test]
fn test_update_missing_key_fails_and_does_not_create() {
    let (_temp, store) = setup_temp_store();

    let err = store.update("ghost", &Value::Int(1)).unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::KeyNotFound));
    assert_eq!(err.operation(), Some(Op::Update));
    assert_eq!(store.get("ghost").unwrap(), None);
    assert_eq!(store.len().unwrap(), 0);
}

#[test]
fn test_delete() {
    let (_temp, store) = setup_temp_store();

    store.put("key", &Value::Bool(true)).unwrap();
    store.delete("key").unwrap();

    assert_eq!(store.get("key").unwrap(), None);
}

#[test]
fn test_delete_missing_key_fails() {
    let (_temp, store) = setup_temp_store();

    let err = store.delete("ghost").unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::KeyNotFound));
    assert_eq!(err.operation(), Some(Op::Delete));
    assert_eq!(
        err.to_string(),
        "operation 'delete' failed for key 'ghost': Key does not exist"
    );
}

#[test]
fn test_put_after_delete_succeeds() {
    let (_temp, store) = setup_temp_store();

    store.put("key", &Value::Int(1)).unwrap();
    store.delete("key").unwrap();
    store.put("key", &Value::Int(2)).unwrap();

    assert_eq!(store.get("key").unwrap(), Some(Value::Int(2)));
}

// =============================================================================
// Empty Key Tests
// =============================================================================

#[test]
fn test_empty_key_rejected_for_every_operation() {
    let (_temp, store) = setup_temp_store();

    let errors = [
        store.get("").unwrap_err(),
        store.put("", &Value::Int(1)).unwrap_err(),
        store.update("", &Value::Int(1)).unwrap_err(),
        store.delete("").unwrap_err(),
    ];

    for err in &errors {
        assert_eq!(err.kind(), Some(ErrorKind::InvalidKey));
        assert_eq!(err.key(), None);
    }
    assert_eq!(errors[0].operation(), Some(Op::Get));
    assert_eq!(errors[3].to_string(), "operation 'delete' failed: Key cannot be empty");
    assert_eq!(store.len().unwrap(), 0);
}

#[test]
fn test_empty_key_rejected_without_touching_storage() {
    let (temp, store) = setup_temp_store();
    let path = db_path(&temp);

    // With the file gone, any I/O attempt would surface as StorageUnavailable
    fs::remove_file(&path).unwrap();

    assert_eq!(store.get("").unwrap_err().kind(), Some(ErrorKind::InvalidKey));
    assert_eq!(
        store.put("", &Value::Null).unwrap_err().kind(),
        Some(ErrorKind::InvalidKey)
    );
    assert_eq!(
        store.update("", &Value::Null).unwrap_err().kind(),
        Some(ErrorKind::InvalidKey)
    );
    assert_eq!(store.delete("").unwrap_err().kind(), Some(ErrorKind::InvalidKey));
    assert!(!path.exists());
}

// =============================================================================
// Failure Mapping Tests
// =============================================================================

#[test]
fn test_missing_database_is_storage_unavailable() {
    let (temp, store) = setup_temp_store();
    fs::remove_file(db_path(&temp)).unwrap();

    let err = store.get("key").unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::StorageUnavailable));
    assert_eq!(err.key(), Some("key"));

    let err = store.put("key", &Value::Int(1)).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::StorageUnavailable));
}

#[test]
fn test_corrupted_value_is_decode_failure() {
    let (temp, store) = setup_temp_store();
    store.put("key", &Value::from("intact")).unwrap();

    // Flip the last payload byte behind the store's back
    let conn = Connection::open(db_path(&temp)).unwrap();
    let mut bytes: Vec<u8> = conn
        .query_row("SELECT value FROM kv_store WHERE key = 'key'", [], |row| row.get(0))
        .unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    conn.execute(
        "UPDATE kv_store SET value = ?1 WHERE key = 'key'",
        params![bytes],
    )
    .unwrap();
    drop(conn);

    let err = store.get("key").unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::DecodeFailure));
    assert_eq!(err.operation(), Some(Op::Get));
    assert!(err.message().contains("checksum mismatch"));
}

#[test]
fn test_foreign_bytes_are_decode_failure() {
    let (temp, store) = setup_temp_store();

    let conn = Connection::open(db_path(&temp)).unwrap();
    conn.execute(
        "INSERT INTO kv_store (key, value) VALUES ('legacy', ?1)",
        params![b"\x80\x04\x95pickled".to_vec()],
    )
    .unwrap();
    drop(conn);

    let err = store.get("legacy").unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::DecodeFailure));
    assert!(err.message().contains("unsupported format version"));
}

#[test]
fn test_non_blob_cell_is_decode_failure() {
    let (temp, store) = setup_temp_store();

    let conn = Connection::open(db_path(&temp)).unwrap();
    conn.execute(
        "INSERT INTO kv_store (key, value) VALUES ('text', 'plain text'), ('number', 42)",
        [],
    )
    .unwrap();
    drop(conn);

    for key in ["text", "number"] {
        let err = store.get(key).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::DecodeFailure), "key {}", key);
        assert_eq!(err.operation(), Some(Op::Get));
        assert_eq!(err.key(), Some(key));
    }

    // The rest of the table stays readable
    store.put("fine", &Value::Int(1)).unwrap();
    assert_eq!(store.get("fine").unwrap(), Some(Value::Int(1)));
}

#[test]
fn test_oversized_value_is_encode_failure_and_not_written() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .db_path(db_path(&temp_dir))
        .max_value_size(64)
        .build();
    let store = Store::open(&config).unwrap();

    let big = Value::String("x".repeat(1024));
    let err = store.put("big", &big).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::EncodeFailure));
    assert_eq!(store.get("big").unwrap(), None);

    store.put("small", &Value::Int(1)).unwrap();
    let err = store.update("small", &big).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::EncodeFailure));
    assert_eq!(store.get("small").unwrap(), Some(Value::Int(1)));
}

// =============================================================================
// Batch Tests
// =============================================================================

#[test]
fn test_apply_batch_applies_in_kind_order() {
    let (_temp, store) = setup_temp_store();
    store.put("b", &Value::Int(0)).unwrap();

    let mut pending = PendingOps::new();
    pending.push_delete("b");
    pending.push_update("a", Value::Int(2));
    pending.push_set("a", Value::Int(1));

    assert_eq!(store.apply_batch(&pending).unwrap(), 3);
    assert_eq!(store.get("a").unwrap(), Some(Value::Int(2)));
    assert_eq!(store.get("b").unwrap(), None);
}

#[test]
fn test_apply_batch_is_all_or_nothing() {
    let (_temp, store) = setup_temp_store();
    store.put("existing", &Value::Int(0)).unwrap();

    let mut pending = PendingOps::new();
    pending.push_set("fresh", Value::Int(1));
    pending.push_update("existing", Value::Int(99));
    pending.push_delete("ghost");

    let err = store.apply_batch(&pending).unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::KeyNotFound));
    assert_eq!(err.key(), Some("ghost"));
    assert_eq!(store.get("fresh").unwrap(), None);
    assert_eq!(store.get("existing").unwrap(), Some(Value::Int(0)));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_clones_work_from_multiple_threads() {
    let (_temp, store) = setup_temp_store();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..10 {
                    store.put(&format!("t{}_k{}", t, i), &Value::Int(i)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len().unwrap(), 40);
    assert_eq!(store.get("t3_k9").unwrap(), Some(Value::Int(9)));
}
